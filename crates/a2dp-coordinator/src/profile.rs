//! The L2CAP/profile-service boundary (§6 "L2CAP") and the HAL notification
//! sink (§6 HAL IPC "event CONN_STATE"). Both are external collaborators
//! per §1; this module only names the narrow interface the coordinator
//! calls through, mirroring the role `fidl_fuchsia_bluetooth_bredr::ProfileProxy`
//! plays in the teacher's `Peer::stream_start`.

use crate::avdtp::AvdtpSession;
use crate::types::{BdAddr, ConnectionState};

/// Initiates outbound L2CAP connections to PSM 0x19 at MEDIUM security
/// (§4.4, §6). Both the signaling channel and each stream's media transport
/// channel go through this. Connection attempts are asynchronous; their
/// outcome arrives later as a `CoordinatorEvent` fed back into the
/// coordinator (§5).
pub trait ProfileService: Send + Sync {
    /// Begin an outbound signaling connection to `device` on PSM 0x19.
    fn connect_signaling(&self, device: BdAddr);

    /// Begin an outbound media transport connection to `device` on PSM
    /// 0x19, for the stream owned by `endpoint` (§4.5 confirmation "open").
    fn connect_transport(&self, device: BdAddr, endpoint: crate::ids::EndpointId);
}

/// Delivers `CONN_STATE` notifications to the HAL client (§6). Exactly one
/// call per distinct state transition (§4.4, §8 invariant 4).
pub trait HalNotifier: Send + Sync {
    fn conn_state(&self, device: BdAddr, state: ConnectionState);
}

/// Events fed into `Coordinator::handle_event`, the single point through
/// which AVDTP and L2CAP drive state transitions (§5: "three input
/// sources"). A real binary's socket/engine glue translates raw callbacks
/// into these; a test drives them directly with no wire bytes at all.
pub enum CoordinatorEvent {
    /// The outbound or inbound signaling L2CAP channel for `device`
    /// finished connecting. `session` is the freshly constructed AVDTP
    /// session (§4.4: "construct the AVDTP session from the socket fd and
    /// negotiated MTUs").
    SignalingConnected { device: BdAddr, session: Box<dyn AvdtpSession> },
    /// The outbound signaling connection attempt failed.
    SignalingConnectFailed { device: BdAddr },
    /// The AVDTP engine's disconnect callback fired for `device` (remote
    /// drop, or confirmation of a locally requested shutdown).
    Disconnected { device: BdAddr },
    /// A second L2CAP connection to `device` completed and is to be bound
    /// as the media transport channel for `endpoint`'s stream (§4.5
    /// confirmation "open").
    TransportConnected { device: BdAddr, endpoint: crate::ids::EndpointId, stream: crate::avdtp::StreamHandle },
    /// The second L2CAP connection attempt failed.
    TransportConnectFailed { device: BdAddr, endpoint: crate::ids::EndpointId },
    /// An inbound AVDTP indication from `device`.
    Indication { device: BdAddr, indication: crate::avdtp::Indication },
    /// The outcome of a locally-initiated AVDTP request to `device`.
    Confirmation { device: BdAddr, confirmation: crate::avdtp::Confirmation },
}
