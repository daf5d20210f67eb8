//! Out-of-scope collaborators, stubbed: the actual AVDTP engine and L2CAP
//! socket plumbing are a separate system (a real build links e.g. a
//! `bt_avdtp`-equivalent crate and an L2CAP socket crate here). This module
//! gives `main` something that satisfies `ProfileService` and `HalNotifier`
//! so the coordinator's wiring is exercised end-to-end without depending on
//! a live Bluetooth controller.

use std::sync::Arc;

use a2dp_coordinator::ids::EndpointId;
use a2dp_coordinator::profile::{CoordinatorEvent, HalNotifier, ProfileService};
use a2dp_coordinator::types::{BdAddr, ConnectionState};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// Reports every signaling/transport connect attempt as an immediate
/// failure. A real implementation dials L2CAP PSM 0x19 and feeds the
/// outcome back through the same `events` channel as a
/// `SignalingConnected` / `SignalingConnectFailed` event.
pub struct StubProfileService {
    events: UnboundedSender<CoordinatorEvent>,
}

impl StubProfileService {
    pub fn new(events: UnboundedSender<CoordinatorEvent>) -> Self {
        Self { events }
    }
}

impl ProfileService for StubProfileService {
    fn connect_signaling(&self, device: BdAddr) {
        info!(%device, "connect_signaling: no L2CAP backend wired, reporting failure");
        let _ = self.events.send(CoordinatorEvent::SignalingConnectFailed { device });
    }

    fn connect_transport(&self, device: BdAddr, endpoint: EndpointId) {
        info!(%device, %endpoint, "connect_transport: no L2CAP backend wired, reporting failure");
        let _ = self.events.send(CoordinatorEvent::TransportConnectFailed { device, endpoint });
    }
}

/// Forwards `CONN_STATE` notifications to every HAL IPC connection
/// currently attached, so a real daemon's multiple HAL clients (if any)
/// all observe the same state transitions.
#[derive(Clone)]
pub struct BroadcastHalNotifier {
    subscribers: Arc<Mutex<Vec<UnboundedSender<(BdAddr, ConnectionState)>>>>,
}

impl BroadcastHalNotifier {
    pub fn new() -> Self {
        Self { subscribers: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn subscribe(&self) -> tokio::sync::mpsc::UnboundedReceiver<(BdAddr, ConnectionState)> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }
}

impl HalNotifier for BroadcastHalNotifier {
    fn conn_state(&self, device: BdAddr, state: ConnectionState) {
        self.subscribers.lock().retain(|tx| tx.send((device, state)).is_ok());
    }
}
