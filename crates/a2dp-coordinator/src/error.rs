//! Error taxonomy (spec §7). Nothing here crosses the IPC boundary as
//! structured data -- HAL responses carry a status byte and Audio IPC
//! responses carry success/failure; callers project these down to that.

use crate::BdAddr;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The AVDTP engine surfaced a failure, or a remote capability was
    /// invalid in a way that a protocol-level retry can't fix. Recovered by
    /// destroying the affected setup, or shutting down the session if it
    /// happened during discovery/selection.
    #[error("AVDTP protocol error: {0}")]
    ProtocolError(String),

    /// A peer-proposed capability failed the codec or length checks.
    /// Rejected via a negative indication confirmation; no state change.
    #[error("invalid codec configuration")]
    InvalidConfig,

    /// HAL A2DP_CONNECT against a BD_ADDR that already has a live device
    /// record.
    #[error("peer {0} is already tracked")]
    PeerAlreadyTracked(BdAddr),

    /// HAL A2DP_DISCONNECT (or other device-scoped op) against a BD_ADDR
    /// with no live device record.
    #[error("peer {0} is not tracked")]
    PeerNotTracked(BdAddr),

    /// Stream discovery completed, but no local endpoint matched any
    /// remote SEP (by codec type and direction).
    #[error("no local endpoint matches a remote stream endpoint")]
    NoMatchingEndpoint,

    /// A matching remote SEP was found, but no preferred preset on the
    /// chosen endpoint passes the codec validator against its capability.
    #[error("no preset is compatible with the remote endpoint's capabilities")]
    NoMatchingPreset,

    /// The media-transport channel's MTU query or `stream_set_transport`
    /// failed. Logged and dropped; the AVDTP engine will abort the stream
    /// via its own timeout path.
    #[error("media transport setup failed: {0}")]
    TransportSetupFailure(String),

    /// Audio OPEN carried a truncated or malformed preset payload.
    #[error("malformed preset payload: {0}")]
    IpcParseError(String),

    /// Referenced an endpoint ID with no live endpoint.
    #[error("no such endpoint")]
    NoSuchEndpoint,

    /// Referenced an endpoint with no in-progress or active setup.
    #[error("endpoint is not in use")]
    SepNotInUse,
}
