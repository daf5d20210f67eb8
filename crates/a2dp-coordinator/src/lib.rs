//! Core, transport-free coordinator for the source role of A2DP: device
//! connection lifecycle, endpoint and preset bookkeeping, codec
//! negotiation, and the AVDTP indication/confirmation protocol. Everything
//! that talks to a socket lives one layer up, in the `a2dp-sourced` binary;
//! this crate only defines the trait boundaries that binary implements.

pub mod avdtp;
pub mod codec;
pub mod coordinator;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod ids;
pub mod preset;
pub mod profile;
pub mod sdp;
pub mod setup;
pub mod types;

pub use coordinator::{Coordinator, StreamInfo};
pub use error::CoordinatorError;
pub use ids::{DeviceId, EndpointId, SetupId};
pub use types::{BdAddr, ConnectionState};
