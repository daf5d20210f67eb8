//! Device table & connection FSM (spec §4.4).

use std::collections::HashMap;

use crate::avdtp::AvdtpSession;
use crate::error::CoordinatorError;
use crate::ids::{AllocatesId, DeviceId, IdAllocator};
use crate::types::{BdAddr, ConnectionState};

/// One entry per peer BD_ADDR currently interacting with us (§3).
pub struct Device {
    id: DeviceId,
    addr: BdAddr,
    state: ConnectionState,
    /// Set while an outbound L2CAP signaling connect is outstanding.
    connecting: bool,
    /// The AVDTP session, present iff `state == Connected` (§3 invariant:
    /// "A device in Connected state has a non-null AVDTP session; no other
    /// state does").
    session: Option<Box<dyn AvdtpSession>>,
    /// True if this device's signaling connection was initiated locally
    /// (HAL A2DP_CONNECT), false if accepted from an inbound L2CAP
    /// connection (§4.4 "Incoming connection path").
    initiated_locally: bool,
}

impl Device {
    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn addr(&self) -> BdAddr {
        self.addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> Option<&dyn AvdtpSession> {
        self.session.as_deref()
    }

    pub fn initiated_locally(&self) -> bool {
        self.initiated_locally
    }

    /// A local disconnect on this device's signaling channel can complete
    /// immediately (no AVDTP shutdown round-trip) iff it is still
    /// connecting and has no session yet (§5 "Cancellation & timeouts").
    pub fn can_disconnect_immediately(&self) -> bool {
        self.connecting && self.session.is_none()
    }
}

/// Tracks one `Device` per live BD_ADDR (§3 invariant 1 / §8 invariant 1).
#[derive(Default)]
pub struct DeviceTable {
    devices: HashMap<BdAddr, Device>,
    ids: IdAllocator,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self { devices: HashMap::new(), ids: IdAllocator::default() }
    }

    pub fn get(&self, addr: BdAddr) -> Option<&Device> {
        self.devices.get(&addr)
    }

    pub fn get_mut(&mut self, addr: BdAddr) -> Option<&mut Device> {
        self.devices.get_mut(&addr)
    }

    pub fn contains(&self, addr: BdAddr) -> bool {
        self.devices.contains_key(&addr)
    }

    /// Creates a new device record in the `Connecting` state, for a local
    /// connect request. Fails if a record already exists (§6 A2DP_CONNECT:
    /// "fails if device already tracked").
    pub fn begin_local_connect(&mut self, addr: BdAddr) -> Result<(), CoordinatorError> {
        if self.devices.contains_key(&addr) {
            return Err(CoordinatorError::PeerAlreadyTracked(addr));
        }
        let id = self.ids.alloc();
        self.devices.insert(
            addr,
            Device { id, addr, state: ConnectionState::Connecting, connecting: true, session: None, initiated_locally: true },
        );
        Ok(())
    }

    /// Creates a new device record for a previously-unknown peer that
    /// opened an inbound L2CAP connection (§4.4 "Incoming connection
    /// path"). The device starts in `Connecting` and is promoted to
    /// `Connected` once the caller installs the AVDTP session, exactly as
    /// the locally-initiated path does.
    pub fn begin_inbound_connect(&mut self, addr: BdAddr) -> DeviceId {
        let id = self.ids.alloc();
        self.devices.insert(
            addr,
            Device { id, addr, state: ConnectionState::Connecting, connecting: true, session: None, initiated_locally: false },
        );
        id
    }

    /// Installs the AVDTP session and transitions to `Connected` (§4.4:
    /// "On success, construct the AVDTP session... transition to
    /// Connected"). Returns whether the state actually changed (callers
    /// use this to decide whether to emit `CONN_STATE`, per §8 invariant 4).
    pub fn signaling_connected(&mut self, addr: BdAddr, session: Box<dyn AvdtpSession>) -> bool {
        let Some(device) = self.devices.get_mut(&addr) else { return false };
        let changed = device.state != ConnectionState::Connected;
        device.session = Some(session);
        device.connecting = false;
        device.state = ConnectionState::Connected;
        changed
    }

    /// Requests disconnection of `addr` (HAL A2DP_DISCONNECT). Returns
    /// `Ok(true)` if the device can be destroyed immediately (pre-signaling
    /// channel torn down synchronously, §5), `Ok(false)` if it now owns an
    /// AVDTP session and must await the engine's disconnect callback.
    pub fn begin_disconnect(&mut self, addr: BdAddr) -> Result<bool, CoordinatorError> {
        let device = self.devices.get_mut(&addr).ok_or(CoordinatorError::PeerNotTracked(addr))?;
        if device.can_disconnect_immediately() {
            return Ok(true);
        }
        device.state = ConnectionState::Disconnecting;
        Ok(false)
    }

    /// Marks `addr`'s signaling connect attempt as failed. The device
    /// record should then be destroyed via `destroy` (§4.4: "On failure, go
    /// to Disconnected (which destroys the device)").
    pub fn signaling_connect_failed(&mut self, addr: BdAddr) {
        if let Some(device) = self.devices.get_mut(&addr) {
            device.state = ConnectionState::Disconnected;
        }
    }

    /// Destroys the device record. Must be called exactly when a device's
    /// state reaches `Disconnected` (§3 Device lifecycle, §8 invariant 5).
    pub fn destroy(&mut self, addr: BdAddr) -> Option<Device> {
        self.devices.remove(&addr)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EndpointId;

    fn addr(b: u8) -> BdAddr {
        BdAddr([b, 0, 0, 0, 0, 0])
    }

    #[test]
    fn rejects_duplicate_local_connect() {
        let mut table = DeviceTable::new();
        table.begin_local_connect(addr(1)).unwrap();
        assert!(matches!(table.begin_local_connect(addr(1)), Err(CoordinatorError::PeerAlreadyTracked(_))));
    }

    #[test]
    fn disconnect_of_untracked_peer_fails() {
        let mut table = DeviceTable::new();
        assert!(matches!(table.begin_disconnect(addr(9)), Err(CoordinatorError::PeerNotTracked(_))));
    }

    #[test]
    fn pre_signaling_disconnect_completes_immediately() {
        let mut table = DeviceTable::new();
        table.begin_local_connect(addr(1)).unwrap();
        let immediate = table.begin_disconnect(addr(1)).unwrap();
        assert!(immediate);
    }

    #[test]
    fn connected_device_disconnect_awaits_engine() {
        struct Fake;
        impl crate::avdtp::AvdtpSession for Fake {
            fn discover(&self) {}
            fn set_configuration(&self, _: u8, _: EndpointId, _: Vec<crate::avdtp::ServiceCapability>) {}
            fn open(&self, _: u8, _: EndpointId) {}
            fn start(&self, _: EndpointId, _: crate::avdtp::StreamHandle) {}
            fn suspend(&self, _: EndpointId, _: crate::avdtp::StreamHandle) {}
            fn close(&self, _: EndpointId, _: crate::avdtp::StreamHandle, _: bool) {}
            fn shutdown(&self) {}
        }

        let mut table = DeviceTable::new();
        table.begin_local_connect(addr(1)).unwrap();
        table.signaling_connected(addr(1), Box::new(Fake));
        let immediate = table.begin_disconnect(addr(1)).unwrap();
        assert!(!immediate);
        assert_eq!(table.get(addr(1)).unwrap().state(), ConnectionState::Disconnecting);
    }
}
