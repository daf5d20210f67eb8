//! Setup broker (spec §4.5, the binding half): represents an in-progress or
//! active stream. The indication/confirmation protocol logic itself lives
//! in `coordinator.rs`, which is the only thing that can see both the
//! setup broker and the endpoint/device tables at once.

use std::collections::HashMap;

use crate::avdtp::StreamHandle;
use crate::ids::{AllocatesId, EndpointId, IdAllocator, SetupId};
use crate::preset::Preset;
use crate::types::BdAddr;

/// Binds a device, an endpoint, a preset, and an AVDTP stream handle (§3).
///
/// §3's "a setup's preset is freed exactly when the setup is destroyed, and
/// only if it is not shared with the endpoint" describes a manual-free
/// discipline the original needs because its presets are heap blobs owned
/// by whichever of the endpoint or the setup got to them first. Here
/// `preset` is an owned `Preset` with no other owner: Rust drops it exactly
/// once, when this `Setup` is dropped, whether or not an endpoint preset
/// with the same bytes happens to exist elsewhere. There is nothing left to
/// track.
pub struct Setup {
    id: SetupId,
    device: BdAddr,
    endpoint: EndpointId,
    preset: Preset,
    stream: StreamHandle,
}

impl Setup {
    pub fn id(&self) -> SetupId {
        self.id
    }

    pub fn device(&self) -> BdAddr {
        self.device
    }

    pub fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn stream(&self) -> StreamHandle {
        self.stream
    }
}

/// At most one setup per endpoint at a time; at most one setup per
/// device-endpoint pair (§3 invariant), so indexing by endpoint ID alone is
/// sufficient and also gives O(1) lookup for the audio IPC stream ops,
/// which are always endpoint-keyed (§4.6).
#[derive(Default)]
pub struct SetupBroker {
    setups: HashMap<SetupId, Setup>,
    by_endpoint: HashMap<EndpointId, SetupId>,
    ids: IdAllocator,
}

impl SetupBroker {
    pub fn new() -> Self {
        Self { setups: HashMap::new(), by_endpoint: HashMap::new(), ids: IdAllocator::default() }
    }

    /// Creates a setup binding, replacing any (there should be none, by
    /// invariant) existing setup for the same endpoint.
    pub fn create(&mut self, device: BdAddr, endpoint: EndpointId, preset: Preset, stream: StreamHandle) -> SetupId {
        let id = self.ids.alloc();
        self.setups.insert(id, Setup { id, device, endpoint, preset, stream });
        self.by_endpoint.insert(endpoint, id);
        id
    }

    pub fn get(&self, id: SetupId) -> Option<&Setup> {
        self.setups.get(&id)
    }

    pub fn find_by_endpoint(&self, endpoint: EndpointId) -> Option<&Setup> {
        self.by_endpoint.get(&endpoint).and_then(|id| self.setups.get(id))
    }

    pub fn find_by_device(&self, device: BdAddr) -> impl Iterator<Item = &Setup> {
        self.setups.values().filter(move |s| s.device == device)
    }

    /// Destroys the setup bound to `endpoint`, if any. Returns it so the
    /// caller can inspect the freed state (§8 invariant 6); the preset
    /// itself is dropped with the returned `Setup` once the caller is done.
    pub fn destroy_by_endpoint(&mut self, endpoint: EndpointId) -> Option<Setup> {
        let id = self.by_endpoint.remove(&endpoint)?;
        self.setups.remove(&id)
    }

    /// Destroys every setup owned by `device` (used when a device is torn
    /// down, §3: a setup's device must be Connected for its entire
    /// lifetime).
    pub fn destroy_all_for_device(&mut self, device: BdAddr) -> Vec<Setup> {
        let ids: Vec<SetupId> = self.setups.values().filter(|s| s.device == device).map(|s| s.id).collect();
        ids.into_iter()
            .filter_map(|id| {
                let setup = self.setups.remove(&id)?;
                self.by_endpoint.remove(&setup.endpoint);
                Some(setup)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> BdAddr {
        BdAddr([1, 2, 3, 4, 5, 6])
    }

    #[test]
    fn at_most_one_setup_per_endpoint() {
        let mut broker = SetupBroker::new();
        let endpoint = EndpointId::from(1u64);
        broker.create(addr(), endpoint, Preset::new(vec![1, 2, 3, 4]), StreamHandle(0));
        broker.create(addr(), endpoint, Preset::new(vec![5, 6, 7, 8]), StreamHandle(1));
        assert_eq!(broker.find_by_endpoint(endpoint).unwrap().preset().bytes(), &[5, 6, 7, 8]);
    }

    #[test]
    fn destroy_by_endpoint_removes_it() {
        let mut broker = SetupBroker::new();
        let endpoint = EndpointId::from(1u64);
        broker.create(addr(), endpoint, Preset::new(vec![1, 2, 3, 4]), StreamHandle(0));
        assert!(broker.destroy_by_endpoint(endpoint).is_some());
        assert!(broker.find_by_endpoint(endpoint).is_none());
    }
}
