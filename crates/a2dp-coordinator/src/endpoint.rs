//! Endpoint registry (spec §4.3): local SEPs registered by the audio
//! plug-in client.

use std::collections::HashMap;

use uuid::Uuid;

use crate::codec::CodecType;
use crate::error::CoordinatorError;
use crate::ids::{AllocatesId, EndpointId, IdAllocator};
use crate::preset::PresetStore;

/// A local Stream End Point (§3). Lives until the audio client closes it
/// or the process shuts down.
#[derive(Debug)]
pub struct Endpoint {
    id: EndpointId,
    uuid: Uuid,
    codec_type: CodecType,
    presets: PresetStore,
}

impl Endpoint {
    pub fn id(&self) -> EndpointId {
        self.id
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn codec_type(&self) -> CodecType {
        self.codec_type
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }
}

/// Registers local SEPs, assigning stable small-integer IDs (§4.3). IDs are
/// never reused within the process lifetime (§9), unlike the `count + 1`
/// scheme of the source this spec describes.
///
/// `order` tracks registration order separately from `endpoints` (a
/// `HashMap`, whose iteration order is randomized per process) so that
/// anything walking "every live endpoint" -- `discover_cb`'s endpoint scan
/// in §4.5 chief among them -- sees a stable, registration order sequence
/// rather than a hash-bucket order that can reshuffle between runs.
#[derive(Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<EndpointId, Endpoint>,
    order: Vec<EndpointId>,
    ids: IdAllocator,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self { endpoints: HashMap::new(), order: Vec::new(), ids: IdAllocator::default() }
    }

    /// Registers a source-role, audio-media SEP for `codec_type`, with
    /// `presets[0]` as the capabilities preset and the remainder as
    /// preferred presets (§4.6 OPEN).
    pub fn register(&mut self, uuid: Uuid, codec_type: CodecType, presets: PresetStore) -> EndpointId {
        let id: EndpointId = self.ids.alloc();
        self.endpoints.insert(id, Endpoint { id, uuid, codec_type, presets });
        self.order.push(id);
        id
    }

    /// Unregisters the endpoint, freeing its capabilities and preset list.
    /// Callers must have already destroyed any setup bound to this
    /// endpoint (§4.6 CLOSE: "unregistering the SEP cascades").
    pub fn unregister(&mut self, id: EndpointId) -> Result<Endpoint, CoordinatorError> {
        let endpoint = self.endpoints.remove(&id).ok_or(CoordinatorError::NoSuchEndpoint)?;
        self.order.retain(|&e| e != id);
        Ok(endpoint)
    }

    pub fn find(&self, id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.get(&id)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Live endpoint IDs in registration order (oldest first), not hash
    /// order, so a scan over "every local endpoint" is deterministic.
    pub fn ids_in_use(&self) -> Vec<EndpointId> {
        self.order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::Preset;

    fn presets() -> PresetStore {
        PresetStore::new(vec![Preset::new(vec![0xFF, 0xFF, 0x77, 0x35])]).unwrap()
    }

    #[test]
    fn ids_are_one_based_and_monotonic() {
        let mut reg = EndpointRegistry::new();
        let a = reg.register(Uuid::nil(), CodecType::SBC, presets());
        let b = reg.register(Uuid::nil(), CodecType::SBC, presets());
        assert_eq!(format!("{a}"), "1");
        assert_eq!(format!("{b}"), "2");
    }

    #[test]
    fn id_is_not_reused_after_close() {
        let mut reg = EndpointRegistry::new();
        let a = reg.register(Uuid::nil(), CodecType::SBC, presets());
        reg.unregister(a).unwrap();
        let b = reg.register(Uuid::nil(), CodecType::SBC, presets());
        assert_ne!(a, b);
        assert_eq!(format!("{b}"), "2");
    }

    #[test]
    fn ids_in_use_is_registration_order() {
        let mut reg = EndpointRegistry::new();
        let a = reg.register(Uuid::nil(), CodecType::SBC, presets());
        let b = reg.register(Uuid::nil(), CodecType::SBC, presets());
        let c = reg.register(Uuid::nil(), CodecType::SBC, presets());
        reg.unregister(b).unwrap();
        let d = reg.register(Uuid::nil(), CodecType::SBC, presets());
        assert_eq!(reg.ids_in_use(), vec![a, c, d]);
    }

    #[test]
    fn find_missing_is_none() {
        let reg = EndpointRegistry::new();
        let bogus = {
            let mut other = EndpointRegistry::new();
            other.register(Uuid::nil(), CodecType::SBC, presets())
        };
        assert!(reg.find(bogus).is_none());
    }
}
