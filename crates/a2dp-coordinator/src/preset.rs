//! Preset store (spec §4.2). Per endpoint, a list whose head is the
//! capabilities preset and whose tail is the ordered preferred-preset list.

use crate::codec::{validate, CodecType};
use crate::error::CoordinatorError;

/// An opaque codec configuration blob, interpreted only by the codec
/// validator for its codec type (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    bytes: Vec<u8>,
}

impl Preset {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Per-endpoint preset list: `capabilities` answers GET_CAPABILITIES and
/// validates peer-proposed configs that don't match a stored preset;
/// `preferred` is consulted top-to-bottom during local selection.
#[derive(Debug, Clone)]
pub struct PresetStore {
    capabilities: Preset,
    preferred: Vec<Preset>,
}

impl PresetStore {
    /// `presets[0]` becomes capabilities, the rest become preferred
    /// presets, per §4.6 ("The first preset in the list becomes the
    /// endpoint's capabilities; the rest become preferred presets").
    pub fn new(mut presets: Vec<Preset>) -> Result<Self, CoordinatorError> {
        if presets.is_empty() {
            return Err(CoordinatorError::IpcParseError("at least one preset (capabilities) is required".into()));
        }
        let capabilities = presets.remove(0);
        Ok(Self { capabilities, preferred: presets })
    }

    pub fn capabilities(&self) -> &Preset {
        &self.capabilities
    }

    pub fn preferred(&self) -> &[Preset] {
        &self.preferred
    }

    /// Checks whether `candidate_bytes` is an acceptable peer-proposed
    /// configuration (§4.5 `check_config`): accept if it equals any stored
    /// preset, else fall back to the codec validator against capabilities.
    pub fn check_config(&self, codec: CodecType, candidate_bytes: &[u8]) -> Result<(), CoordinatorError> {
        if self.capabilities.bytes() == candidate_bytes || self.preferred.iter().any(|p| p.bytes() == candidate_bytes) {
            return Ok(());
        }
        validate(codec, self.capabilities.bytes(), candidate_bytes)
    }

    /// Selects the first preferred preset whose bytes pass the codec
    /// validator against the remote SEP's codec capability (§4.5,
    /// "select_configuration" step 1).
    pub fn select_for_remote(&self, codec: CodecType, remote_caps: &[u8]) -> Option<&Preset> {
        self.preferred.iter().find(|p| validate(codec, p.bytes(), remote_caps).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_entry_is_capabilities() {
        let store = PresetStore::new(vec![Preset::new(vec![1, 2, 3, 4]), Preset::new(vec![5, 6, 7, 8])]).unwrap();
        assert_eq!(store.capabilities().bytes(), &[1, 2, 3, 4]);
        assert_eq!(store.preferred().len(), 1);
    }

    #[test]
    fn rejects_empty_preset_list() {
        assert!(PresetStore::new(vec![]).is_err());
    }
}
