//! Codec validator registry (spec §4.1) and the SBC wire layout it
//! validates. Expressed as a tagged variant with a per-variant capability
//! type plus a fallback dispatch table keyed by codec byte, per §9's
//! "Heterogeneous codecs" note, so adding a second concrete codec is one
//! registry entry rather than a rewrite of the negotiation path.

use crate::error::CoordinatorError;

/// One-byte codec type enumerator (§3, "Endpoint... codec type (one-byte
/// enumerator)"). Values match the Bluetooth SIG assigned numbers used by
/// A2DP; only SBC is validated today (§1 Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecType(pub u8);

impl CodecType {
    pub const SBC: CodecType = CodecType(0x00);
}

bitflags::bitflags! {
    /// Sampling frequency mask, high nibble of SBC codec byte 0.
    pub struct SbcSamplingFrequency: u8 {
        const FREQ_16000 = 0x8;
        const FREQ_32000 = 0x4;
        const FREQ_44100 = 0x2;
        const FREQ_48000 = 0x1;
    }
}

bitflags::bitflags! {
    /// Channel mode mask, low nibble of SBC codec byte 0.
    pub struct SbcChannelMode: u8 {
        const MONO = 0x8;
        const DUAL_CHANNEL = 0x4;
        const STEREO = 0x2;
        const JOINT_STEREO = 0x1;
    }
}

bitflags::bitflags! {
    /// Block length mask, high nibble of SBC codec byte 1.
    pub struct SbcBlockLength: u8 {
        const FOUR = 0x8;
        const EIGHT = 0x4;
        const TWELVE = 0x2;
        const SIXTEEN = 0x1;
    }
}

bitflags::bitflags! {
    /// Subbands mask, bits 2-3 of SBC codec byte 1.
    pub struct SbcSubbands: u8 {
        const FOUR = 0x2;
        const EIGHT = 0x1;
    }
}

bitflags::bitflags! {
    /// Allocation method mask, bits 0-1 of SBC codec byte 1.
    pub struct SbcAllocation: u8 {
        const SNR = 0x2;
        const LOUDNESS = 0x1;
    }
}

/// The SBC media codec payload: a 4-byte structure (§4.1). A "capabilities"
/// blob has every applicable mask field set to the bitwise-OR of everything
/// locally supported; a "preset" blob has exactly one bit set per mask
/// field plus a concrete bitpool range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbcCodecInfo {
    pub sampling_frequency: u8,
    pub channel_mode: u8,
    pub block_length: u8,
    pub subbands: u8,
    pub allocation_method: u8,
    pub min_bitpool: u8,
    pub max_bitpool: u8,
}

pub const SBC_CODEC_INFO_LEN: usize = 4;

impl SbcCodecInfo {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoordinatorError> {
        if bytes.len() != SBC_CODEC_INFO_LEN {
            return Err(CoordinatorError::InvalidConfig);
        }
        Ok(Self {
            sampling_frequency: bytes[0] >> 4,
            channel_mode: bytes[0] & 0x0F,
            block_length: bytes[1] >> 4,
            subbands: (bytes[1] >> 2) & 0x03,
            allocation_method: bytes[1] & 0x03,
            min_bitpool: bytes[2],
            max_bitpool: bytes[3],
        })
    }

    pub fn to_bytes(&self) -> [u8; SBC_CODEC_INFO_LEN] {
        [
            (self.sampling_frequency << 4) | (self.channel_mode & 0x0F),
            (self.block_length << 4) | ((self.subbands & 0x03) << 2) | (self.allocation_method & 0x03),
            self.min_bitpool,
            self.max_bitpool,
        ]
    }
}

/// Validates that `peer` is a subset of `local` (§4.1, §8 invariant 7).
/// Lengths must match and equal the expected SBC size; every mask field
/// must have at least one overlapping bit. Bitpool is not validated
/// (noted in spec §9 / §4.1 as a known gap, preserved intentionally).
pub fn validate_sbc(local: &[u8], peer: &[u8]) -> Result<(), CoordinatorError> {
    if local.len() != SBC_CODEC_INFO_LEN || peer.len() != SBC_CODEC_INFO_LEN {
        return Err(CoordinatorError::InvalidConfig);
    }
    let local = SbcCodecInfo::from_bytes(local)?;
    let peer = SbcCodecInfo::from_bytes(peer)?;

    let overlaps = |a: u8, b: u8| (a & b) != 0;
    if !overlaps(local.sampling_frequency, peer.sampling_frequency)
        || !overlaps(local.channel_mode, peer.channel_mode)
        || !overlaps(local.block_length, peer.block_length)
        || !overlaps(local.subbands, peer.subbands)
        || !overlaps(local.allocation_method, peer.allocation_method)
    {
        return Err(CoordinatorError::InvalidConfig);
    }
    Ok(())
}

/// Dispatches to the validator for `codec`. Unknown codec types fail with
/// `InvalidConfig` (§4.1).
pub fn validate(codec: CodecType, local: &[u8], peer: &[u8]) -> Result<(), CoordinatorError> {
    match codec {
        CodecType::SBC => validate_sbc(local, peer),
        _ => Err(CoordinatorError::InvalidConfig),
    }
}
