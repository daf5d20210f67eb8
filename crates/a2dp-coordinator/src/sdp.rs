//! SDP record for the AudioSource service (spec §6), built here but
//! published by an external SDP server (§1 Out-of-scope). Structured the
//! way `bt-a2dp-source::make_profile_service_definition` builds its
//! `ServiceDefinition` and the way `bluefang`'s `A2dpSinkServiceRecord`
//! expresses attributes as a flat list; the attribute IDs below
//! (`ServiceClassIDList`, `BrowseGroupList`, `ProtocolDescriptorList`,
//! `BluetoothProfileDescriptorList`) match `a2dp_record()` in
//! `examples/original_source/android/a2dp.c`. The service-hint is not an SDP
//! attribute there either -- `android/a2dp.c`'s `SVC_HINT_CAPTURING` is
//! passed to the separate adapter service-class registration call, so it is
//! carried on `ServiceRecord` as its own field rather than folded into
//! `attributes`.

/// One SDP service attribute: a 16-bit attribute ID plus an opaque,
/// already-encoded DataElement. Encoding a `DataElement` tree is the SDP
/// server's job; this crate only knows the A2DP-specific attribute shape.
pub struct ServiceAttribute {
    pub id: u16,
    pub value: AttributeValue,
}

#[derive(Debug, Clone)]
pub enum AttributeValue {
    Uuid16(u16),
    Uint16(u16),
    UuidList(Vec<u16>),
    ProtocolDescriptorList(Vec<(ProtocolIdentifier, u16)>),
    ProfileDescriptorList(Vec<ProfileDescriptor>),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolIdentifier {
    L2cap,
    Avdtp,
}

#[derive(Debug, Clone, Copy)]
pub struct ProfileDescriptor {
    pub profile_id: u16,
    pub major_version: u8,
    pub minor_version: u8,
}

/// A complete service record: the SDP attribute list, plus the service-hint
/// byte that is registered alongside it (not an SDP attribute itself).
pub struct ServiceRecord {
    pub attributes: Vec<ServiceAttribute>,
    pub service_hint: u8,
}

/// Bluetooth SIG assigned number for the AudioSource service class.
pub const AUDIO_SOURCE_UUID16: u16 = 0x110A;
/// Bluetooth SIG assigned number for the AdvancedAudioDistribution profile.
pub const A2DP_PROFILE_UUID16: u16 = 0x110D;
/// Bluetooth SIG assigned number for the PublicBrowseGroup.
pub const PUBLIC_BROWSE_GROUP_UUID16: u16 = 0x1002;
/// L2CAP PSM for AVDTP (§1, §6).
pub const PSM_AVDTP: u16 = 0x19;
/// SDP attribute ID for A2DP's Supported Features (Bluetooth SIG Assigned
/// Numbers for SDP).
pub const ATTR_A2DP_SUPPORTED_FEATURES: u16 = 0x0311;
/// service-hint bit for "capturing" (§6; `SVC_HINT_CAPTURING` in the
/// original source).
pub const SERVICE_HINT_CAPTURING: u8 = 0x08;
/// supported-features value advertised by this coordinator (§6: 0x000F).
pub const SUPPORTED_FEATURES: u16 = 0x000F;

pub fn audio_source_service_record() -> ServiceRecord {
    ServiceRecord {
        attributes: vec![
            ServiceAttribute { id: 0x0001, value: AttributeValue::UuidList(vec![AUDIO_SOURCE_UUID16]) },
            ServiceAttribute { id: 0x0005, value: AttributeValue::UuidList(vec![PUBLIC_BROWSE_GROUP_UUID16]) },
            ServiceAttribute {
                id: 0x0004,
                value: AttributeValue::ProtocolDescriptorList(vec![(ProtocolIdentifier::L2cap, PSM_AVDTP), (ProtocolIdentifier::Avdtp, 0x0103)]),
            },
            ServiceAttribute {
                id: 0x0009,
                value: AttributeValue::ProfileDescriptorList(vec![ProfileDescriptor { profile_id: A2DP_PROFILE_UUID16, major_version: 1, minor_version: 3 }]),
            },
            ServiceAttribute { id: ATTR_A2DP_SUPPORTED_FEATURES, value: AttributeValue::Uint16(SUPPORTED_FEATURES) },
            ServiceAttribute { id: 0x0100, value: AttributeValue::Text("Audio Source".to_string()) },
        ],
        service_hint: SERVICE_HINT_CAPTURING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_advertises_avdtp_on_the_right_psm() {
        let record = audio_source_service_record();
        let protocol = record.attributes.iter().find(|a| a.id == 0x0004).expect("protocol descriptor list present");
        match &protocol.value {
            AttributeValue::ProtocolDescriptorList(list) => {
                assert!(list.contains(&(ProtocolIdentifier::L2cap, PSM_AVDTP)));
            }
            _ => panic!("wrong attribute shape"),
        }
    }

    #[test]
    fn record_carries_supported_features() {
        let record = audio_source_service_record();
        let features = record.attributes.iter().find(|a| a.id == ATTR_A2DP_SUPPORTED_FEATURES).unwrap();
        assert!(matches!(features.value, AttributeValue::Uint16(SUPPORTED_FEATURES)));
    }

    #[test]
    fn service_hint_advertises_capturing() {
        let record = audio_source_service_record();
        assert_eq!(record.service_hint & SERVICE_HINT_CAPTURING, SERVICE_HINT_CAPTURING);
    }
}
