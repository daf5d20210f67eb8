//! Ties the device table, endpoint registry, and setup broker together and
//! drives them from a single stream of events, the way `Peer::handle_request`
//! and `Peer::stream_start` drive the teacher's equivalent tables from one
//! task per peer. Nothing outside this module ever mutates more than one of
//! those three collections at a time.

use tracing::{info, info_span, trace, warn};
use uuid::Uuid;

use crate::avdtp::{
    AvdtpSession, Confirmation, EndpointType, ErrorCode, Indication, IndicationResult, MediaType, RemoteSep, ServiceCapability, StreamHandle,
};
use crate::codec::CodecType;
use crate::device::DeviceTable;
use crate::endpoint::EndpointRegistry;
use crate::error::CoordinatorError;
use crate::ids::EndpointId;
use crate::preset::{Preset, PresetStore};
use crate::profile::{CoordinatorEvent, HalNotifier, ProfileService};
use crate::setup::SetupBroker;
use crate::types::{BdAddr, ConnectionState};

/// Result of an audio-client OPEN_STREAM call: the preset actually bound to
/// the setup, so the caller can hand its bytes back over the IPC socket.
pub struct StreamInfo {
    pub preset: Vec<u8>,
}

/// The coordinator. Owns every live `Device`, `Endpoint`, and `Setup`, and
/// the two outbound collaborators through which it drives the outside
/// world. A process wires one of these up at startup and feeds it every
/// HAL command, audio IPC command, and `CoordinatorEvent` in arrival order.
pub struct Coordinator {
    devices: DeviceTable,
    endpoints: EndpointRegistry,
    setups: SetupBroker,
    profile: Box<dyn ProfileService>,
    hal: Box<dyn HalNotifier>,
    /// State for an endpoint with a locally-initiated SET_CONFIGURATION in
    /// flight: the remote SEID (so the follow-up OPEN can address the right
    /// remote stream) and the preset selected in `on_discover` (so the
    /// setup created once SET_CONFIGURATION is confirmed binds the same
    /// preset that was offered). Cleared once the confirmation arrives,
    /// success or failure.
    pending_selection: std::collections::HashMap<EndpointId, PendingSelection>,
}

struct PendingSelection {
    remote_seid: u8,
    preset: Preset,
}

impl Coordinator {
    pub fn new(profile: Box<dyn ProfileService>, hal: Box<dyn HalNotifier>) -> Self {
        Self {
            devices: DeviceTable::new(),
            endpoints: EndpointRegistry::new(),
            setups: SetupBroker::new(),
            profile,
            hal,
            pending_selection: std::collections::HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    #[cfg(test)]
    pub fn setups(&self) -> &SetupBroker {
        &self.setups
    }

    // ---- HAL IPC: A2DP_CONNECT / A2DP_DISCONNECT --------------------------

    /// HAL `A2DP_CONNECT`. Fails if `device` already has a live record.
    pub fn hal_connect(&mut self, device: BdAddr) -> Result<(), CoordinatorError> {
        let _span = info_span!("device", %device).entered();
        trace!("A2DP_CONNECT");
        if let Err(e) = self.devices.begin_local_connect(device) {
            warn!(error = %e, "A2DP_CONNECT rejected");
            return Err(e);
        }
        self.notify_state(device, ConnectionState::Connecting);
        self.profile.connect_signaling(device);
        Ok(())
    }

    /// HAL `A2DP_DISCONNECT`. A device still waiting on its signaling
    /// connect is torn down synchronously; a connected device is asked to
    /// shut down and completes asynchronously via `Disconnected`.
    pub fn hal_disconnect(&mut self, device: BdAddr) -> Result<(), CoordinatorError> {
        let _span = info_span!("device", %device).entered();
        trace!("A2DP_DISCONNECT");
        let immediate = match self.devices.begin_disconnect(device) {
            Ok(immediate) => immediate,
            Err(e) => {
                warn!(error = %e, "A2DP_DISCONNECT rejected");
                return Err(e);
            }
        };
        if immediate {
            self.destroy_device(device);
            return Ok(());
        }
        self.notify_state(device, ConnectionState::Disconnecting);
        if let Some(dev) = self.devices.get(device) {
            if let Some(session) = dev.session() {
                session.shutdown();
            }
        }
        Ok(())
    }

    // ---- Audio IPC: OPEN / CLOSE / stream ops -----------------------------

    /// Audio `OPEN`: registers a source-role SBC-or-whatever endpoint. The
    /// first preset becomes capabilities, the rest become preferred presets.
    pub fn audio_open(&mut self, uuid: Uuid, codec: CodecType, presets: Vec<Preset>) -> Result<EndpointId, CoordinatorError> {
        trace!(%uuid, codec = codec.0, "audio OPEN");
        let store = PresetStore::new(presets)?;
        let id = self.endpoints.register(uuid, codec, store);
        info!(endpoint = %id, codec = codec.0, "endpoint registered");
        Ok(id)
    }

    /// Audio `CLOSE`: unregisters the endpoint. Any live setup bound to it
    /// is torn down first since its preset may be owned by the endpoint.
    pub fn audio_close(&mut self, endpoint: EndpointId) -> Result<(), CoordinatorError> {
        trace!(%endpoint, "audio CLOSE");
        self.endpoints.find(endpoint).ok_or(CoordinatorError::NoSuchEndpoint)?;
        if self.setups.destroy_by_endpoint(endpoint).is_some() {
            info!(%endpoint, "setup torn down by endpoint close");
        }
        self.endpoints.unregister(endpoint)?;
        info!(%endpoint, "endpoint unregistered");
        Ok(())
    }

    /// Audio `OPEN_STREAM`: returns the preset bound to the endpoint's setup.
    pub fn audio_open_stream(&self, endpoint: EndpointId) -> Result<StreamInfo, CoordinatorError> {
        let setup = self.setups.find_by_endpoint(endpoint).ok_or(CoordinatorError::SepNotInUse)?;
        Ok(StreamInfo { preset: setup.preset().bytes().to_vec() })
    }

    /// Audio `RESUME_STREAM`.
    pub fn audio_resume_stream(&self, endpoint: EndpointId) -> Result<(), CoordinatorError> {
        self.with_setup_session(endpoint, |session, setup| session.start(setup.endpoint(), setup.stream()))
    }

    /// Audio `SUSPEND_STREAM`.
    pub fn audio_suspend_stream(&self, endpoint: EndpointId) -> Result<(), CoordinatorError> {
        self.with_setup_session(endpoint, |session, setup| session.suspend(setup.endpoint(), setup.stream()))
    }

    /// Audio `CLOSE_STREAM`: a non-aborting AVDTP close.
    pub fn audio_close_stream(&self, endpoint: EndpointId) -> Result<(), CoordinatorError> {
        self.with_setup_session(endpoint, |session, setup| session.close(setup.endpoint(), setup.stream(), false))
    }

    fn with_setup_session(&self, endpoint: EndpointId, f: impl FnOnce(&dyn AvdtpSession, &crate::setup::Setup)) -> Result<(), CoordinatorError> {
        let setup = self.setups.find_by_endpoint(endpoint).ok_or(CoordinatorError::SepNotInUse)?;
        let device = self.devices.get(setup.device()).ok_or(CoordinatorError::PeerNotTracked(setup.device()))?;
        let session = device.session().ok_or(CoordinatorError::PeerNotTracked(setup.device()))?;
        f(session, setup);
        Ok(())
    }

    // ---- Event dispatch ----------------------------------------------------

    /// The single entry point for everything the AVDTP engine and the
    /// profile/L2CAP layer report back. HAL and audio IPC commands are
    /// handled synchronously through the methods above instead, since they
    /// never need to wait on anything.
    pub fn handle_event(&mut self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::SignalingConnected { device, session } => self.on_signaling_connected(device, session),
            CoordinatorEvent::SignalingConnectFailed { device } => self.on_signaling_connect_failed(device),
            CoordinatorEvent::Disconnected { device } => self.on_disconnected(device),
            CoordinatorEvent::TransportConnected { device, endpoint, stream } => self.on_transport_connected(device, endpoint, stream),
            CoordinatorEvent::TransportConnectFailed { device, endpoint } => self.on_transport_connect_failed(device, endpoint),
            CoordinatorEvent::Indication { device, indication } => self.on_indication(device, indication),
            CoordinatorEvent::Confirmation { device, confirmation } => self.on_confirmation(device, confirmation),
        }
    }

    fn on_signaling_connected(&mut self, device: BdAddr, session: Box<dyn AvdtpSession>) {
        let _span = info_span!("device", %device).entered();
        let initiated_locally = self.devices.get(device).map(|d| d.initiated_locally()).unwrap_or(false);
        if !self.devices.contains(device) {
            trace!("inbound signaling connection from previously-unknown peer");
            self.devices.begin_inbound_connect(device);
        }
        let changed = self.devices.signaling_connected(device, session);
        if changed {
            info!("signaling up");
            self.notify_state(device, ConnectionState::Connected);
        }
        if initiated_locally {
            if let Some(dev) = self.devices.get(device) {
                if let Some(session) = dev.session() {
                    trace!("issuing DISCOVER");
                    session.discover();
                }
            }
        }
    }

    fn on_signaling_connect_failed(&mut self, device: BdAddr) {
        warn!(%device, "signaling connect failed");
        self.devices.signaling_connect_failed(device);
        self.destroy_device(device);
    }

    fn on_disconnected(&mut self, device: BdAddr) {
        info!(%device, "AVDTP disconnect callback");
        self.setups.destroy_all_for_device(device);
        self.destroy_device(device);
    }

    fn on_transport_connected(&mut self, device: BdAddr, endpoint: EndpointId, stream: StreamHandle) {
        let _ = (device, endpoint, stream);
        // The AVDTP engine owns binding the transport fd to the stream once
        // it has the connected socket; nothing in the four core collections
        // changes here.
    }

    fn on_transport_connect_failed(&mut self, device: BdAddr, endpoint: EndpointId) {
        warn!(%device, %endpoint, "media transport connect failed");
        self.setups.destroy_by_endpoint(endpoint);
    }

    // ---- Indications (inbound from peer) ----------------------------------

    fn on_indication(&mut self, device: BdAddr, indication: Indication) {
        let _span = info_span!("device", %device).entered();
        match indication {
            Indication::GetCapability { endpoint, responder } => {
                trace!(%endpoint, "GET_CAPABILITIES");
                let result = self.endpoints.find(endpoint).map(|ep| {
                    vec![
                        ServiceCapability::MediaTransport,
                        ServiceCapability::MediaCodec {
                            media_type: MediaType::Audio,
                            codec_type: ep.codec_type(),
                            payload: ep.presets().capabilities().bytes().to_vec(),
                        },
                    ]
                });
                responder.respond(result.ok_or(ErrorCode::BadAcpSeid));
            }
            Indication::SetConfiguration { endpoint, stream, capabilities, responder } => {
                trace!(%endpoint, "SET_CONFIGURATION");
                let result = self.set_configuration(device, endpoint, stream, &capabilities);
                if matches!(result, IndicationResult::Reject(..)) {
                    warn!(%endpoint, ?result, "SET_CONFIGURATION rejected");
                }
                responder.respond(result);
            }
            Indication::Open { endpoint, responder } => {
                trace!(%endpoint, "OPEN indication");
                responder.respond(self.require_setup(endpoint));
            }
            Indication::Start { endpoint, responder } => {
                trace!(%endpoint, "START indication");
                responder.respond(self.require_setup(endpoint));
            }
            Indication::Suspend { endpoint, responder } => {
                trace!(%endpoint, "SUSPEND indication");
                responder.respond(self.require_setup(endpoint));
            }
            Indication::Close { endpoint, responder } => {
                trace!(%endpoint, "CLOSE indication");
                let result = if self.setups.destroy_by_endpoint(endpoint).is_some() {
                    info!(%endpoint, "setup torn down by peer CLOSE");
                    IndicationResult::Accept
                } else {
                    IndicationResult::Reject(crate::avdtp::ServiceCategory::None, ErrorCode::SepNotInUse)
                };
                responder.respond(result);
            }
        }
    }

    fn require_setup(&self, endpoint: EndpointId) -> IndicationResult {
        if self.setups.find_by_endpoint(endpoint).is_some() {
            IndicationResult::Accept
        } else {
            IndicationResult::Reject(crate::avdtp::ServiceCategory::None, ErrorCode::SepNotInUse)
        }
    }

    fn set_configuration(&mut self, device: BdAddr, endpoint: EndpointId, stream: StreamHandle, capabilities: &[ServiceCapability]) -> IndicationResult {
        let Some(ep) = self.endpoints.find(endpoint) else {
            return IndicationResult::Reject(crate::avdtp::ServiceCategory::None, ErrorCode::BadAcpSeid);
        };
        let mut codec_payload: Option<&[u8]> = None;
        for cap in capabilities {
            match cap {
                ServiceCapability::DelayReporting => {
                    return IndicationResult::Reject(crate::avdtp::ServiceCategory::DelayReporting, ErrorCode::UnsupportedConfiguration);
                }
                ServiceCapability::MediaCodec { codec_type, payload, .. } => {
                    if *codec_type != ep.codec_type() {
                        return IndicationResult::Reject(crate::avdtp::ServiceCategory::MediaCodec, ErrorCode::UnsupportedConfiguration);
                    }
                    codec_payload = Some(payload.as_slice());
                }
                ServiceCapability::MediaTransport => {}
            }
        }
        let Some(payload) = codec_payload else {
            return IndicationResult::Reject(crate::avdtp::ServiceCategory::MediaCodec, ErrorCode::UnsupportedConfiguration);
        };
        if ep.presets().check_config(ep.codec_type(), payload).is_err() {
            return IndicationResult::Reject(crate::avdtp::ServiceCategory::MediaCodec, ErrorCode::UnsupportedConfiguration);
        }
        let setup = self.setups.create(device, endpoint, Preset::new(payload.to_vec()), stream);
        info!(%device, %endpoint, %setup, "setup created");
        IndicationResult::Accept
    }

    // ---- Confirmations (outcomes of our own requests) ----------------------

    fn on_confirmation(&mut self, device: BdAddr, confirmation: Confirmation) {
        let _span = info_span!("device", %device).entered();
        match confirmation {
            Confirmation::Discover(result) => self.on_discover(device, result),
            Confirmation::SetConfiguration { endpoint, stream, result } => self.on_set_configuration_confirmed(device, endpoint, stream, result),
            Confirmation::Open { endpoint, result } => self.on_open_confirmed(device, endpoint, result),
            Confirmation::Start { endpoint, result } => self.destroy_setup_on_error(endpoint, result),
            Confirmation::Suspend { endpoint, result } => self.destroy_setup_on_error(endpoint, result),
            Confirmation::Close { endpoint, result } => self.destroy_setup_always(endpoint, result),
            Confirmation::Abort { endpoint, result } => self.destroy_setup_always(endpoint, result),
        }
    }

    fn on_discover(&mut self, device: BdAddr, result: Result<Vec<RemoteSep>, ErrorCode>) {
        let Ok(remote_seps) = result else {
            warn!(%device, "DISCOVER failed, shutting down session");
            self.shutdown_session(device);
            return;
        };
        trace!(%device, count = remote_seps.len(), "DISCOVER returned remote SEPs");
        let Some((endpoint_id, remote_sep)) = self.select_endpoint(&remote_seps) else {
            warn!(%device, "no local endpoint matches a remote SEP, shutting down session");
            self.shutdown_session(device);
            return;
        };
        let codec_type = self.endpoints.find(endpoint_id).map(|e| e.codec_type());
        let Some(codec_type) = codec_type else {
            self.shutdown_session(device);
            return;
        };
        let Some(remote_caps) = remote_sep.codec_payload() else {
            self.shutdown_session(device);
            return;
        };
        let selected = self.endpoints.find(endpoint_id).and_then(|ep| ep.presets().select_for_remote(codec_type, remote_caps)).cloned();
        let Some(preset) = selected else {
            warn!(%device, endpoint = %endpoint_id, "no preset compatible with remote SEP, shutting down session");
            self.shutdown_session(device);
            return;
        };
        let capabilities = vec![
            ServiceCapability::MediaTransport,
            ServiceCapability::MediaCodec { media_type: MediaType::Audio, codec_type, payload: preset.bytes().to_vec() },
        ];
        let Some(session) = self.devices.get(device).and_then(|d| d.session()) else {
            return;
        };
        self.pending_selection.insert(endpoint_id, PendingSelection { remote_seid: remote_sep.id, preset });
        session.set_configuration(remote_sep.id, endpoint_id, capabilities);
    }

    fn select_endpoint(&self, remote_seps: &[RemoteSep]) -> Option<(EndpointId, RemoteSep)> {
        for sep in remote_seps {
            if sep.endpoint_type != EndpointType::Sink {
                continue;
            }
            let Some(codec) = sep.codec_type() else { continue };
            for id in self.live_endpoint_ids() {
                if self.endpoints.find(id).map(|e| e.codec_type()) == Some(codec) {
                    return Some((id, sep.clone()));
                }
            }
        }
        None
    }

    fn live_endpoint_ids(&self) -> Vec<EndpointId> {
        // EndpointRegistry doesn't expose an iterator over keys directly;
        // route through find() for each ID we've ever handed out would be
        // wasteful, so this walks the registry's own storage instead.
        self.endpoints.ids_in_use()
    }

    fn on_set_configuration_confirmed(&mut self, device: BdAddr, endpoint: EndpointId, stream: StreamHandle, result: Result<(), ErrorCode>) {
        let Some(pending) = self.pending_selection.remove(&endpoint) else {
            return;
        };
        if let Err(e) = result {
            warn!(%device, %endpoint, ?e, "SET_CONFIGURATION confirmation failed");
            return;
        }
        let setup = self.setups.create(device, endpoint, pending.preset, stream);
        info!(%device, %endpoint, %setup, "setup created");
        let Some(session) = self.devices.get(device).and_then(|d| d.session()) else {
            return;
        };
        trace!(%device, %endpoint, "issuing OPEN");
        session.open(pending.remote_seid, endpoint);
    }

    fn on_open_confirmed(&mut self, device: BdAddr, endpoint: EndpointId, result: Result<(), ErrorCode>) {
        if let Err(e) = result {
            warn!(%device, %endpoint, ?e, "OPEN confirmation failed");
            self.setups.destroy_by_endpoint(endpoint);
            return;
        }
        trace!(%device, %endpoint, "OPEN confirmed, connecting media transport");
        self.profile.connect_transport(device, endpoint);
    }

    fn destroy_setup_on_error(&mut self, endpoint: EndpointId, result: Result<(), ErrorCode>) {
        if let Err(e) = result {
            warn!(%endpoint, ?e, "confirmation failed, destroying setup");
            self.setups.destroy_by_endpoint(endpoint);
        }
    }

    fn destroy_setup_always(&mut self, endpoint: EndpointId, _result: Result<(), ErrorCode>) {
        if self.setups.destroy_by_endpoint(endpoint).is_some() {
            info!(%endpoint, "setup torn down");
        }
    }

    fn shutdown_session(&mut self, device: BdAddr) {
        if let Some(session) = self.devices.get(device).and_then(|d| d.session()) {
            session.shutdown();
        }
    }

    // ---- shared plumbing ----------------------------------------------------

    fn notify_state(&self, device: BdAddr, state: ConnectionState) {
        trace!(%device, ?state, "CONN_STATE");
        self.hal.conn_state(device, state);
    }

    fn destroy_device(&mut self, device: BdAddr) {
        self.setups.destroy_all_for_device(device);
        if self.devices.destroy(device).is_some() {
            info!(%device, "device record destroyed");
            self.notify_state(device, ConnectionState::Disconnected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avdtp::{IndicationResult, Responder};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NullSession;
    impl AvdtpSession for NullSession {
        fn discover(&self) {}
        fn set_configuration(&self, _: u8, _: EndpointId, _: Vec<ServiceCapability>) {}
        fn open(&self, _: u8, _: EndpointId) {}
        fn start(&self, _: EndpointId, _: StreamHandle) {}
        fn suspend(&self, _: EndpointId, _: StreamHandle) {}
        fn close(&self, _: EndpointId, _: StreamHandle, _: bool) {}
        fn shutdown(&self) {}
    }

    struct NullProfile;
    impl ProfileService for NullProfile {
        fn connect_signaling(&self, _: BdAddr) {}
        fn connect_transport(&self, _: BdAddr, _: EndpointId) {}
    }

    struct RecordingHal {
        states: Rc<RefCell<Vec<ConnectionState>>>,
    }
    impl HalNotifier for RecordingHal {
        fn conn_state(&self, _: BdAddr, state: ConnectionState) {
            self.states.borrow_mut().push(state);
        }
    }

    fn addr() -> BdAddr {
        BdAddr([9, 9, 9, 9, 9, 9])
    }

    fn coordinator() -> (Coordinator, Rc<RefCell<Vec<ConnectionState>>>) {
        let states = Rc::new(RefCell::new(Vec::new()));
        let coordinator = Coordinator::new(Box::new(NullProfile), Box::new(RecordingHal { states: states.clone() }));
        (coordinator, states)
    }

    #[test]
    fn connect_then_signaling_up_emits_connecting_then_connected() {
        let (mut c, states) = coordinator();
        c.hal_connect(addr()).unwrap();
        c.handle_event(CoordinatorEvent::SignalingConnected { device: addr(), session: Box::new(NullSession) });
        assert_eq!(*states.borrow(), vec![ConnectionState::Connecting, ConnectionState::Connected]);
    }

    #[test]
    fn set_configuration_with_delay_reporting_is_rejected() {
        let (mut c, _states) = coordinator();
        let preset = Preset::new(vec![0xFF, 0xFF, 0x77, 0x35]);
        let endpoint = c.audio_open(Uuid::nil(), CodecType::SBC, vec![preset]).unwrap();
        c.hal_connect(addr()).unwrap();
        c.handle_event(CoordinatorEvent::SignalingConnected { device: addr(), session: Box::new(NullSession) });

        let caps = vec![ServiceCapability::DelayReporting];
        let (tx, rx) = std::sync::mpsc::channel();
        let responder: Responder<IndicationResult> = Responder::new(move |r| tx.send(r).unwrap());
        c.handle_event(CoordinatorEvent::Indication {
            device: addr(),
            indication: Indication::SetConfiguration { endpoint, stream: StreamHandle(1), capabilities: caps, responder },
        });
        let result = rx.recv().unwrap();
        assert!(matches!(result, IndicationResult::Reject(_, ErrorCode::UnsupportedConfiguration)));
        assert!(c.setups().find_by_endpoint(endpoint).is_none());
    }

    #[test]
    fn set_configuration_matching_preset_creates_setup() {
        let (mut c, _states) = coordinator();
        let caps = Preset::new(vec![0xFF, 0xFF, 0x77, 0x35]);
        let pref = Preset::new(vec![0x21, 0x15, 0x35, 0x35]);
        let endpoint = c.audio_open(Uuid::nil(), CodecType::SBC, vec![caps, pref]).unwrap();
        c.hal_connect(addr()).unwrap();
        c.handle_event(CoordinatorEvent::SignalingConnected { device: addr(), session: Box::new(NullSession) });

        let proposal = vec![
            ServiceCapability::MediaTransport,
            ServiceCapability::MediaCodec { media_type: MediaType::Audio, codec_type: CodecType::SBC, payload: vec![0x21, 0x15, 0x35, 0x35] },
        ];
        let (tx, rx) = std::sync::mpsc::channel();
        let responder: Responder<IndicationResult> = Responder::new(move |r| tx.send(r).unwrap());
        c.handle_event(CoordinatorEvent::Indication {
            device: addr(),
            indication: Indication::SetConfiguration { endpoint, stream: StreamHandle(7), capabilities: proposal, responder },
        });
        assert!(matches!(rx.recv().unwrap(), IndicationResult::Accept));
        let setup = c.setups().find_by_endpoint(endpoint).unwrap();
        assert_eq!(setup.preset().bytes(), &[0x21, 0x15, 0x35, 0x35]);
    }

    #[test]
    fn disconnect_races_pre_signaling_channel_completes_immediately() {
        let (mut c, states) = coordinator();
        c.hal_connect(addr()).unwrap();
        c.hal_disconnect(addr()).unwrap();
        assert_eq!(*states.borrow(), vec![ConnectionState::Connecting, ConnectionState::Disconnected]);
        assert!(c.devices().get(addr()).is_none());
    }

    #[test]
    fn remote_drop_mid_stream_destroys_setup_and_device() {
        let (mut c, states) = coordinator();
        let endpoint = c.audio_open(Uuid::nil(), CodecType::SBC, vec![Preset::new(vec![0xFF, 0xFF, 0x77, 0x35])]).unwrap();
        c.hal_connect(addr()).unwrap();
        c.handle_event(CoordinatorEvent::SignalingConnected { device: addr(), session: Box::new(NullSession) });

        let proposal = vec![ServiceCapability::MediaCodec { media_type: MediaType::Audio, codec_type: CodecType::SBC, payload: vec![0x21, 0x15, 0x35, 0x35] }];
        let responder: Responder<IndicationResult> = Responder::new(|_| {});
        c.handle_event(CoordinatorEvent::Indication {
            device: addr(),
            indication: Indication::SetConfiguration { endpoint, stream: StreamHandle(1), capabilities: proposal, responder },
        });
        assert!(c.setups().find_by_endpoint(endpoint).is_some());

        c.handle_event(CoordinatorEvent::Disconnected { device: addr() });
        assert!(c.setups().find_by_endpoint(endpoint).is_none());
        assert!(c.devices().get(addr()).is_none());
        assert_eq!(states.borrow().last(), Some(&ConnectionState::Disconnected));
    }

    #[test]
    fn close_with_active_setup_unregisters_endpoint() {
        let (mut c, _states) = coordinator();
        let endpoint = c.audio_open(Uuid::nil(), CodecType::SBC, vec![Preset::new(vec![0xFF, 0xFF, 0x77, 0x35])]).unwrap();
        c.hal_connect(addr()).unwrap();
        c.handle_event(CoordinatorEvent::SignalingConnected { device: addr(), session: Box::new(NullSession) });
        let proposal = vec![ServiceCapability::MediaCodec { media_type: MediaType::Audio, codec_type: CodecType::SBC, payload: vec![0x21, 0x15, 0x35, 0x35] }];
        let responder: Responder<IndicationResult> = Responder::new(|_| {});
        c.handle_event(CoordinatorEvent::Indication {
            device: addr(),
            indication: Indication::SetConfiguration { endpoint, stream: StreamHandle(1), capabilities: proposal, responder },
        });

        c.audio_close(endpoint).unwrap();
        assert!(c.setups().find_by_endpoint(endpoint).is_none());
        assert!(c.audio_open_stream(endpoint).is_err());
    }
}
