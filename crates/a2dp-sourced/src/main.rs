//! Bluetooth A2DP source daemon. Wires the transport-free `a2dp-coordinator`
//! core to two Unix-socket IPC servers and an AVDTP/L2CAP backend, and runs
//! the single-threaded event loop that is the only thing allowed to call
//! into the core. Structured after the teacher's `main` + `handle_profile_events`
//! split: one async fn builds the wiring, a second drains the event sources.

mod audio_ipc;
mod config;
mod hal_ipc;

use std::sync::Arc;

use a2dp_coordinator::profile::CoordinatorEvent;
use a2dp_coordinator::Coordinator;
use anyhow::{Context, Result};
use config::Opt;
use parking_lot::Mutex;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Stub implementations of the AVDTP/L2CAP collaborators. A production
/// build replaces these with real socket- and AVDTP-engine-backed types;
/// this crate's job ends at the trait boundary `a2dp-coordinator` defines.
mod backend;

#[tokio::main]
async fn main() -> Result<()> {
    let opt: Opt = argh::from_env();

    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(&opt.log)).init();

    info!(adapter = %opt.adapter.0, "starting a2dp-sourced");

    let service_record = a2dp_coordinator::sdp::audio_source_service_record();
    info!(attributes = service_record.attributes.len(), service_hint = service_record.service_hint, "built AudioSource SDP record (publication is an external collaborator)");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<CoordinatorEvent>();
    let profile = backend::StubProfileService::new(events_tx);
    let hal = backend::BroadcastHalNotifier::new();
    let hal_notifications = hal.clone();

    let coordinator = Arc::new(Mutex::new(Coordinator::new(Box::new(profile), Box::new(hal))));

    let hal_listener = UnixListener::bind(&opt.hal_socket).with_context(|| format!("binding HAL IPC socket at {:?}", opt.hal_socket))?;
    let audio_listener = UnixListener::bind(&opt.audio_socket).with_context(|| format!("binding audio IPC socket at {:?}", opt.audio_socket))?;

    let hal_coordinator = coordinator.clone();
    let hal_task = tokio::spawn(async move {
        loop {
            match hal_listener.accept().await {
                Ok((stream, _addr)) => {
                    let coordinator = hal_coordinator.clone();
                    let notifications = hal_notifications.subscribe();
                    tokio::spawn(serve_hal_connection(stream, coordinator, notifications));
                }
                Err(e) => warn!(error = %e, "HAL IPC accept failed"),
            }
        }
    });

    let audio_coordinator = coordinator.clone();
    let audio_task = tokio::spawn(async move {
        loop {
            match audio_listener.accept().await {
                Ok((stream, _addr)) => {
                    let coordinator = audio_coordinator.clone();
                    tokio::spawn(serve_audio_connection(stream, coordinator));
                }
                Err(e) => warn!(error = %e, "audio IPC accept failed"),
            }
        }
    });

    let event_coordinator = coordinator.clone();
    let event_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            event_coordinator.lock().handle_event(event);
        }
    });

    tokio::select! {
        res = hal_task => res.context("HAL IPC server task panicked")?,
        res = audio_task => res.context("audio IPC server task panicked")?,
        res = event_task => res.context("coordinator event loop panicked")?,
    }

    Ok(())
}

/// Drives one HAL IPC connection: requests flow in and get a synchronous
/// response, while `CONN_STATE` notifications (possibly for devices this
/// client never asked about -- the HAL is meant to observe every peer) are
/// interleaved as they arrive from the coordinator (§6).
async fn serve_hal_connection(
    mut stream: UnixStream,
    coordinator: Arc<Mutex<Coordinator>>,
    mut notifications: mpsc::UnboundedReceiver<(a2dp_coordinator::BdAddr, a2dp_coordinator::ConnectionState)>,
) {
    loop {
        tokio::select! {
            biased;

            request = hal_ipc::read_request(&mut stream) => {
                let request = match request {
                    Ok(Some(r)) => r,
                    Ok(None) => return,
                    Err(e) => {
                        warn!(error = %e, "HAL IPC read failed");
                        return;
                    }
                };
                let (opcode, status) = match request {
                    hal_ipc::HalRequest::Connect(addr) => {
                        let result = coordinator.lock().hal_connect(addr);
                        (hal_ipc::OP_A2DP_CONNECT, status_of(result))
                    }
                    hal_ipc::HalRequest::Disconnect(addr) => {
                        let result = coordinator.lock().hal_disconnect(addr);
                        (hal_ipc::OP_A2DP_DISCONNECT, status_of(result))
                    }
                };
                if let Err(e) = hal_ipc::write_response(&mut stream, opcode, status).await {
                    warn!(error = %e, "HAL IPC write failed");
                    return;
                }
            }

            notification = notifications.recv() => {
                let Some((device, state)) = notification else { return };
                if let Err(e) = hal_ipc::write_conn_state(&mut stream, device, state).await {
                    warn!(error = %e, "HAL IPC notification write failed");
                    return;
                }
            }
        }
    }
}

async fn serve_audio_connection(mut stream: UnixStream, coordinator: Arc<Mutex<Coordinator>>) {
    loop {
        let request = match audio_ipc::read_request(&mut stream).await {
            Ok(Some(r)) => r,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "audio IPC read failed");
                return;
            }
        };
        let write_result = match request {
            audio_ipc::AudioRequest::Open { uuid, codec, presets } => {
                let id = coordinator.lock().audio_open(uuid, codec, presets).ok();
                audio_ipc::write_open_response(&mut stream, id).await
            }
            audio_ipc::AudioRequest::Close { id } => {
                let status = status_of(coordinator.lock().audio_close(id));
                audio_ipc::write_status(&mut stream, audio_ipc::OP_CLOSE, status).await
            }
            audio_ipc::AudioRequest::OpenStream { id } => {
                let preset = coordinator.lock().audio_open_stream(id).ok().map(|info| info.preset);
                audio_ipc::write_stream_response(&mut stream, preset.as_deref()).await
            }
            audio_ipc::AudioRequest::CloseStream { id } => {
                let status = status_of(coordinator.lock().audio_close_stream(id));
                audio_ipc::write_status(&mut stream, audio_ipc::OP_CLOSE_STREAM, status).await
            }
            audio_ipc::AudioRequest::ResumeStream { id } => {
                let status = status_of(coordinator.lock().audio_resume_stream(id));
                audio_ipc::write_status(&mut stream, audio_ipc::OP_RESUME_STREAM, status).await
            }
            audio_ipc::AudioRequest::SuspendStream { id } => {
                let status = status_of(coordinator.lock().audio_suspend_stream(id));
                audio_ipc::write_status(&mut stream, audio_ipc::OP_SUSPEND_STREAM, status).await
            }
        };
        if let Err(e) = write_result {
            warn!(error = %e, "audio IPC write failed");
            return;
        }
    }
}

fn status_of<T>(result: Result<T, a2dp_coordinator::CoordinatorError>) -> u8 {
    match result {
        Ok(_) => hal_ipc::STATUS_SUCCESS,
        Err(e) => {
            warn!(error = %e, "command rejected");
            hal_ipc::STATUS_FAILED
        }
    }
}
