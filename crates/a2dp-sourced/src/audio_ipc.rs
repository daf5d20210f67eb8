//! Audio IPC framing: `OPEN` / `CLOSE` / `OPEN_STREAM` / `CLOSE_STREAM` /
//! `RESUME_STREAM` / `SUSPEND_STREAM`, the channel through which the local
//! audio plug-in registers endpoints and drives stream transport. Same
//! length-delimited frame shape as `hal_ipc`, with its own opcode space.

use a2dp_coordinator::codec::CodecType;
use a2dp_coordinator::error::CoordinatorError;
use a2dp_coordinator::ids::EndpointId;
use a2dp_coordinator::preset::Preset;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use uuid::Uuid;

pub const OP_OPEN: u16 = 0x01;
pub const OP_CLOSE: u16 = 0x02;
pub const OP_OPEN_STREAM: u16 = 0x03;
pub const OP_CLOSE_STREAM: u16 = 0x04;
pub const OP_RESUME_STREAM: u16 = 0x05;
pub const OP_SUSPEND_STREAM: u16 = 0x06;

pub const STATUS_SUCCESS: u8 = 0;
pub const STATUS_FAILED: u8 = 1;

#[derive(Debug)]
pub enum AudioRequest {
    Open { uuid: Uuid, codec: CodecType, presets: Vec<Preset> },
    Close { id: EndpointId },
    OpenStream { id: EndpointId },
    CloseStream { id: EndpointId },
    ResumeStream { id: EndpointId },
    SuspendStream { id: EndpointId },
}

pub async fn read_request(stream: &mut UnixStream) -> std::io::Result<Option<AudioRequest>> {
    let Some((opcode, payload)) = read_frame(stream).await? else { return Ok(None) };
    let request = match opcode {
        OP_OPEN => parse_open(&payload).map_err(to_io_error)?,
        OP_CLOSE => AudioRequest::Close { id: parse_id(&payload)? },
        OP_OPEN_STREAM => AudioRequest::OpenStream { id: parse_id(&payload)? },
        OP_CLOSE_STREAM => AudioRequest::CloseStream { id: parse_id(&payload)? },
        OP_RESUME_STREAM => AudioRequest::ResumeStream { id: parse_id(&payload)? },
        OP_SUSPEND_STREAM => AudioRequest::SuspendStream { id: parse_id(&payload)? },
        other => return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("unknown audio opcode {other:#x}"))),
    };
    Ok(Some(request))
}

/// `uuid(16) + codec(1) + count(1) + packed (len:u8, bytes[len]) * count`,
/// bounds-checked against the remaining buffer at every step so a truncated
/// or malicious payload can't read past the frame.
fn parse_open(payload: &[u8]) -> Result<AudioRequest, CoordinatorError> {
    if payload.len() < 18 {
        return Err(CoordinatorError::IpcParseError("OPEN payload shorter than fixed header".into()));
    }
    let uuid = Uuid::from_slice(&payload[0..16]).map_err(|e| CoordinatorError::IpcParseError(e.to_string()))?;
    let codec = CodecType(payload[16]);
    let count = payload[17] as usize;
    let mut cursor = 18usize;
    let mut presets = Vec::with_capacity(count);
    for _ in 0..count {
        let len = *payload.get(cursor).ok_or_else(|| CoordinatorError::IpcParseError("truncated preset length".into()))? as usize;
        cursor += 1;
        let end = cursor.checked_add(len).ok_or_else(|| CoordinatorError::IpcParseError("preset length overflow".into()))?;
        let bytes = payload.get(cursor..end).ok_or_else(|| CoordinatorError::IpcParseError("preset bytes overrun buffer".into()))?;
        presets.push(Preset::new(bytes.to_vec()));
        cursor = end;
    }
    if presets.is_empty() {
        return Err(CoordinatorError::IpcParseError("OPEN requires at least one preset".into()));
    }
    Ok(AudioRequest::Open { uuid, codec, presets })
}

fn parse_id(payload: &[u8]) -> std::io::Result<EndpointId> {
    let raw: [u8; 8] = payload.try_into().map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "endpoint id payload must be 8 bytes"))?;
    Ok(EndpointId::from_wire(u64::from_le_bytes(raw)))
}

fn to_io_error(e: CoordinatorError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
}

pub async fn write_status(stream: &mut UnixStream, opcode: u16, status: u8) -> std::io::Result<()> {
    write_frame(stream, opcode, &[status]).await
}

pub async fn write_open_response(stream: &mut UnixStream, id: Option<EndpointId>) -> std::io::Result<()> {
    let mut payload = Vec::with_capacity(9);
    match id {
        Some(id) => {
            payload.push(STATUS_SUCCESS);
            payload.extend_from_slice(&id.to_wire().to_le_bytes());
        }
        None => payload.push(STATUS_FAILED),
    }
    write_frame(stream, OP_OPEN, &payload).await
}

pub async fn write_stream_response(stream: &mut UnixStream, preset: Option<&[u8]>) -> std::io::Result<()> {
    let mut payload = Vec::new();
    match preset {
        Some(bytes) => {
            payload.push(STATUS_SUCCESS);
            payload.push(bytes.len() as u8);
            payload.extend_from_slice(bytes);
        }
        None => payload.push(STATUS_FAILED),
    }
    write_frame(stream, OP_OPEN_STREAM, &payload).await
}

async fn read_frame(stream: &mut UnixStream) -> std::io::Result<Option<(u16, Vec<u8>)>> {
    let mut header = [0u8; 4];
    match stream.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let opcode = u16::from_le_bytes([header[0], header[1]]);
    let len = u16::from_le_bytes([header[2], header[3]]) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Ok(Some((opcode, payload)))
}

async fn write_frame(stream: &mut UnixStream, opcode: u16, payload: &[u8]) -> std::io::Result<()> {
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&opcode.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(payload);
    stream.write_all(&frame).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_payload(presets: &[&[u8]]) -> Vec<u8> {
        let mut payload = vec![0u8; 16];
        payload.push(0x00); // codec = SBC
        payload.push(presets.len() as u8);
        for preset in presets {
            payload.push(preset.len() as u8);
            payload.extend_from_slice(preset);
        }
        payload
    }

    #[tokio::test]
    async fn parses_open_with_two_presets() {
        let (mut client, mut server) = UnixStream::pair().unwrap();
        let payload = open_payload(&[&[0xFF, 0xFF, 0x77, 0x35], &[0x21, 0x15, 0x35, 0x35]]);
        write_frame(&mut client, OP_OPEN, &payload).await.unwrap();
        let request = read_request(&mut server).await.unwrap().unwrap();
        match request {
            AudioRequest::Open { codec, presets, .. } => {
                assert_eq!(codec, CodecType::SBC);
                assert_eq!(presets.len(), 2);
                assert_eq!(presets[1].bytes(), &[0x21, 0x15, 0x35, 0x35]);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[tokio::test]
    async fn truncated_preset_length_is_rejected() {
        let (mut client, mut server) = UnixStream::pair().unwrap();
        let mut payload = vec![0u8; 16];
        payload.push(0x00);
        payload.push(1);
        payload.push(10); // claims 10 bytes but frame has none left
        write_frame(&mut client, OP_OPEN, &payload).await.unwrap();
        assert!(read_request(&mut server).await.is_err());
    }
}
