//! HAL IPC framing: a length-prefixed binary protocol over a Unix socket,
//! carrying `A2DP_CONNECT` / `A2DP_DISCONNECT` requests and `CONN_STATE`
//! notifications. Modeled on the `u16` opcode + `u16` length + payload
//! framing of BlueZ's `android/a2dp.c` HAL IPC, translated to an async
//! length-delimited codec the way a Rust daemon would actually write one.

use a2dp_coordinator::{BdAddr, ConnectionState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

pub const OP_A2DP_CONNECT: u16 = 0x01;
pub const OP_A2DP_DISCONNECT: u16 = 0x02;
pub const EV_CONN_STATE: u16 = 0x81;

pub const STATUS_SUCCESS: u8 = 0;
pub const STATUS_FAILED: u8 = 1;

#[derive(Debug)]
pub enum HalRequest {
    Connect(BdAddr),
    Disconnect(BdAddr),
}

/// Reads one framed message and decodes it into a `HalRequest`. Returns
/// `Ok(None)` on a clean EOF (peer closed the socket).
pub async fn read_request(stream: &mut UnixStream) -> std::io::Result<Option<HalRequest>> {
    let Some((opcode, payload)) = read_frame(stream).await? else { return Ok(None) };
    match opcode {
        OP_A2DP_CONNECT => Ok(Some(HalRequest::Connect(parse_addr(&payload)?))),
        OP_A2DP_DISCONNECT => Ok(Some(HalRequest::Disconnect(parse_addr(&payload)?))),
        other => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, format!("unknown HAL opcode {other:#x}"))),
    }
}

pub async fn write_response(stream: &mut UnixStream, opcode: u16, status: u8) -> std::io::Result<()> {
    write_frame(stream, opcode, &[status]).await
}

pub async fn write_conn_state(stream: &mut UnixStream, device: BdAddr, state: ConnectionState) -> std::io::Result<()> {
    let mut payload = Vec::with_capacity(7);
    payload.extend_from_slice(&device.0);
    payload.push(state.wire_value());
    write_frame(stream, EV_CONN_STATE, &payload).await
}

fn parse_addr(payload: &[u8]) -> std::io::Result<BdAddr> {
    let bytes: [u8; 6] = payload.try_into().map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "BD_ADDR payload must be 6 bytes"))?;
    Ok(BdAddr(bytes))
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

    #[tokio::test]
    async fn round_trips_connect_request() {
        let (mut client, mut server) = UnixStream::pair().unwrap();
        write_frame(&mut client, OP_A2DP_CONNECT, &[1, 2, 3, 4, 5, 6]).await.unwrap();
        let request = read_request(&mut server).await.unwrap().unwrap();
        assert!(matches!(request, HalRequest::Connect(BdAddr([1, 2, 3, 4, 5, 6]))));
    }

    #[tokio::test]
    async fn eof_yields_none() {
        let (client, mut server) = UnixStream::pair().unwrap();
        drop(client);
        assert!(read_request(&mut server).await.unwrap().is_none());
    }
}
