//! Length-prefixed bincode framing used on every connection
//!
//! Each frame is a 4-byte big-endian payload length followed by the bincode
//! encoding of one message. Because frame boundaries are known before the
//! payload is decoded, a payload that fails to decode leaves the stream
//! aligned on the next frame and the connection can keep going.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted in a single frame
pub const MAX_FRAME_LEN: usize = 64 * 1024;

const HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed message: {0}")]
    Malformed(#[from] bincode::Error),
    #[error("frame of {0} bytes exceeds the {} byte limit", MAX_FRAME_LEN)]
    FrameTooLarge(usize),
}

/// What a single read from the stream produced
#[derive(Debug)]
pub enum Inbound<T> {
    Message(T),
    /// A complete frame arrived but its payload was not a valid message
    Malformed(String),
    /// The peer closed the stream on a frame boundary
    Closed,
}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serialize(message)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, CodecError> {
    Ok(bincode::deserialize(payload)?)
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame and decodes it.
///
/// Returns `Err` only for connectivity failures (I/O errors, or EOF in the
/// middle of a frame). Oversized frames are drained and reported as
/// [`Inbound::Malformed`] so the caller can answer with an error and carry on.
pub async fn read_message<R, T>(reader: &mut R) -> io::Result<Inbound<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut header = [0u8; HEADER_LEN];
    if reader.read(&mut header[..1]).await? == 0 {
        return Ok(Inbound::Closed);
    }
    reader.read_exact(&mut header[1..]).await?;

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        let mut oversized = (&mut *reader).take(len as u64);
        let skipped = tokio::io::copy(&mut oversized, &mut tokio::io::sink()).await?;
        if skipped < len as u64 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        return Ok(Inbound::Malformed(
            CodecError::FrameTooLarge(len).to_string(),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    match decode(&payload) {
        Ok(message) => Ok(Inbound::Message(message)),
        Err(e) => Ok(Inbound::Malformed(e.to_string())),
    }
}
