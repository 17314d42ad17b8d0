// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire framing: `<version:u32><size:u32><payload:size bytes>`, network
//! byte order (§4.1).

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The only framing version this build speaks. A mismatch drops the
/// connection with a logged warning rather than trying to interpret an
/// unknown payload shape.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol version mismatch: peer sent {got}, we speak {expected}")]
    VersionMismatch { got: u32, expected: u32 },
}

/// Read one framed payload. Returns `Ok(None)` on clean EOF at a frame
/// boundary (the peer closed the connection); any other I/O failure,
/// including a partial frame, is an error.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<Vec<u8>>, FrameError> {
    let mut version_buf = [0u8; 4];
    match reader.read_exact(&mut version_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let version = u32::from_be_bytes(version_buf);
    if version != PROTOCOL_VERSION {
        return Err(FrameError::VersionMismatch { got: version, expected: PROTOCOL_VERSION });
    }

    let mut size_buf = [0u8; 4];
    reader.read_exact(&mut size_buf).await?;
    let size = u32::from_be_bytes(size_buf) as usize;

    let mut payload = vec![0u8; size];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Write one framed payload, including the version prefix.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), FrameError> {
    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
