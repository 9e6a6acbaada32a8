// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format for the Orchestration-Controls binding.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.

use crate::{Request, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest single message this protocol will frame. Guards a misbehaving
/// peer from forcing an unbounded allocation via a bogus length prefix.
const MAX_MESSAGE_BYTES: u32 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message of {0} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit")]
    MessageTooLarge(u32),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out waiting for peer")]
    Timeout,
}

/// Serialize a value to raw JSON bytes, no length prefix.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a value from raw JSON bytes, no length prefix.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write `payload` prefixed with its big-endian u32 length.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    let len: u32 = payload
        .len()
        .try_into()
        .map_err(|_| ProtocolError::MessageTooLarge(u32::MAX))?;
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge(len));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed message, or `ConnectionClosed` on clean EOF
/// before any bytes of the length prefix arrive.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(ProtocolError::ConnectionClosed),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_MESSAGE_BYTES {
        return Err(ProtocolError::MessageTooLarge(len));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

async fn with_timeout<T>(duration: Duration, fut: impl std::future::Future<Output = Result<T, ProtocolError>>) -> Result<T, ProtocolError> {
    tokio::time::timeout(duration, fut).await.map_err(|_| ProtocolError::Timeout)?
}

/// Read and decode one `Request`, bounded by `timeout`.
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R, timeout: Duration) -> Result<Request, ProtocolError> {
    with_timeout(timeout, async {
        let bytes = read_message(reader).await?;
        decode(&bytes)
    })
    .await
}

/// Encode and write one `Response`, bounded by `timeout`.
pub async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &Response, timeout: Duration) -> Result<(), ProtocolError> {
    with_timeout(timeout, async {
        let bytes = encode(response)?;
        write_message(writer, &bytes).await
    })
    .await
}

/// Encode and write one `Request`, bounded by `timeout`. Client-side
/// counterpart to `read_request`, used by anything dialing the
/// Orchestration-Controls Unix socket (the CLI, a peer replica).
pub async fn write_request<W: AsyncWrite + Unpin>(writer: &mut W, request: &Request, timeout: Duration) -> Result<(), ProtocolError> {
    with_timeout(timeout, async {
        let bytes = encode(request)?;
        write_message(writer, &bytes).await
    })
    .await
}

/// Read and decode one `Response`, bounded by `timeout`. Client-side
/// counterpart to `write_response`.
pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut R, timeout: Duration) -> Result<Response, ProtocolError> {
    with_timeout(timeout, async {
        let bytes = read_message(reader).await?;
        decode(&bytes)
    })
    .await
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
