// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framing: 4-byte big-endian length prefix followed by the JSON envelope.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::binder::{BinderError, TypeBinder};
use crate::codec::Codec;
use crate::request::Request;
use crate::response::Response;

/// Upper bound on a single frame
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("type binding failed: {0}")]
    Binder(#[from] BinderError),

    #[error("envelope has no $type")]
    MissingType,

    #[error("envelope is not a JSON object")]
    NotAnObject,

    #[error("unexpected message type {0}")]
    UnexpectedType(String),

    #[error("message of {size} bytes exceeds limit of {max}")]
    MessageTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out")]
    Timeout,
}

/// Read one length-prefixed frame.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }
    let size = u32::from_be_bytes(len_buf) as usize;
    if size > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size, max: MAX_MESSAGE_SIZE });
    }
    let mut data = vec![0u8; size];
    reader.read_exact(&mut data).await?;
    Ok(data)
}

/// Write one length-prefixed frame and flush.
pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<(), ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge { size: data.len(), max: MAX_MESSAGE_SIZE });
    }
    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

async fn with_timeout<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T, ProtocolError>>,
) -> Result<T, ProtocolError> {
    tokio::time::timeout(timeout, fut).await.map_err(|_| ProtocolError::Timeout)?
}

pub async fn read_request<R, B>(reader: &mut R, codec: &Codec<B>, timeout: Duration) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
    B: TypeBinder,
{
    let bytes = with_timeout(timeout, read_message(reader)).await?;
    codec.decode_request(&bytes)
}

pub async fn write_request<W, B>(
    writer: &mut W,
    codec: &Codec<B>,
    request: &Request,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    B: TypeBinder,
{
    let bytes = codec.encode_request(request)?;
    with_timeout(timeout, write_message(writer, &bytes)).await
}

pub async fn read_response<R, B>(reader: &mut R, codec: &Codec<B>, timeout: Duration) -> Result<Response, ProtocolError>
where
    R: AsyncRead + Unpin,
    B: TypeBinder,
{
    let bytes = with_timeout(timeout, read_message(reader)).await?;
    codec.decode_response(&bytes)
}

pub async fn write_response<W, B>(
    writer: &mut W,
    codec: &Codec<B>,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    B: TypeBinder,
{
    let bytes = codec.encode_response(response)?;
    with_timeout(timeout, write_message(writer, &bytes)).await
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
