// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Each accepted connection carries one request and one response and is
//! served on its own task, so a StartScript that waits for its script never
//! holds up other callers.

use std::sync::Arc;
use std::time::Duration;

use tend_engine::request_ticket;
use tend_wire::{read_request, write_response, Codec, ProtocolError, Request, RequestHandler, StatusMethod};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shared context for all connections.
pub struct ListenCtx {
    pub handler: Arc<dyn RequestHandler>,
    pub codec: Codec,
    /// Applies to reading the request and writing the response
    pub timeout: Duration,
}

/// Listener task for accepting socket connections.
pub struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// Connections already being served are left to finish on their own tasks.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Unix accept error: {}", e),
                },
                _ = shutdown.cancelled() => {
                    debug!("listener stopping");
                    break;
                }
            }
        }
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("Client disconnected"),
        ProtocolError::Timeout => warn!("Connection timeout"),
        _ => error!("Connection error: {}", e),
    }
}

/// Serve a single request on one connection.
///
/// The handler races client disconnect detection. If the client goes away
/// first the handler's token is cancelled and no response is written.
async fn handle_connection<R, W>(mut reader: R, mut writer: W, ctx: &ListenCtx) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let request = read_request(&mut reader, &ctx.codec, ctx.timeout).await?;
    let rpc = request.rpc_call();
    let ticket = request_ticket(&request).map(ToString::to_string);

    // Status polling is frequent; keep it out of the info log
    if matches!(request, Request::Status { method: StatusMethod::GetStatus, .. }) {
        debug!(%rpc, ticket = ?ticket, "received request");
    } else {
        info!(%rpc, ticket = ?ticket, "received request");
    }

    let token = CancellationToken::new();
    let response = tokio::select! {
        response = ctx.handler.handle(request, token.clone()) => response,
        _ = detect_client_disconnect(&mut reader) => {
            token.cancel();
            debug!(%rpc, "Client disconnected, cancelling handler");
            return Ok(());
        }
    };

    debug!(%rpc, response = %response.wire_type().short_name(), "sending response");
    write_response(&mut writer, &ctx.codec, &response, ctx.timeout).await
}

/// Completes when the client closes its end (or sends stray bytes).
///
/// Clients send one request then wait, so any read completing means the
/// caller is no longer waiting for this response.
async fn detect_client_disconnect<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
