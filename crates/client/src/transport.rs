// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ways to reach an agent.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tend_wire::{read_response, write_request, Codec, ProtocolError, Request, RequestHandler, Response};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

use crate::error::RpcError;

/// One request, one response
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Identity of the agent, used to key cached capabilities
    fn endpoint(&self) -> &str;

    /// Send `request`. Fails with [`RpcError::Cancelled`] if `cancel` fires first.
    async fn send(&self, request: Request, cancel: CancellationToken) -> Result<Response, RpcError>;
}

/// A fresh Unix socket connection per request
pub struct SocketTransport {
    path: PathBuf,
    endpoint: String,
    timeout: Duration,
    codec: Codec,
}

impl SocketTransport {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        let path = path.into();
        let endpoint = format!("unix:{}", path.display());
        Self { path, endpoint, timeout, codec: Codec::default() }
    }

    async fn round_trip(&self, request: &Request) -> Result<Response, ProtocolError> {
        let stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.path))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        let (mut reader, mut writer) = stream.into_split();
        write_request(&mut writer, &self.codec, request, self.timeout).await?;
        // The agent may hold a StartScript response while the script runs
        let wait = match request {
            Request::StartScriptV2(c) => c.duration_to_wait_for_script_to_finish,
            Request::StartScriptV3Alpha(c) => c.duration_to_wait_for_script_to_finish,
            _ => None,
        };
        read_response(&mut reader, &self.codec, self.timeout + wait.unwrap_or_default()).await
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: Request, cancel: CancellationToken) -> Result<Response, RpcError> {
        tokio::select! {
            result = self.round_trip(&request) => Ok(result?),
            _ = cancel.cancelled() => Err(RpcError::Cancelled),
        }
    }
}

/// Calls an in-process handler directly
pub struct LocalTransport {
    handler: Arc<dyn RequestHandler>,
    endpoint: String,
}

impl LocalTransport {
    pub fn new(endpoint: impl Into<String>, handler: Arc<dyn RequestHandler>) -> Self {
        Self { handler, endpoint: endpoint.into() }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: Request, cancel: CancellationToken) -> Result<Response, RpcError> {
        tokio::select! {
            response = self.handler.handle(request, cancel.child_token()) => Ok(response),
            _ = cancel.cancelled() => Err(RpcError::Cancelled),
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    type Responder = dyn Fn(&Request) -> Result<Response, RpcError> + Send + Sync;

    /// Answers from a closure and records what it was asked.
    pub struct FakeTransport {
        endpoint: String,
        responder: Box<Responder>,
        requests: Mutex<Vec<Request>>,
    }

    impl FakeTransport {
        pub fn new(respond: impl Fn(&Request) -> Result<Response, RpcError> + Send + Sync + 'static) -> Self {
            Self { endpoint: "fake".to_string(), responder: Box::new(respond), requests: Mutex::new(Vec::new()) }
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.lock().clone()
        }

        pub fn count(&self, matches: impl Fn(&Request) -> bool) -> usize {
            self.requests.lock().iter().filter(|r| matches(r)).count()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn endpoint(&self) -> &str {
            &self.endpoint
        }

        async fn send(&self, request: Request, cancel: CancellationToken) -> Result<Response, RpcError> {
            self.requests.lock().push(request.clone());
            if cancel.is_cancelled() {
                return Err(RpcError::Cancelled);
            }
            (self.responder)(&request)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTransport;

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
