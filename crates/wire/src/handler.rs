// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::request::Request;
use crate::response::Response;

/// Serves decoded requests. Implemented by the agent's dispatcher; the
/// in-process client transport calls it directly.
///
/// Failures are reported as [`Response::Error`], never as a transport error.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// `cancel` fires when the caller stops waiting for the response.
    async fn handle(&self, request: Request, cancel: CancellationToken) -> Response;
}
