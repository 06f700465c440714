// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability negotiation.
//!
//! An agent's capabilities only change when it is upgraded, so responses
//! are cached per endpoint for [`ClientOptions::capabilities_ttl`]. An agent
//! that predates the capabilities service answers ServiceNotFound, which is
//! read as the legacy service set rather than an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tend_core::{ClientOperationMetricsBuilder, Clock};
use tend_wire::capabilities::CAPABILITIES_SERVICE_V2;
use tend_wire::{CapabilitiesResponseV2, Request, Response, ScriptServiceVersion};
use tokio_util::sync::CancellationToken;

use crate::config::ClientOptions;
use crate::error::{NegotiationError, RpcError};
use crate::executor::{OnCancel, RpcCallExecutor};
use crate::transport::Transport;

/// Capabilities keyed by endpoint, each valid for a fixed interval
pub struct CapabilitiesCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, CapabilitiesResponseV2)>>,
}

impl CapabilitiesCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, endpoint: &str, now: Instant) -> Option<CapabilitiesResponseV2> {
        let mut entries = self.entries.lock();
        match entries.get(endpoint) {
            Some((fetched, caps)) if now.saturating_duration_since(*fetched) < self.ttl => Some(caps.clone()),
            Some(_) => {
                entries.remove(endpoint);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, endpoint: &str, now: Instant, capabilities: CapabilitiesResponseV2) {
        self.entries.lock().insert(endpoint.to_string(), (now, capabilities));
    }

    pub fn invalidate(&self, endpoint: &str) {
        self.entries.lock().remove(endpoint);
    }
}

/// Pick the script service version to talk to.
///
/// Kubernetes agents advertise a Kubernetes script service and are always
/// driven through it. Otherwise the newest shell service wins.
pub fn select_script_service(
    capabilities: &CapabilitiesResponseV2,
    disable_v3_alpha: bool,
) -> Result<ScriptServiceVersion, NegotiationError> {
    use ScriptServiceVersion as V;

    let order: &[V] = if disable_v3_alpha {
        &[V::KubernetesV1, V::KubernetesV1Alpha, V::V2, V::V1]
    } else {
        &[V::KubernetesV1, V::KubernetesV1Alpha, V::V3Alpha, V::V2, V::V1]
    };
    order
        .iter()
        .copied()
        .find(|v| capabilities.supports(v.service_name()))
        .ok_or_else(|| NegotiationError::NoCompatibleService(capabilities.supported_services.clone()))
}

pub struct CapabilityNegotiator {
    cache: Arc<CapabilitiesCache>,
    disable_v3_alpha: bool,
}

impl CapabilityNegotiator {
    pub fn new(options: &ClientOptions) -> Self {
        Self::with_cache(Arc::new(CapabilitiesCache::new(options.capabilities_ttl)), options.disable_v3_alpha)
    }

    /// Share a cache between negotiators, e.g. one per agent connection.
    pub fn with_cache(cache: Arc<CapabilitiesCache>, disable_v3_alpha: bool) -> Self {
        Self { cache, disable_v3_alpha }
    }

    pub fn cache(&self) -> &Arc<CapabilitiesCache> {
        &self.cache
    }

    /// Cached capabilities for the transport's endpoint, fetching on a miss.
    pub async fn capabilities<C: Clock>(
        &self,
        executor: &RpcCallExecutor<C>,
        transport: &Arc<dyn Transport>,
        retries_enabled: bool,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) -> Result<CapabilitiesResponseV2, RpcError> {
        let endpoint = transport.endpoint();
        if let Some(caps) = self.cache.get(endpoint, executor.clock().now()) {
            tracing::trace!(endpoint, "using cached capabilities");
            return Ok(caps);
        }

        let request = Request::GetCapabilities;
        let call = request.rpc_call();
        let action = {
            let transport = Arc::clone(transport);
            move |token: CancellationToken| {
                let transport = Arc::clone(&transport);
                let request = request.clone();
                async move {
                    match transport.send(request, token).await? {
                        Response::Capabilities(caps) => Ok(caps),
                        other => match RpcError::from_response(CAPABILITIES_SERVICE_V2, other) {
                            RpcError::ServiceNotFound(_) => Ok(CapabilitiesResponseV2::legacy()),
                            e => Err(e),
                        },
                    }
                }
            }
        };
        let caps = executor.execute(retries_enabled, call, action, OnCancel::Abandon, operation, cancel).await?;

        tracing::debug!(endpoint, services = ?caps.supported_services, "fetched agent capabilities");
        self.cache.insert(endpoint, executor.clock().now(), caps.clone());
        Ok(caps)
    }

    pub async fn negotiate<C: Clock>(
        &self,
        executor: &RpcCallExecutor<C>,
        transport: &Arc<dyn Transport>,
        retries_enabled: bool,
        operation: &ClientOperationMetricsBuilder,
        cancel: &CancellationToken,
    ) -> Result<ScriptServiceVersion, NegotiationError> {
        let caps = self.capabilities(executor, transport, retries_enabled, operation, cancel).await?;
        let version = select_script_service(&caps, self.disable_v3_alpha)?;
        tracing::debug!(endpoint = transport.endpoint(), %version, "selected script service");
        Ok(version)
    }
}

#[cfg(test)]
#[path = "capabilities_tests.rs"]
mod tests;
