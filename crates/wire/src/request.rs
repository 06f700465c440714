// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests from clients to the agent

use serde_json::Value;
use tend_core::RpcCall;

use crate::binder::{StatusMethod, WireType};
use crate::capabilities::{ScriptServiceVersion, CAPABILITIES_SERVICE_V2};
use crate::contracts::{
    ScriptStatusRequest, StartKubernetesScriptCommandV1, StartKubernetesScriptCommandV1Alpha,
    StartScriptCommand, StartScriptCommandV2, StartScriptCommandV3Alpha,
};
use crate::wire::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetCapabilities,
    StartScript(StartScriptCommand),
    StartScriptV2(StartScriptCommandV2),
    StartScriptV3Alpha(StartScriptCommandV3Alpha),
    StartKubernetesScriptV1Alpha(StartKubernetesScriptCommandV1Alpha),
    StartKubernetesScriptV1(StartKubernetesScriptCommandV1),
    /// GetStatus, CancelScript, or CompleteScript against one service version
    Status { version: ScriptServiceVersion, method: StatusMethod, request: ScriptStatusRequest },
}

impl Request {
    pub fn status(version: ScriptServiceVersion, method: StatusMethod, request: ScriptStatusRequest) -> Self {
        Self::Status { version, method, request }
    }

    pub fn wire_type(&self) -> WireType {
        match self {
            Self::GetCapabilities => WireType::CapabilitiesRequest,
            Self::StartScript(_) => WireType::StartScript(ScriptServiceVersion::V1),
            Self::StartScriptV2(_) => WireType::StartScript(ScriptServiceVersion::V2),
            Self::StartScriptV3Alpha(_) => WireType::StartScript(ScriptServiceVersion::V3Alpha),
            Self::StartKubernetesScriptV1Alpha(_) => WireType::StartScript(ScriptServiceVersion::KubernetesV1Alpha),
            Self::StartKubernetesScriptV1(_) => WireType::StartScript(ScriptServiceVersion::KubernetesV1),
            Self::Status { version, method, .. } => WireType::StatusRequest(*version, *method),
        }
    }

    /// Name of the service that handles this request
    pub fn service(&self) -> &'static str {
        match self.script_version() {
            Some(version) => version.service_name(),
            None => CAPABILITIES_SERVICE_V2,
        }
    }

    pub fn script_version(&self) -> Option<ScriptServiceVersion> {
        match self.wire_type() {
            WireType::StartScript(v) | WireType::StatusRequest(v, _) => Some(v),
            _ => None,
        }
    }

    pub fn method(&self) -> String {
        match self {
            Self::GetCapabilities => "GetCapabilities".to_string(),
            Self::Status { method, .. } => method.to_string(),
            _ => "StartScript".to_string(),
        }
    }

    pub fn rpc_call(&self) -> RpcCall {
        RpcCall::new(self.service(), self.method())
    }

    pub(crate) fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::GetCapabilities => Ok(Value::Object(Default::default())),
            Self::StartScript(c) => serde_json::to_value(c),
            Self::StartScriptV2(c) => serde_json::to_value(c),
            Self::StartScriptV3Alpha(c) => serde_json::to_value(c),
            Self::StartKubernetesScriptV1Alpha(c) => serde_json::to_value(c),
            Self::StartKubernetesScriptV1(c) => serde_json::to_value(c),
            Self::Status { request, .. } => serde_json::to_value(request),
        }
    }

    pub(crate) fn from_payload(ty: WireType, payload: Value) -> Result<Self, ProtocolError> {
        use ScriptServiceVersion as V;
        Ok(match ty {
            WireType::CapabilitiesRequest => Self::GetCapabilities,
            WireType::StartScript(V::V1) => Self::StartScript(serde_json::from_value(payload)?),
            WireType::StartScript(V::V2) => Self::StartScriptV2(serde_json::from_value(payload)?),
            WireType::StartScript(V::V3Alpha) => Self::StartScriptV3Alpha(serde_json::from_value(payload)?),
            WireType::StartScript(V::KubernetesV1Alpha) => {
                Self::StartKubernetesScriptV1Alpha(serde_json::from_value(payload)?)
            }
            WireType::StartScript(V::KubernetesV1) => Self::StartKubernetesScriptV1(serde_json::from_value(payload)?),
            WireType::StatusRequest(version, method) => {
                Self::Status { version, method, request: serde_json::from_value(payload)? }
            }
            other => return Err(ProtocolError::UnexpectedType(other.short_name())),
        })
    }
}
