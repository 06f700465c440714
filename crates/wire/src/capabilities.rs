// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service names an agent can advertise, and the script service versions
//! they map to.

use serde::{Deserialize, Serialize};

pub const CAPABILITIES_SERVICE_V2: &str = "CapabilitiesServiceV2";
pub const SCRIPT_SERVICE: &str = "ScriptService";
pub const SCRIPT_SERVICE_V2: &str = "ScriptServiceV2";
pub const SCRIPT_SERVICE_V3_ALPHA: &str = "ScriptServiceV3Alpha";
pub const KUBERNETES_SCRIPT_SERVICE_V1_ALPHA: &str = "KubernetesScriptServiceV1Alpha";
pub const KUBERNETES_SCRIPT_SERVICE_V1: &str = "KubernetesScriptServiceV1";
pub const FILE_TRANSFER_SERVICE: &str = "FileTransferService";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesResponseV2 {
    pub supported_services: Vec<String>,
}

impl CapabilitiesResponseV2 {
    pub fn new<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { supported_services: services.into_iter().map(Into::into).collect() }
    }

    /// What an agent that predates the capabilities service supports.
    pub fn legacy() -> Self {
        Self::new([SCRIPT_SERVICE, FILE_TRANSFER_SERVICE])
    }

    pub fn supports(&self, service: &str) -> bool {
        self.supported_services.iter().any(|s| s == service)
    }
}

/// One version of the script service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptServiceVersion {
    V1,
    V2,
    V3Alpha,
    KubernetesV1Alpha,
    KubernetesV1,
}

impl ScriptServiceVersion {
    pub const ALL: [ScriptServiceVersion; 5] =
        [Self::V1, Self::V2, Self::V3Alpha, Self::KubernetesV1Alpha, Self::KubernetesV1];

    /// The advertised service name
    pub fn service_name(self) -> &'static str {
        match self {
            Self::V1 => SCRIPT_SERVICE,
            Self::V2 => SCRIPT_SERVICE_V2,
            Self::V3Alpha => SCRIPT_SERVICE_V3_ALPHA,
            Self::KubernetesV1Alpha => KUBERNETES_SCRIPT_SERVICE_V1_ALPHA,
            Self::KubernetesV1 => KUBERNETES_SCRIPT_SERVICE_V1,
        }
    }

    pub fn from_service_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.service_name() == name)
    }

    pub fn is_kubernetes(self) -> bool {
        matches!(self, Self::KubernetesV1Alpha | Self::KubernetesV1)
    }

    /// Whether the caller supplies the ticket (idempotent start).
    pub fn has_client_ticket(self) -> bool {
        !matches!(self, Self::V1)
    }
}

tend_core::simple_display! {
    ScriptServiceVersion {
        V1 => "v1",
        V2 => "v2",
        V3Alpha => "v3-alpha",
        KubernetesV1Alpha => "kubernetes v1-alpha",
        KubernetesV1 => "kubernetes v1",
    }
}
