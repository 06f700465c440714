// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Type binding for the `$type` field of the message envelope.
//!
//! [`ContractBinder`] maps every [`WireType`] to its current name
//! (`Tend.Contracts[.Service].Name, Tend.Contracts`). [`LegacyTypeBinder`]
//! wraps any binder and rewrites an allow-list of v1 types to and from their
//! pre-split names (`Tend.Shared.Contracts.Name, Tend.Shared`) so old and new
//! peers can read each other's payloads.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::capabilities::ScriptServiceVersion;

pub const CONTRACTS_NAMESPACE: &str = "Tend.Contracts";
pub const CONTRACTS_ASSEMBLY: &str = "Tend.Contracts";
pub const LEGACY_NAMESPACE: &str = "Tend.Shared.Contracts";
pub const LEGACY_ASSEMBLY: &str = "Tend.Shared";

/// Short names that old peers know under the legacy namespace.
pub const LEGACY_REMAPPED: &[&str] = &[
    "ScriptTicket",
    "StartScriptCommand",
    "ScriptStatusRequest",
    "CancelScriptCommand",
    "CompleteScriptCommand",
    "ScriptStatusResponse",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BinderError {
    #[error("unknown type {0}")]
    UnknownType(TypeName),
    #[error("malformed type name {0:?}")]
    Malformed(String),
}

/// Which status-shaped operation a request is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusMethod {
    GetStatus,
    Cancel,
    Complete,
}

impl StatusMethod {
    pub const ALL: [StatusMethod; 3] = [Self::GetStatus, Self::Cancel, Self::Complete];
}

tend_core::simple_display! {
    StatusMethod {
        GetStatus => "GetStatus",
        Cancel => "CancelScript",
        Complete => "CompleteScript",
    }
}

/// Every payload type that can appear in an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    CapabilitiesRequest,
    CapabilitiesResponse,
    Ticket,
    Acknowledged,
    Error,
    StartScript(ScriptServiceVersion),
    StatusRequest(ScriptServiceVersion, StatusMethod),
    StatusResponse(ScriptServiceVersion),
}

impl WireType {
    pub fn all() -> Vec<WireType> {
        let mut all = vec![
            Self::CapabilitiesRequest,
            Self::CapabilitiesResponse,
            Self::Ticket,
            Self::Acknowledged,
            Self::Error,
        ];
        for version in ScriptServiceVersion::ALL {
            all.push(Self::StartScript(version));
            all.extend(StatusMethod::ALL.map(|m| Self::StatusRequest(version, m)));
            all.push(Self::StatusResponse(version));
        }
        all
    }

    /// Namespace under [`CONTRACTS_NAMESPACE`], if any
    fn sub_namespace(self) -> Option<&'static str> {
        match self {
            Self::CapabilitiesRequest | Self::CapabilitiesResponse => Some("Capabilities"),
            Self::Ticket | Self::Acknowledged | Self::Error => None,
            Self::StartScript(v) | Self::StatusRequest(v, _) | Self::StatusResponse(v) => match v {
                ScriptServiceVersion::V1 => None,
                other => Some(other.service_name()),
            },
        }
    }

    /// Unqualified type name, e.g. `CancelScriptCommandV2`
    pub fn short_name(self) -> String {
        let (stem, version) = match self {
            Self::CapabilitiesRequest => return "CapabilitiesRequestV2".to_string(),
            Self::CapabilitiesResponse => return "CapabilitiesResponseV2".to_string(),
            Self::Ticket => return "ScriptTicket".to_string(),
            Self::Acknowledged => return "Acknowledgement".to_string(),
            Self::Error => return "ErrorResponse".to_string(),
            Self::StartScript(v) => (("Start", "Command"), v),
            Self::StatusRequest(v, StatusMethod::GetStatus) => (("", "StatusRequest"), v),
            Self::StatusRequest(v, StatusMethod::Cancel) => (("Cancel", "Command"), v),
            Self::StatusRequest(v, StatusMethod::Complete) => (("Complete", "Command"), v),
            Self::StatusResponse(v) => (("", "StatusResponse"), v),
        };
        let (prefix, suffix) = stem;
        let (subject, tag) = match version {
            ScriptServiceVersion::V1 => ("Script", ""),
            ScriptServiceVersion::V2 => ("Script", "V2"),
            ScriptServiceVersion::V3Alpha => ("Script", "V3Alpha"),
            ScriptServiceVersion::KubernetesV1Alpha => ("KubernetesScript", "V1Alpha"),
            ScriptServiceVersion::KubernetesV1 => ("KubernetesScript", "V1"),
        };
        format!("{prefix}{subject}{suffix}{tag}")
    }
}

/// A qualified `$type` value: `Full.Type.Name, Assembly`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    pub full_name: String,
    pub assembly: String,
}

impl TypeName {
    pub fn new(namespace: &str, short_name: &str, assembly: &str) -> Self {
        Self { full_name: format!("{namespace}.{short_name}"), assembly: assembly.to_string() }
    }

    pub fn parse(value: &str) -> Result<Self, BinderError> {
        let (full_name, assembly) =
            value.split_once(',').ok_or_else(|| BinderError::Malformed(value.to_string()))?;
        let (full_name, assembly) = (full_name.trim(), assembly.trim());
        if full_name.is_empty() || assembly.is_empty() {
            return Err(BinderError::Malformed(value.to_string()));
        }
        Ok(Self { full_name: full_name.to_string(), assembly: assembly.to_string() })
    }

    pub fn namespace(&self) -> &str {
        self.full_name.rsplit_once('.').map_or("", |(ns, _)| ns)
    }

    pub fn short_name(&self) -> &str {
        self.full_name.rsplit_once('.').map_or(self.full_name.as_str(), |(_, name)| name)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.full_name, self.assembly)
    }
}

/// Maps payload types to and from their serialized names
pub trait TypeBinder: Send + Sync {
    fn bind_to_name(&self, ty: WireType) -> TypeName;
    fn bind_to_type(&self, name: &TypeName) -> Result<WireType, BinderError>;
}

/// Current names for every [`WireType`]
#[derive(Debug, Clone)]
pub struct ContractBinder {
    by_name: HashMap<TypeName, WireType>,
}

impl ContractBinder {
    pub fn new() -> Self {
        let by_name = WireType::all().into_iter().map(|ty| (Self::name_of(ty), ty)).collect();
        Self { by_name }
    }

    fn name_of(ty: WireType) -> TypeName {
        let namespace = match ty.sub_namespace() {
            Some(sub) => format!("{CONTRACTS_NAMESPACE}.{sub}"),
            None => CONTRACTS_NAMESPACE.to_string(),
        };
        TypeName::new(&namespace, &ty.short_name(), CONTRACTS_ASSEMBLY)
    }
}

impl Default for ContractBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeBinder for ContractBinder {
    fn bind_to_name(&self, ty: WireType) -> TypeName {
        Self::name_of(ty)
    }

    fn bind_to_type(&self, name: &TypeName) -> Result<WireType, BinderError> {
        self.by_name.get(name).copied().ok_or_else(|| BinderError::UnknownType(name.clone()))
    }
}

/// Rewrites allow-listed names between the current and legacy namespace.
///
/// Serializing an allow-listed type always produces the legacy name, which
/// both old and new peers accept. Everything else passes through untouched.
#[derive(Debug, Clone, Default)]
pub struct LegacyTypeBinder<B> {
    inner: B,
}

impl<B: TypeBinder> LegacyTypeBinder<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    fn is_remapped(short_name: &str) -> bool {
        LEGACY_REMAPPED.contains(&short_name)
    }
}

impl<B: TypeBinder> TypeBinder for LegacyTypeBinder<B> {
    fn bind_to_name(&self, ty: WireType) -> TypeName {
        let name = self.inner.bind_to_name(ty);
        if name.namespace() == CONTRACTS_NAMESPACE
            && name.assembly == CONTRACTS_ASSEMBLY
            && Self::is_remapped(name.short_name())
        {
            return TypeName::new(LEGACY_NAMESPACE, name.short_name(), LEGACY_ASSEMBLY);
        }
        name
    }

    fn bind_to_type(&self, name: &TypeName) -> Result<WireType, BinderError> {
        if name.namespace() == LEGACY_NAMESPACE
            && name.assembly == LEGACY_ASSEMBLY
            && Self::is_remapped(name.short_name())
        {
            let current = TypeName::new(CONTRACTS_NAMESPACE, name.short_name(), CONTRACTS_ASSEMBLY);
            return self.inner.bind_to_type(&current);
        }
        self.inner.bind_to_type(name)
    }
}

/// The binder every peer uses on the wire
pub type DefaultBinder = LegacyTypeBinder<ContractBinder>;

pub fn default_binder() -> DefaultBinder {
    LegacyTypeBinder::new(ContractBinder::new())
}

#[cfg(test)]
#[path = "binder_tests.rs"]
mod tests;
