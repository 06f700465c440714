// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent protocol: versioned script service contracts, `$type` binding with
//! legacy name support, and length-prefixed JSON framing.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON envelope

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod binder;
pub mod capabilities;
mod codec;
mod contracts;
mod convert;
mod handler;
mod request;
mod response;
mod wire;

pub use binder::{
    default_binder, BinderError, ContractBinder, DefaultBinder, LegacyTypeBinder, StatusMethod, TypeBinder,
    TypeName, WireType,
};
pub use capabilities::{CapabilitiesResponseV2, ScriptServiceVersion};
pub use codec::{Codec, TYPE_FIELD};
pub use contracts::{
    ErrorResponse, ExecutionContext, PodImageConfiguration, RemoteErrorKind, ScriptStatusRequest,
    ScriptStatusResponse, StartKubernetesScriptCommandV1, StartKubernetesScriptCommandV1Alpha, StartScriptCommand,
    StartScriptCommandV2, StartScriptCommandV3Alpha, TicketResponse,
};
pub use handler::RequestHandler;
pub use request::Request;
pub use response::Response;
pub use wire::{
    read_message, read_request, read_response, write_message, write_request, write_response, ProtocolError,
    MAX_MESSAGE_SIZE,
};
