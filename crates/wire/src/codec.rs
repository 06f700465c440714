// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON envelope with a `$type` discriminator resolved through a [`TypeBinder`].

use serde_json::Value;

use crate::binder::{default_binder, DefaultBinder, TypeBinder, TypeName, WireType};
use crate::request::Request;
use crate::response::Response;
use crate::wire::ProtocolError;

pub const TYPE_FIELD: &str = "$type";

#[derive(Debug, Clone)]
pub struct Codec<B = DefaultBinder> {
    binder: B,
}

impl Default for Codec<DefaultBinder> {
    fn default() -> Self {
        Self::new(default_binder())
    }
}

impl<B: TypeBinder> Codec<B> {
    pub fn new(binder: B) -> Self {
        Self { binder }
    }

    pub fn encode_request(&self, request: &Request) -> Result<Vec<u8>, ProtocolError> {
        self.seal(request.wire_type(), request.payload()?)
    }

    pub fn decode_request(&self, bytes: &[u8]) -> Result<Request, ProtocolError> {
        let (ty, payload) = self.open(bytes)?;
        Request::from_payload(ty, payload)
    }

    pub fn encode_response(&self, response: &Response) -> Result<Vec<u8>, ProtocolError> {
        self.seal(response.wire_type(), response.payload()?)
    }

    pub fn decode_response(&self, bytes: &[u8]) -> Result<Response, ProtocolError> {
        let (ty, payload) = self.open(bytes)?;
        Response::from_payload(ty, payload)
    }

    fn seal(&self, ty: WireType, payload: Value) -> Result<Vec<u8>, ProtocolError> {
        let Value::Object(mut fields) = payload else {
            return Err(ProtocolError::NotAnObject);
        };
        fields.insert(TYPE_FIELD.to_string(), Value::String(self.binder.bind_to_name(ty).to_string()));
        Ok(serde_json::to_vec(&fields)?)
    }

    fn open(&self, bytes: &[u8]) -> Result<(WireType, Value), ProtocolError> {
        let Value::Object(mut fields) = serde_json::from_slice(bytes)? else {
            return Err(ProtocolError::NotAnObject);
        };
        let name = match fields.remove(TYPE_FIELD) {
            Some(Value::String(name)) => TypeName::parse(&name)?,
            _ => return Err(ProtocolError::MissingType),
        };
        let ty = self.binder.bind_to_type(&name)?;
        Ok((ty, Value::Object(fields)))
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
