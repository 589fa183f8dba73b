// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Payloads
//!
//! This module provides the payload model shared by both directions of the
//! pub/sub layer: inbound raw bytes are opportunistically parsed into
//! structured data, and outbound payloads are encoded back into the bytes
//! the transport carries.

use crate::transport::Envelope;
use serde_json::Value;
use std::sync::Arc;

/// A message payload.
///
/// Inbound, `parse` classifies the raw bytes; parsing never fails, it only
/// degrades: valid JSON becomes `Json`, other UTF-8 becomes `Text`, and
/// anything else stays `Binary`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub(crate) fn parse(data: &[u8]) -> Payload {
        match std::str::from_utf8(data) {
            Ok(text) => match serde_json::from_str::<Value>(text) {
                Ok(value) => Payload::Json(value),
                Err(_) => Payload::Text(text.to_owned()),
            },
            Err(_) => Payload::Binary(data.to_vec()),
        }
    }

    /// Encodes the payload for publishing. `Text` and `Binary` pass
    /// through byte-identically; `Json` is stringified.
    pub(crate) fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Payload::Json(value) => serde_json::to_vec(value),
            Payload::Text(text) => Ok(text.clone().into_bytes()),
            Payload::Binary(data) => Ok(data.clone()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_owned())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Payload::Binary(data)
    }
}

/// The argument handed to a listener for one inbound message.
pub struct Delivery {
    /// Backend message identifier
    pub id: String,
    /// Topic the subscription is bound to
    pub topic: String,
    pub payload: Payload,
    /// Present only in `raw` mode, for manual ack/nack
    pub envelope: Option<Arc<dyn Envelope>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_payloads() {
        let payload = Payload::parse(br#"{"msg":"yay"}"#);
        assert_eq!(payload, Payload::Json(json!({"msg": "yay"})));
    }

    #[test]
    fn falls_back_to_text_on_parse_failure() {
        let payload = Payload::parse(b"loud and clear!");
        assert_eq!(payload, Payload::Text("loud and clear!".to_owned()));
    }

    #[test]
    fn falls_back_to_binary_on_invalid_utf8() {
        let payload = Payload::parse(&[0xff, 0xfe, 0x00]);
        assert_eq!(payload, Payload::Binary(vec![0xff, 0xfe, 0x00]));
    }

    #[test]
    fn text_encodes_byte_identically() {
        let payload = Payload::from("hey!");
        assert_eq!(payload.encode().unwrap(), b"hey!".to_vec());
    }

    #[test]
    fn json_encodes_as_stringified_value() {
        let value = json!({"a": 1});
        let payload = Payload::from(value.clone());
        assert_eq!(payload.encode().unwrap(), serde_json::to_vec(&value).unwrap());
    }
}
