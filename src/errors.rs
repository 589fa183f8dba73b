// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types
//!
//! This module provides the error taxonomy for the pub/sub layer. The
//! `PubSubError` enum covers topic provisioning, subscription setup, and
//! publishing failures; each variant carries the topic context and, where
//! one exists, the underlying transport cause.
//!
//! Listener failures never surface here: the dispatcher contains them and
//! converts them into a negative-acknowledge.

use crate::transport::TransportError;
use thiserror::Error;

/// Represents errors surfaced to callers of the pub/sub layer.
#[derive(Error, Debug)]
pub enum PubSubError {
    /// The topic existence check or creation failed
    #[error("failure to provision topic `{topic}`")]
    Provisioning {
        topic: String,
        #[source]
        source: TransportError,
    },

    /// The topic does not exist and auto-create is disabled
    #[error("topic `{0}` does not exist and auto-create is disabled")]
    TopicMissing(String),

    /// The subscription could not be created
    #[error("failure to subscribe `{name}` to `{topic}`")]
    Subscribe {
        topic: String,
        name: String,
        #[source]
        source: TransportError,
    },

    /// The payload could not be serialized for publishing
    #[error("failure to serialize payload for `{topic}`")]
    PublishSerialize {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// The transport rejected the publish call
    #[error("failure to publish to `{topic}`")]
    Publish {
        topic: String,
        #[source]
        source: TransportError,
    },

    /// A one-shot subscription ended before any message arrived
    #[error("subscription `{0}` ended before a message arrived")]
    SubscriptionClosed(String),
}
