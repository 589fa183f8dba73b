// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Transport Interface
//!
//! This module defines the capability set the pub/sub layer expects from the
//! underlying message-queue backend: topic lookup and creation, subscription
//! creation, message delivery, and the per-message acknowledgment primitives.
//! Concrete backends implement these traits; the rest of the crate only ever
//! talks to the trait objects.

use crate::options::TransportSubscribeOptions;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use thiserror::Error;

/// Error raised by a transport implementation.
///
/// The transport is opaque to this layer, so its failures are carried as a
/// plain message. Higher-level errors in [`crate::errors::PubSubError`] wrap
/// this type as their source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Client handle into the message-queue backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Checks whether a topic with the given name exists.
    async fn topic_exists(&self, name: &str) -> Result<bool, TransportError>;

    /// Returns a handle to an existing topic.
    async fn topic(&self, name: &str) -> Result<Arc<dyn TopicHandle>, TransportError>;

    /// Creates a topic. The backend is expected to tolerate redundant
    /// create calls for the same name.
    async fn create_topic(&self, name: &str) -> Result<Arc<dyn TopicHandle>, TransportError>;

    /// Creates (or attaches to) a named subscription on a topic.
    /// Get-or-create semantics are expected of implementations.
    async fn create_subscription(
        &self,
        topic: Arc<dyn TopicHandle>,
        name: &str,
        options: TransportSubscribeOptions,
    ) -> Result<Arc<dyn SubscriptionHandle>, TransportError>;
}

/// Handle to a provisioned topic.
#[async_trait]
pub trait TopicHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Publishes raw bytes to the topic, returning the backend message id.
    async fn publish(&self, data: Vec<u8>) -> Result<String, TransportError>;
}

/// Handle to a live subscription.
///
/// Delivery is modeled as a pulled event stream: `recv` yields message and
/// error events until the subscription ends, then yields `None`.
#[async_trait]
pub trait SubscriptionHandle: Send + Sync {
    fn name(&self) -> &str;

    async fn recv(&self) -> Option<SubscriptionEvent>;

    /// Deletes the subscription server-side.
    async fn delete(&self) -> Result<(), TransportError>;
}

/// One delivered message plus its acknowledgment controls.
#[async_trait]
pub trait Envelope: Send + Sync {
    fn id(&self) -> &str;

    fn data(&self) -> &[u8];

    /// Confirms processing. Terminal: at most one of ack/nack per envelope.
    async fn ack(&self) -> Result<(), TransportError>;

    /// Signals failed processing; the backend redelivers after `delay`.
    async fn nack(&self, delay: Duration) -> Result<(), TransportError>;
}

/// Event emitted by an established subscription.
pub enum SubscriptionEvent {
    Message(Arc<dyn Envelope>),
    Error(TransportError),
}
