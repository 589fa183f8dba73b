// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Subscribe and Client Options
//!
//! This module provides the layered option model. Effective settings are
//! resolved by merging partial layers over the built-in defaults, key by
//! key: built-ins, then client-level defaults, then per-call overrides.
//! The negative-acknowledge delay is always clamped to [`MAX_NACK_DELAY`]
//! no matter which layer supplied it.

use serde::Deserialize;
use std::time::Duration;

/// Hard upper bound, in seconds, for the negative-acknowledge redelivery
/// delay and the acknowledge deadline.
pub const MAX_NACK_DELAY: u64 = 600;

/// Grace period, in seconds, added to the acknowledge deadline when sizing
/// the handler watchdog.
pub(crate) const WATCHDOG_GRACE: u64 = 20;

/// Transport-level subscription settings forwarded to
/// [`crate::transport::Transport::create_subscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSubscribeOptions {
    /// Seconds the backend waits for an acknowledge before redelivering
    pub ack_deadline: u64,
    /// Flow-control limit on outstanding messages
    pub max_messages: u32,
    /// Retry bound for transport-internal calls
    pub max_retries: u32,
}

impl Default for TransportSubscribeOptions {
    fn default() -> Self {
        TransportSubscribeOptions {
            ack_deadline: 10,
            max_messages: 50,
            max_retries: 10,
        }
    }
}

/// Fully resolved per-subscription settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Hand the listener the full envelope instead of just the payload
    pub raw: bool,
    /// Acknowledge automatically from the listener outcome
    pub auto_ack: bool,
    /// Suffix explicit subscription names with the topic name
    pub sub_name_with_topic: bool,
    /// Seconds before the backend redelivers a nacked message
    pub nack_delay: u64,
    pub transport: TransportSubscribeOptions,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        SubscribeOptions {
            raw: false,
            auto_ack: true,
            sub_name_with_topic: true,
            nack_delay: 120,
            transport: TransportSubscribeOptions::default(),
        }
    }
}

impl SubscribeOptions {
    /// Watchdog interval for one listener invocation: the acknowledge
    /// deadline, bounded by [`MAX_NACK_DELAY`], plus a fixed grace period.
    pub(crate) fn watchdog_delay(&self) -> Duration {
        Duration::from_secs(self.transport.ack_deadline.min(MAX_NACK_DELAY) + WATCHDOG_GRACE)
    }

    /// Redelivery delay handed to the transport on a nack.
    pub(crate) fn redelivery_delay(&self) -> Duration {
        Duration::from_secs(self.nack_delay)
    }
}

/// Partial layer over [`TransportSubscribeOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportOverrides {
    pub ack_deadline: Option<u64>,
    pub max_messages: Option<u32>,
    pub max_retries: Option<u32>,
}

impl TransportOverrides {
    fn resolve(&self, base: &TransportSubscribeOptions) -> TransportSubscribeOptions {
        let mut resolved = base.clone();
        if let Some(ack_deadline) = self.ack_deadline {
            resolved.ack_deadline = ack_deadline;
        }
        if let Some(max_messages) = self.max_messages {
            resolved.max_messages = max_messages;
        }
        if let Some(max_retries) = self.max_retries {
            resolved.max_retries = max_retries;
        }
        resolved
    }
}

/// Partial layer over [`SubscribeOptions`].
///
/// Absent keys leave the lower layer untouched; the nested transport
/// overrides merge recursively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubscribeOverrides {
    pub raw: Option<bool>,
    pub auto_ack: Option<bool>,
    pub sub_name_with_topic: Option<bool>,
    pub nack_delay: Option<u64>,
    pub transport: TransportOverrides,
}

impl SubscribeOverrides {
    pub fn new() -> Self {
        SubscribeOverrides::default()
    }

    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn auto_ack(mut self, auto_ack: bool) -> Self {
        self.auto_ack = Some(auto_ack);
        self
    }

    pub fn sub_name_with_topic(mut self, enabled: bool) -> Self {
        self.sub_name_with_topic = Some(enabled);
        self
    }

    pub fn nack_delay(mut self, seconds: u64) -> Self {
        self.nack_delay = Some(seconds);
        self
    }

    pub fn ack_deadline(mut self, seconds: u64) -> Self {
        self.transport.ack_deadline = Some(seconds);
        self
    }

    pub fn max_messages(mut self, max: u32) -> Self {
        self.transport.max_messages = Some(max);
        self
    }

    pub fn max_retries(mut self, max: u32) -> Self {
        self.transport.max_retries = Some(max);
        self
    }

    /// Merges this layer over `base` and clamps the nack delay.
    pub(crate) fn resolve(&self, base: &SubscribeOptions) -> SubscribeOptions {
        let mut resolved = base.clone();
        if let Some(raw) = self.raw {
            resolved.raw = raw;
        }
        if let Some(auto_ack) = self.auto_ack {
            resolved.auto_ack = auto_ack;
        }
        if let Some(sub_name_with_topic) = self.sub_name_with_topic {
            resolved.sub_name_with_topic = sub_name_with_topic;
        }
        if let Some(nack_delay) = self.nack_delay {
            resolved.nack_delay = nack_delay;
        }
        resolved.transport = self.transport.resolve(&base.transport);
        resolved.nack_delay = resolved.nack_delay.min(MAX_NACK_DELAY);
        resolved
    }
}

/// Client-wide settings, fixed at construction time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Create topics on first use instead of failing
    pub auto_create: bool,
    /// Default layer applied under every subscribe call
    pub default_subscribe: SubscribeOverrides,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            auto_create: true,
            default_subscribe: SubscribeOverrides::default(),
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        ClientOptions::default()
    }

    pub fn auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    pub fn default_subscribe(mut self, overrides: SubscribeOverrides) -> Self {
        self.default_subscribe = overrides;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_defaults() {
        let options = SubscribeOverrides::default().resolve(&SubscribeOptions::default());

        assert!(!options.raw);
        assert!(options.auto_ack);
        assert!(options.sub_name_with_topic);
        assert_eq!(options.nack_delay, 120);
        assert_eq!(options.transport.ack_deadline, 10);
        assert_eq!(options.transport.max_messages, 50);
        assert_eq!(options.transport.max_retries, 10);
    }

    #[test]
    fn per_call_layer_overrides_client_layer() {
        let client_layer = SubscribeOverrides::new()
            .nack_delay(30)
            .max_messages(5)
            .resolve(&SubscribeOptions::default());

        let resolved = SubscribeOverrides::new()
            .raw(true)
            .nack_delay(45)
            .resolve(&client_layer);

        assert!(resolved.raw);
        assert_eq!(resolved.nack_delay, 45);
        // untouched keys fall through to the client layer
        assert_eq!(resolved.transport.max_messages, 5);
        assert!(resolved.auto_ack);
    }

    #[test]
    fn clamps_nack_delay_to_maximum() {
        let resolved = SubscribeOverrides::new()
            .nack_delay(10_000)
            .resolve(&SubscribeOptions::default());

        assert_eq!(resolved.nack_delay, MAX_NACK_DELAY);
    }

    #[test]
    fn clamps_again_when_lower_layer_is_at_ceiling() {
        let client_layer = SubscribeOverrides::new()
            .nack_delay(9_999)
            .resolve(&SubscribeOptions::default());
        assert_eq!(client_layer.nack_delay, MAX_NACK_DELAY);

        let resolved = SubscribeOverrides::new()
            .nack_delay(700)
            .resolve(&client_layer);
        assert_eq!(resolved.nack_delay, MAX_NACK_DELAY);
    }

    #[test]
    fn watchdog_delay_adds_grace_to_bounded_deadline() {
        let options = SubscribeOptions::default();
        assert_eq!(options.watchdog_delay(), Duration::from_secs(30));

        let huge = SubscribeOverrides::new()
            .ack_deadline(100_000)
            .resolve(&SubscribeOptions::default());
        assert_eq!(
            huge.watchdog_delay(),
            Duration::from_secs(MAX_NACK_DELAY + WATCHDOG_GRACE)
        );
    }

    #[test]
    fn deserializes_partial_layer_from_config() {
        let overrides: SubscribeOverrides =
            serde_json::from_str(r#"{"auto_ack": false, "transport": {"ack_deadline": 60}}"#)
                .unwrap();

        let resolved = overrides.resolve(&SubscribeOptions::default());
        assert!(!resolved.auto_ack);
        assert_eq!(resolved.transport.ack_deadline, 60);
        assert_eq!(resolved.nack_delay, 120);
    }
}
