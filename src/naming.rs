// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Subscription Naming
//!
//! Resolves the final subscription identifier from the topic name and the
//! caller's naming choice.

use uuid::Uuid;

/// Caller intent for naming a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionName {
    /// Use the topic name itself
    Topic,
    /// Generate a randomized, topic-prefixed identifier
    Random,
    /// Use an explicit name
    Named(String),
}

impl Default for SubscriptionName {
    fn default() -> Self {
        SubscriptionName::Topic
    }
}

impl SubscriptionName {
    /// Resolves the final identifier.
    ///
    /// Explicit names that differ from the topic are suffixed with the
    /// topic (`<name>-<topic>`) when `sub_name_with_topic` is enabled, so
    /// the same subscription name on two topics stays distinct.
    pub(crate) fn resolve(&self, topic: &str, sub_name_with_topic: bool) -> String {
        match self {
            SubscriptionName::Topic => topic.to_owned(),
            SubscriptionName::Random => format!("{topic}-{}", Uuid::new_v4().simple()),
            SubscriptionName::Named(name) if sub_name_with_topic && name != topic => {
                format!("{name}-{topic}")
            }
            SubscriptionName::Named(name) => name.clone(),
        }
    }
}
