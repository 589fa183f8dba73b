// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Subscription Supervision
//!
//! This module provides the subscribe-request builder and the supervisor
//! loop that drives an established subscription: message events are fanned
//! out to the dispatcher, error events tear the subscription down and
//! re-issue the original subscribe call.

use crate::{
    client::QueueClient,
    dispatcher::dispatch,
    handler::Handler,
    naming::SubscriptionName,
    options::{SubscribeOptions, SubscribeOverrides},
    transport::{SubscriptionEvent, SubscriptionHandle},
};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

/// Builder describing one subscribe call: the topic, the naming choice,
/// and per-call option overrides.
#[derive(Debug, Clone, Default)]
pub struct SubscribeRequest {
    pub(crate) topic: String,
    pub(crate) name: SubscriptionName,
    pub(crate) overrides: SubscribeOverrides,
}

impl SubscribeRequest {
    /// Starts a request for the given topic. The subscription name
    /// defaults to the topic name.
    pub fn topic(topic: &str) -> SubscribeRequest {
        SubscribeRequest {
            topic: topic.to_owned(),
            name: SubscriptionName::Topic,
            overrides: SubscribeOverrides::default(),
        }
    }

    /// Uses an explicit subscription name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = SubscriptionName::Named(name.to_owned());
        self
    }

    /// Uses a randomized, topic-prefixed subscription name.
    pub fn random_name(mut self) -> Self {
        self.name = SubscriptionName::Random;
        self
    }

    /// Replaces the per-call option overrides wholesale.
    pub fn options(mut self, overrides: SubscribeOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Hands the listener the full envelope instead of just the payload.
    pub fn raw(mut self) -> Self {
        self.overrides.raw = Some(true);
        self
    }

    /// Leaves ack/nack to the listener.
    pub fn manual_ack(mut self) -> Self {
        self.overrides.auto_ack = Some(false);
        self
    }

    /// Overrides the nack redelivery delay, in seconds.
    pub fn nack_delay(mut self, seconds: u64) -> Self {
        self.overrides.nack_delay = Some(seconds);
        self
    }
}

/// The resolved arguments of a subscribe call, kept so a broken
/// subscription can be re-established with the same identity.
#[derive(Clone)]
pub(crate) struct SubscriptionContext {
    pub(crate) topic: String,
    pub(crate) name: String,
    pub(crate) options: SubscribeOptions,
    pub(crate) handler: Arc<dyn Handler>,
}

/// Spawns the event loop for an established subscription.
///
/// Each message is dispatched on its own task so in-flight listener
/// invocations and their watchdogs interleave. A transport error event
/// ends this loop and hands the context back to the client for
/// resubscription; a closed stream ends it quietly.
pub(crate) fn supervise(
    client: Weak<QueueClient>,
    handle: Arc<dyn SubscriptionHandle>,
    ctx: SubscriptionContext,
) {
    tokio::spawn(async move {
        loop {
            match handle.recv().await {
                Some(SubscriptionEvent::Message(envelope)) => {
                    tokio::spawn(dispatch(
                        ctx.topic.clone(),
                        envelope,
                        Arc::clone(&ctx.handler),
                        ctx.options.clone(),
                    ));
                }
                Some(SubscriptionEvent::Error(err)) => {
                    warn!(
                        error = err.to_string(),
                        topic = ctx.topic.clone(),
                        name = ctx.name.clone(),
                        "subscription error"
                    );
                    match client.upgrade() {
                        Some(client) => resubscribe(&client, Arc::clone(&handle), ctx),
                        None => debug!("client dropped, not resubscribing"),
                    }
                    break;
                }
                None => {
                    debug!(
                        topic = ctx.topic.clone(),
                        name = ctx.name.clone(),
                        "subscription stream ended"
                    );
                    if let Some(client) = client.upgrade() {
                        client.detach(&handle);
                    }
                    break;
                }
            }
        }
    });
}

/// Tears down a broken subscription and re-issues the subscribe call with
/// the already-resolved name and options. Fire-and-forget: a failed
/// re-subscribe is logged and abandoned.
fn resubscribe(client: &Arc<QueueClient>, stale: Arc<dyn SubscriptionHandle>, ctx: SubscriptionContext) {
    let client = Arc::clone(client);
    tokio::spawn(async move {
        client.delete_subscription(&stale).await;
        match client.attach(ctx.clone()).await {
            Ok(_) => debug!(
                topic = ctx.topic,
                name = ctx.name,
                "subscription re-established"
            ),
            Err(err) => error!(
                error = err.to_string(),
                topic = ctx.topic,
                "resubscribe error"
            ),
        }
    });
}
