// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Pub/Sub Client
//!
//! The caller-facing facade over an abstract transport: publish payloads to
//! named topics and subscribe to topics with listener handlers, with topic
//! provisioning, option resolution, acknowledgment bookkeeping, and
//! failure recovery handled here.
//!
//! The client is constructed once with an immutable [`ClientOptions`] value
//! and shared behind an `Arc`.

use crate::{
    errors::PubSubError,
    handler::{handler_fn, Disposition, Handler},
    message::{Delivery, Payload},
    options::{ClientOptions, SubscribeOptions},
    publisher,
    subscriber::{supervise, SubscribeRequest, SubscriptionContext},
    topic::ensure_topic,
    transport::{SubscriptionHandle, Transport},
};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Weak},
};
use tokio::sync::oneshot;
use tracing::{error, trace, warn};

/// Pub/sub abstraction layer over a managed message-queue backend.
pub struct QueueClient {
    transport: Arc<dyn Transport>,
    auto_create: bool,
    default_subscribe: SubscribeOptions,
    subscriptions: Mutex<HashMap<String, Arc<dyn SubscriptionHandle>>>,
    // handed to supervisor loops so resubscription can reach back into the
    // client without keeping it alive
    weak: Weak<QueueClient>,
}

impl QueueClient {
    /// Creates a new client over the given transport.
    ///
    /// The client-level subscribe overrides are resolved against the
    /// built-in defaults here, once; per-call overrides layer on top.
    pub fn new(transport: Arc<dyn Transport>, options: ClientOptions) -> Arc<QueueClient> {
        let default_subscribe = options
            .default_subscribe
            .resolve(&SubscribeOptions::default());

        Arc::new_cyclic(|weak| QueueClient {
            transport,
            auto_create: options.auto_create,
            default_subscribe,
            subscriptions: Mutex::new(HashMap::default()),
            weak: weak.clone(),
        })
    }

    /// Effective subscribe defaults for this client.
    pub fn default_subscribe_options(&self) -> &SubscribeOptions {
        &self.default_subscribe
    }

    /// Publishes a payload to a topic, returning the backend message id.
    ///
    /// Text and binary payloads are forwarded byte-identically; JSON
    /// payloads are stringified. The topic is provisioned first when
    /// auto-create is enabled.
    pub async fn publish(&self, topic: &str, payload: Payload) -> Result<String, PubSubError> {
        trace!(topic, "publishing");
        publisher::publish(self.transport.as_ref(), topic, payload, self.auto_create).await
    }

    /// Serializes any serde value and publishes it as JSON.
    pub async fn publish_json<T: Serialize>(
        &self,
        topic: &str,
        payload: &T,
    ) -> Result<String, PubSubError> {
        let value = serde_json::to_value(payload).map_err(|err| {
            warn!(error = err.to_string(), topic, "payload serialize error");
            PubSubError::PublishSerialize {
                topic: topic.to_owned(),
                source: err,
            }
        })?;
        self.publish(topic, Payload::Json(value)).await
    }

    /// Subscribes a handler to a topic.
    ///
    /// Resolves the effective options and subscription name, provisions
    /// the topic, creates (or attaches to) the subscription, and starts
    /// supervising it: messages flow through the dispatcher, transport
    /// errors tear the subscription down and re-establish it.
    pub async fn subscribe(
        &self,
        request: SubscribeRequest,
        handler: Arc<dyn Handler>,
    ) -> Result<Arc<dyn SubscriptionHandle>, PubSubError> {
        let SubscribeRequest {
            topic,
            name,
            overrides,
        } = request;

        let options = overrides.resolve(&self.default_subscribe);
        let name = name.resolve(&topic, options.sub_name_with_topic);
        trace!(topic = topic.clone(), name = name.clone(), "subscribing");

        self.attach(SubscriptionContext {
            topic,
            name,
            options,
            handler,
        })
        .await
    }

    /// Subscribes for exactly one message: resolves with the first
    /// payload, then deletes the subscription. Deletion errors are logged,
    /// never surfaced.
    pub async fn subscribe_one(&self, request: SubscribeRequest) -> Result<Payload, PubSubError> {
        let (tx, rx) = oneshot::channel::<Payload>();
        let slot = Arc::new(Mutex::new(Some(tx)));

        let handler = {
            let slot = Arc::clone(&slot);
            handler_fn(move |delivery: Delivery| {
                let tx = slot.lock().unwrap().take();
                async move {
                    if let Some(tx) = tx {
                        let _ = tx.send(delivery.payload);
                    }
                    Ok(Disposition::Ack)
                }
            })
        };

        let subscription = self.subscribe(request, handler).await?;
        let name = subscription.name().to_owned();

        match rx.await {
            Ok(payload) => {
                self.delete_subscription(&subscription).await;
                Ok(payload)
            }
            Err(_) => {
                self.delete_subscription(&subscription).await;
                Err(PubSubError::SubscriptionClosed(name))
            }
        }
    }

    /// Deletes a subscription server-side. Failures are logged and
    /// swallowed.
    pub async fn delete_subscription(&self, subscription: &Arc<dyn SubscriptionHandle>) {
        self.subscriptions
            .lock()
            .unwrap()
            .remove(subscription.name());

        if let Err(err) = subscription.delete().await {
            warn!(
                error = err.to_string(),
                name = subscription.name(),
                "subscription delete error"
            );
        }
    }

    /// Returns the live handle registered under a subscription name, if
    /// any. Resubscription overwrites entries with the replacement handle.
    pub fn subscription(&self, name: &str) -> Option<Arc<dyn SubscriptionHandle>> {
        self.subscriptions.lock().unwrap().get(name).cloned()
    }

    /// Drops the registry entry for a handle whose event stream ended,
    /// unless a replacement has already been registered under the name.
    pub(crate) fn detach(&self, handle: &Arc<dyn SubscriptionHandle>) {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if let Some(current) = subscriptions.get(handle.name()) {
            if Arc::ptr_eq(current, handle) {
                subscriptions.remove(handle.name());
            }
        }
    }

    /// Provisions the topic, creates the subscription, registers the
    /// handle, and starts the supervisor loop. Shared by first-time
    /// subscribes and resubscription.
    pub(crate) async fn attach(
        &self,
        ctx: SubscriptionContext,
    ) -> Result<Arc<dyn SubscriptionHandle>, PubSubError> {
        let topic = ensure_topic(self.transport.as_ref(), &ctx.topic, self.auto_create).await?;

        let handle = match self
            .transport
            .create_subscription(topic, &ctx.name, ctx.options.transport.clone())
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                error!(
                    error = err.to_string(),
                    topic = ctx.topic.clone(),
                    name = ctx.name.clone(),
                    "subscribe error"
                );
                return Err(PubSubError::Subscribe {
                    topic: ctx.topic,
                    name: ctx.name,
                    source: err,
                });
            }
        };

        self.subscriptions
            .lock()
            .unwrap()
            .insert(ctx.name.clone(), Arc::clone(&handle));

        supervise(self.weak.clone(), Arc::clone(&handle), ctx);

        Ok(handle)
    }
}
