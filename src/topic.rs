// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Topic Provisioning
//!
//! Ensures a topic exists before it is used for publishing or subscribing.
//! The check-then-create sequence is safe to run concurrently for the same
//! name; the backend is expected to tolerate redundant create calls.

use crate::{
    errors::PubSubError,
    transport::{TopicHandle, Transport},
};
use std::sync::Arc;
use tracing::{debug, error};

/// Returns a handle to `name`, creating the topic when it is absent and
/// auto-create is enabled. Provisioning failures are logged and propagated.
pub(crate) async fn ensure_topic(
    transport: &dyn Transport,
    name: &str,
    auto_create: bool,
) -> Result<Arc<dyn TopicHandle>, PubSubError> {
    let exists = match transport.topic_exists(name).await {
        Ok(exists) => exists,
        Err(err) => {
            error!(
                error = err.to_string(),
                topic = name,
                "topic existence check failed"
            );
            return Err(PubSubError::Provisioning {
                topic: name.to_owned(),
                source: err,
            });
        }
    };

    if exists {
        return transport.topic(name).await.map_err(|err| {
            error!(error = err.to_string(), topic = name, "error to get topic");
            PubSubError::Provisioning {
                topic: name.to_owned(),
                source: err,
            }
        });
    }

    if !auto_create {
        return Err(PubSubError::TopicMissing(name.to_owned()));
    }

    debug!(topic = name, "creating topic");
    match transport.create_topic(name).await {
        Ok(topic) => {
            debug!(topic = name, "topic created");
            Ok(topic)
        }
        Err(err) => {
            error!(
                error = err.to_string(),
                topic = name,
                "error to create topic"
            );
            Err(PubSubError::Provisioning {
                topic: name.to_owned(),
                source: err,
            })
        }
    }
}
