// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Publishing
//!
//! Encodes a payload, ensures the target topic exists, and forwards the
//! bytes to the topic's publish primitive. Failures are logged and
//! re-raised with the topic context attached.

use crate::{errors::PubSubError, message::Payload, topic::ensure_topic, transport::Transport};
use tracing::{error, trace};

/// Publishes one payload, returning the backend message id.
pub(crate) async fn publish(
    transport: &dyn Transport,
    topic: &str,
    payload: Payload,
    auto_create: bool,
) -> Result<String, PubSubError> {
    let data = payload.encode().map_err(|err| {
        error!(error = err.to_string(), topic, "payload encode error");
        PubSubError::PublishSerialize {
            topic: topic.to_owned(),
            source: err,
        }
    })?;

    let handle = ensure_topic(transport, topic, auto_create).await?;

    match handle.publish(data).await {
        Ok(message_id) => {
            trace!(topic, id = message_id.clone(), "published");
            Ok(message_id)
        }
        Err(err) => {
            error!(error = err.to_string(), topic, "error publishing message");
            Err(PubSubError::Publish {
                topic: topic.to_owned(),
                source: err,
            })
        }
    }
}
