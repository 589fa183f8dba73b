// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Listener Seam
//!
//! Application code processes messages through the `Handler` trait. The
//! returned [`Disposition`] (or an error) is what the dispatcher turns into
//! an acknowledge-or-negative-acknowledge decision when auto-ack is on.

use crate::message::Delivery;
use async_trait::async_trait;
use std::{future::Future, sync::Arc};

/// What should happen to the message after the listener settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Confirm processing; the backend will not redeliver
    Ack,
    /// Reject processing; the backend redelivers after the nack delay
    Nack,
}

/// Errors raised by application listeners. Contained by the dispatcher and
/// converted into a negative-acknowledge, never propagated to the caller.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Processes one inbound message.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, delivery: Delivery) -> Result<Disposition, HandlerError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Delivery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Disposition, HandlerError>> + Send + 'static,
{
    async fn handle(&self, delivery: Delivery) -> Result<Disposition, HandlerError> {
        (self.0)(delivery).await
    }
}

/// Wraps an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Delivery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Disposition, HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Payload;

    #[tokio::test]
    async fn closure_handler_receives_the_delivery() {
        let handler = handler_fn(|delivery: Delivery| async move {
            assert_eq!(delivery.payload, Payload::Text("hi".to_owned()));
            Ok(Disposition::Ack)
        });

        let delivery = Delivery {
            id: "1".to_owned(),
            topic: "t".to_owned(),
            payload: Payload::from("hi"),
            envelope: None,
        };

        assert_eq!(handler.handle(delivery).await.unwrap(), Disposition::Ack);
    }
}
