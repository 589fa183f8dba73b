// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Dispatcher
//!
//! This module implements the core per-message consumption logic: parsing
//! the payload, invoking the listener, enforcing the handler watchdog, and
//! translating the listener outcome into an acknowledge-or-negative-
//! acknowledge decision.
//!
//! The watchdog and the listener-completion path can race to settle the
//! same envelope, so the decision goes through an `AckGuard` whose
//! first-wins flag makes the acknowledgment exactly-once.

use crate::{
    handler::{Disposition, Handler},
    message::{Delivery, Payload},
    options::SubscribeOptions,
    transport::Envelope,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, trace, warn};

/// Single-assignment gate around the terminal ack/nack call.
struct AckGuard {
    envelope: Arc<dyn Envelope>,
    topic: String,
    nack_delay: Duration,
    settled: AtomicBool,
}

impl AckGuard {
    fn new(envelope: Arc<dyn Envelope>, topic: String, nack_delay: Duration) -> Self {
        AckGuard {
            envelope,
            topic,
            nack_delay,
            settled: AtomicBool::new(false),
        }
    }

    async fn ack(&self) {
        if self.settled.swap(true, Ordering::SeqCst) {
            return;
        }
        trace!(id = self.envelope.id(), topic = self.topic.clone(), "ack");
        if let Err(err) = self.envelope.ack().await {
            error!(
                error = err.to_string(),
                id = self.envelope.id(),
                "error to ack message"
            );
        }
    }

    async fn nack(&self) {
        if self.settled.swap(true, Ordering::SeqCst) {
            return;
        }
        trace!(id = self.envelope.id(), topic = self.topic.clone(), "nack");
        if let Err(err) = self.envelope.nack(self.nack_delay).await {
            error!(
                error = err.to_string(),
                id = self.envelope.id(),
                "error to nack message"
            );
        }
    }
}

/// Processes one inbound envelope through the listener.
///
/// With auto-ack enabled the listener outcome decides: `Ok(Ack)` (or any
/// successful outcome) acknowledges, `Ok(Nack)` negative-acknowledges, and
/// a listener error is logged and treated as a nack. With auto-ack disabled
/// the listener owns acknowledgment through the raw envelope.
pub(crate) async fn dispatch(
    topic: String,
    envelope: Arc<dyn Envelope>,
    handler: Arc<dyn Handler>,
    options: SubscribeOptions,
) {
    let payload = Payload::parse(envelope.data());
    trace!(
        id = envelope.id(),
        topic = topic.clone(),
        "message received"
    );

    let guard = Arc::new(AckGuard::new(
        Arc::clone(&envelope),
        topic.clone(),
        options.redelivery_delay(),
    ));

    // The watchdog is cancelled by signal rather than by aborting the task:
    // once the sleep wins the race the nack must run to completion, or an
    // abort landing between the guard claim and the transport call would
    // leave the envelope neither acked nor nacked.
    let cancel = Arc::new(Notify::new());
    let watchdog = if options.auto_ack {
        let guard = Arc::clone(&guard);
        let cancel = Arc::clone(&cancel);
        let id = envelope.id().to_owned();
        let watchdog_topic = topic.clone();
        let delay = options.watchdog_delay();
        Some(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.notified() => {}
                _ = tokio::time::sleep(delay) => {
                    warn!(id, topic = watchdog_topic, "handler timeout");
                    guard.nack().await;
                }
            }
        }))
    } else {
        None
    };

    let delivery = Delivery {
        id: envelope.id().to_owned(),
        topic: topic.clone(),
        payload,
        envelope: options.raw.then(|| Arc::clone(&envelope)),
    };

    let result = handler.handle(delivery).await;

    if let Some(watchdog) = watchdog {
        cancel.notify_one();
        let _ = watchdog.await;
    }

    if !options.auto_ack {
        // acknowledgment is the listener's responsibility via the envelope
        return;
    }

    match result {
        Ok(Disposition::Nack) => guard.nack().await,
        Ok(Disposition::Ack) => guard.ack().await,
        Err(err) => {
            error!(error = err.to_string(), topic, "listener error");
            guard.nack().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, HandlerError};
    use crate::options::SubscribeOverrides;
    use crate::transport::TransportError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct FakeEnvelope {
        id: String,
        data: Vec<u8>,
        acks: AtomicUsize,
        nacks: AtomicUsize,
        nack_latency: Duration,
        last_nack_delay: Mutex<Option<Duration>>,
    }

    impl FakeEnvelope {
        fn text(id: &str, data: &str) -> Self {
            FakeEnvelope {
                id: id.to_owned(),
                data: data.as_bytes().to_vec(),
                acks: AtomicUsize::new(0),
                nacks: AtomicUsize::new(0),
                nack_latency: Duration::ZERO,
                last_nack_delay: Mutex::new(None),
            }
        }

        fn slow_nack(id: &str, data: &str, latency: Duration) -> Self {
            FakeEnvelope {
                nack_latency: latency,
                ..FakeEnvelope::text(id, data)
            }
        }

        fn acks(&self) -> usize {
            self.acks.load(Ordering::SeqCst)
        }

        fn nacks(&self) -> usize {
            self.nacks.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Envelope for FakeEnvelope {
        fn id(&self) -> &str {
            &self.id
        }

        fn data(&self) -> &[u8] {
            &self.data
        }

        async fn ack(&self) -> Result<(), TransportError> {
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn nack(&self, delay: Duration) -> Result<(), TransportError> {
            if self.nack_latency > Duration::ZERO {
                tokio::time::sleep(self.nack_latency).await;
            }
            self.nacks.fetch_add(1, Ordering::SeqCst);
            *self.last_nack_delay.lock().unwrap() = Some(delay);
            Ok(())
        }
    }

    fn options() -> SubscribeOptions {
        SubscribeOptions::default()
    }

    #[tokio::test]
    async fn acks_on_successful_outcome() {
        let envelope = Arc::new(FakeEnvelope::text("1", "hi"));
        let handler = handler_fn(|_| async { Ok(Disposition::Ack) });

        dispatch("t".to_owned(), envelope.clone(), handler, options()).await;

        assert_eq!(envelope.acks(), 1);
        assert_eq!(envelope.nacks(), 0);
    }

    #[tokio::test]
    async fn nacks_on_rejected_outcome_with_configured_delay() {
        let envelope = Arc::new(FakeEnvelope::text("1", "hi"));
        let handler = handler_fn(|_| async { Ok(Disposition::Nack) });

        dispatch("t".to_owned(), envelope.clone(), handler, options()).await;

        assert_eq!(envelope.acks(), 0);
        assert_eq!(envelope.nacks(), 1);
        assert_eq!(
            *envelope.last_nack_delay.lock().unwrap(),
            Some(Duration::from_secs(120))
        );
    }

    #[tokio::test]
    async fn listener_error_is_contained_and_nacks() {
        let envelope = Arc::new(FakeEnvelope::text("1", "hi"));
        let handler = handler_fn(|_| async { Err::<Disposition, HandlerError>("boom".into()) });

        dispatch("t".to_owned(), envelope.clone(), handler, options()).await;

        assert_eq!(envelope.acks(), 0);
        assert_eq!(envelope.nacks(), 1);
    }

    #[tokio::test]
    async fn takes_no_action_without_auto_ack() {
        let envelope = Arc::new(FakeEnvelope::text("1", "hi"));
        let handler = handler_fn(|_| async { Ok(Disposition::Nack) });
        let options = SubscribeOverrides::new()
            .auto_ack(false)
            .resolve(&SubscribeOptions::default());

        dispatch("t".to_owned(), envelope.clone(), handler, options).await;

        assert_eq!(envelope.acks(), 0);
        assert_eq!(envelope.nacks(), 0);
    }

    #[tokio::test]
    async fn listener_sees_payload_only_by_default() {
        let envelope = Arc::new(FakeEnvelope::text("1", r#"{"msg":"yay"}"#));
        let handler = handler_fn(|delivery: Delivery| async move {
            assert!(delivery.envelope.is_none());
            assert_eq!(
                delivery.payload,
                Payload::Json(serde_json::json!({"msg": "yay"}))
            );
            Ok(Disposition::Ack)
        });

        dispatch("t".to_owned(), envelope.clone(), handler, options()).await;
        assert_eq!(envelope.acks(), 1);
    }

    #[tokio::test]
    async fn raw_mode_hands_over_the_envelope() {
        let envelope = Arc::new(FakeEnvelope::text("1", "hi"));
        let handler = handler_fn(|delivery: Delivery| async move {
            assert!(delivery.envelope.is_some());
            Ok(Disposition::Ack)
        });
        let options = SubscribeOverrides::new()
            .raw(true)
            .resolve(&SubscribeOptions::default());

        dispatch("t".to_owned(), envelope.clone(), handler, options).await;
        assert_eq!(envelope.acks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_nacks_exactly_once_when_listener_never_settles() {
        let envelope = Arc::new(FakeEnvelope::text("1", "hi"));
        let handler =
            handler_fn(|_| std::future::pending::<Result<Disposition, HandlerError>>());

        let task = tokio::spawn(dispatch(
            "t".to_owned(),
            envelope.clone(),
            handler,
            options(),
        ));

        // default watchdog interval is ack_deadline(10) + grace(20)
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert_eq!(envelope.nacks(), 1);
        assert_eq!(envelope.acks(), 0);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn settlement_during_in_flight_timeout_nack_still_settles_once() {
        // timeout fires at 30s and its nack takes 1s on the wire; the
        // listener settles at 30.5s, mid-nack
        let envelope = Arc::new(FakeEnvelope::slow_nack("1", "hi", Duration::from_secs(1)));
        let handler = handler_fn(|_| async {
            tokio::time::sleep(Duration::from_millis(30_500)).await;
            Ok(Disposition::Ack)
        });

        dispatch("t".to_owned(), envelope.clone(), handler, options()).await;

        assert_eq!(envelope.nacks(), 1);
        assert_eq!(envelope.acks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn late_settlement_after_timeout_does_not_double_fire() {
        let envelope = Arc::new(FakeEnvelope::text("1", "hi"));
        let handler = handler_fn(|_| async {
            tokio::time::sleep(Duration::from_secs(40)).await;
            Ok(Disposition::Ack)
        });

        dispatch("t".to_owned(), envelope.clone(), handler, options()).await;

        assert_eq!(envelope.nacks(), 1);
        assert_eq!(envelope.acks(), 0);
    }
}
