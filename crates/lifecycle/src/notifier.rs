//! Customer notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{AggregateId, CustomerId, Money};
use domain::OrderStatus;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};

/// What happened to the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum NotificationPayload {
    OrderPlaced { total: Money, line_count: usize },
    OrderStatusChanged { status: OrderStatus },
}

/// A message for the customer who owns an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub order_id: AggregateId,
    pub recipient: CustomerId,
    pub payload: NotificationPayload,
    /// Stable per order and event, so a transport can drop duplicates.
    pub idempotency_key: String,
}

impl Notification {
    pub fn order_placed(
        order_id: AggregateId,
        recipient: CustomerId,
        total: Money,
        line_count: usize,
    ) -> Self {
        Self {
            order_id,
            recipient,
            payload: NotificationPayload::OrderPlaced { total, line_count },
            idempotency_key: format!("{order_id}:placed"),
        }
    }

    pub fn status_changed(order_id: AggregateId, recipient: CustomerId, status: OrderStatus) -> Self {
        Self {
            order_id,
            recipient,
            payload: NotificationPayload::OrderStatusChanged { status },
            idempotency_key: format!("{order_id}:{}", status.as_str().to_ascii_lowercase()),
        }
    }

    /// Short name for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self.payload {
            NotificationPayload::OrderPlaced { .. } => "order_placed",
            NotificationPayload::OrderStatusChanged { .. } => "order_status_changed",
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivers notifications. Callers never wait on the outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError>;
}

/// Writes each notification to the log. Used when no transport is configured.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        tracing::info!(
            order_id = %notification.order_id,
            recipient = %notification.recipient,
            kind = notification.kind(),
            idempotency_key = %notification.idempotency_key,
            "notification dispatched"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    delivered: Vec<Notification>,
    attempts: usize,
    fail: bool,
    delay: Option<Duration>,
}

/// Records notifications in memory for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<Mutex<InMemoryNotifierState>>,
    attempted: Arc<Notify>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail.
    pub async fn set_fail(&self, fail: bool) {
        self.state.lock().await.fail = fail;
    }

    /// Holds each delivery for `delay` before completing it.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.delay = delay;
    }

    pub async fn delivered(&self) -> Vec<Notification> {
        self.state.lock().await.delivered.clone()
    }

    pub async fn attempts(&self) -> usize {
        self.state.lock().await.attempts
    }

    /// Waits until at least `count` deliveries have been attempted.
    ///
    /// Returns false if that does not happen within `within`.
    pub async fn wait_for_attempts(&self, count: usize, within: Duration) -> bool {
        tokio::time::timeout(within, async {
            loop {
                let notified = self.attempted.notified();
                if self.state.lock().await.attempts >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifierError> {
        let (fail, delay) = {
            let state = self.state.lock().await;
            (state.fail, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let mut state = self.state.lock().await;
            state.attempts += 1;
            if fail {
                Err(NotifierError::Unavailable("mail relay refused".to_string()))
            } else {
                state.delivered.push(notification.clone());
                Ok(())
            }
        };
        self.attempted.notify_waiters();
        result
    }
}
