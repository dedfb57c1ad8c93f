//! Placement and decision workflow.

use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog::{CatalogStore, LineRequest, Reservation, ReservationEngine};
use common::{AggregateId, CustomerId};
use domain::{
    Aggregate, DecideOrder, DomainError, LineItem, Order, OrderLedger, OrderStatus, PlaceOrder,
};
use event_store::{EventEnvelope, EventStore};

use crate::error::LifecycleError;
use crate::notifier::{Notification, Notifier, NotifierError};

/// Upper bound on one notification delivery.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

struct Inner<S: EventStore, C: CatalogStore> {
    engine: ReservationEngine<C>,
    ledger: OrderLedger<S>,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
}

/// Places orders and records decisions on them.
///
/// Cheap to clone; clones share the catalog, ledger and notifier.
pub struct LifecycleController<S: EventStore, C: CatalogStore> {
    inner: Arc<Inner<S, C>>,
}

impl<S: EventStore, C: CatalogStore> Clone for LifecycleController<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C> LifecycleController<S, C>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    pub fn new(store: S, catalog: C, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_notify_timeout(store, catalog, notifier, DEFAULT_NOTIFY_TIMEOUT)
    }

    pub fn with_notify_timeout(
        store: S,
        catalog: C,
        notifier: Arc<dyn Notifier>,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine: ReservationEngine::new(catalog),
                ledger: OrderLedger::new(store),
                notifier,
                notify_timeout,
            }),
        }
    }

    pub fn catalog(&self) -> &C {
        self.inner.engine.catalog()
    }

    /// Reserves stock for every line and records a Pending order.
    ///
    /// Runs on its own task so that a caller going away mid-flight cannot
    /// leave stock decremented without either an order or a rollback.
    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn place_order(
        &self,
        customer_id: CustomerId,
        lines: Vec<LineRequest>,
    ) -> Result<Order, LifecycleError> {
        let inner = Arc::clone(&self.inner);
        let started = Instant::now();

        let outcome = tokio::spawn(async move { inner.place(customer_id, lines).await })
            .await
            .map_err(|e| LifecycleError::Aborted(e.to_string()))
            .and_then(|result| result);

        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(order) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(order_id = ?order.id(), total = %order.total(), "order placed");
            }
            Err(e) => {
                metrics::counter!("order_placement_rejected_total", "reason" => e.kind())
                    .increment(1);
                tracing::info!(reason = e.kind(), error = %e, "order placement rejected");
            }
        }

        outcome
    }

    /// Moves a Pending order to Approved or Declined.
    ///
    /// Stock is not returned when an order is declined.
    #[tracing::instrument(skip(self, decided_by))]
    pub async fn set_status(
        &self,
        order_id: AggregateId,
        status: OrderStatus,
        decided_by: Option<String>,
    ) -> Result<Order, LifecycleError> {
        let mut cmd = DecideOrder::new(order_id, status);
        cmd.decided_by = decided_by;

        let order = self.inner.ledger.transition(cmd).await?;

        metrics::counter!("order_transitions_total", "status" => status.as_str()).increment(1);
        tracing::info!(%order_id, %status, "order status changed");

        if let Some(customer_id) = order.customer_id() {
            self.inner
                .dispatch(Notification::status_changed(order_id, customer_id, status));
        }

        Ok(order)
    }

    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, LifecycleError> {
        Ok(self.inner.ledger.get(order_id).await?)
    }

    /// A customer's orders, newest first.
    pub async fn list_orders(&self, customer_id: CustomerId) -> Result<Vec<Order>, LifecycleError> {
        Ok(self.inner.ledger.list_for_customer(customer_id).await?)
    }

    /// Every order, newest first.
    pub async fn list_all_orders(&self) -> Result<Vec<Order>, LifecycleError> {
        Ok(self.inner.ledger.list_all().await?)
    }

    /// Recorded events for one order, oldest first.
    pub async fn order_history(
        &self,
        order_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>, LifecycleError> {
        Ok(self.inner.ledger.history(order_id).await?)
    }
}

impl<S, C> Inner<S, C>
where
    S: EventStore + 'static,
    C: CatalogStore + 'static,
{
    async fn place(
        self: Arc<Self>,
        customer_id: CustomerId,
        lines: Vec<LineRequest>,
    ) -> Result<Order, LifecycleError> {
        let reservation = self.engine.reserve(&lines).await?;
        let cmd = PlaceOrder::new(customer_id, line_items(&reservation));
        let order_id = cmd.order_id;

        let order = match self.ledger.create(cmd).await {
            Ok(order) => order,
            Err(e) => self.settle_failed_create(order_id, &reservation, e).await?,
        };

        self.dispatch(Notification::order_placed(
            order_id,
            customer_id,
            order.total(),
            order.lines().len(),
        ));

        Ok(order)
    }

    /// Decides what a failed `create` means for the reserved stock.
    ///
    /// A storage error may arrive after the append committed, so the ledger is
    /// consulted first: a recorded order keeps its stock, a missing one gets it
    /// back. If the ledger cannot be read either, the stock stays reserved.
    async fn settle_failed_create(
        &self,
        order_id: AggregateId,
        reservation: &Reservation,
        err: DomainError,
    ) -> Result<Order, LifecycleError> {
        if matches!(err, DomainError::EventStore(_)) {
            match self.ledger.get(order_id).await {
                Ok(Some(order)) => {
                    tracing::warn!(%order_id, error = %err, "order was recorded despite a storage error");
                    return Ok(order);
                }
                Ok(None) => {}
                Err(check) => {
                    tracing::error!(
                        %order_id,
                        error = %err,
                        check_error = %check,
                        "order record outcome unknown, keeping stock reserved"
                    );
                    return Err(err.into());
                }
            }
        }

        tracing::error!(%order_id, error = %err, "order record failed, releasing stock");
        self.engine.release(reservation).await;
        Err(err.into())
    }

    /// Sends `notification` in the background. Failures are logged and counted.
    fn dispatch(&self, notification: Notification) {
        let notifier = Arc::clone(&self.notifier);
        let limit = self.notify_timeout;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(limit, notifier.notify(&notification)).await {
                Ok(result) => result,
                Err(_) => Err(NotifierError::Timeout(limit)),
            };

            match result {
                Ok(()) => {
                    metrics::counter!("notifications_sent_total", "kind" => notification.kind())
                        .increment(1);
                }
                Err(e) => {
                    metrics::counter!("notifications_failed_total", "kind" => notification.kind())
                        .increment(1);
                    tracing::warn!(
                        order_id = %notification.order_id,
                        kind = notification.kind(),
                        idempotency_key = %notification.idempotency_key,
                        error = %e,
                        "notification failed"
                    );
                }
            }
        });
    }
}

fn line_items(reservation: &Reservation) -> Vec<LineItem> {
    reservation
        .lines()
        .iter()
        .map(|line| {
            LineItem::new(
                line.product_id.clone(),
                line.product_name.clone(),
                line.quantity,
                line.unit_price,
            )
        })
        .collect()
}
