//! Order ledger: durable record of placed orders and their decisions.

use common::AggregateId;
use event_store::{EventEnvelope, EventStore};

use crate::aggregate::Aggregate;
use crate::command::CommandHandler;
use crate::error::DomainError;

use super::{CustomerId, DecideOrder, Order, OrderError, PlaceOrder};

/// How many times a transition is re-decided after losing a write race.
const MAX_TRANSITION_ATTEMPTS: usize = 3;

impl From<OrderError> for DomainError {
    fn from(e: OrderError) -> Self {
        DomainError::Order(e)
    }
}

/// Stores orders as event streams in an [`EventStore`].
///
/// Transitions on one order are serialized by the store's version check: of
/// two concurrent decisions on a Pending order, one appends and the other is
/// re-decided against the new state, which is terminal, and fails with
/// `InvalidTransition`.
pub struct OrderLedger<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Records a Pending order. Its total is computed from the line prices.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, customer_id = %cmd.customer_id))]
    pub async fn create(&self, cmd: PlaceOrder) -> Result<Order, DomainError> {
        let PlaceOrder {
            order_id,
            customer_id,
            lines,
            placed_at,
        } = cmd;

        let result = self
            .handler
            .execute(order_id, |order| {
                order.place(order_id, customer_id, lines, placed_at)
            })
            .await;

        match result {
            Ok(result) => Ok(result.aggregate),
            Err(e) if e.is_conflict() => Err(DomainError::Order(OrderError::AlreadyCreated)),
            Err(e) => Err(e),
        }
    }

    /// Moves a Pending order to Approved or Declined.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id, target = %cmd.target))]
    pub async fn transition(&self, cmd: DecideOrder) -> Result<Order, DomainError> {
        let mut attempt = 1;
        loop {
            let decided_by = cmd.decided_by.clone();
            let result = self
                .handler
                .execute(cmd.order_id, |order| order.decide(cmd.target, decided_by))
                .await;

            match result {
                Ok(result) => return Ok(result.aggregate),
                Err(e) if e.is_conflict() && attempt < MAX_TRANSITION_ATTEMPTS => {
                    metrics::counter!("order_transition_conflicts_total").increment(1);
                    tracing::debug!(attempt, "transition lost a write race, re-deciding");
                    attempt += 1;
                }
                Err(DomainError::Order(OrderError::NotPlaced)) => {
                    return Err(DomainError::AggregateNotFound {
                        aggregate_type: Order::aggregate_type(),
                        aggregate_id: cmd.order_id.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn get(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    /// A customer's orders, newest first.
    pub async fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>, DomainError> {
        let mut orders = self.list_all().await?;
        orders.retain(|order| order.customer_id() == Some(customer_id));
        Ok(orders)
    }

    /// Every order, newest first. Orders placed at the same instant come out
    /// in reverse placement order.
    pub async fn list_all(&self) -> Result<Vec<Order>, DomainError> {
        let mut orders = self.handler.load_all().await?;
        orders.reverse();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    /// The order's event stream, oldest first. Empty for unknown ids.
    pub async fn history(&self, order_id: AggregateId) -> Result<Vec<EventEnvelope>, DomainError> {
        Ok(self
            .handler
            .store()
            .get_events_for_aggregate(order_id)
            .await?)
    }
}
