//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    CustomerId, LineItem, Money, OrderError, OrderEvent, OrderStatus,
    events::{OrderDecisionData, OrderPlacedData},
};

/// Order aggregate root.
///
/// Created once by `OrderPlaced` with its lines and total frozen. The only
/// later change is a single decision moving it out of Pending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    customer_id: Option<CustomerId>,

    status: OrderStatus,

    lines: Vec<LineItem>,

    total: Money,

    created_at: Option<DateTime<Utc>>,

    decided_at: Option<DateTime<Utc>>,

    decided_by: Option<String>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::OrderApproved(data) => self.apply_decision(OrderStatus::Approved, data),
            OrderEvent::OrderDeclined(data) => self.apply_decision(OrderStatus::Declined, data),
        }
    }
}

// Query methods
impl Order {
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Total fixed at placement from the snapshotted unit prices.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    pub fn decided_by(&self) -> Option<&str> {
        self.decided_by.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Command methods (return events)
impl Order {
    /// Records a new Pending order for already-reserved lines.
    pub fn place(
        &self,
        order_id: AggregateId,
        customer_id: CustomerId,
        lines: Vec<LineItem>,
        placed_at: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyCreated);
        }

        if lines.is_empty() {
            return Err(OrderError::NoLines);
        }

        if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id.to_string(),
                quantity: line.quantity,
            });
        }

        let total = lines
            .iter()
            .try_fold(Money::zero(), |total, line| {
                line.checked_subtotal()?.checked_add(total)
            });
        if total.is_none() {
            return Err(OrderError::TotalOverflow);
        }

        Ok(vec![OrderEvent::order_placed(
            order_id,
            customer_id,
            lines,
            placed_at,
        )])
    }

    /// Moves a Pending order to `target`.
    ///
    /// Every other edge, including a repeat of the current status, is an
    /// `InvalidTransition`.
    pub fn decide(
        &self,
        target: OrderStatus,
        decided_by: Option<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let Some(order_id) = self.id else {
            return Err(OrderError::NotPlaced);
        };

        if !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition {
                order_id,
                from: self.status,
                to: target,
            });
        }

        // Only Approved and Declined are reachable targets.
        let event = if target == OrderStatus::Approved {
            OrderEvent::order_approved(decided_by)
        } else {
            OrderEvent::order_declined(decided_by)
        };
        Ok(vec![event])
    }
}

// Event application
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.customer_id = Some(data.customer_id);
        self.lines = data.lines;
        self.total = data.total;
        self.created_at = Some(data.placed_at);
        self.status = OrderStatus::Pending;
    }

    fn apply_decision(&mut self, status: OrderStatus, data: OrderDecisionData) {
        self.status = status;
        self.decided_at = Some(data.decided_at);
        self.decided_by = data.decided_by;
    }
}
