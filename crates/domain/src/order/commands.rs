//! Order commands.

use chrono::{DateTime, Utc};
use common::AggregateId;

use super::{CustomerId, LineItem, OrderStatus};

/// Record a new order for lines whose stock is already reserved.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: AggregateId,
    pub customer_id: CustomerId,
    pub lines: Vec<LineItem>,
    pub placed_at: DateTime<Utc>,
}

impl PlaceOrder {
    /// Creates a command with a fresh order id, stamped now.
    pub fn new(customer_id: CustomerId, lines: Vec<LineItem>) -> Self {
        Self {
            order_id: AggregateId::new(),
            customer_id,
            lines,
            placed_at: Utc::now(),
        }
    }

    pub fn with_order_id(mut self, order_id: AggregateId) -> Self {
        self.order_id = order_id;
        self
    }
}

/// Move a Pending order to Approved or Declined.
#[derive(Debug, Clone)]
pub struct DecideOrder {
    pub order_id: AggregateId,
    pub target: OrderStatus,
    pub decided_by: Option<String>,
}

impl DecideOrder {
    pub fn new(order_id: AggregateId, target: OrderStatus) -> Self {
        Self {
            order_id,
            target,
            decided_by: None,
        }
    }

    pub fn approve(order_id: AggregateId) -> Self {
        Self::new(order_id, OrderStatus::Approved)
    }

    pub fn decline(order_id: AggregateId) -> Self {
        Self::new(order_id, OrderStatus::Declined)
    }

    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.decided_by = Some(actor.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    #[test]
    fn test_place_order_targets_its_order_id() {
        let order_id = AggregateId::new();
        let cmd = PlaceOrder::new(
            CustomerId::new(),
            vec![LineItem::new("SKU-1", "Widget", 1, Money::from_cents(100))],
        )
        .with_order_id(order_id);

        assert_eq!(cmd.order_id, order_id);
    }

    #[test]
    fn test_decide_order_builders() {
        let order_id = AggregateId::new();

        let cmd = DecideOrder::approve(order_id).by("admin@shop");
        assert_eq!(cmd.target, OrderStatus::Approved);
        assert_eq!(cmd.decided_by.as_deref(), Some("admin@shop"));
        assert_eq!(cmd.order_id, order_id);

        assert_eq!(DecideOrder::decline(order_id).target, OrderStatus::Declined);
    }
}
