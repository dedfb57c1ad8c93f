//! Order domain events.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{CustomerId, LineItem, Money};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Stock was reserved and the order recorded as Pending.
    OrderPlaced(OrderPlacedData),

    OrderApproved(OrderDecisionData),

    OrderDeclined(OrderDecisionData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderApproved(_) => "OrderApproved",
            OrderEvent::OrderDeclined(_) => "OrderDeclined",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub customer_id: CustomerId,
    pub lines: Vec<LineItem>,
    /// Sum of line subtotals, fixed at placement.
    pub total: Money,
    pub placed_at: DateTime<Utc>,
}

/// Payload shared by the two decision events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDecisionData {
    pub decided_at: DateTime<Utc>,
    /// Who made the call, when the caller said.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
}

impl OrderEvent {
    pub fn order_placed(
        order_id: AggregateId,
        customer_id: CustomerId,
        lines: Vec<LineItem>,
        placed_at: DateTime<Utc>,
    ) -> Self {
        let total = lines.iter().map(LineItem::subtotal).sum();
        OrderEvent::OrderPlaced(OrderPlacedData {
            order_id,
            customer_id,
            lines,
            total,
            placed_at,
        })
    }

    pub fn order_approved(decided_by: Option<String>) -> Self {
        OrderEvent::OrderApproved(OrderDecisionData {
            decided_at: Utc::now(),
            decided_by,
        })
    }

    pub fn order_declined(decided_by: Option<String>) -> Self {
        OrderEvent::OrderDeclined(OrderDecisionData {
            decided_at: Utc::now(),
            decided_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placed_event_carries_total() {
        let event = OrderEvent::order_placed(
            AggregateId::new(),
            CustomerId::new(),
            vec![
                LineItem::new("A", "Apple", 3, Money::from_cents(50)),
                LineItem::new("B", "Banana", 1, Money::from_cents(25)),
            ],
            Utc::now(),
        );

        match event {
            OrderEvent::OrderPlaced(data) => assert_eq!(data.total, Money::from_cents(175)),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_event_types() {
        assert_eq!(OrderEvent::order_approved(None).event_type(), "OrderApproved");
        assert_eq!(
            OrderEvent::order_declined(Some("ops".into())).event_type(),
            "OrderDeclined"
        );
    }

    #[test]
    fn test_tagged_serialization() {
        let event = OrderEvent::order_declined(Some("ops".into()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "OrderDeclined");
        assert_eq!(json["data"]["decided_by"], "ops");

        let back: OrderEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "OrderDeclined");
    }
}
