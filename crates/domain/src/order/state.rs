//! Order status machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Where an order stands.
///
/// ```text
/// Pending ──┬──► Approved
///           └──► Declined
/// ```
///
/// Approved and Declined are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Approved,
    Declined,
}

impl OrderStatus {
    /// Returns true if `self -> target` is an allowed edge.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (OrderStatus::Pending, OrderStatus::Approved)
                | (OrderStatus::Pending, OrderStatus::Declined)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Approved | OrderStatus::Declined)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Approved => "Approved",
            OrderStatus::Declined => "Declined",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "declined" => Ok(OrderStatus::Declined),
            _ => Err(OrderError::UnknownStatus(s.to_string())),
        }
    }
}
