//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

pub use common::{CustomerId, Money, ProductId};

/// One line of a placed order.
///
/// `unit_price` is the catalog price at the moment stock was reserved and
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItem {
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// `None` when `unit_price * quantity` does not fit in cents.
    pub fn checked_subtotal(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtotal_multiplies_snapshot_price() {
        let line = LineItem::new("SKU-1", "Widget", 3, Money::from_cents(1250));
        assert_eq!(line.subtotal(), Money::from_cents(3750));
    }

    #[test]
    fn serializes_price_as_cents() {
        let line = LineItem::new("SKU-1", "Widget", 2, Money::from_cents(999));
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["unit_price"], 999);
        assert_eq!(json["product_id"], "SKU-1");
    }
}
