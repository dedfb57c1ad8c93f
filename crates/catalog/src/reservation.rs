//! All-or-nothing stock reservation over a [`CatalogStore`].

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::{CatalogStore, Product, error::ReservationError};

/// One requested line: a product and how many units of it.
///
/// `quantity` is signed so that bad input reaches validation instead of
/// failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A line whose stock has been taken, with the price in force at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl ReservedLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Stock held for one order, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    lines: Vec<ReservedLine>,
}

impl Reservation {
    pub fn lines(&self) -> &[ReservedLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<ReservedLine> {
        self.lines
    }

    /// Sum of `unit_price * quantity` over every line.
    pub fn total(&self) -> Money {
        self.lines.iter().map(ReservedLine::subtotal).sum()
    }
}

/// Reserves stock for a whole request or none of it.
///
/// Every product is looked up before any stock moves. Decrements then run in
/// request order; if one fails, the earlier ones are restored in reverse.
pub struct ReservationEngine<C: CatalogStore> {
    catalog: C,
}

impl<C: CatalogStore> ReservationEngine<C> {
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    #[tracing::instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn reserve(&self, lines: &[LineRequest]) -> Result<Reservation, ReservationError> {
        let quantities = validate(lines)?;

        let mut products: Vec<Product> = Vec::with_capacity(lines.len());
        for line in lines {
            products.push(self.catalog.get_product(&line.product_id).await?);
        }
        priced_total(&products, &quantities)?;

        let mut taken: Vec<ReservedLine> = Vec::with_capacity(lines.len());
        for (product, quantity) in products.into_iter().zip(quantities) {
            match self.catalog.try_decrement(&product.id, quantity).await {
                Ok(remaining) => {
                    tracing::debug!(product_id = %product.id, quantity, remaining, "stock decremented");
                    taken.push(ReservedLine {
                        product_id: product.id,
                        product_name: product.name,
                        quantity,
                        unit_price: product.price,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        product_id = %product.id,
                        quantity,
                        error = %e,
                        "stock decrement failed, rolling back reservation"
                    );
                    self.compensate(&taken).await;
                    return Err(e.into());
                }
            }
        }

        Ok(Reservation { lines: taken })
    }

    /// Returns every line of `reservation` to stock, last line first.
    #[tracing::instrument(skip(self, reservation), fields(line_count = reservation.lines.len()))]
    pub async fn release(&self, reservation: &Reservation) {
        self.compensate(&reservation.lines).await;
    }

    async fn compensate(&self, taken: &[ReservedLine]) {
        if taken.is_empty() {
            return;
        }
        metrics::counter!("stock_compensations_total").increment(1);

        for line in taken.iter().rev() {
            match self.catalog.restore(&line.product_id, line.quantity).await {
                Ok(stock) => {
                    tracing::info!(product_id = %line.product_id, quantity = line.quantity, stock, "stock restored");
                }
                Err(e) => {
                    metrics::counter!("stock_compensation_failures_total").increment(1);
                    tracing::error!(
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        error = %e,
                        "failed to restore stock"
                    );
                }
            }
        }
    }
}

fn validate(lines: &[LineRequest]) -> Result<Vec<u32>, ReservationError> {
    if lines.is_empty() {
        return Err(ReservationError::InvalidRequest(
            "order must contain at least one line".to_string(),
        ));
    }

    lines
        .iter()
        .map(|line| {
            if line.quantity < 1 {
                return Err(ReservationError::InvalidRequest(format!(
                    "quantity for {} must be at least 1, got {}",
                    line.product_id, line.quantity
                )));
            }
            u32::try_from(line.quantity).map_err(|_| {
                ReservationError::InvalidRequest(format!(
                    "quantity for {} is too large: {}",
                    line.product_id, line.quantity
                ))
            })
        })
        .collect()
}

/// Total at the looked-up prices. Rejected before any stock moves if it does
/// not fit in cents.
fn priced_total(products: &[Product], quantities: &[u32]) -> Result<Money, ReservationError> {
    products
        .iter()
        .zip(quantities)
        .try_fold(Money::zero(), |total, (product, &quantity)| {
            product
                .price
                .checked_multiply(quantity)
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or_else(|| {
                    ReservationError::InvalidRequest(format!(
                        "order total overflows at {} x {}",
                        product.id, quantity
                    ))
                })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_and_non_positive() {
        assert!(matches!(
            validate(&[]),
            Err(ReservationError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate(&[LineRequest::new("P1", 0)]),
            Err(ReservationError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate(&[LineRequest::new("P1", 2), LineRequest::new("P2", -1)]),
            Err(ReservationError::InvalidRequest(_))
        ));
        assert!(matches!(
            validate(&[LineRequest::new("P1", i64::from(u32::MAX) + 1)]),
            Err(ReservationError::InvalidRequest(_))
        ));
        assert_eq!(
            validate(&[LineRequest::new("P1", 2), LineRequest::new("P2", 1)]).unwrap(),
            [2, 1]
        );
    }

    #[test]
    fn priced_total_rejects_overflow() {
        let products = [
            Product::new("P1", "Widget", Money::from_cents(1000), 5),
            Product::new("P2", "Ingot", Money::from_cents(i64::MAX / 2), 10),
        ];

        assert_eq!(
            priced_total(&products, &[2, 1]).unwrap(),
            Money::from_cents(2000 + i64::MAX / 2)
        );
        assert!(matches!(
            priced_total(&products, &[1, 3]),
            Err(ReservationError::InvalidRequest(_))
        ));
        assert!(matches!(
            priced_total(&products, &[1, 2]),
            Err(ReservationError::InvalidRequest(_))
        ));
    }

    #[test]
    fn total_sums_subtotals() {
        let reservation = Reservation {
            lines: vec![
                ReservedLine {
                    product_id: ProductId::new("P1"),
                    product_name: "Widget".into(),
                    quantity: 2,
                    unit_price: Money::from_cents(1000),
                },
                ReservedLine {
                    product_id: ProductId::new("P2"),
                    product_name: "Gadget".into(),
                    quantity: 1,
                    unit_price: Money::from_cents(2500),
                },
            ],
        };
        assert_eq!(reservation.total(), Money::from_cents(4500));
    }
}
