use async_trait::async_trait;
use common::{Money, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    CatalogStore, Product,
    error::{CatalogError, Result},
};

/// PostgreSQL-backed catalog.
///
/// Decrements are a single conditional `UPDATE`, so the row lock Postgres takes
/// for the update is the per-product critical section.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts or replaces a product record.
    #[tracing::instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn upsert(&self, product: Product) -> Result<()> {
        product.validate()?;
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, price_cents = EXCLUDED.price_cents, stock = EXCLUDED.stock
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(i64::from(product.stock))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Changes a product's list price.
    pub async fn set_price(&self, id: &ProductId, price: Money) -> Result<()> {
        if price.is_negative() {
            return Err(CatalogError::InvalidProduct(format!(
                "{id} cannot have a negative price"
            )));
        }
        let updated = sqlx::query("UPDATE products SET price_cents = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(price.cents())
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(CatalogError::NotFound(id.clone()));
        }
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let id: String = row.try_get("id")?;
        let stock = stock_from_db(row.try_get("stock")?, &id)?;
        Ok(Product {
            id: ProductId::new(id),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock,
        })
    }
}

fn stock_from_db(stock: i64, id: &str) -> Result<u32> {
    u32::try_from(stock)
        .map_err(|_| CatalogError::InvalidProduct(format!("{id} has out-of-range stock {stock}")))
}

#[async_trait]
impl CatalogStore for PostgresCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Product> {
        let row = sqlx::query("SELECT id, name, price_cents, stock FROM products WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

        Self::row_to_product(row)
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT id, name, price_cents, stock FROM products ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn try_decrement(&self, id: &ProductId, quantity: u32) -> Result<u32> {
        let remaining: Option<i64> = sqlx::query_scalar(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2 RETURNING stock",
        )
        .bind(id.as_str())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(remaining) = remaining {
            return stock_from_db(remaining, id.as_str());
        }

        // Nothing updated: either the product is missing or it is short.
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match available {
            None => Err(CatalogError::NotFound(id.clone())),
            Some(available) => Err(CatalogError::InsufficientStock {
                product_id: id.clone(),
                requested: quantity,
                available: stock_from_db(available, id.as_str())?,
            }),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn restore(&self, id: &ProductId, quantity: u32) -> Result<u32> {
        let remaining: Option<i64> =
            sqlx::query_scalar("UPDATE products SET stock = stock + $2 WHERE id = $1 RETURNING stock")
                .bind(id.as_str())
                .bind(i64::from(quantity))
                .fetch_optional(&self.pool)
                .await?;

        match remaining {
            Some(stock) => stock_from_db(stock, id.as_str()),
            None => Err(CatalogError::NotFound(id.clone())),
        }
    }
}
