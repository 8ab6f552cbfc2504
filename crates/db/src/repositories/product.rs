use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;

use shopmate_core::domain::{CatalogStatistics, NewProduct, Product};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let price_raw = row.get::<String, _>("price");
    let price = price_raw
        .parse::<Decimal>()
        .map_err(|error| RepositoryError::Decode(format!("bad price `{price_raw}`: {error}")))?;

    Ok(Product {
        id: row.get::<i64, _>("id"),
        name: row.get::<String, _>("name"),
        price,
        category: row.get::<String, _>("category"),
        in_stock: row.get::<i64, _>("in_stock") != 0,
    })
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let rows = match category {
            None => {
                sqlx::query(
                    "SELECT id, name, price, category, in_stock FROM products ORDER BY id ASC",
                )
                .fetch_all(&self.pool)
                .await?
            }
            Some(category) => {
                sqlx::query(
                    "SELECT id, name, price, category, in_stock FROM products \
                     WHERE lower(category) = lower(?) ORDER BY id ASC",
                )
                .bind(category.trim())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter().map(row_to_product).collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Product, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, price, category, in_stock FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_product(&row),
            None => Err(RepositoryError::ProductNotFound(id)),
        }
    }

    async fn insert(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let name = product.name.trim();
        let category = product.category.trim();
        if name.is_empty() {
            return Err(RepositoryError::InvalidArgument(
                "product name must be non-empty".to_string(),
            ));
        }
        if category.is_empty() {
            return Err(RepositoryError::InvalidArgument(
                "product category must be non-empty".to_string(),
            ));
        }
        if product.price < Decimal::ZERO {
            return Err(RepositoryError::InvalidArgument(
                "product price must be >= 0".to_string(),
            ));
        }

        let inserted = sqlx::query(
            "INSERT INTO products (name, price, category, in_stock) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(product.price.to_string())
        .bind(category)
        .bind(i64::from(product.in_stock))
        .execute(&self.pool)
        .await?;

        self.find_by_id(inserted.last_insert_rowid()).await
    }

    /// Count and average price over the whole catalog. The average is
    /// computed in decimal arithmetic, rounded to two places.
    async fn statistics(&self) -> Result<CatalogStatistics, RepositoryError> {
        let rows = sqlx::query("SELECT price FROM products").fetch_all(&self.pool).await?;

        let count = rows.len() as i64;
        if count == 0 {
            return Ok(CatalogStatistics { count: 0, avg_price: Decimal::ZERO });
        }

        let mut total = Decimal::ZERO;
        for row in &rows {
            let price_raw = row.get::<String, _>("price");
            let price = price_raw.parse::<Decimal>().map_err(|error| {
                RepositoryError::Decode(format!("bad price `{price_raw}`: {error}"))
            })?;
            total += price;
        }

        let avg_price = (total / Decimal::from(count)).round_dp(2).normalize();
        Ok(CatalogStatistics { count, avg_price })
    }
}
