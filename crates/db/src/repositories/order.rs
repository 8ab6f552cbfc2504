use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::Row;

use shopmate_core::domain::Order;

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(&self, product_id: i64, quantity: i64) -> Result<Order, RepositoryError> {
        if quantity <= 0 {
            return Err(RepositoryError::InvalidArgument("quantity must be > 0".to_string()));
        }

        let product_row = sqlx::query(
            "SELECT id, name, price, in_stock FROM products WHERE id = ?",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::ProductNotFound(product_id))?;

        if product_row.get::<i64, _>("in_stock") == 0 {
            return Err(RepositoryError::OutOfStock(product_id));
        }

        let price_raw = product_row.get::<String, _>("price");
        let unit_price = price_raw.parse::<Decimal>().map_err(|error| {
            RepositoryError::Decode(format!("bad price `{price_raw}`: {error}"))
        })?;
        let total_price = unit_price * Decimal::from(quantity);

        let inserted = sqlx::query(
            "INSERT INTO orders (product_id, quantity, total_price) VALUES (?, ?, ?)",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(total_price.to_string())
        .execute(&self.pool)
        .await?;

        let order_row = sqlx::query(
            "SELECT id, quantity, created_at FROM orders WHERE id = ?",
        )
        .bind(inserted.last_insert_rowid())
        .fetch_one(&self.pool)
        .await?;

        Ok(Order {
            id: order_row.get::<i64, _>("id"),
            product_id,
            product_name: product_row.get::<String, _>("name"),
            unit_price,
            quantity: order_row.get::<i64, _>("quantity"),
            total_price,
            created_at: order_row.get::<String, _>("created_at"),
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use shopmate_core::domain::NewProduct;

    use super::SqlOrderRepository;
    use crate::repositories::{
        OrderRepository, ProductRepository, RepositoryError, SqlProductRepository,
    };
    use crate::{connect_with_settings, migrations, DbPool};

    async fn pool_with_schema() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    async fn seed_product(pool: &DbPool, in_stock: bool) -> i64 {
        let products = SqlProductRepository::new(pool.clone());
        let created = products
            .insert(NewProduct {
                name: "Наушники".to_string(),
                price: Decimal::new(7_000, 0),
                category: "Электроника".to_string(),
                in_stock,
            })
            .await
            .expect("insert product");
        created.id
    }

    #[tokio::test]
    async fn order_totals_unit_price_times_quantity() {
        let pool = pool_with_schema().await;
        let product_id = seed_product(&pool, true).await;

        let orders = SqlOrderRepository::new(pool);
        let order = orders.create(product_id, 2).await.expect("create order");

        assert_eq!(order.product_id, product_id);
        assert_eq!(order.product_name, "Наушники");
        assert_eq!(order.quantity, 2);
        assert_eq!(order.total_price, Decimal::new(14_000, 0));
        assert!(!order.created_at.is_empty());
    }

    #[tokio::test]
    async fn out_of_stock_product_cannot_be_ordered() {
        let pool = pool_with_schema().await;
        let product_id = seed_product(&pool, false).await;

        let orders = SqlOrderRepository::new(pool);
        let result = orders.create(product_id, 1).await;
        assert!(matches!(result, Err(RepositoryError::OutOfStock(id)) if id == product_id));
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let pool = pool_with_schema().await;
        let product_id = seed_product(&pool, true).await;

        let orders = SqlOrderRepository::new(pool);
        let result = orders.create(product_id, 0).await;
        assert!(matches!(result, Err(RepositoryError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn unknown_product_reports_not_found() {
        let pool = pool_with_schema().await;
        let orders = SqlOrderRepository::new(pool);
        let result = orders.create(999, 1).await;
        assert!(matches!(result, Err(RepositoryError::ProductNotFound(999))));
    }
}
