//! Deterministic demo dataset for first-run and `shopmate seed`.

use rust_decimal::Decimal;

use shopmate_core::domain::NewProduct;

use crate::repositories::{ProductRepository, RepositoryError, SqlProductRepository};
use crate::DbPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub already_present: bool,
}

fn default_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Ноутбук".to_string(),
            price: Decimal::new(50_000, 0),
            category: "Электроника".to_string(),
            in_stock: true,
        },
        NewProduct {
            name: "Наушники".to_string(),
            price: Decimal::new(7_000, 0),
            category: "Электроника".to_string(),
            in_stock: true,
        },
        NewProduct {
            name: "Кофе".to_string(),
            price: Decimal::new(1_200, 0),
            category: "Продукты".to_string(),
            in_stock: false,
        },
    ]
}

/// Seeds the demo catalog if the products table is empty. Idempotent:
/// a non-empty catalog is left untouched.
pub async fn seed_if_empty(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    let products = SqlProductRepository::new(pool.clone());
    if !products.list(None).await?.is_empty() {
        return Ok(SeedSummary { inserted: 0, already_present: true });
    }

    let defaults = default_products();
    let inserted = defaults.len();
    for product in defaults {
        products.insert(product).await?;
    }
    Ok(SeedSummary { inserted, already_present: false })
}
