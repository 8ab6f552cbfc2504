use async_trait::async_trait;
use thiserror::Error;

use shopmate_core::domain::{CatalogStatistics, NewProduct, Order, Product};

pub mod order;
pub mod product;

pub use order::SqlOrderRepository;
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("product with id={0} not found")]
    ProductNotFound(i64),
    #[error("product id={0} is out of stock")]
    OutOfStock(i64),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError>;
    async fn find_by_id(&self, id: i64) -> Result<Product, RepositoryError>;
    async fn insert(&self, product: NewProduct) -> Result<Product, RepositoryError>;
    async fn statistics(&self) -> Result<CatalogStatistics, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, product_id: i64, quantity: i64) -> Result<Order, RepositoryError>;
}
