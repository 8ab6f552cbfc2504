use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use shopmate_core::domain::NewProduct;
use shopmate_core::wire::{codes, RequestFrame, ResponseFrame, WireError};
use shopmate_db::repositories::{
    OrderRepository, ProductRepository, RepositoryError, SqlOrderRepository, SqlProductRepository,
};
use shopmate_db::DbPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Products,
    Orders,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }
}

pub struct ToolService {
    role: Role,
    products: SqlProductRepository,
    orders: SqlOrderRepository,
}

#[derive(Debug, Deserialize)]
struct ListProductsInput {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetProductInput {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct AddProductInput {
    name: String,
    /// Accepted as a JSON number or a decimal string.
    price: Value,
    category: String,
    #[serde(default = "default_in_stock")]
    in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CreateOrderInput {
    product_id: i64,
    quantity: i64,
}

impl ToolService {
    pub fn new(role: Role, pool: DbPool) -> Self {
        Self {
            role,
            products: SqlProductRepository::new(pool.clone()),
            orders: SqlOrderRepository::new(pool),
        }
    }

    pub async fn dispatch(&self, method: &str, args: Value) -> Result<Value, WireError> {
        // A missing args field arrives as null; treat it like `{}`.
        let args = if args.is_null() { json!({}) } else { args };

        match (self.role, method) {
            (Role::Products, "list_products") => {
                let input: ListProductsInput = parse_args(args)?;
                let products =
                    self.products.list(input.category.as_deref()).await.map_err(to_wire)?;
                Ok(serde_json::to_value(products).map_err(encode_failure)?)
            }
            (Role::Products, "get_product") => {
                let input: GetProductInput = parse_args(args)?;
                let product = self.products.find_by_id(input.id).await.map_err(to_wire)?;
                Ok(serde_json::to_value(product).map_err(encode_failure)?)
            }
            (Role::Products, "add_product") => {
                let input: AddProductInput = parse_args(args)?;
                let price = decimal_value(&input.price).ok_or_else(|| WireError {
                    code: codes::INVALID_ARGUMENT.to_string(),
                    message: format!("price is not a decimal value: {}", input.price),
                })?;
                let created = self
                    .products
                    .insert(NewProduct {
                        name: input.name,
                        price,
                        category: input.category,
                        in_stock: input.in_stock,
                    })
                    .await
                    .map_err(to_wire)?;
                Ok(serde_json::to_value(created).map_err(encode_failure)?)
            }
            (Role::Products, "statistics") => {
                let stats = self.products.statistics().await.map_err(to_wire)?;
                Ok(serde_json::to_value(stats).map_err(encode_failure)?)
            }
            (Role::Orders, "create_order") => {
                let input: CreateOrderInput = parse_args(args)?;
                let order =
                    self.orders.create(input.product_id, input.quantity).await.map_err(to_wire)?;
                Ok(serde_json::to_value(order).map_err(encode_failure)?)
            }
            (role, unknown) => Err(WireError {
                code: codes::UNKNOWN_METHOD.to_string(),
                message: format!("method `{unknown}` is not served by the {} role", role.as_str()),
            }),
        }
    }
}

fn parse_args<T: serde::de::DeserializeOwned>(args: Value) -> Result<T, WireError> {
    serde_json::from_value(args).map_err(|error| WireError {
        code: codes::INVALID_ARGUMENT.to_string(),
        message: format!("bad arguments: {error}"),
    })
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(text) => text.parse::<Decimal>().ok(),
        Value::Number(number) => number.to_string().parse::<Decimal>().ok(),
        _ => None,
    }
}

fn to_wire(error: RepositoryError) -> WireError {
    match error {
        RepositoryError::ProductNotFound(id) => WireError {
            code: codes::NOT_FOUND.to_string(),
            message: format!("Product with id={id} not found"),
        },
        RepositoryError::OutOfStock(id) => WireError {
            code: codes::INVALID_ARGUMENT.to_string(),
            message: format!("Product id={id} is out of stock"),
        },
        RepositoryError::InvalidArgument(message) => {
            WireError { code: codes::INVALID_ARGUMENT.to_string(), message }
        }
        RepositoryError::Database(error) => WireError {
            code: codes::INTERNAL.to_string(),
            message: format!("storage failure: {error}"),
        },
        RepositoryError::Decode(message) => WireError {
            code: codes::INTERNAL.to_string(),
            message: format!("storage decode failure: {message}"),
        },
    }
}

fn encode_failure(error: serde_json::Error) -> WireError {
    WireError {
        code: codes::INTERNAL.to_string(),
        message: format!("response encoding failed: {error}"),
    }
}

/// Serves the line protocol until the input stream closes (the client's
/// shutdown signal). One frame per line in, one frame per line out; an
/// unparseable request line is logged and skipped since there is no id to
/// answer on.
pub async fn serve<R, W>(service: &ToolService, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<RequestFrame>(&line) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(
                    event_name = "toolserver.bad_request_line",
                    error = %error,
                    "skipping unparseable request line"
                );
                continue;
            }
        };

        let response = match service.dispatch(&request.method, request.args).await {
            Ok(result) => ResponseFrame::ok(request.id, result),
            Err(wire_error) => {
                ResponseFrame { id: request.id, result: None, error: Some(wire_error) }
            }
        };

        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }

    info!(event_name = "toolserver.input_closed", "request stream closed; shutting down");
    Ok(())
}
