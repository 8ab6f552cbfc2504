use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One catalog entry as returned by the products tool server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub in_stock: bool,
}

/// Insert payload for `add_product`. The id is assigned by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

/// A placed order, echoing the product snapshot it was priced against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub total_price: Decimal,
    pub created_at: String,
}

/// Aggregate view over the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStatistics {
    pub count: i64,
    pub avg_price: Decimal,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{NewProduct, Product};

    #[test]
    fn product_round_trips_through_json() {
        let product = Product {
            id: 1,
            name: "Ноутбук".to_string(),
            price: Decimal::new(50_000, 0),
            category: "Электроника".to_string(),
            in_stock: true,
        };

        let encoded = serde_json::to_string(&product).expect("serialize");
        let decoded: Product = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(decoded, product);
    }

    #[test]
    fn new_product_defaults_to_in_stock() {
        let decoded: NewProduct =
            serde_json::from_str(r#"{"name":"Кофе","price":"1200","category":"Продукты"}"#)
                .expect("deserialize");
        assert!(decoded.in_stock);
    }
}
