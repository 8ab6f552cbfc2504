use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Closed set of actions a query can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ListProducts,
    GetProduct,
    AddProduct,
    Statistics,
    Discount,
    CreateOrder,
    Unsupported,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListProducts => "list_products",
            Self::GetProduct => "get_product",
            Self::AddProduct => "add_product",
            Self::Statistics => "statistics",
            Self::Discount => "discount",
            Self::CreateOrder => "create_order",
            Self::Unsupported => "unsupported",
        }
    }

    /// Tie-break rank: a higher rank wins when two intents score equally.
    /// More specific intents outrank generic ones; `Unsupported` never
    /// competes (it is the below-threshold fallback, not a candidate).
    pub fn tie_break_rank(&self) -> u8 {
        match self {
            Self::CreateOrder => 6,
            Self::Discount => 5,
            Self::AddProduct => 4,
            Self::Statistics => 3,
            Self::GetProduct => 2,
            Self::ListProducts => 1,
            Self::Unsupported => 0,
        }
    }

    /// Candidates the classifier scores, in no particular order.
    pub fn candidates() -> [Intent; 6] {
        [
            Self::ListProducts,
            Self::GetProduct,
            Self::AddProduct,
            Self::Statistics,
            Self::Discount,
            Self::CreateOrder,
        ]
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a tool parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Integer,
    Decimal,
    Flag,
}

/// One extracted value. Numbers are parsed verbatim from the query; text
/// values keep the casing the user typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Flag(bool),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Text(_) => ParamType::Text,
            Self::Integer(_) => ParamType::Integer,
            Self::Decimal(_) => ParamType::Decimal,
            Self::Flag(_) => ParamType::Flag,
        }
    }

    /// JSON form used when the value becomes a tool-call argument.
    /// Decimals travel as strings so no precision is lost on the wire.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(value) => serde_json::Value::String(value.clone()),
            Self::Integer(value) => serde_json::Value::from(*value),
            Self::Decimal(value) => serde_json::Value::String(value.to_string()),
            Self::Flag(value) => serde_json::Value::Bool(*value),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(value) => Some(*value),
            Self::Integer(value) => Some(Decimal::from(*value)),
            _ => None,
        }
    }
}

/// Partially filled parameter set. A missing required parameter is a normal,
/// representable state here; validation against the tool contract decides
/// whether the run can proceed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedParams {
    values: BTreeMap<String, ParamValue>,
}

impl ExtractedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    /// JSON object form for tool-call arguments and response metadata.
    /// Deterministic: keys come out in lexicographic order.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}
