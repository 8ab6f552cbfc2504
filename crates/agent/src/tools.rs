//! In-process custom tools: pure computations with no I/O and no failure
//! mode beyond argument validation.

use rust_decimal::Decimal;
use serde_json::{json, Value};

use shopmate_core::domain::Product;
use shopmate_core::errors::AgentError;

use crate::classifier::transliterate;

/// Price after applying a percentage discount. Rejects a negative price and
/// a percentage outside [0, 100].
pub fn calc_discount(price: Decimal, percent: Decimal) -> Result<Decimal, AgentError> {
    if price < Decimal::ZERO {
        return Err(AgentError::InvalidArgument("price must be >= 0".to_string()));
    }
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(AgentError::InvalidArgument("percent must be in [0, 100]".to_string()));
    }
    let discounted = price * (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED;
    Ok(discounted.round_dp(2).normalize())
}

/// Registry binding for [`calc_discount`]. Args: `{price, percent}`, both
/// accepted as JSON numbers or decimal strings.
pub fn discount_tool(args: &Value) -> Result<Value, AgentError> {
    let price = decimal_arg(args, "price")?;
    let percent = decimal_arg(args, "percent")?;
    let discounted = calc_discount(price, percent)?;
    Ok(json!({ "discounted_price": discounted.to_string() }))
}

fn decimal_arg(args: &Value, key: &str) -> Result<Decimal, AgentError> {
    let value = args
        .get(key)
        .ok_or_else(|| AgentError::MissingParameter { name: key.to_string() })?;
    let parsed = match value {
        Value::String(text) => text.parse::<Decimal>().ok(),
        Value::Number(number) => number.to_string().parse::<Decimal>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        AgentError::InvalidArgument(format!("`{key}` is not a decimal value: {value}"))
    })
}

/// Resolves a requested category against the categories actually present in
/// the catalog, comparing normalized and transliterated forms so
/// "electronics" finds "Электроника". Falls back to the request verbatim
/// when nothing is close enough.
pub fn resolve_category(requested: &str, existing: &[String]) -> String {
    let requested_norm = normalize_label(requested);
    let requested_lat = transliterate(&requested_norm);
    if requested_norm.is_empty() || existing.is_empty() {
        return requested.to_string();
    }

    let mut best: Option<(&String, f64)> = None;
    for candidate in existing {
        let candidate_norm = normalize_label(candidate);
        let candidate_lat = transliterate(&candidate_norm);

        let mut score = [
            similarity(&requested_norm, &candidate_norm),
            similarity(&requested_norm, &candidate_lat),
            similarity(&requested_lat, &candidate_norm),
            similarity(&requested_lat, &candidate_lat),
        ]
        .into_iter()
        .fold(0.0f64, f64::max);

        let prefix_hit = candidate_norm.starts_with(&requested_norm)
            || candidate_norm.contains(&requested_norm)
            || candidate_lat.starts_with(&requested_lat)
            || candidate_lat.contains(&requested_lat);
        if prefix_hit {
            score = score.max(0.85);
        }

        if best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, score)) if score >= 0.65 => candidate.clone(),
        _ => requested.to_string(),
    }
}

/// Filters products to the requested category, resolving the name fuzzily
/// first. Returns the surviving products and the resolved category label.
pub fn filter_products_by_category(
    products: Vec<Product>,
    requested: &str,
) -> (Vec<Product>, String) {
    let mut categories = products
        .iter()
        .map(|product| product.category.trim().to_string())
        .filter(|category| !category.is_empty())
        .collect::<Vec<_>>();
    categories.sort();
    categories.dedup();

    let resolved = resolve_category(requested, &categories);
    let resolved_norm = normalize_label(&resolved);
    let filtered = products
        .into_iter()
        .filter(|product| normalize_label(&product.category) == resolved_norm)
        .collect();
    (filtered, resolved)
}

fn normalize_label(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            output.push(ch);
        } else if !output.ends_with(' ') {
            output.push(' ');
        }
    }
    output.trim().to_string()
}

/// Similarity ratio `2 * LCS / (|a| + |b|)` over characters; 1.0 for
/// identical strings. Tolerant enough that "electronics" and the
/// transliterated "elektronika" land above the 0.65 resolution floor.
fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a_chars = a.chars().filter(|ch| !ch.is_whitespace()).collect::<Vec<_>>();
    let b_chars = b.chars().filter(|ch| !ch.is_whitespace()).collect::<Vec<_>>();
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }

    let mut previous = vec![0usize; b_chars.len() + 1];
    let mut current = vec![0usize; b_chars.len() + 1];
    for a_char in &a_chars {
        for (j, b_char) in b_chars.iter().enumerate() {
            current[j + 1] = if a_char == b_char {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    let shared = previous[b_chars.len()];
    (2.0 * shared as f64) / (a_chars.len() + b_chars.len()) as f64
}
