//! Intent-specific parameter extraction.
//!
//! Extraction is independent of scoring: it always walks the full
//! normalized token stream, whether or not a token contributed to the
//! winning intent. Numeric values are taken verbatim from the query (no
//! fuzzy matching), free-text spans keep the casing the user typed.

use rust_decimal::Decimal;

use shopmate_core::intent::{ExtractedParams, Intent, ParamValue};

use crate::classifier::{KeywordModel, Token};

impl KeywordModel {
    pub(crate) fn extract_params(&self, intent: Intent, tokens: &[Token]) -> ExtractedParams {
        let mut params = ExtractedParams::new();

        match intent {
            Intent::ListProducts => {
                if let Some(category) = self.text_after(tokens, "category", Position::Last) {
                    params.insert("category", ParamValue::Text(category));
                }
            }
            Intent::GetProduct => {
                let id = self.integer_after(tokens, "id").or_else(|| first_integer(tokens));
                if let Some(id) = id {
                    params.insert("id", ParamValue::Integer(id));
                }
            }
            Intent::AddProduct => {
                if let Some(name) = self.text_after(tokens, "products", Position::First) {
                    params.insert("name", ParamValue::Text(name));
                }
                if let Some(price) = self.decimal_after(tokens, "price") {
                    params.insert("price", ParamValue::Decimal(price));
                }
                if let Some(category) = self.text_after(tokens, "category", Position::Last) {
                    params.insert("category", ParamValue::Text(category));
                }
                if mentions_out_of_stock(tokens) {
                    params.insert("in_stock", ParamValue::Flag(false));
                }
            }
            Intent::Statistics | Intent::Unsupported => {}
            Intent::Discount => {
                let percent = self
                    .integer_before(tokens, "percent")
                    .or_else(|| self.integer_after(tokens, "discount"));
                if let Some(percent) = percent {
                    params.insert("percent", ParamValue::Integer(percent));
                }
                let id = self
                    .integer_after(tokens, "id")
                    .or_else(|| self.integer_after(tokens, "products"));
                if let Some(id) = id {
                    params.insert("id", ParamValue::Integer(id));
                }
            }
            Intent::CreateOrder => {
                let product_id = self
                    .integer_after(tokens, "id")
                    .or_else(|| self.integer_after(tokens, "products"));
                if let Some(product_id) = product_id {
                    params.insert("product_id", ParamValue::Integer(product_id));
                }
                if let Some(quantity) = self.integer_after(tokens, "quantity") {
                    params.insert("quantity", ParamValue::Integer(quantity));
                }
            }
        }

        params
    }

    fn canonical_of(&self, token: &Token) -> Option<&'static str> {
        self.match_keyword(token).map(|keyword| keyword.canonical)
    }

    /// First integer directly following any surface form of `canonical`.
    fn integer_after(&self, tokens: &[Token], canonical: &str) -> Option<i64> {
        for (index, token) in tokens.iter().enumerate() {
            if self.canonical_of(token) != Some(canonical) {
                continue;
            }
            if let Some(next) = tokens.get(index + 1) {
                if let Ok(value) = next.norm.parse::<i64>() {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Integer directly preceding a surface form of `canonical`
    /// (the `15 %` shape).
    fn integer_before(&self, tokens: &[Token], canonical: &str) -> Option<i64> {
        for (index, token) in tokens.iter().enumerate() {
            if self.canonical_of(token) != Some(canonical) {
                continue;
            }
            if index == 0 {
                continue;
            }
            if let Ok(value) = tokens[index - 1].norm.parse::<i64>() {
                return Some(value);
            }
        }
        None
    }

    fn decimal_after(&self, tokens: &[Token], canonical: &str) -> Option<Decimal> {
        for (index, token) in tokens.iter().enumerate() {
            if self.canonical_of(token) != Some(canonical) {
                continue;
            }
            if let Some(next) = tokens.get(index + 1) {
                if next.is_numeric() {
                    if let Ok(value) = next.norm.parse::<Decimal>() {
                        return Some(value);
                    }
                }
            }
        }
        None
    }

    /// Raw-text span following a surface form of `canonical`, stopping at
    /// the next keyword or number. `Position::Last` mirrors the original
    /// behavior of honoring the final `category ...` mention.
    fn text_after(&self, tokens: &[Token], canonical: &str, position: Position) -> Option<String> {
        let occurrences = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| self.canonical_of(token) == Some(canonical))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        let anchor = match position {
            Position::First => *occurrences.first()?,
            Position::Last => *occurrences.last()?,
        };

        let mut span = Vec::new();
        for token in tokens.iter().skip(anchor + 1) {
            if token.is_numeric() || self.canonical_of(token).is_some() {
                break;
            }
            span.push(token.raw.clone());
        }

        if span.is_empty() {
            None
        } else {
            Some(span.join(" "))
        }
    }
}

#[derive(Clone, Copy)]
enum Position {
    First,
    Last,
}

fn first_integer(tokens: &[Token]) -> Option<i64> {
    tokens.iter().find_map(|token| token.norm.parse::<i64>().ok())
}

fn mentions_out_of_stock(tokens: &[Token]) -> bool {
    let normalized = tokens.iter().map(|token| token.norm.as_str()).collect::<Vec<_>>().join(" ");
    normalized.contains("net v nalichii") || normalized.contains("out of stock")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use shopmate_core::intent::{Intent, ParamValue};

    use crate::classifier::{IntentModel, KeywordModel};

    fn params_for(query: &str) -> (Intent, shopmate_core::intent::ExtractedParams) {
        let classification = KeywordModel::default().classify(query);
        (classification.intent, classification.params)
    }

    #[test]
    fn list_category_keeps_original_casing() {
        let (intent, params) = params_for("Show me all products in category Electronics");
        assert_eq!(intent, Intent::ListProducts);
        assert_eq!(params.get("category"), Some(&ParamValue::Text("Electronics".to_string())));
    }

    #[test]
    fn last_category_mention_wins() {
        let (_, params) = params_for("Покажи продукты в категории категории Электроника");
        assert_eq!(params.get("category"), Some(&ParamValue::Text("Электроника".to_string())));
    }

    #[test]
    fn add_product_pulls_name_price_category() {
        let (intent, params) =
            params_for("Add new product: Keyboard, price 9000, category Electronics");
        assert_eq!(intent, Intent::AddProduct);
        assert_eq!(params.get("name"), Some(&ParamValue::Text("Keyboard".to_string())));
        assert_eq!(params.get("price"), Some(&ParamValue::Decimal(Decimal::new(9_000, 0))));
        assert_eq!(params.get("category"), Some(&ParamValue::Text("Electronics".to_string())));
        assert!(params.get("in_stock").is_none());
    }

    #[test]
    fn add_product_respects_out_of_stock_phrase() {
        let (_, params) =
            params_for("Добавь новый продукт: Кофе, цена 1200, категория Продукты, нет в наличии");
        assert_eq!(params.get("in_stock"), Some(&ParamValue::Flag(false)));
    }

    #[test]
    fn decimal_price_with_comma_separator_is_parsed() {
        let (_, params) = params_for("Добавь товар: Чай, цена 350,50, категория Продукты");
        assert_eq!(params.get("price"), Some(&ParamValue::Decimal("350.50".parse().unwrap())));
    }

    #[test]
    fn discount_extracts_percent_and_id_verbatim() {
        let (intent, params) = params_for("Посчитай скидку 15% на товар с ID 1");
        assert_eq!(intent, Intent::Discount);
        assert_eq!(params.get("percent"), Some(&ParamValue::Integer(15)));
        assert_eq!(params.get("id"), Some(&ParamValue::Integer(1)));
    }

    #[test]
    fn order_extracts_product_and_quantity() {
        let (intent, params) = params_for("Создай заказ: product_id 1 quantity 2");
        assert_eq!(intent, Intent::CreateOrder);
        assert_eq!(params.get("product_id"), Some(&ParamValue::Integer(1)));
        assert_eq!(params.get("quantity"), Some(&ParamValue::Integer(2)));
    }

    #[test]
    fn order_without_numbers_extracts_nothing() {
        let (intent, params) = params_for("Создай заказ");
        assert_eq!(intent, Intent::CreateOrder);
        assert!(params.is_empty());
    }

    #[test]
    fn get_product_falls_back_to_first_integer() {
        let (intent, params) = params_for("Get product 5");
        assert_eq!(intent, Intent::GetProduct);
        assert_eq!(params.get("id"), Some(&ParamValue::Integer(5)));
    }
}
