//! Reply templates, bilingual and deterministic.
//!
//! Every function here is pure text assembly over already-fetched payloads:
//! formatting the same payload twice yields byte-identical output. The reply
//! language mirrors the query language when detectable (any Cyrillic letter
//! selects Russian), otherwise the configured default applies.

use rust_decimal::Decimal;

use shopmate_core::config::ReplyLanguage;
use shopmate_core::domain::{CatalogStatistics, Order, Product};
use shopmate_core::errors::{AgentError, ChannelError};

pub fn detect_language(query: &str, default: ReplyLanguage) -> ReplyLanguage {
    let has_cyrillic = query.chars().any(|ch| ('\u{0400}'..='\u{04FF}').contains(&ch));
    if has_cyrillic {
        ReplyLanguage::Ru
    } else if query.chars().any(|ch| ch.is_ascii_alphabetic()) {
        ReplyLanguage::En
    } else {
        default
    }
}

pub fn products_table(products: &[Product], lang: ReplyLanguage) -> String {
    if products.is_empty() {
        return match lang {
            ReplyLanguage::En => "Nothing found.".to_string(),
            ReplyLanguage::Ru => "Ничего не найдено.".to_string(),
        };
    }

    let mut lines = Vec::with_capacity(products.len() + 2);
    lines.push(match lang {
        ReplyLanguage::En => "| ID | Name | Price | Category | In stock |".to_string(),
        ReplyLanguage::Ru => "| ID | Название | Цена | Категория | В наличии |".to_string(),
    });
    lines.push("|---:|---|---:|---|:---:|".to_string());
    for product in products {
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            product.id,
            product.name,
            product.price,
            product.category,
            if product.in_stock { "✅" } else { "❌" }
        ));
    }
    lines.join("\n")
}

pub fn statistics_text(stats: &CatalogStatistics, lang: ReplyLanguage) -> String {
    match lang {
        ReplyLanguage::En => format!(
            "Products in catalog: **{}**\nAverage price: **{}**",
            stats.count, stats.avg_price
        ),
        ReplyLanguage::Ru => format!(
            "Всего продуктов: **{}**\nСредняя цена: **{}**",
            stats.count, stats.avg_price
        ),
    }
}

pub fn product_text(product: &Product, lang: ReplyLanguage) -> String {
    match lang {
        ReplyLanguage::En => format!(
            "**{}** (ID {})\nPrice: **{}**\nCategory: {}\n{}",
            product.name,
            product.id,
            product.price,
            product.category,
            if product.in_stock { "In stock ✅" } else { "Out of stock ❌" }
        ),
        ReplyLanguage::Ru => format!(
            "**{}** (ID {})\nЦена: **{}**\nКатегория: {}\n{}",
            product.name,
            product.id,
            product.price,
            product.category,
            if product.in_stock { "В наличии ✅" } else { "Нет в наличии ❌" }
        ),
    }
}

pub fn added_product_text(product: &Product, lang: ReplyLanguage) -> String {
    match lang {
        ReplyLanguage::En => format!(
            "✅ Added product: {} (ID {}), price {}, category {}",
            product.name, product.id, product.price, product.category
        ),
        ReplyLanguage::Ru => format!(
            "✅ Добавлен продукт: {} (ID {}), цена {}, категория {}",
            product.name, product.id, product.price, product.category
        ),
    }
}

pub fn discount_text(
    product: &Product,
    percent: Decimal,
    discounted: Decimal,
    lang: ReplyLanguage,
) -> String {
    match lang {
        ReplyLanguage::En => format!(
            "Product: **{}** (ID {})\nPrice: **{}**\nDiscount: **{}%**\nDiscounted price: **{}**",
            product.name, product.id, product.price, percent, discounted
        ),
        ReplyLanguage::Ru => format!(
            "Товар: **{}** (ID {})\nЦена: **{}**\nСкидка: **{}%**\nЦена со скидкой: **{}**",
            product.name, product.id, product.price, percent, discounted
        ),
    }
}

pub fn order_text(order: &Order, lang: ReplyLanguage) -> String {
    match lang {
        ReplyLanguage::En => format!(
            "✅ Order created (ID {})\n- Product: {} (ID {})\n- Unit price: {}\n- Quantity: {}\n- Total: {}\n- Created at: {}",
            order.id,
            order.product_name,
            order.product_id,
            order.unit_price,
            order.quantity,
            order.total_price,
            order.created_at
        ),
        ReplyLanguage::Ru => format!(
            "✅ Заказ создан (ID {})\n- Товар: {} (ID {})\n- Цена за штуку: {}\n- Количество: {}\n- Итог: {}\n- Время: {}",
            order.id,
            order.product_name,
            order.product_id,
            order.unit_price,
            order.quantity,
            order.total_price,
            order.created_at
        ),
    }
}

/// Fallback for unsupported queries: what the agent can do, by example.
pub fn help_text(lang: ReplyLanguage) -> String {
    match lang {
        ReplyLanguage::En => "I can help with:\n\
             1) List products: `Show me all products`\n\
             2) Filter by category: `Show me all products in category Electronics`\n\
             3) Find one product: `Find product with ID 1`\n\
             4) Statistics: `What is the average price of products?`\n\
             5) Add a product: `Add new product: Keyboard, price 9000, category Electronics`\n\
             6) Discount: `Calculate a 15% discount for product ID 1`\n\
             7) Order: `Create order: product_id 1 quantity 2`"
            .to_string(),
        ReplyLanguage::Ru => "Я умею:\n\
             1) Показать продукты: `Покажи продукты`\n\
             2) Фильтр по категории: `Покажи все продукты в категории Электроника`\n\
             3) Найти товар: `Найди товар с ID 1`\n\
             4) Статистика: `Какая средняя цена продуктов?`\n\
             5) Добавить продукт: `Добавь новый продукт: Мышка, цена 1500, категория Электроника`\n\
             6) Скидка: `Посчитай скидку 15% на товар с ID 1`\n\
             7) Заказ: `Создай заказ: product_id 1 quantity 2`"
            .to_string(),
    }
}

pub fn missing_parameter_text(name: &str, lang: ReplyLanguage) -> String {
    match lang {
        ReplyLanguage::En => format!(
            "I need a value for `{name}` to do that. Please repeat the request with `{name}` included."
        ),
        ReplyLanguage::Ru => format!(
            "Мне не хватает параметра `{name}`. Пожалуйста, повторите запрос, указав `{name}`."
        ),
    }
}

/// Every failure degrades to a reply; nothing propagates past here.
pub fn failure_text(error: &AgentError, lang: ReplyLanguage) -> String {
    match error {
        AgentError::MissingParameter { name } => missing_parameter_text(name, lang),
        AgentError::InvalidArgument(message) => match lang {
            ReplyLanguage::En => format!("That request is invalid: {message}."),
            ReplyLanguage::Ru => format!("Некорректный запрос: {message}."),
        },
        AgentError::Channel(ChannelError::Timeout { .. })
        | AgentError::Channel(ChannelError::Unavailable(_)) => match lang {
            ReplyLanguage::En => {
                "Sorry, the catalog service is not responding right now. Please try again in a moment."
                    .to_string()
            }
            ReplyLanguage::Ru => {
                "Извините, сервис каталога сейчас не отвечает. Пожалуйста, попробуйте ещё раз чуть позже."
                    .to_string()
            }
        },
        AgentError::Channel(ChannelError::Tool { message, .. }) => match lang {
            ReplyLanguage::En => format!("The request could not be completed: {message}."),
            ReplyLanguage::Ru => format!("Не удалось выполнить запрос: {message}."),
        },
        AgentError::UnknownTool(_)
        | AgentError::Channel(ChannelError::Protocol(_))
        | AgentError::Channel(ChannelError::ProcessLaunch { .. }) => match lang {
            ReplyLanguage::En => {
                "Sorry, something went wrong on our side. Please try again.".to_string()
            }
            ReplyLanguage::Ru => {
                "Извините, что-то пошло не так на нашей стороне. Попробуйте ещё раз.".to_string()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use shopmate_core::config::ReplyLanguage;
    use shopmate_core::domain::{CatalogStatistics, Product};
    use shopmate_core::errors::{AgentError, ChannelError};

    use super::{detect_language, failure_text, products_table, statistics_text};

    fn sample_products() -> Vec<Product> {
        vec![
            Product {
                id: 1,
                name: "Ноутбук".to_string(),
                price: Decimal::new(50_000, 0),
                category: "Электроника".to_string(),
                in_stock: true,
            },
            Product {
                id: 3,
                name: "Кофе".to_string(),
                price: Decimal::new(1_200, 0),
                category: "Продукты".to_string(),
                in_stock: false,
            },
        ]
    }

    #[test]
    fn cyrillic_query_selects_russian() {
        assert_eq!(detect_language("Покажи продукты", ReplyLanguage::En), ReplyLanguage::Ru);
        assert_eq!(detect_language("show products", ReplyLanguage::Ru), ReplyLanguage::En);
        assert_eq!(detect_language("12345", ReplyLanguage::Ru), ReplyLanguage::Ru);
    }

    #[test]
    fn product_table_is_idempotent() {
        let products = sample_products();
        let first = products_table(&products, ReplyLanguage::Ru);
        let second = products_table(&products, ReplyLanguage::Ru);
        assert_eq!(first, second);
        assert!(first.starts_with("| ID | Название |"));
        assert!(first.contains("| 1 | Ноутбук | 50000 | Электроника | ✅ |"));
        assert!(first.contains("| 3 | Кофе | 1200 | Продукты | ❌ |"));
    }

    #[test]
    fn empty_table_has_language_specific_fallback() {
        assert_eq!(products_table(&[], ReplyLanguage::En), "Nothing found.");
        assert_eq!(products_table(&[], ReplyLanguage::Ru), "Ничего не найдено.");
    }

    #[test]
    fn statistics_template_formats_decimal_average() {
        let stats = CatalogStatistics { count: 3, avg_price: "19400".parse().unwrap() };
        let text = statistics_text(&stats, ReplyLanguage::En);
        assert_eq!(text, "Products in catalog: **3**\nAverage price: **19400**");
    }

    #[test]
    fn timeout_failure_renders_apology_not_debug_dump() {
        let error = AgentError::Channel(ChannelError::Timeout { timeout_ms: 50 });
        let text = failure_text(&error, ReplyLanguage::En);
        assert!(text.contains("not responding"));
        assert!(!text.contains("Timeout"));
    }

    #[test]
    fn unknown_tool_degrades_to_generic_apology() {
        let error = AgentError::UnknownTool("mystery".to_string());
        let text = failure_text(&error, ReplyLanguage::En);
        assert!(text.contains("something went wrong"));
        assert!(!text.contains("mystery"));
    }
}
