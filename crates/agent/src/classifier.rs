//! Rule-based intent classification.
//!
//! The alias table below is data, not branching code: each canonical keyword
//! lists the surface forms (English and Russian, including abbreviations)
//! that map to it and the intents it votes for. Adding a language or an
//! alias is a table edit. Specificity falls out of the table too - a keyword
//! claimed by a single intent weighs more than one shared across several.

use shopmate_core::intent::{ExtractedParams, Intent};

/// Classification outcome: best intent, its weighted score (used only for
/// thresholding and tie-breaks, never exposed), and extracted parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub score: u32,
    pub params: ExtractedParams,
}

/// Contract a real language model would implement; the orchestrator only
/// sees this, so the rule-based model is swappable without touching it.
pub trait IntentModel: Send + Sync {
    fn classify(&self, query: &str) -> Classification;
}

pub(crate) struct Keyword {
    pub canonical: &'static str,
    pub intents: &'static [Intent],
    pub aliases: &'static [&'static str],
}

impl Keyword {
    /// A keyword unique to one intent is the strongest signal; one shared
    /// across three or more intents barely distinguishes anything.
    pub fn weight(&self) -> u32 {
        match self.intents.len() {
            1 => 3,
            2 => 2,
            _ => 1,
        }
    }
}

const KEYWORDS: &[Keyword] = &[
    Keyword {
        canonical: "show",
        intents: &[Intent::ListProducts],
        aliases: &["show", "list", "display", "покажи", "показать", "выведи", "вывести"],
    },
    Keyword {
        canonical: "products",
        intents: &[Intent::ListProducts, Intent::AddProduct, Intent::GetProduct],
        aliases: &[
            "product", "products", "item", "items", "goods", "продукт", "продукты", "продуктов",
            "товар", "товары", "товаров",
        ],
    },
    Keyword {
        canonical: "category",
        intents: &[Intent::ListProducts, Intent::AddProduct],
        aliases: &["category", "categories", "cat", "категория", "категории", "категорию", "катег"],
    },
    Keyword {
        canonical: "add",
        intents: &[Intent::AddProduct],
        aliases: &["add", "добавь", "добавить", "внеси"],
    },
    Keyword {
        canonical: "new",
        intents: &[Intent::AddProduct],
        aliases: &["new", "новый", "новая", "новую", "новых"],
    },
    Keyword {
        canonical: "price",
        intents: &[Intent::AddProduct, Intent::Statistics],
        aliases: &["price", "prices", "cost", "цена", "цены", "цену", "стоимость"],
    },
    Keyword {
        canonical: "statistics",
        intents: &[Intent::Statistics],
        aliases: &["statistics", "stats", "статистика", "статистику", "статистики"],
    },
    Keyword {
        canonical: "average",
        intents: &[Intent::Statistics],
        aliases: &["average", "avg", "mean", "средняя", "среднюю", "средний", "среднее"],
    },
    Keyword {
        canonical: "discount",
        intents: &[Intent::Discount],
        aliases: &["discount", "скидка", "скидку", "скидки", "скидок"],
    },
    Keyword {
        canonical: "percent",
        intents: &[Intent::Discount],
        aliases: &["percent", "percentage", "процент", "проценты", "процентов", "%"],
    },
    Keyword {
        canonical: "order",
        intents: &[Intent::CreateOrder],
        aliases: &["order", "заказ", "закажи", "заказать"],
    },
    Keyword {
        canonical: "quantity",
        intents: &[Intent::CreateOrder],
        aliases: &["quantity", "qty", "количество", "количества", "штук", "штуки"],
    },
    Keyword {
        canonical: "create",
        intents: &[Intent::AddProduct, Intent::CreateOrder],
        aliases: &["create", "создай", "создать", "сделай"],
    },
    Keyword {
        canonical: "id",
        intents: &[Intent::GetProduct, Intent::Discount, Intent::CreateOrder],
        aliases: &["id", "айди", "идентификатор"],
    },
    Keyword {
        canonical: "find",
        intents: &[Intent::GetProduct],
        aliases: &["find", "get", "fetch", "найди", "найти"],
    },
];

/// One normalized token. `raw` keeps the user's casing for free-text
/// extraction; `norm` is the casefolded, transliterated comparison form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Token {
    pub raw: String,
    pub norm: String,
}

impl Token {
    pub fn is_numeric(&self) -> bool {
        !self.norm.is_empty()
            && self.norm.chars().all(|c| c.is_ascii_digit() || c == '.')
            && self.norm.chars().any(|c| c.is_ascii_digit())
    }
}

/// The rule-based stand-in for a language model.
pub struct KeywordModel {
    /// Alias comparison forms, pre-transliterated once at construction.
    aliases: Vec<(String, usize)>,
    min_score: u32,
}

impl KeywordModel {
    pub fn new(min_score: u32) -> Self {
        let mut aliases = Vec::new();
        for (index, keyword) in KEYWORDS.iter().enumerate() {
            for alias in keyword.aliases {
                aliases.push((transliterate(alias), index));
            }
        }
        Self { aliases, min_score }
    }

    pub(crate) fn tokenize(&self, query: &str) -> Vec<Token> {
        tokenize(query)
    }

    /// Canonical keyword for a token, or None for free text. Numbers are
    /// never fuzzy-matched - they are extraction material, not keywords.
    pub(crate) fn match_keyword(&self, token: &Token) -> Option<&'static Keyword> {
        if token.is_numeric() {
            return None;
        }

        // Exact hit wins over any fuzzy candidate.
        if let Some((_, index)) =
            self.aliases.iter().find(|(alias, _)| *alias == token.norm)
        {
            return Some(&KEYWORDS[*index]);
        }

        self.aliases
            .iter()
            .find(|(alias, _)| fuzzy_match(&token.norm, alias))
            .map(|(_, index)| &KEYWORDS[*index])
    }

    fn score(&self, tokens: &[Token]) -> (Intent, u32) {
        let mut scores = [0u32; 6];
        let candidates = Intent::candidates();

        for token in tokens {
            let Some(keyword) = self.match_keyword(token) else {
                continue;
            };
            for intent in keyword.intents {
                let slot = candidates
                    .iter()
                    .position(|candidate| candidate == intent)
                    .unwrap_or_default();
                scores[slot] += keyword.weight();
            }
        }

        let mut best = (Intent::Unsupported, 0u32);
        for (slot, candidate) in candidates.iter().enumerate() {
            let score = scores[slot];
            let wins = score > best.1
                || (score == best.1
                    && score > 0
                    && candidate.tie_break_rank() > best.0.tie_break_rank());
            if wins {
                best = (*candidate, score);
            }
        }

        if best.1 < self.min_score {
            (Intent::Unsupported, best.1)
        } else {
            best
        }
    }
}

impl Default for KeywordModel {
    fn default() -> Self {
        Self::new(3)
    }
}

impl IntentModel for KeywordModel {
    fn classify(&self, query: &str) -> Classification {
        let tokens = self.tokenize(query);
        let (intent, score) = self.score(&tokens);
        // Extraction runs over the full normalized stream, independent of
        // which tokens scored.
        let params = self.extract_params(intent, &tokens);
        Classification { intent, score, params }
    }
}

const RU2LAT: &[(char, &str)] = &[
    ('а', "a"), ('б', "b"), ('в', "v"), ('г', "g"), ('д', "d"), ('е', "e"), ('ё', "e"),
    ('ж', "zh"), ('з', "z"), ('и', "i"), ('й', "y"), ('к', "k"), ('л', "l"), ('м', "m"),
    ('н', "n"), ('о', "o"), ('п', "p"), ('р', "r"), ('с', "s"), ('т', "t"), ('у', "u"),
    ('ф', "f"), ('х', "h"), ('ц', "ts"), ('ч', "ch"), ('ш', "sh"), ('щ', "shch"),
    ('ъ', ""), ('ы', "y"), ('ь', ""), ('э', "e"), ('ю', "yu"), ('я', "ya"),
];

/// Casefolds and maps Cyrillic onto comparable Latin token forms so one
/// alias table serves both alphabets.
pub(crate) fn transliterate(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    for ch in text.to_lowercase().chars() {
        match RU2LAT.iter().find(|(cyrillic, _)| *cyrillic == ch) {
            Some((_, latin)) => output.push_str(latin),
            None => output.push(ch),
        }
    }
    output
}

/// Splits a query into tokens: alphanumeric runs survive, the percent sign
/// becomes its own token, decimal separators inside numbers are kept (and
/// `,` normalized to `.`), everything else separates.
fn tokenize(query: &str) -> Vec<Token> {
    let chars = query.chars().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, tokens: &mut Vec<Token>| {
        if !current.is_empty() {
            let raw = std::mem::take(current);
            let norm = transliterate(&raw).replace(',', ".");
            tokens.push(Token { raw, norm });
        }
    };

    for (position, ch) in chars.iter().enumerate() {
        if ch.is_alphanumeric() {
            current.push(*ch);
        } else if *ch == '%' {
            flush(&mut current, &mut tokens);
            tokens.push(Token { raw: "%".to_string(), norm: "%".to_string() });
        } else if (*ch == '.' || *ch == ',')
            && position > 0
            && position + 1 < chars.len()
            && chars[position - 1].is_ascii_digit()
            && chars[position + 1].is_ascii_digit()
        {
            current.push(*ch);
        } else {
            flush(&mut current, &mut tokens);
        }
    }
    flush(&mut current, &mut tokens);
    tokens
}

/// Bounded edit-distance comparison. Short tokens must match exactly;
/// longer ones tolerate a single edit.
fn fuzzy_match(token: &str, alias: &str) -> bool {
    if token == alias {
        return true;
    }
    if token.chars().count() < 4 || alias.chars().count() < 4 {
        return false;
    }
    edit_distance(token, alias) <= 1
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a = a.chars().collect::<Vec<_>>();
    let b = b.chars().collect::<Vec<_>>();
    let mut previous = (0..=b.len()).collect::<Vec<usize>>();
    let mut current = vec![0usize; b.len() + 1];

    for (i, a_char) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(a_char != b_char);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use shopmate_core::intent::{Intent, ParamValue};

    use super::{edit_distance, transliterate, Classification, IntentModel, KeywordModel};

    fn classify(query: &str) -> Classification {
        KeywordModel::default().classify(query)
    }

    #[test]
    fn representative_queries_classify_in_both_languages() {
        struct Case {
            query: &'static str,
            intent: Intent,
        }

        let cases = vec![
            Case { query: "Show me all products in category Electronics", intent: Intent::ListProducts },
            Case { query: "Покажи все продукты в категории Электроника", intent: Intent::ListProducts },
            Case { query: "Покажи продукты", intent: Intent::ListProducts },
            Case { query: "Find product with ID 3", intent: Intent::GetProduct },
            Case { query: "Найди товар с ID 3", intent: Intent::GetProduct },
            Case {
                query: "Add new product: Keyboard, price 9000, category Electronics",
                intent: Intent::AddProduct,
            },
            Case {
                query: "Добавь новый продукт: Мышка, цена 1500, категория Электроника",
                intent: Intent::AddProduct,
            },
            Case { query: "What is the average price of products?", intent: Intent::Statistics },
            Case { query: "Какая средняя цена продуктов?", intent: Intent::Statistics },
            Case { query: "Посчитай скидку 15% на товар с ID 1", intent: Intent::Discount },
            Case { query: "Calculate a 20% discount for product ID 2", intent: Intent::Discount },
            Case { query: "Создай заказ: product_id 1 quantity 2", intent: Intent::CreateOrder },
            Case { query: "Create order: product_id 1 quantity 2", intent: Intent::CreateOrder },
        ];

        for case in cases {
            let classification = classify(case.query);
            assert_eq!(
                classification.intent, case.intent,
                "query `{}` should classify as {}",
                case.query, case.intent
            );
        }
    }

    #[test]
    fn single_edit_misspellings_do_not_change_the_intent() {
        struct Case {
            misspelled: &'static str,
            clean: &'static str,
        }

        let cases = vec![
            Case {
                misspelled: "Show me all prodcts in catgory Electronics",
                clean: "Show me all products in category Electronics",
            },
            Case { misspelled: "Пакажи прадукты", clean: "Покажи продукты" },
            Case {
                misspelled: "Calculate a 20% discont for product ID 2",
                clean: "Calculate a 20% discount for product ID 2",
            },
            Case {
                misspelled: "Create ordr: product_id 1 quantity 2",
                clean: "Create order: product_id 1 quantity 2",
            },
        ];

        for case in cases {
            let misspelled = classify(case.misspelled);
            let clean = classify(case.clean);
            assert_eq!(
                misspelled.intent, clean.intent,
                "`{}` should classify like `{}`",
                case.misspelled, case.clean
            );
        }
    }

    #[test]
    fn noise_falls_below_threshold() {
        let classification = classify("asdkjh random text");
        assert_eq!(classification.intent, Intent::Unsupported);
        assert_eq!(classification.score, 0);
    }

    #[test]
    fn empty_query_is_unsupported() {
        assert_eq!(classify("").intent, Intent::Unsupported);
        assert_eq!(classify("   ").intent, Intent::Unsupported);
    }

    #[test]
    fn classification_carries_extracted_params() {
        let classification = classify("Посчитай скидку 15% на товар с ID 1");
        assert_eq!(classification.intent, Intent::Discount);
        assert_eq!(classification.params.get("percent"), Some(&ParamValue::Integer(15)));
        assert_eq!(classification.params.get("id"), Some(&ParamValue::Integer(1)));
    }

    #[test]
    fn transliteration_maps_cyrillic_to_latin_forms() {
        assert_eq!(transliterate("Скидка"), "skidka");
        assert_eq!(transliterate("Электроника"), "elektronika");
        assert_eq!(transliterate("discount"), "discount");
    }

    #[test]
    fn edit_distance_counts_single_edits() {
        assert_eq!(edit_distance("discount", "discount"), 0);
        assert_eq!(edit_distance("discont", "discount"), 1);
        assert_eq!(edit_distance("catgory", "category"), 1);
        assert_eq!(edit_distance("order", "quantity"), 8);
    }

    #[test]
    fn numbers_are_never_fuzzy_matched_to_keywords() {
        // "1d" is one edit from "id" but numeric-ish noise should not
        // become a keyword; pure numbers definitely must not.
        let classification = classify("100 200 300");
        assert_eq!(classification.intent, Intent::Unsupported);
    }
}
