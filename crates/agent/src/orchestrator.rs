//! The per-query state machine.
//!
//! One [`AgentRun`] walks `Received -> Classified -> Validated -> Invoking
//! -> Formatting -> Done`, with `Failed` reachable from any state. Every
//! issued tool call is awaited before the run ends, an unsupported intent
//! never reaches a transport channel, and every failure - including
//! programming errors - degrades to a formatted reply.

use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use shopmate_core::config::ReplyLanguage;
use shopmate_core::domain::{CatalogStatistics, Order, Product};
use shopmate_core::errors::{AgentError, ChannelError};
use shopmate_core::intent::{ExtractedParams, Intent, ParamValue};

use crate::classifier::IntentModel;
use crate::format;
use crate::registry::{ToolBinding, ToolRegistry};
use crate::tools;

/// Final product of one run, handed back to the boundary layer.
#[derive(Clone, Debug)]
pub struct AgentReply {
    pub reply: String,
    pub intent: Intent,
    pub duration: Duration,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Per-call timing surfaced in the reply metadata and log events.
#[derive(Clone, Debug)]
pub struct ToolCallRecord {
    pub call_id: u32,
    pub tool: &'static str,
    pub duration: Duration,
    pub outcome: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Received,
    Classified,
    Validated,
    Invoking,
    Formatting,
    Done,
    Failed,
}

impl RunState {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Classified => "classified",
            Self::Validated => "validated",
            Self::Invoking => "invoking",
            Self::Formatting => "formatting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

struct AgentRun<'a> {
    trace_id: &'a str,
    lang: ReplyLanguage,
    state: RunState,
    next_call_id: u32,
    records: Vec<ToolCallRecord>,
}

impl<'a> AgentRun<'a> {
    fn new(trace_id: &'a str, lang: ReplyLanguage) -> Self {
        Self { trace_id, lang, state: RunState::Received, next_call_id: 0, records: Vec::new() }
    }

    fn transition(&mut self, to: RunState) {
        debug!(
            event_name = "agent.state",
            trace_id = %self.trace_id,
            from = self.state.as_str(),
            to = to.as_str(),
            "run state transition"
        );
        self.state = to;
    }

    fn issue_call_id(&mut self) -> u32 {
        self.next_call_id += 1;
        self.next_call_id
    }
}

/// What a successful invoke phase produced, ready for formatting.
enum Invoked {
    Products(Vec<Product>),
    Product(Product),
    Added(Product),
    Stats(CatalogStatistics),
    Discount { product: Product, percent: Decimal, discounted: Decimal },
    Order(Order),
}

/// Tools each intent touches, in invocation order. `internal` names the
/// contract parameters supplied by an earlier step rather than extraction,
/// so validation knows not to demand them from the user.
struct PlanTool {
    tool: &'static str,
    internal: &'static [&'static str],
}

fn plan_for(intent: Intent) -> &'static [PlanTool] {
    match intent {
        Intent::ListProducts => &[PlanTool { tool: "list_products", internal: &[] }],
        Intent::GetProduct => &[PlanTool { tool: "get_product", internal: &[] }],
        Intent::AddProduct => &[
            PlanTool { tool: "list_products", internal: &[] },
            PlanTool { tool: "add_product", internal: &[] },
        ],
        Intent::Statistics => &[PlanTool { tool: "statistics", internal: &[] }],
        Intent::Discount => &[
            PlanTool { tool: "get_product", internal: &[] },
            PlanTool { tool: "discount", internal: &["price"] },
        ],
        Intent::CreateOrder => &[PlanTool { tool: "create_order", internal: &[] }],
        Intent::Unsupported => &[],
    }
}

pub struct Orchestrator {
    model: Box<dyn IntentModel>,
    registry: ToolRegistry,
    default_language: ReplyLanguage,
    tool_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        model: Box<dyn IntentModel>,
        registry: ToolRegistry,
        default_language: ReplyLanguage,
        tool_timeout: Duration,
    ) -> Self {
        Self { model, registry, default_language, tool_timeout }
    }

    /// Processes one query end to end. Never fails: every outcome, including
    /// internal errors, is a formatted reply plus timing metadata.
    pub async fn handle_query(&self, query: &str, trace_id: &str) -> AgentReply {
        let started = Instant::now();
        let lang = format::detect_language(query, self.default_language);
        let mut run = AgentRun::new(trace_id, lang);

        let classification = self.model.classify(query);
        run.transition(RunState::Classified);
        info!(
            event_name = "agent.classified",
            trace_id = %trace_id,
            intent = %classification.intent,
            score = classification.score,
            "query classified"
        );

        let intent = classification.intent;
        let reply = if intent == Intent::Unsupported {
            run.transition(RunState::Formatting);
            let text = format::help_text(run.lang);
            run.transition(RunState::Done);
            text
        } else {
            match self.validate(intent, &classification.params) {
                Err(failure) => self.fail(&mut run, &failure),
                Ok(()) => {
                    run.transition(RunState::Validated);
                    run.transition(RunState::Invoking);
                    match self.invoke(&mut run, intent, &classification.params).await {
                        Err(failure) => self.fail(&mut run, &failure),
                        Ok(invoked) => {
                            run.transition(RunState::Formatting);
                            let text = render(&invoked, run.lang);
                            run.transition(RunState::Done);
                            text
                        }
                    }
                }
            }
        };

        let duration = started.elapsed();
        info!(
            event_name = "agent_done",
            trace_id = %trace_id,
            intent = %intent,
            duration_ms = duration.as_millis() as u64,
            final_state = run.state.as_str(),
            "agent run finished"
        );

        AgentReply { reply, intent, duration, tool_calls: run.records }
    }

    /// Checks extracted parameters against the contracts of every tool the
    /// intent plans to call, skipping parameters an earlier step supplies.
    fn validate(&self, intent: Intent, params: &ExtractedParams) -> Result<(), AgentError> {
        for step in plan_for(intent) {
            let registered = self.registry.lookup(step.tool)?;
            for spec in registered.contract.params {
                if !spec.required || step.internal.contains(&spec.name) {
                    continue;
                }
                if !params.contains(spec.name) {
                    return Err(AgentError::MissingParameter { name: spec.name.to_string() });
                }
            }
        }
        Ok(())
    }

    async fn invoke(
        &self,
        run: &mut AgentRun<'_>,
        intent: Intent,
        params: &ExtractedParams,
    ) -> Result<Invoked, AgentError> {
        match intent {
            Intent::ListProducts => {
                let payload = self.invoke_tool(run, "list_products", json!({})).await?;
                let products: Vec<Product> = parse_payload("list_products", payload)?;
                match params.get("category").and_then(ParamValue::as_text) {
                    Some(requested) => {
                        let (filtered, _resolved) =
                            tools::filter_products_by_category(products, requested);
                        Ok(Invoked::Products(filtered))
                    }
                    None => Ok(Invoked::Products(products)),
                }
            }
            Intent::GetProduct => {
                let id = required_integer(params, "id")?;
                let payload = self.invoke_tool(run, "get_product", json!({ "id": id })).await?;
                Ok(Invoked::Product(parse_payload("get_product", payload)?))
            }
            Intent::AddProduct => {
                // Existing categories steer fuzzy resolution so "electronics"
                // lands on a catalog category instead of forking a new one.
                let listing = self.invoke_tool(run, "list_products", json!({})).await?;
                let existing: Vec<Product> = parse_payload("list_products", listing)?;
                let mut categories = existing
                    .iter()
                    .map(|product| product.category.trim().to_string())
                    .filter(|category| !category.is_empty())
                    .collect::<Vec<_>>();
                categories.sort();
                categories.dedup();

                let requested = required_text(params, "category")?;
                let resolved = tools::resolve_category(&requested, &categories);
                let name = required_text(params, "name")?;
                let price = params
                    .get("price")
                    .and_then(ParamValue::as_decimal)
                    .ok_or_else(|| AgentError::MissingParameter { name: "price".to_string() })?;
                let in_stock = match params.get("in_stock") {
                    Some(ParamValue::Flag(value)) => *value,
                    _ => true,
                };

                let payload = self
                    .invoke_tool(
                        run,
                        "add_product",
                        json!({
                            "name": name,
                            "price": price.to_string(),
                            "category": resolved,
                            "in_stock": in_stock,
                        }),
                    )
                    .await?;
                Ok(Invoked::Added(parse_payload("add_product", payload)?))
            }
            Intent::Statistics => {
                let payload = self.invoke_tool(run, "statistics", json!({})).await?;
                Ok(Invoked::Stats(parse_payload("statistics", payload)?))
            }
            Intent::Discount => {
                let id = required_integer(params, "id")?;
                let percent_value = required_integer(params, "percent")?;

                let payload = self.invoke_tool(run, "get_product", json!({ "id": id })).await?;
                let product: Product = parse_payload("get_product", payload)?;

                let result = self
                    .invoke_tool(
                        run,
                        "discount",
                        json!({ "price": product.price.to_string(), "percent": percent_value }),
                    )
                    .await?;
                let discounted = result
                    .get("discounted_price")
                    .and_then(Value::as_str)
                    .and_then(|text| text.parse::<Decimal>().ok())
                    .ok_or_else(|| {
                        AgentError::Channel(ChannelError::Protocol(
                            "discount tool returned no discounted_price".to_string(),
                        ))
                    })?;

                Ok(Invoked::Discount {
                    product,
                    percent: Decimal::from(percent_value),
                    discounted,
                })
            }
            Intent::CreateOrder => {
                let product_id = required_integer(params, "product_id")?;
                let quantity = required_integer(params, "quantity")?;
                let payload = self
                    .invoke_tool(
                        run,
                        "create_order",
                        json!({ "product_id": product_id, "quantity": quantity }),
                    )
                    .await?;
                Ok(Invoked::Order(parse_payload("create_order", payload)?))
            }
            Intent::Unsupported => {
                // Guarded by the caller; reaching here is a programming error.
                Err(AgentError::UnknownTool("unsupported".to_string()))
            }
        }
    }

    /// Runs one tool through the registry, timing it and emitting the
    /// `tool_call` event whatever the outcome.
    async fn invoke_tool(
        &self,
        run: &mut AgentRun<'_>,
        tool: &'static str,
        args: Value,
    ) -> Result<Value, AgentError> {
        let registered = self.registry.lookup(tool)?;
        let call_id = run.issue_call_id();
        let args_summary = summarize(&args);
        let started = Instant::now();

        let outcome = match &registered.binding {
            ToolBinding::Channel { transport, method } => {
                transport.call(method, args, self.tool_timeout).await.map_err(AgentError::from)
            }
            ToolBinding::InProcess(function) => function(&args),
        };

        let duration = started.elapsed();
        let outcome_label = match &outcome {
            Ok(_) => "ok",
            Err(failure) => failure.kind(),
        };
        run.records.push(ToolCallRecord { call_id, tool, duration, outcome: outcome_label });

        info!(
            event_name = "tool_call",
            trace_id = %run.trace_id,
            tool,
            call_id,
            args_summary = %args_summary,
            duration_ms = duration.as_millis() as u64,
            outcome = outcome_label,
            "tool call finished"
        );

        outcome
    }

    /// Side-exit: log at a severity matching the failure class, then produce
    /// the user-facing reply. A tool failure short-circuits any remaining
    /// calls for this run before landing here.
    fn fail(&self, run: &mut AgentRun<'_>, failure: &AgentError) -> String {
        match failure {
            AgentError::UnknownTool(_)
            | AgentError::Channel(ChannelError::Protocol(_))
            | AgentError::Channel(ChannelError::ProcessLaunch { .. }) => {
                error!(
                    event_name = "agent.run_failed",
                    trace_id = %run.trace_id,
                    kind = failure.kind(),
                    error = %failure,
                    "internal failure during agent run"
                );
            }
            AgentError::Channel(_) => {
                warn!(
                    event_name = "agent.run_failed",
                    trace_id = %run.trace_id,
                    kind = failure.kind(),
                    error = %failure,
                    "tool failure during agent run"
                );
            }
            AgentError::MissingParameter { .. } | AgentError::InvalidArgument(_) => {
                info!(
                    event_name = "agent.run_failed",
                    trace_id = %run.trace_id,
                    kind = failure.kind(),
                    error = %failure,
                    "agent run needs clarification"
                );
            }
        }

        run.transition(RunState::Failed);
        format::failure_text(failure, run.lang)
    }
}

fn render(invoked: &Invoked, lang: ReplyLanguage) -> String {
    match invoked {
        Invoked::Products(products) => format::products_table(products, lang),
        Invoked::Product(product) => format::product_text(product, lang),
        Invoked::Added(product) => format::added_product_text(product, lang),
        Invoked::Stats(stats) => format::statistics_text(stats, lang),
        Invoked::Discount { product, percent, discounted } => {
            format::discount_text(product, *percent, *discounted, lang)
        }
        Invoked::Order(order) => format::order_text(order, lang),
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(
    tool: &str,
    payload: Value,
) -> Result<T, AgentError> {
    serde_json::from_value(payload).map_err(|source| {
        AgentError::Channel(ChannelError::Protocol(format!(
            "`{tool}` returned an unexpected payload shape: {source}"
        )))
    })
}

fn required_integer(params: &ExtractedParams, name: &str) -> Result<i64, AgentError> {
    params
        .get(name)
        .and_then(ParamValue::as_integer)
        .ok_or_else(|| AgentError::MissingParameter { name: name.to_string() })
}

fn required_text(params: &ExtractedParams, name: &str) -> Result<String, AgentError> {
    params
        .get(name)
        .and_then(ParamValue::as_text)
        .map(str::to_string)
        .ok_or_else(|| AgentError::MissingParameter { name: name.to_string() })
}

fn summarize(args: &Value) -> String {
    let text = args.to_string();
    if text.chars().count() <= 200 {
        return text;
    }
    let mut truncated = text.chars().take(197).collect::<String>();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use shopmate_core::config::ReplyLanguage;
    use shopmate_core::errors::ChannelError;
    use shopmate_core::intent::Intent;

    use crate::classifier::KeywordModel;
    use crate::format;
    use crate::registry::{ToolRegistry, ToolTransport};

    use super::Orchestrator;

    #[derive(Clone)]
    enum FakeOutcome {
        Ok(Value),
        Timeout,
        Unavailable,
        Tool { code: &'static str, message: &'static str },
    }

    struct FakeTransport {
        calls: Mutex<Vec<(String, Value)>>,
        responses: HashMap<&'static str, FakeOutcome>,
    }

    impl FakeTransport {
        fn new(responses: Vec<(&'static str, FakeOutcome)>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                responses: responses.into_iter().collect(),
            })
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl ToolTransport for FakeTransport {
        async fn call(
            &self,
            method: &str,
            args: Value,
            _timeout: Duration,
        ) -> Result<Value, ChannelError> {
            self.calls.lock().expect("calls lock").push((method.to_string(), args));
            match self.responses.get(method) {
                Some(FakeOutcome::Ok(value)) => Ok(value.clone()),
                Some(FakeOutcome::Timeout) => Err(ChannelError::Timeout { timeout_ms: 50 }),
                Some(FakeOutcome::Unavailable) => {
                    Err(ChannelError::Unavailable("degraded".to_string()))
                }
                Some(FakeOutcome::Tool { code, message }) => Err(ChannelError::Tool {
                    code: code.to_string(),
                    message: message.to_string(),
                }),
                None => panic!("unexpected method `{method}`"),
            }
        }

        fn is_degraded(&self) -> bool {
            false
        }
    }

    fn catalog_payload() -> Value {
        json!([
            {"id": 1, "name": "Ноутбук", "price": "50000", "category": "Электроника", "in_stock": true},
            {"id": 2, "name": "Наушники", "price": "7000", "category": "Электроника", "in_stock": true},
            {"id": 3, "name": "Кофе", "price": "1200", "category": "Продукты", "in_stock": false},
        ])
    }

    fn orchestrator_with(
        products: Arc<FakeTransport>,
        orders: Arc<FakeTransport>,
    ) -> Orchestrator {
        Orchestrator::new(
            Box::new(KeywordModel::default()),
            ToolRegistry::standard(products, orders),
            ReplyLanguage::En,
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn list_products_fixture_issues_one_call_and_filters_by_category() {
        let products = FakeTransport::new(vec![("list_products", FakeOutcome::Ok(catalog_payload()))]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), orders);

        let reply = orchestrator
            .handle_query("Show me all products in category Electronics", "trace-1")
            .await;

        assert_eq!(reply.intent, Intent::ListProducts);
        let calls = products.calls();
        assert_eq!(calls.len(), 1, "exactly one tool call expected");
        assert_eq!(calls[0].0, "list_products");
        assert!(reply.reply.contains("Ноутбук"));
        assert!(reply.reply.contains("Наушники"));
        assert!(!reply.reply.contains("Кофе"), "other categories must be filtered out");
    }

    #[tokio::test]
    async fn discount_fixture_composes_get_product_then_in_process_discount() {
        let products = FakeTransport::new(vec![(
            "get_product",
            FakeOutcome::Ok(json!({
                "id": 1, "name": "Ноутбук", "price": "50000",
                "category": "Электроника", "in_stock": true
            })),
        )]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), orders);

        let reply =
            orchestrator.handle_query("Посчитай скидку 15% на товар с ID 1", "trace-2").await;

        assert_eq!(reply.intent, Intent::Discount);
        let calls = products.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("get_product".to_string(), json!({"id": 1})));

        let tools = reply.tool_calls.iter().map(|record| record.tool).collect::<Vec<_>>();
        assert_eq!(tools, vec!["get_product", "discount"], "fixed dependency order");
        assert!(reply.reply.contains("42500"));
        assert!(reply.reply.contains("Скидка"), "reply language mirrors the query");
    }

    #[tokio::test]
    async fn noise_query_reaches_no_transport_and_gets_fallback() {
        let products = FakeTransport::new(vec![]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), Arc::clone(&orders));

        let reply = orchestrator.handle_query("asdkjh random text", "trace-3").await;

        assert_eq!(reply.intent, Intent::Unsupported);
        assert!(products.calls().is_empty());
        assert!(orders.calls().is_empty());
        assert!(reply.tool_calls.is_empty());
        assert_eq!(reply.reply, format::help_text(ReplyLanguage::En));
    }

    #[tokio::test]
    async fn missing_parameter_asks_for_clarification_without_calling_tools() {
        let products = FakeTransport::new(vec![]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), Arc::clone(&orders));

        let reply = orchestrator.handle_query("Создай заказ", "trace-4").await;

        assert_eq!(reply.intent, Intent::CreateOrder);
        assert!(orders.calls().is_empty());
        assert!(reply.reply.contains("product_id"), "clarification names the parameter");
    }

    #[tokio::test]
    async fn statistics_intent_with_no_required_params_never_asks_for_clarification() {
        let products = FakeTransport::new(vec![(
            "statistics",
            FakeOutcome::Ok(json!({"count": 3, "avg_price": "19400"})),
        )]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), orders);

        let reply = orchestrator.handle_query("Какая средняя цена продуктов?", "trace-5").await;

        assert_eq!(reply.intent, Intent::Statistics);
        assert!(reply.reply.contains("19400"));
        assert!(reply.reply.contains("Средняя цена"));
    }

    #[tokio::test]
    async fn tool_timeout_degrades_to_apology_reply() {
        let products = FakeTransport::new(vec![("statistics", FakeOutcome::Timeout)]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), orders);

        let reply = orchestrator.handle_query("What is the average price of products?", "t-6").await;

        assert_eq!(reply.intent, Intent::Statistics);
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].outcome, "timeout");
        assert!(reply.reply.contains("not responding"), "apology text, not an error dump");
    }

    #[tokio::test]
    async fn degraded_channel_also_degrades_to_apology() {
        let products = FakeTransport::new(vec![("list_products", FakeOutcome::Unavailable)]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), orders);

        let reply = orchestrator.handle_query("Show me all products", "t-7").await;

        assert_eq!(reply.tool_calls[0].outcome, "unavailable");
        assert!(reply.reply.contains("not responding"));
    }

    #[tokio::test]
    async fn tool_side_error_short_circuits_remaining_calls() {
        let products = FakeTransport::new(vec![(
            "get_product",
            FakeOutcome::Tool { code: "not_found", message: "Product with id=9 not found" },
        )]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), orders);

        let reply = orchestrator.handle_query("Посчитай скидку 10% на товар с ID 9", "t-8").await;

        // get_product failed, so the in-process discount step never ran.
        let tools = reply.tool_calls.iter().map(|record| record.tool).collect::<Vec<_>>();
        assert_eq!(tools, vec!["get_product"]);
        assert!(reply.reply.contains("Product with id=9 not found"));
    }

    #[tokio::test]
    async fn create_order_passes_extracted_arguments_through() {
        let products = FakeTransport::new(vec![]);
        let orders = FakeTransport::new(vec![(
            "create_order",
            FakeOutcome::Ok(json!({
                "id": 1, "product_id": 1, "product_name": "Ноутбук", "unit_price": "50000",
                "quantity": 2, "total_price": "100000", "created_at": "2026-01-15 10:00:00"
            })),
        )]);
        let orchestrator = orchestrator_with(products, Arc::clone(&orders));

        let reply =
            orchestrator.handle_query("Create order: product_id 1 quantity 2", "t-9").await;

        assert_eq!(reply.intent, Intent::CreateOrder);
        assert_eq!(
            orders.calls(),
            vec![("create_order".to_string(), json!({"product_id": 1, "quantity": 2}))]
        );
        assert!(reply.reply.contains("Order created"));
        assert!(reply.reply.contains("100000"));
    }

    #[tokio::test]
    async fn add_product_resolves_category_against_catalog() {
        let products = FakeTransport::new(vec![
            ("list_products", FakeOutcome::Ok(catalog_payload())),
            (
                "add_product",
                FakeOutcome::Ok(json!({
                    "id": 4, "name": "Клавиатура", "price": "9000",
                    "category": "Электроника", "in_stock": true
                })),
            ),
        ]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), orders);

        let reply = orchestrator
            .handle_query("Add new product: Клавиатура, price 9000, category electronics", "t-10")
            .await;

        assert_eq!(reply.intent, Intent::AddProduct);
        let calls = products.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].0, "add_product");
        assert_eq!(calls[1].1["category"], "Электроника", "fuzzy category resolution applied");
        assert!(reply.reply.contains("ID 4"));
    }

    #[tokio::test]
    async fn out_of_range_discount_is_rejected_by_the_pure_tool() {
        let products = FakeTransport::new(vec![(
            "get_product",
            FakeOutcome::Ok(json!({
                "id": 1, "name": "Ноутбук", "price": "50000",
                "category": "Электроника", "in_stock": true
            })),
        )]);
        let orders = FakeTransport::new(vec![]);
        let orchestrator = orchestrator_with(Arc::clone(&products), orders);

        let reply =
            orchestrator.handle_query("Calculate a 150% discount for product ID 1", "t-11").await;

        assert_eq!(reply.intent, Intent::Discount);
        let outcomes = reply.tool_calls.iter().map(|r| r.outcome).collect::<Vec<_>>();
        assert_eq!(outcomes, vec!["ok", "invalid_argument"]);
        assert!(reply.reply.contains("percent must be in [0, 100]"));
    }

    #[tokio::test]
    async fn same_query_and_responses_produce_identical_replies() {
        for _ in 0..2 {
            let products = FakeTransport::new(vec![(
                "get_product",
                FakeOutcome::Ok(json!({
                    "id": 1, "name": "Ноутбук", "price": "50000",
                    "category": "Электроника", "in_stock": true
                })),
            )]);
            let orders = FakeTransport::new(vec![]);
            let orchestrator = orchestrator_with(products, orders);

            let first =
                orchestrator.handle_query("Посчитай скидку 15% на товар с ID 1", "t-12").await;
            let second =
                orchestrator.handle_query("Посчитай скидку 15% на товар с ID 1", "t-12").await;
            assert_eq!(first.reply, second.reply, "no hidden randomness in the pipeline");
        }
    }
}
