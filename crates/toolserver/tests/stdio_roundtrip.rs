//! End-to-end tests over a real subprocess: the transport channel drives the
//! compiled tool-server binary through its stdio protocol.

use std::time::Duration;

use serde_json::json;

use shopmate_core::errors::ChannelError;
use shopmate_transport::{ChannelConfig, ToolChannel};

fn server_config(role: &str, database_url: &str) -> ChannelConfig {
    let mut config = ChannelConfig::new(role, env!("CARGO_BIN_EXE_shopmate-toolserver"));
    config.args = vec![
        "--role".to_string(),
        role.to_string(),
        "--database-url".to_string(),
        database_url.to_string(),
    ];
    config.call_timeout = Duration::from_secs(10);
    config
}

fn temp_database(dir: &tempfile::TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("catalog.db").display())
}

#[tokio::test]
async fn products_server_round_trips_catalog_calls() {
    let dir = tempfile::tempdir().expect("tempdir");
    let channel = ToolChannel::start(server_config("products", &temp_database(&dir)))
        .await
        .expect("start products server");

    let products = channel.call("list_products", json!({})).await.expect("list_products");
    assert_eq!(products.as_array().expect("array").len(), 3, "seeded catalog expected");

    let product = channel.call("get_product", json!({"id": 1})).await.expect("get_product");
    assert_eq!(product["name"], "Ноутбук");
    assert_eq!(product["price"], "50000");

    channel.stop().await;
}

#[tokio::test]
async fn concurrent_calls_on_one_channel_resolve_to_their_own_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let channel = ToolChannel::start(server_config("products", &temp_database(&dir)))
        .await
        .expect("start products server");

    let (listing, stats) = tokio::join!(
        channel.call("list_products", json!({})),
        channel.call("statistics", json!({})),
    );

    let listing = listing.expect("list_products result");
    let stats = stats.expect("statistics result");
    assert!(listing.is_array(), "list result must stay a list");
    assert_eq!(stats["count"], 3, "statistics must not receive the listing payload");
    assert_eq!(stats["avg_price"], "19400");

    channel.stop().await;
}

#[tokio::test]
async fn tool_side_failure_carries_code_and_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    let channel = ToolChannel::start(server_config("products", &temp_database(&dir)))
        .await
        .expect("start products server");

    let outcome = channel.call("get_product", json!({"id": 999})).await;
    match outcome {
        Err(ChannelError::Tool { code, message }) => {
            assert_eq!(code, "not_found");
            assert!(message.contains("999"));
        }
        other => panic!("expected not_found tool error, got {other:?}"),
    }

    // A tool-side error is not a channel failure; the stream keeps working.
    let stats = channel.call("statistics", json!({})).await.expect("statistics after error");
    assert_eq!(stats["count"], 3);

    channel.stop().await;
}

#[tokio::test]
async fn orders_server_shares_the_catalog_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let database_url = temp_database(&dir);

    let products = ToolChannel::start(server_config("products", &database_url))
        .await
        .expect("start products server");
    // Force the seed to be visible before the orders server reads.
    products.call("list_products", json!({})).await.expect("seeded list");

    let orders = ToolChannel::start(server_config("orders", &database_url))
        .await
        .expect("start orders server");

    let order = orders
        .call("create_order", json!({"product_id": 1, "quantity": 2}))
        .await
        .expect("create_order");
    assert_eq!(order["product_name"], "Ноутбук");
    assert_eq!(order["total_price"], "100000");
    assert_eq!(order["quantity"], 2);

    orders.stop().await;
    products.stop().await;
}

#[tokio::test]
async fn stopped_channel_fails_fast_until_reconnect() {
    let dir = tempfile::tempdir().expect("tempdir");
    let channel = ToolChannel::start(server_config("products", &temp_database(&dir)))
        .await
        .expect("start products server");

    channel.call("statistics", json!({})).await.expect("statistics before stop");
    channel.stop().await;

    let outcome = channel.call("statistics", json!({})).await;
    assert!(matches!(outcome, Err(ChannelError::Unavailable(_))));
    assert!(channel.is_degraded());

    channel.reconnect().await.expect("reconnect");
    assert!(!channel.is_degraded());
    let stats = channel.call("statistics", json!({})).await.expect("statistics after reconnect");
    assert_eq!(stats["count"], 3);

    channel.stop().await;
}

#[tokio::test]
async fn unresponsive_server_times_out_with_tool_timeout() {
    // `sleep` accepts stdin and never writes a frame - a server that never
    // responds, as far as the channel can tell.
    let mut config = ChannelConfig::new("stuck", "sleep");
    config.args = vec!["5".to_string()];
    config.call_timeout = Duration::from_millis(50);
    config.shutdown_grace = Duration::from_millis(100);

    let channel = ToolChannel::start(config).await.expect("start sleeper");
    let outcome = channel.call("statistics", json!({})).await;
    assert!(matches!(outcome, Err(ChannelError::Timeout { timeout_ms: 50 })));

    channel.stop().await;
}

#[tokio::test]
async fn missing_executable_fails_with_process_launch_error() {
    let config = ChannelConfig::new("ghost", "shopmate-no-such-binary");
    let outcome = ToolChannel::start(config).await;
    assert!(matches!(outcome, Err(ChannelError::ProcessLaunch { .. })));
}
