//! Tool server binary.
//!
//! ```bash
//! # Catalog methods over stdio
//! shopmate-toolserver --role products
//!
//! # Order creation, sharing the same database file
//! shopmate-toolserver --role orders --database-url sqlite://shopmate.db?mode=rwc
//! ```
//!
//! stdout is the protocol stream, so all logging goes to stderr.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shopmate_toolserver::{serve, Role, ToolService};

#[derive(Debug, Parser)]
#[command(name = "shopmate-toolserver", about = "Shopmate tool server (line protocol on stdio)")]
struct Args {
    #[arg(long, value_enum)]
    role: Role,
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let database_url = args
        .database_url
        .or_else(|| std::env::var("SHOPMATE_DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://shopmate.db?mode=rwc".to_string());

    let pool = shopmate_db::connect(&database_url).await?;
    shopmate_db::migrations::run_pending(&pool).await?;

    if args.role == Role::Products {
        let seeded = shopmate_db::fixtures::seed_if_empty(&pool).await?;
        if !seeded.already_present {
            info!(
                event_name = "toolserver.seeded",
                inserted = seeded.inserted,
                "seeded demo catalog into empty store"
            );
        }
    }

    info!(
        event_name = "toolserver.started",
        role = args.role.as_str(),
        database_url = %database_url,
        "tool server listening on stdio"
    );

    let service = ToolService::new(args.role, pool);
    serve(&service, tokio::io::stdin(), tokio::io::stdout()).await
}
