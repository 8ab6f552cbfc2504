use shopmate_core::config::{AppConfig, LoadOptions};
use shopmate_db::{connect_with_settings, fixtures, migrations};

use super::CommandResult;

pub async fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("seed", "config", error.to_string(), 2),
    };

    let pool = match connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    {
        Ok(pool) => pool,
        Err(error) => return CommandResult::failure("seed", "database", error.to_string(), 2),
    };

    if let Err(error) = migrations::run_pending(&pool).await {
        return CommandResult::failure("seed", "migration", error.to_string(), 2);
    }

    match fixtures::seed_if_empty(&pool).await {
        Ok(summary) if summary.already_present => {
            CommandResult::success("seed", "catalog already populated; nothing inserted")
        }
        Ok(summary) => CommandResult::success(
            "seed",
            format!("inserted {} demo products into an empty catalog", summary.inserted),
        ),
        Err(error) => CommandResult::failure("seed", "fixtures", error.to_string(), 2),
    }
}
