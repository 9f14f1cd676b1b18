use anyhow::Result;
use dotenvy::dotenv;
use log::info;
use std::sync::Arc;

use nudge::core::clock::SystemClock;
use nudge::core::Config;
use nudge::features::delivery::{Dispatcher, StaticTemplates};
use nudge::features::{get_bot_version, get_features, scheduling::ReminderScheduler};
use nudge::messaging::ConsoleClient;
use nudge::storage::JsonStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Nudge Reminder Bot v{}...", get_bot_version());
    for feature in get_features() {
        info!("  feature {} v{}", feature.name, feature.version);
    }

    let store = Arc::new(JsonStore::new(&config.data_dir)?);
    let client = Arc::new(ConsoleClient::new());
    let clock = Arc::new(SystemClock);
    let templates = Arc::new(StaticTemplates::default());

    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        client.clone(),
        templates,
        clock.clone(),
        config.country_code.clone(),
        config.utc_offset,
        config.send_timeout,
    ));

    let scheduler = Arc::new(ReminderScheduler::new(
        store,
        dispatcher,
        client,
        clock,
        config.utc_offset,
        config.tick_interval,
    ));

    let handle = scheduler.clone().start();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    scheduler.stop().await;
    handle.await?;

    Ok(())
}
