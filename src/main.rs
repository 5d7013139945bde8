mod api;
mod config;
mod db;
mod models;
mod notify;
mod screener;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{
    EnrichmentClient, FinancialModelingPrepClient, RobinhoodClient, TopMoversProvider, YahooClient,
};
use crate::config::Config;
use crate::db::StockStore;
use crate::notify::TelegramNotifier;
use crate::screener::{GainFilter, Screener};

/// One screening pass per invocation; scheduling lives outside the process
/// (cron or a systemd timer), so a fatal error surfaces as a non-zero exit.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mover_signal=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mover-signal screening run");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded (threshold: {}%, policy: {})",
        config.gain_threshold,
        config.outlook_policy.as_str()
    );

    // Initialize store
    let store = Arc::new(
        StockStore::new(
            &config.database_url,
            &config.stocks_table,
            &config.archive_table,
        )
        .await?,
    );

    // Quote sources, queried uniformly
    let providers: Vec<Arc<dyn TopMoversProvider>> = vec![
        Arc::new(RobinhoodClient::new()),
        Arc::new(FinancialModelingPrepClient::new(
            &config.fmp_api_key,
            &config.fmp_api_key_backup,
        )),
    ];

    let analysis = Arc::new(YahooClient::new());
    let enrichment = Arc::new(EnrichmentClient::new(&config.cuttly_api_key));
    let notifier = Arc::new(TelegramNotifier::new(
        &config.telegram_bot_token,
        &config.telegram_chat_id,
    ));
    let filter = Arc::new(GainFilter::new(
        config.gain_threshold,
        config.outlook_policy,
    ));

    let screener = Screener::new(providers, analysis, enrichment, store, notifier, filter);

    let sent = screener.run().await?;
    info!("Screening run complete, {} stocks notified", sent);

    Ok(())
}
