use std::env;

use anyhow::{Context, Result};
use tracing::warn;

use crate::screener::{OutlookPolicy, DEFAULT_GAIN_THRESHOLD};

/// Application configuration loaded from environment variables
///
/// Read once at startup and passed into constructors; nothing reads the
/// environment after this.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL
    pub database_url: String,

    /// Short-lived dedup table name
    pub stocks_table: String,

    /// Long-lived price archive table name
    pub archive_table: String,

    /// Minimum gain (percentage points) for a symbol to qualify
    pub gain_threshold: f64,

    /// Which analyst-outlook rule variant is in force
    pub outlook_policy: OutlookPolicy,

    /// Telegram bot credential for digest delivery
    pub telegram_bot_token: String,

    /// Telegram chat the digest is delivered to
    pub telegram_chat_id: String,

    /// Financial Modeling Prep API key
    pub fmp_api_key: String,

    /// Backup key used after the daily rotation cutover
    pub fmp_api_key_backup: String,

    /// cutt.ly URL shortener API key
    pub cuttly_api_key: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let gain_threshold = match env::var("GAIN_THRESHOLD") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(
                    "GAIN_THRESHOLD {:?} is not a number, using {}",
                    raw, DEFAULT_GAIN_THRESHOLD
                );
                DEFAULT_GAIN_THRESHOLD
            }),
            Err(_) => DEFAULT_GAIN_THRESHOLD,
        };

        let outlook_policy = match env::var("OUTLOOK_POLICY") {
            Ok(raw) => OutlookPolicy::from_name(&raw).unwrap_or_else(|| {
                warn!(
                    "Unknown OUTLOOK_POLICY {:?}, using {}",
                    raw,
                    OutlookPolicy::TargetOrBuyRating.as_str()
                );
                OutlookPolicy::TargetOrBuyRating
            }),
            Err(_) => OutlookPolicy::TargetOrBuyRating,
        };

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/stocks.db".to_string()),

            stocks_table: env::var("STOCKS_TABLE").unwrap_or_else(|_| "stocks".to_string()),

            archive_table: env::var("ARCHIVE_TABLE")
                .unwrap_or_else(|_| "stocks_archive".to_string()),

            gain_threshold,

            outlook_policy,

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .context("TELEGRAM_BOT_TOKEN must be set")?,

            telegram_chat_id: env::var("TELEGRAM_CHAT_ID")
                .context("TELEGRAM_CHAT_ID must be set")?,

            fmp_api_key: env::var("FIN_MODELING_API_KEY").unwrap_or_default(),

            fmp_api_key_backup: env::var("FIN_MODELING_API_KEY_BACKUP").unwrap_or_default(),

            cuttly_api_key: env::var("CUTTLY_API_KEY").unwrap_or_default(),
        })
    }
}
