use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::TopMoversProvider;

const GAINERS_URL: &str = "https://financialmodelingprep.com/api/v3/gainers";

/// Hour (UTC) after which the backup API key takes over, so the primary
/// key's daily request quota survives the late-session runs
const KEY_ROTATION_HOUR: u32 = 18;
const KEY_ROTATION_MINUTE: u32 = 30;

/// Client for the Financial Modeling Prep daily gainers list
pub struct FinancialModelingPrepClient {
    client: Client,
    api_key: String,
}

/// Gainers list entry
#[derive(Debug, Deserialize)]
struct TickerResponse {
    ticker: String,
}

impl FinancialModelingPrepClient {
    /// Create a new client, choosing between the primary and backup API key
    /// based on the current time of day
    pub fn new(api_key: &str, backup_api_key: &str) -> Self {
        Self::with_clock(api_key, backup_api_key, Utc::now())
    }

    fn with_clock(api_key: &str, backup_api_key: &str, now: DateTime<Utc>) -> Self {
        let rotation = now
            .date_naive()
            .and_hms_opt(KEY_ROTATION_HOUR, KEY_ROTATION_MINUTE, 0)
            .unwrap()
            .and_utc();

        let api_key = if now > rotation {
            info!("Past API key rotation time, using backup key");
            backup_api_key.to_string()
        } else {
            api_key.to_string()
        };

        Self {
            client: Client::new(),
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl TopMoversProvider for FinancialModelingPrepClient {
    fn source_name(&self) -> &'static str {
        "financial_modeling_prep"
    }

    async fn top_movers(&self) -> Result<Vec<String>> {
        let url = format!("{}?apikey={}", GAINERS_URL, self.api_key);
        debug!("Fetching Financial Modeling Prep gainers");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch Financial Modeling Prep gainers")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Financial Modeling Prep API error: {} - {}", status, text);
        }

        let gainers: Vec<TickerResponse> = response
            .json()
            .await
            .context("Failed to parse Financial Modeling Prep gainers response")?;

        Ok(gainers.into_iter().map(|g| g.ticker).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn primary_key_before_rotation_time() {
        let morning = Utc.with_ymd_and_hms(2026, 8, 6, 13, 0, 0).unwrap();
        let client = FinancialModelingPrepClient::with_clock("primary", "backup", morning);
        assert_eq!(client.api_key, "primary");
    }

    #[test]
    fn backup_key_after_rotation_time() {
        let evening = Utc.with_ymd_and_hms(2026, 8, 6, 18, 31, 0).unwrap();
        let client = FinancialModelingPrepClient::with_clock("primary", "backup", evening);
        assert_eq!(client.api_key, "backup");
    }
}
