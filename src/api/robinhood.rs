use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::api::TopMoversProvider;

const TOP_MOVERS_URL: &str = "https://api.robinhood.com/midlands/tags/tag/top-movers/";

/// Client for Robinhood's curated "Top Movers" tag
///
/// The tag endpoint returns instrument URIs, not symbols; each URI is
/// resolved with a second request.
pub struct RobinhoodClient {
    client: Client,
}

/// Top-movers tag response (instrument URIs only)
#[derive(Debug, Deserialize)]
struct MoversResponse {
    #[serde(default)]
    instruments: Vec<String>,
}

/// Instrument detail response
#[derive(Debug, Deserialize)]
struct InstrumentResponse {
    symbol: String,
}

impl RobinhoodClient {
    /// Create a new Robinhood client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Fetch the instrument URIs on today's top-movers list
    async fn instrument_uris(&self) -> Result<Vec<String>> {
        debug!("Fetching Robinhood top movers: {}", TOP_MOVERS_URL);

        let response = self
            .client
            .get(TOP_MOVERS_URL)
            .send()
            .await
            .context("Failed to fetch Robinhood top movers")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Robinhood API error: {} - {}", status, text);
        }

        let movers: MoversResponse = response
            .json()
            .await
            .context("Failed to parse Robinhood top movers response")?;

        Ok(movers.instruments)
    }

    /// Resolve the ticker symbol behind an instrument URI
    async fn symbol(&self, instrument_uri: &str) -> Result<String> {
        let response = self
            .client
            .get(instrument_uri)
            .send()
            .await
            .context("Failed to fetch Robinhood instrument")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Robinhood instrument error: {} - {}", status, text);
        }

        let instrument: InstrumentResponse = response
            .json()
            .await
            .context("Failed to parse Robinhood instrument response")?;

        Ok(instrument.symbol)
    }
}

#[async_trait::async_trait]
impl TopMoversProvider for RobinhoodClient {
    fn source_name(&self) -> &'static str {
        "robinhood"
    }

    async fn top_movers(&self) -> Result<Vec<String>> {
        let uris = self.instrument_uris().await?;

        let mut symbols = Vec::with_capacity(uris.len());
        for uri in uris {
            symbols.push(self.symbol(&uri).await?);
        }

        Ok(symbols)
    }
}
