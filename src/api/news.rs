use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::EnrichmentProvider;

const AUTOCOMPLETE_URL: &str = "https://autoc.finance.yahoo.com/autoc";
const NEWS_SEARCH_URL: &str = "https://news.google.com/search";
const SHORTENER_URL: &str = "https://cutt.ly/api/api.php";

/// Company-name and news-link enrichment for notified symbols
pub struct EnrichmentClient {
    client: Client,
    shortener_api_key: String,
    company_suffix: Regex,
}

/// Yahoo autocomplete envelope
#[derive(Debug, Deserialize)]
struct AutocompleteEnvelope {
    #[serde(rename = "ResultSet")]
    result_set: AutocompleteResultSet,
}

#[derive(Debug, Deserialize)]
struct AutocompleteResultSet {
    #[serde(rename = "Result", default)]
    result: Vec<AutocompleteEntry>,
}

#[derive(Debug, Deserialize)]
struct AutocompleteEntry {
    symbol: String,
    name: String,
}

/// cutt.ly shortener envelope
#[derive(Debug, Deserialize)]
struct ShortenerEnvelope {
    url: ShortenerResult,
}

#[derive(Debug, Deserialize)]
struct ShortenerResult {
    #[serde(rename = "shortLink", default)]
    short_link: String,
}

impl EnrichmentClient {
    /// Create a new enrichment client
    pub fn new(shortener_api_key: &str) -> Self {
        Self {
            client: Client::new(),
            shortener_api_key: shortener_api_key.to_string(),
            company_suffix: Regex::new(
                r"(?i)inc\.|incorporated|plc|corporation|corp\.|limited|ltd\.",
            )
            .unwrap(),
        }
    }

    /// News search query for a company: corporate suffixes stripped, words
    /// joined with `+`
    fn news_query(&self, company_name: &str) -> String {
        let stripped = self.company_suffix.replace_all(company_name, "");

        let mut query = String::from("+");
        query.push_str(&stripped.split_whitespace().collect::<Vec<_>>().join("+"));
        query
    }

    /// Shorten a link through cutt.ly; an empty short link falls back to the
    /// original
    async fn shorten(&self, uri: &str) -> Result<String> {
        let url = format!(
            "{}?key={}&short={}",
            SHORTENER_URL,
            self.shortener_api_key,
            urlencoding::encode(uri)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach URL shortener")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("URL shortener error: {} - {}", status, text);
        }

        let shortened: ShortenerEnvelope = response
            .json()
            .await
            .context("Failed to parse URL shortener response")?;

        if shortened.url.short_link.is_empty() {
            warn!("URL shortener returned no alias, keeping full link");
            return Ok(uri.to_string());
        }

        Ok(shortened.url.short_link)
    }
}

#[async_trait::async_trait]
impl EnrichmentProvider for EnrichmentClient {
    async fn company_name(&self, symbol: &str) -> Result<String> {
        let url = format!(
            "{}?lang=en&query={}",
            AUTOCOMPLETE_URL,
            urlencoding::encode(symbol)
        );
        debug!("Looking up company name for {}", symbol);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch company name")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Company lookup error: {} - {}", status, text);
        }

        let autocomplete: AutocompleteEnvelope = response
            .json()
            .await
            .context("Failed to parse company lookup response")?;

        let name = autocomplete
            .result_set
            .result
            .into_iter()
            .find(|entry| entry.symbol == symbol)
            .map(|entry| entry.name)
            .unwrap_or_default();

        Ok(name)
    }

    async fn news_url(&self, company_name: &str) -> Result<String> {
        if company_name.is_empty() {
            anyhow::bail!("News lookup requires a company name");
        }

        let link = format!("{}?q={}", NEWS_SEARCH_URL, self.news_query(company_name));
        self.shorten(&link).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_query_strips_corporate_suffixes() {
        let client = EnrichmentClient::new("");

        assert_eq!(client.news_query("Example Inc."), "+Example");
        assert_eq!(client.news_query("Example Corporation"), "+Example");
        assert_eq!(client.news_query("example incorporated"), "+example");
    }

    #[test]
    fn news_query_joins_words_with_plus() {
        let client = EnrichmentClient::new("");

        assert_eq!(
            client.news_query("Acme Rocket Holdings Ltd."),
            "+Acme+Rocket+Holdings"
        );
    }
}
