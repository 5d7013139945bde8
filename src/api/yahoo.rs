use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::api::AnalysisProvider;
use crate::models::{MarketSnapshot, RecommendationRating};

const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Client for the Yahoo Finance quoteSummary endpoint
pub struct YahooClient {
    client: Client,
}

/// Top-level quoteSummary envelope
#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    #[serde(default)]
    result: Option<Vec<QuoteResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct QuoteResult {
    recommendation_trend: RecommendationTrend,
    price: PriceBlock,
    financial_data: FinancialDataBlock,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationTrend {
    #[serde(default)]
    trend: Vec<RecommendationRating>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PriceBlock {
    regular_market_change_percent: RawValue,
    pre_market_price: RawValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FinancialDataBlock {
    current_price: RawValue,
    target_low_price: RawValue,
    target_high_price: RawValue,
    target_mean_price: RawValue,
}

/// Yahoo wraps every numeric field as `{"raw": 1.23, "fmt": "1.23"}`
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: f64,
}

impl YahooClient {
    /// Create a new Yahoo Finance client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for YahooClient {
    async fn analysis(&self, symbol: &str) -> Result<(MarketSnapshot, RecommendationRating)> {
        let url = format!(
            "{}/{}?region=US&modules=recommendationTrend%2Cprice%2CfinancialData",
            QUOTE_SUMMARY_URL,
            urlencoding::encode(symbol)
        );
        debug!("Fetching quote summary for {}", symbol);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch quote summary")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Symbol not found: {}", symbol);
            return Ok((MarketSnapshot::default(), RecommendationRating::default()));
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Yahoo quote summary error: {} - {}", status, text);
        }

        let envelope: QuoteSummaryEnvelope = response
            .json()
            .await
            .context("Failed to parse quote summary response")?;

        if let Some(error) = envelope.quote_summary.error {
            anyhow::bail!("Yahoo quote summary rejected {}: {}", symbol, error);
        }

        let result = match envelope
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
        {
            Some(result) => result,
            // No coverage for the symbol; zero-valued data is a valid state
            None => return Ok((MarketSnapshot::default(), RecommendationRating::default())),
        };

        let snapshot = MarketSnapshot {
            // Yahoo reports the change as a fraction; gain is carried in
            // percentage points everywhere downstream
            gain_percent: result.price.regular_market_change_percent.raw * 100.0,
            pre_market_price: result.price.pre_market_price.raw,
            current_price: result.financial_data.current_price.raw,
            target_low_price: result.financial_data.target_low_price.raw,
            target_high_price: result.financial_data.target_high_price.raw,
            target_mean_price: result.financial_data.target_mean_price.raw,
        };

        let rating = result
            .recommendation_trend
            .trend
            .into_iter()
            .next()
            .unwrap_or_default();

        Ok((snapshot, rating))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_quote_summary_payload() {
        let payload = json!({
            "quoteSummary": {
                "result": [{
                    "recommendationTrend": {
                        "trend": [
                            {"period": "0m", "strongBuy": 2, "buy": 5, "hold": 3, "sell": 1, "strongSell": 0}
                        ]
                    },
                    "price": {
                        "regularMarketChangePercent": {"raw": 0.523},
                        "preMarketPrice": {"raw": 11.2}
                    },
                    "financialData": {
                        "currentPrice": {"raw": 12.5},
                        "targetLowPrice": {"raw": 10.0},
                        "targetHighPrice": {"raw": 20.0},
                        "targetMeanPrice": {"raw": 15.0}
                    }
                }],
                "error": null
            }
        });

        let envelope: QuoteSummaryEnvelope = serde_json::from_value(payload).unwrap();
        let result = envelope.quote_summary.result.unwrap().remove(0);

        assert_eq!(result.price.regular_market_change_percent.raw, 0.523);
        assert_eq!(result.financial_data.target_high_price.raw, 20.0);
        assert_eq!(result.recommendation_trend.trend[0].strong_buy, 2);
        assert_eq!(result.recommendation_trend.trend[0].period, "0m");
    }

    #[test]
    fn missing_modules_default_to_zero() {
        let payload = json!({
            "quoteSummary": {
                "result": [{"price": {"regularMarketChangePercent": {"raw": 0.6}}}],
                "error": null
            }
        });

        let envelope: QuoteSummaryEnvelope = serde_json::from_value(payload).unwrap();
        let result = envelope.quote_summary.result.unwrap().remove(0);

        assert_eq!(result.financial_data.current_price.raw, 0.0);
        assert!(result.recommendation_trend.trend.is_empty());
    }
}
