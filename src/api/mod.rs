pub mod fmp;
pub mod news;
pub mod robinhood;
pub mod yahoo;

pub use fmp::FinancialModelingPrepClient;
pub use news::EnrichmentClient;
pub use robinhood::RobinhoodClient;
pub use yahoo::YahooClient;

use anyhow::Result;

use crate::models::{MarketSnapshot, RecommendationRating};

/// A market-data source that lists the day's "top mover" symbols
///
/// Sources are registered as a flat list and queried uniformly; each one
/// succeeds or fails on its own.
#[async_trait::async_trait]
pub trait TopMoversProvider: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn top_movers(&self) -> Result<Vec<String>>;
}

/// Per-symbol price and analyst-rating data
///
/// An unknown symbol yields zero-valued snapshot and rating with no error.
#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analysis(&self, symbol: &str) -> Result<(MarketSnapshot, RecommendationRating)>;
}

/// Company metadata and news lookup for notified symbols
#[async_trait::async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Resolve the company name behind a ticker symbol; an unknown symbol
    /// yields an empty string
    async fn company_name(&self, symbol: &str) -> Result<String>;

    /// Build a news link for the company; an empty company name is an error
    async fn news_url(&self, company_name: &str) -> Result<String>;
}
