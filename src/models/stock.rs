use serde::Deserialize;

/// Point-in-time market data for a symbol, produced once per screening run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketSnapshot {
    /// Regular-market change since previous close, in percentage points
    /// (52.3 means 52.3%)
    pub gain_percent: f64,

    /// Pre-market price, 0.0 when the source reports none
    pub pre_market_price: f64,

    /// Current market price
    pub current_price: f64,

    /// Analyst low price target
    pub target_low_price: f64,

    /// Analyst high price target
    pub target_high_price: f64,

    /// Analyst mean price target
    pub target_mean_price: f64,
}

/// Analyst recommendation counts for a symbol
///
/// Zero-valued when the source has no analyst coverage, which is a valid
/// state rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationRating {
    /// Rating period reported by the source (e.g. "0m")
    pub period: String,
    pub strong_buy: i64,
    pub buy: i64,
    pub hold: i64,
    pub sell: i64,
    pub strong_sell: i64,
}

/// Stock overview assembled for the aggregated notification
///
/// Built only for symbols that pass every pipeline stage; handed to the
/// notifier as a batch and then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Stock {
    pub symbol: String,

    /// Gain in percentage points at screening time
    pub gain: f64,

    pub current_price: f64,
    pub target_low_price: f64,
    pub target_high_price: f64,
    pub target_mean_price: f64,

    pub strong_buy: i64,
    pub buy: i64,
    pub hold: i64,
    pub sell: i64,
    pub strong_sell: i64,

    /// Link to news coverage for the company
    pub news_url: String,
}
