use crate::models::{MarketSnapshot, RecommendationRating};

/// Minimum gain applied when no threshold is configured
pub const DEFAULT_GAIN_THRESHOLD: f64 = 50.0;

/// StrictConsensus requires the mean analyst target to be at least this
/// multiple of the current price
const STRICT_TARGET_MULTIPLE: f64 = 1.5;

/// Why a symbol was dropped by the filter
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("gain {actual:.2}% is below the {threshold:.2}% threshold")]
    BelowGainThreshold { actual: f64, threshold: f64 },

    #[error("pre-market price {pre_market:.2} is above current price {current:.2}")]
    PreMarketReversal { pre_market: f64, current: f64 },

    #[error("target high {target_high:.2} does not exceed current price {current:.2} and no buy ratings")]
    NoAnalystUpside { target_high: f64, current: f64 },

    #[error("{sell} sell and {strong_sell} strong-sell ratings on the book")]
    SellSideCoverage { sell: i64, strong_sell: i64 },

    #[error("no buy-side ratings")]
    NoBuySideCoverage,

    #[error("mean target {target_mean:.2} is below {multiple}x current price {current:.2}")]
    MeanTargetTooLow {
        target_mean: f64,
        current: f64,
        multiple: f64,
    },
}

/// Analyst-outlook rule variant
///
/// Two policies have been in force at different times; configuration picks
/// one rather than merging them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlookPolicy {
    /// Target high above the current price, or any buy-side coverage
    TargetOrBuyRating,

    /// No sell-side ratings, at least one buy-side rating, and a mean target
    /// of at least 1.5x the current price
    StrictConsensus,
}

impl OutlookPolicy {
    /// Parse a policy name from configuration
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "target-or-buy" => Some(OutlookPolicy::TargetOrBuyRating),
            "strict" => Some(OutlookPolicy::StrictConsensus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutlookPolicy::TargetOrBuyRating => "target-or-buy",
            OutlookPolicy::StrictConsensus => "strict",
        }
    }
}

/// A single threshold rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Gain must meet the configured minimum, boundary inclusive
    MinGain(f64),

    /// Pre-market price must not exceed the current price; guards against
    /// momentum that already reversed before the open
    PreMarketBelowCurrent,

    /// Analyst outlook must satisfy the selected policy
    AnalystOutlook(OutlookPolicy),
}

impl Rule {
    fn check(&self, snapshot: &MarketSnapshot, rating: &RecommendationRating) -> Result<(), Rejection> {
        match *self {
            Rule::MinGain(threshold) => {
                if snapshot.gain_percent < threshold {
                    return Err(Rejection::BelowGainThreshold {
                        actual: snapshot.gain_percent,
                        threshold,
                    });
                }
            }
            Rule::PreMarketBelowCurrent => {
                if snapshot.pre_market_price > snapshot.current_price {
                    return Err(Rejection::PreMarketReversal {
                        pre_market: snapshot.pre_market_price,
                        current: snapshot.current_price,
                    });
                }
            }
            Rule::AnalystOutlook(OutlookPolicy::TargetOrBuyRating) => {
                let has_upside = snapshot.target_high_price > snapshot.current_price;
                let has_buy_rating = rating.strong_buy > 0 || rating.buy > 0;
                if !has_upside && !has_buy_rating {
                    return Err(Rejection::NoAnalystUpside {
                        target_high: snapshot.target_high_price,
                        current: snapshot.current_price,
                    });
                }
            }
            Rule::AnalystOutlook(OutlookPolicy::StrictConsensus) => {
                if rating.sell > 0 || rating.strong_sell > 0 {
                    return Err(Rejection::SellSideCoverage {
                        sell: rating.sell,
                        strong_sell: rating.strong_sell,
                    });
                }
                if rating.buy == 0 && rating.strong_buy == 0 {
                    return Err(Rejection::NoBuySideCoverage);
                }
                if snapshot.target_mean_price < STRICT_TARGET_MULTIPLE * snapshot.current_price {
                    return Err(Rejection::MeanTargetTooLow {
                        target_mean: snapshot.target_mean_price,
                        current: snapshot.current_price,
                        multiple: STRICT_TARGET_MULTIPLE,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Ordered rule chain deciding whether a symbol is worth notifying
///
/// Pure and deterministic; evaluation short-circuits on the first failing
/// rule, whose rejection becomes the logged skip reason.
pub struct GainFilter {
    rules: Vec<Rule>,
}

impl GainFilter {
    /// Create the standard rule chain for a threshold and outlook policy
    pub fn new(gain_threshold: f64, policy: OutlookPolicy) -> Self {
        Self {
            rules: vec![
                Rule::MinGain(gain_threshold),
                Rule::PreMarketBelowCurrent,
                Rule::AnalystOutlook(policy),
            ],
        }
    }

    /// Accept the symbol, or reject it with the first failing rule's reason
    pub fn check(
        &self,
        snapshot: &MarketSnapshot,
        rating: &RecommendationRating,
    ) -> Result<(), Rejection> {
        for rule in &self.rules {
            rule.check(snapshot, rating)?;
        }
        Ok(())
    }
}
