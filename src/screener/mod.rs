pub mod fanout;
pub mod filter;

pub use filter::{GainFilter, OutlookPolicy, Rejection, DEFAULT_GAIN_THRESHOLD};

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::api::{AnalysisProvider, EnrichmentProvider, TopMoversProvider};
use crate::db::StockStore;
use crate::models::Stock;
use crate::notify::Notifier;
use fanout::join_all;

/// Orchestrates one screening run: source fan-out, per-symbol pipelines, and
/// the aggregated notification hand-off
pub struct Screener {
    providers: Vec<Arc<dyn TopMoversProvider>>,
    analysis: Arc<dyn AnalysisProvider>,
    enrichment: Arc<dyn EnrichmentProvider>,
    store: Arc<StockStore>,
    notifier: Arc<dyn Notifier>,
    filter: Arc<GainFilter>,
}

impl Screener {
    /// Create a new screener over the registered quote sources
    pub fn new(
        providers: Vec<Arc<dyn TopMoversProvider>>,
        analysis: Arc<dyn AnalysisProvider>,
        enrichment: Arc<dyn EnrichmentProvider>,
        store: Arc<StockStore>,
        notifier: Arc<dyn Notifier>,
        filter: Arc<GainFilter>,
    ) -> Self {
        Self {
            providers,
            analysis,
            enrichment,
            store,
            notifier,
            filter,
        }
    }

    /// Run one screening pass and return how many stocks were notified
    ///
    /// Everything upstream of the notifier is best-effort: a failing source
    /// or symbol is logged and dropped without disturbing its siblings. Only
    /// the notification delivery itself can fail the run.
    pub async fn run(&self) -> Result<usize> {
        let symbols = self.collect_candidates().await;
        info!("Screening {} unique symbols", symbols.len());

        let outcomes = join_all(symbols, |symbol| {
            let analysis = Arc::clone(&self.analysis);
            let enrichment = Arc::clone(&self.enrichment);
            let store = Arc::clone(&self.store);
            let filter = Arc::clone(&self.filter);
            screen_symbol(symbol, analysis, enrichment, store, filter)
        })
        .await;

        let mut stocks = Vec::new();
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(Some(stock)) => stocks.push(stock),
                // Skips were already logged with their reason
                Ok(None) => {}
                Err(e) => warn!("Dropping {}: {:#}", symbol, e),
            }
        }

        let sent = stocks.len();
        self.notifier
            .send(&stocks)
            .await
            .context("Failed to deliver notification")?;

        Ok(sent)
    }

    /// Query every quote source concurrently and union their symbols,
    /// deduplicated in first-seen order
    async fn collect_candidates(&self) -> Vec<String> {
        let outcomes = join_all(self.providers.clone(), |provider| async move {
            provider.top_movers().await
        })
        .await;

        let mut all = Vec::new();
        for (provider, outcome) in outcomes {
            match outcome {
                Ok(symbols) => {
                    info!(
                        "{} returned {} top movers",
                        provider.source_name(),
                        symbols.len()
                    );
                    all.extend(symbols);
                }
                Err(e) => {
                    error!("{} top movers failed: {:#}", provider.source_name(), e);
                }
            }
        }

        unique(all)
    }
}

/// One symbol's pipeline: analyze, validate, dedup-check, record, enrich
///
/// `Ok(None)` is an informational skip (validation or dedup); `Err` drops the
/// symbol as failed.
async fn screen_symbol(
    symbol: String,
    analysis: Arc<dyn AnalysisProvider>,
    enrichment: Arc<dyn EnrichmentProvider>,
    store: Arc<StockStore>,
    filter: Arc<GainFilter>,
) -> Result<Option<Stock>> {
    let (snapshot, rating) = analysis
        .analysis(&symbol)
        .await
        .context("Analysis fetch failed")?;

    if let Err(rejection) = filter.check(&snapshot, &rating) {
        info!("Skipping {}: {}", symbol, rejection);
        return Ok(None);
    }

    if store.exists(&symbol).await? {
        info!("Skipping {}: already notified today", symbol);
        return Ok(None);
    }

    // Dedup commit point: record before enrichment so a slow news lookup
    // cannot widen the duplicate-notification window
    store
        .insert(&symbol, snapshot.gain_percent, snapshot.current_price)
        .await?;

    let company = enrichment
        .company_name(&symbol)
        .await
        .context("Company lookup failed")?;
    let news_url = enrichment
        .news_url(&company)
        .await
        .context("News lookup failed")?;

    Ok(Some(Stock {
        symbol,
        gain: snapshot.gain_percent,
        current_price: snapshot.current_price,
        target_low_price: snapshot.target_low_price,
        target_high_price: snapshot.target_high_price,
        target_mean_price: snapshot.target_mean_price,
        strong_buy: rating.strong_buy,
        buy: rating.buy,
        hold: rating.hold,
        sell: rating.sell,
        strong_sell: rating.strong_sell,
        news_url,
    }))
}

/// Drop repeated symbols, keeping each one's first occurrence in place
fn unique(symbols: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .filter(|symbol| seen.insert(symbol.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::models::{MarketSnapshot, RecommendationRating};

    struct StaticProvider {
        name: &'static str,
        symbols: Option<Vec<&'static str>>,
    }

    #[async_trait::async_trait]
    impl TopMoversProvider for StaticProvider {
        fn source_name(&self) -> &'static str {
            self.name
        }

        async fn top_movers(&self) -> Result<Vec<String>> {
            match &self.symbols {
                Some(symbols) => Ok(symbols.iter().map(|s| s.to_string()).collect()),
                None => anyhow::bail!("source offline"),
            }
        }
    }

    struct StubAnalysis {
        data: HashMap<String, (MarketSnapshot, RecommendationRating)>,
    }

    #[async_trait::async_trait]
    impl AnalysisProvider for StubAnalysis {
        async fn analysis(
            &self,
            symbol: &str,
        ) -> Result<(MarketSnapshot, RecommendationRating)> {
            Ok(self.data.get(symbol).cloned().unwrap_or_default())
        }
    }

    struct StubEnrichment;

    #[async_trait::async_trait]
    impl EnrichmentProvider for StubEnrichment {
        async fn company_name(&self, symbol: &str) -> Result<String> {
            Ok(format!("{} Inc.", symbol))
        }

        async fn news_url(&self, company_name: &str) -> Result<String> {
            anyhow::ensure!(!company_name.is_empty(), "empty company name");
            Ok(format!("https://news.example/{}", company_name))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        batches: Mutex<Vec<Vec<Stock>>>,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, stocks: &[Stock]) -> Result<()> {
            self.batches.lock().unwrap().push(stocks.to_vec());
            Ok(())
        }
    }

    fn snapshot(gain: f64) -> MarketSnapshot {
        MarketSnapshot {
            gain_percent: gain,
            pre_market_price: 9.0,
            current_price: 10.0,
            target_low_price: 8.0,
            target_high_price: 18.0,
            target_mean_price: 16.0,
        }
    }

    fn analysis_for(entries: &[(&str, f64)]) -> Arc<StubAnalysis> {
        let data = entries
            .iter()
            .map(|(symbol, gain)| {
                (
                    symbol.to_string(),
                    (snapshot(*gain), RecommendationRating::default()),
                )
            })
            .collect();
        Arc::new(StubAnalysis { data })
    }

    async fn test_store() -> Arc<StockStore> {
        Arc::new(
            StockStore::new("sqlite::memory:", "stocks", "stocks_archive")
                .await
                .unwrap(),
        )
    }

    fn screener(
        providers: Vec<Arc<dyn TopMoversProvider>>,
        analysis: Arc<StubAnalysis>,
        store: Arc<StockStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> Screener {
        Screener::new(
            providers,
            analysis,
            Arc::new(StubEnrichment),
            store,
            notifier,
            Arc::new(GainFilter::new(
                DEFAULT_GAIN_THRESHOLD,
                OutlookPolicy::TargetOrBuyRating,
            )),
        )
    }

    #[test]
    fn unique_preserves_first_seen_order() {
        let input = vec!["a", "b", "c", "b", "c", "d"]
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(unique(input), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn unique_on_empty_input() {
        assert!(unique(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn overlapping_sources_notify_only_fresh_passing_symbols() {
        let providers: Vec<Arc<dyn TopMoversProvider>> = vec![
            Arc::new(StaticProvider {
                name: "alpha",
                symbols: Some(vec!["AAA", "BBB"]),
            }),
            Arc::new(StaticProvider {
                name: "beta",
                symbols: Some(vec!["BBB", "CCC"]),
            }),
        ];
        // AAA passes, BBB falls below the threshold, CCC passes the filter
        // but was already notified
        let analysis = analysis_for(&[("AAA", 60.0), ("BBB", 10.0), ("CCC", 70.0)]);
        let store = test_store().await;
        store.insert("CCC", 70.0, 10.0).await.unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let screener = screener(providers, analysis, Arc::clone(&store), Arc::clone(&notifier));

        let sent = screener.run().await.unwrap();
        assert_eq!(sent, 1);

        let batches = notifier.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);

        let stock = &batches[0][0];
        assert_eq!(stock.symbol, "AAA");
        assert_eq!(stock.gain, 60.0);
        assert_eq!(stock.news_url, "https://news.example/AAA Inc.");

        drop(batches);
        assert!(store.exists("AAA").await.unwrap());
        assert!(!store.exists("BBB").await.unwrap());
    }

    #[tokio::test]
    async fn empty_candidate_set_is_a_successful_noop() {
        let providers: Vec<Arc<dyn TopMoversProvider>> = vec![Arc::new(StaticProvider {
            name: "alpha",
            symbols: Some(vec![]),
        })];
        let analysis = analysis_for(&[]);
        let store = test_store().await;
        let notifier = Arc::new(RecordingNotifier::default());

        let screener = screener(providers, analysis, store, Arc::clone(&notifier));

        let sent = screener.run().await.unwrap();
        assert_eq!(sent, 0);

        let batches = notifier.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_empty());
    }

    #[tokio::test]
    async fn failing_source_does_not_abort_the_run() {
        let providers: Vec<Arc<dyn TopMoversProvider>> = vec![
            Arc::new(StaticProvider {
                name: "alpha",
                symbols: None,
            }),
            Arc::new(StaticProvider {
                name: "beta",
                symbols: Some(vec!["AAA"]),
            }),
        ];
        let analysis = analysis_for(&[("AAA", 60.0)]);
        let store = test_store().await;
        let notifier = Arc::new(RecordingNotifier::default());

        let screener = screener(providers, analysis, store, Arc::clone(&notifier));

        let sent = screener.run().await.unwrap();
        assert_eq!(sent, 1);
        assert_eq!(notifier.batches.lock().unwrap()[0][0].symbol, "AAA");
    }

    #[tokio::test]
    async fn second_run_suppresses_already_notified_symbols() {
        let providers: Vec<Arc<dyn TopMoversProvider>> = vec![Arc::new(StaticProvider {
            name: "alpha",
            symbols: Some(vec!["AAA"]),
        })];
        let analysis = analysis_for(&[("AAA", 60.0)]);
        let store = test_store().await;
        let notifier = Arc::new(RecordingNotifier::default());

        let screener = screener(
            providers,
            Arc::clone(&analysis),
            Arc::clone(&store),
            Arc::clone(&notifier),
        );

        assert_eq!(screener.run().await.unwrap(), 1);
        assert_eq!(screener.run().await.unwrap(), 0);

        let batches = notifier.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches[1].is_empty());
    }
}
