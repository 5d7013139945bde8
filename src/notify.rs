use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::models::Stock;

/// Delivers the aggregated screening digest
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Send one digest covering the whole batch; an empty batch is a no-op
    /// success
    async fn send(&self, stocks: &[Stock]) -> Result<()>;
}

/// Notifier publishing the digest as a single Telegram message
pub struct TelegramNotifier {
    http: Client,
    bot_token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessageRequest {
    chat_id: String,
    text: String,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            http: Client::new(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    /// Human-readable digest covering every stock in the batch
    fn format_digest(stocks: &[Stock]) -> String {
        let mut text = String::from("🚀🚀🚀\n");

        for stock in stocks {
            text.push_str(&format!(
                "\nSymbol: {}\nGainz: {:.2}%\nCurrentPrice: {:.2}\nTargetHigh: {:.2}\nTargetLow: {:.2}\nTargetMean: {:.2}\nStrongBuy: {}\nBuy: {}\nHold: {}\nSell: {}\nStrongSell: {}\n{}\n",
                stock.symbol,
                stock.gain,
                stock.current_price,
                stock.target_high_price,
                stock.target_low_price,
                stock.target_mean_price,
                stock.strong_buy,
                stock.buy,
                stock.hold,
                stock.sell,
                stock.strong_sell,
                stock.news_url,
            ));
        }

        text
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, stocks: &[Stock]) -> Result<()> {
        if stocks.is_empty() {
            return Ok(());
        }

        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );
        let request = SendMessageRequest {
            chat_id: self.chat_id.clone(),
            text: Self::format_digest(stocks),
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send Telegram message")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram API error: {} - {}", status, text);
        }

        info!("Delivered digest for {} stocks", stocks.len());
        Ok(())
    }
}
