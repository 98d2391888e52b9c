//! Market-data and notification collaborators.

pub mod binance;
pub mod telegram;

pub use binance::BinanceFuturesClient;
pub use telegram::TelegramNotifier;

use crate::error::Result;
use crate::types::{Candle, Timeframe};
use std::future::Future;
use std::pin::Pin;
use tracing::info;

/// Supplies tradable symbols and candle history.
pub trait MarketDataSource: Send + Sync {
    /// Source name for logs.
    fn name(&self) -> &str;

    /// All tradable symbols, in exchange order.
    fn list_symbols(&self) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + '_>>;

    /// The most recent `limit` candles, oldest first.
    fn fetch_candles<'a>(
        &'a self,
        symbol: &'a str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candle>>> + Send + 'a>>;
}

/// Delivers rendered signal text.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn notify<'a>(&'a self, text: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Longest prefix of an API error body that is logged.
pub(crate) const ERROR_BODY_LOG_CHARS: usize = 200;

/// First `max_chars` characters of `text`, cut on a char boundary.
pub(crate) fn truncate_body(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Notifier that writes messages to the log. Used when no chat is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn notify<'a>(&'a self, text: &'a str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            info!("Signal notification:\n{}", text);
            Ok(())
        })
    }
}
