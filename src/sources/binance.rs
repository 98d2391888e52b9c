use super::{truncate_body, MarketDataSource, ERROR_BODY_LOG_CHARS};
use crate::error::{AppError, Result};
use crate::types::{Candle, Timeframe};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

const BINANCE_FAPI_URL: &str = "https://fapi.binance.com";

/// Binance caps klines requests at this many rows.
const MAX_KLINES: usize = 1500;

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    #[serde(default)]
    contract_type: String,
}

/// Binance USDⓈ-M futures REST client.
#[derive(Clone)]
pub struct BinanceFuturesClient {
    client: Client,
    base_url: String,
}

impl BinanceFuturesClient {
    /// Create a new client against `base_url` (defaults to the public API).
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("Scout/0.1")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| BINANCE_FAPI_URL.to_string()),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(
                "Binance API returned {} for {}: {}",
                status,
                path,
                truncate_body(&text, ERROR_BODY_LOG_CHARS)
            );
            return Err(AppError::DataFetch(format!("Binance API error: {}", status)));
        }

        Ok(response.json().await?)
    }

    async fn perpetual_symbols(&self) -> Result<Vec<String>> {
        let info: ExchangeInfo = self.get_json("/fapi/v1/exchangeInfo", &[]).await?;
        let symbols: Vec<String> = info
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING" && s.contract_type == "PERPETUAL")
            .map(|s| s.symbol)
            .collect();

        debug!("Binance listed {} perpetual symbols", symbols.len());
        Ok(symbols)
    }

    async fn klines(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<Candle>> {
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", timeframe.as_str().to_string()),
            ("limit", limit.clamp(1, MAX_KLINES).to_string()),
        ];
        let rows: Vec<Vec<Value>> = self.get_json("/fapi/v1/klines", &query).await?;

        rows.iter()
            .map(|row| {
                parse_kline_row(row).ok_or_else(|| {
                    AppError::DataFetch(format!("Malformed kline row for {}", symbol))
                })
            })
            .collect()
    }
}

/// Parse one klines row: `[openTime, open, high, low, close, volume, ...]`.
///
/// Prices arrive as strings; numbers are accepted too.
pub fn parse_kline_row(row: &[Value]) -> Option<Candle> {
    fn number(v: &Value) -> Option<f64> {
        match v {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    if row.len() < 6 {
        return None;
    }

    Some(Candle {
        timestamp: row[0].as_i64()?,
        open: number(&row[1])?,
        high: number(&row[2])?,
        low: number(&row[3])?,
        close: number(&row[4])?,
        volume: number(&row[5])?,
    })
}

impl MarketDataSource for BinanceFuturesClient {
    fn name(&self) -> &str {
        "binance-futures"
    }

    fn list_symbols(&self) -> Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + '_>> {
        Box::pin(self.perpetual_symbols())
    }

    fn fetch_candles<'a>(
        &'a self,
        symbol: &'a str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candle>>> + Send + 'a>> {
        Box::pin(self.klines(symbol, timeframe, limit))
    }
}
