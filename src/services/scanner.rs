//! Periodic scan orchestrator.
//!
//! A cycle lists symbols, fans out over every (symbol, timeframe) pair with
//! bounded concurrency, evaluates the rule engine on each pair and forwards
//! fired signals through the cooldown gate to the notifier.

use crate::error::{AppError, Result};
use crate::services::cooldown::CooldownTable;
use crate::services::signals::{format_signal, MarketContext, RuleEngine};
use crate::sources::{MarketDataSource, Notifier};
use crate::types::{Signal, Timeframe};
use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Knobs for one scan cycle.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Only symbols ending with this suffix are scanned.
    pub quote_suffix: String,
    pub symbol_limit: usize,
    pub timeframes: Vec<Timeframe>,
    pub candle_limit: usize,
    /// Upper bound on every collaborator call.
    pub call_timeout: Duration,
    pub concurrency: usize,
    /// Leverage shown in trade notifications.
    pub leverage: u32,
    pub scan_interval: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            quote_suffix: "USDT".to_string(),
            symbol_limit: 100,
            timeframes: vec![
                Timeframe::FifteenMinutes,
                Timeframe::ThirtyMinutes,
                Timeframe::OneHour,
                Timeframe::FourHours,
            ],
            candle_limit: 200,
            call_timeout: Duration::from_secs(10),
            concurrency: 8,
            leverage: 20,
            scan_interval: Duration::from_secs(60),
        }
    }
}

/// Counters for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pairs_scanned: usize,
    pub pairs_failed: usize,
    pub signals_fired: usize,
    pub notified: usize,
    pub suppressed: usize,
    pub notify_failed: usize,
}

impl CycleReport {
    fn absorb(&mut self, pair: PairOutcome) {
        match pair {
            PairOutcome::Failed => self.pairs_failed += 1,
            PairOutcome::Scanned(counts) => {
                self.pairs_scanned += 1;
                self.signals_fired += counts.fired;
                self.notified += counts.notified;
                self.suppressed += counts.suppressed;
                self.notify_failed += counts.notify_failed;
            }
        }
    }
}

#[derive(Debug, Default)]
struct PairCounts {
    fired: usize,
    notified: usize,
    suppressed: usize,
    notify_failed: usize,
}

enum PairOutcome {
    Scanned(PairCounts),
    Failed,
}

/// Runs scan cycles against a market-data source and a notifier.
pub struct Scanner {
    source: Arc<dyn MarketDataSource>,
    notifier: Arc<dyn Notifier>,
    engine: RuleEngine,
    cooldown: CooldownTable,
    settings: ScanSettings,
}

impl Scanner {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        notifier: Arc<dyn Notifier>,
        engine: RuleEngine,
        cooldown: CooldownTable,
        settings: ScanSettings,
    ) -> Self {
        if settings.candle_limit < engine.max_min_candles() {
            warn!(
                "Candle limit {} is below the {} candles some rules need; those rules will never fire",
                settings.candle_limit,
                engine.max_min_candles()
            );
        }

        Self {
            source,
            notifier,
            engine,
            cooldown,
            settings,
        }
    }

    pub fn cooldown(&self) -> &CooldownTable {
        &self.cooldown
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Run cycles on the scan interval until `shutdown` fires.
    ///
    /// A cycle always runs to completion before the next tick or the
    /// shutdown signal is observed.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            "Scanner started: {} rules, {} timeframes, every {}s",
            self.engine.len(),
            self.settings.timeframes.len(),
            self.settings.scan_interval.as_secs()
        );

        let mut ticker = interval(self.settings.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.scan_cycle().await {
                        Ok(report) => info!(
                            "Scan cycle done: {} pairs, {} failed, {} fired, {} sent, {} suppressed, {} send failures",
                            report.pairs_scanned,
                            report.pairs_failed,
                            report.signals_fired,
                            report.notified,
                            report.suppressed,
                            report.notify_failed
                        ),
                        Err(e) => error!("Scan cycle aborted: {}", e),
                    }
                    let pruned = self.cooldown.prune(chrono::Utc::now().timestamp_millis());
                    if pruned > 0 {
                        debug!("Pruned {} expired cooldown entries", pruned);
                    }
                }
                _ = shutdown.recv() => {
                    info!("Scanner received shutdown signal");
                    break;
                }
            }
        }
    }

    /// One full cycle at the current wall-clock time.
    pub async fn scan_cycle(&self) -> Result<CycleReport> {
        self.scan_cycle_at(chrono::Utc::now().timestamp_millis()).await
    }

    /// One full cycle evaluated at `now_ms`.
    ///
    /// Fails only when the symbol list cannot be fetched; per-pair failures
    /// are logged and counted.
    pub async fn scan_cycle_at(&self, now_ms: i64) -> Result<CycleReport> {
        let symbols = self.symbols().await?;
        let pairs: Vec<(String, Timeframe)> = symbols
            .iter()
            .flat_map(|s| self.settings.timeframes.iter().map(move |tf| (s.clone(), *tf)))
            .collect();

        debug!(
            "Scanning {} symbols x {} timeframes",
            symbols.len(),
            self.settings.timeframes.len()
        );

        let concurrency = self.settings.concurrency.max(1);
        let mut outcomes = stream::iter(pairs)
            .map(|(symbol, timeframe)| async move {
                self.scan_pair(&symbol, timeframe, now_ms).await
            })
            .buffer_unordered(concurrency);

        let mut report = CycleReport::default();
        while let Some(outcome) = outcomes.next().await {
            report.absorb(outcome);
        }

        Ok(report)
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let all = self
            .with_timeout(self.source.list_symbols(), "symbol listing")
            .await?;
        let symbols: Vec<String> = all
            .into_iter()
            .filter(|s| s.ends_with(&self.settings.quote_suffix))
            .take(self.settings.symbol_limit)
            .collect();

        info!(
            "Loaded {} {} symbols from {}",
            symbols.len(),
            self.settings.quote_suffix,
            self.source.name()
        );
        Ok(symbols)
    }

    async fn scan_pair(&self, symbol: &str, timeframe: Timeframe, now_ms: i64) -> PairOutcome {
        let what = format!("{} {} candles", symbol, timeframe);
        let candles = match self
            .with_timeout(
                self.source
                    .fetch_candles(symbol, timeframe, self.settings.candle_limit),
                &what,
            )
            .await
        {
            Ok(candles) => candles,
            Err(e) if e.is_fetch_failure() => {
                warn!("Failed to fetch {}: {}", what, e);
                return PairOutcome::Failed;
            }
            Err(e) => {
                error!("Unexpected error loading {}: {}", what, e);
                return PairOutcome::Failed;
            }
        };

        let ctx = MarketContext::new(symbol, timeframe, candles, now_ms);
        let signals = self.engine.evaluate(&ctx).into_signals();
        if signals.is_empty() {
            debug!("No signal for {} {}", symbol, timeframe);
        }

        let mut counts = PairCounts::default();
        for signal in signals {
            counts.fired += 1;
            self.dispatch(&signal, now_ms, &mut counts).await;
        }

        PairOutcome::Scanned(counts)
    }

    /// Cooldown check, notify, and record only on confirmed delivery.
    async fn dispatch(&self, signal: &Signal, now_ms: i64, counts: &mut PairCounts) {
        if !self.cooldown.is_ready(&signal.key, now_ms) {
            let since_secs = self
                .cooldown
                .last_fired(&signal.key)
                .map(|last| (now_ms - last) / 1000)
                .unwrap_or_default();
            debug!(
                "{} already sent {}s ago, inside the cooldown window, skipping",
                signal.key, since_secs
            );
            counts.suppressed += 1;
            return;
        }

        info!(
            "{} signal for {} at {}: {}",
            signal.kind.title(),
            signal.symbol,
            signal.timeframe,
            signal.summary
        );

        let text = format_signal(signal, self.settings.leverage);
        match self
            .with_timeout(self.notifier.notify(&text), "notification")
            .await
        {
            Ok(()) => {
                self.cooldown.record(&signal.key, now_ms);
                counts.notified += 1;
            }
            Err(e) => {
                error!("{} notification for {} failed: {}", self.notifier.name(), signal.key, e);
                counts.notify_failed += 1;
            }
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = Result<T>>,
        what: &str,
    ) -> Result<T> {
        match timeout(self.settings.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(what.to_string())),
        }
    }
}
