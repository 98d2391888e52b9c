use crate::services::signals::patterns::EngulfOptions;
use crate::services::signals::rules::{
    CrtConfig, FiboPullbackConfig, RuleConfig, RuleFamily, SwingReversalConfig,
    TrendAlignmentConfig,
};
use crate::services::ScanSettings;
use crate::types::{Timeframe, DEFAULT_TARGET_MULTIPLES};
use std::env;
use std::time::Duration;
use tracing::warn;

/// Telegram delivery credentials.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Seconds between scan cycles.
    pub scan_interval_secs: u64,
    /// Maximum number of symbols scanned per cycle.
    pub symbols_limit: usize,
    /// Quote asset suffix symbols must end with.
    pub quote_suffix: String,
    pub timeframes: Vec<Timeframe>,
    /// Candles fetched per (symbol, timeframe).
    pub candle_limit: usize,
    /// Cooldown window per signal key, in seconds.
    pub signal_cooldown_secs: u64,
    /// Timeout for each exchange or notification call.
    pub fetch_timeout_secs: u64,
    /// Pairs scanned in parallel.
    pub scan_concurrency: usize,
    /// Leverage shown in trade notifications.
    pub default_leverage: u32,
    pub enabled_rules: Vec<RuleFamily>,
    /// Binance futures REST base URL override.
    pub binance_fapi_url: Option<String>,
    /// Telegram credentials; notifications go to the log when absent.
    pub telegram: Option<TelegramConfig>,
    pub rules: RuleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeframes = lookup("TIMEFRAMES")
            .map(|v| parse_list(&v, Timeframe::from_str, "timeframe"))
            .filter(|tfs| !tfs.is_empty())
            .unwrap_or_else(|| {
                vec![
                    Timeframe::FifteenMinutes,
                    Timeframe::ThirtyMinutes,
                    Timeframe::OneHour,
                    Timeframe::FourHours,
                ]
            });

        let enabled_rules = lookup("ENABLED_RULES")
            .map(|v| parse_list(&v, RuleFamily::from_str, "rule family"))
            .unwrap_or_else(RuleFamily::all);

        let telegram = match (lookup("TELEGRAM_TOKEN"), lookup("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(TelegramConfig { token, chat_id })
            }
            _ => None,
        };

        Self {
            scan_interval_secs: setting(&lookup, "SCAN_INTERVAL_SECS", |v: &u64| *v > 0)
                .unwrap_or(60),
            symbols_limit: setting(&lookup, "SYMBOLS_LIMIT", |_| true).unwrap_or(100),
            quote_suffix: lookup("QUOTE_SUFFIX").unwrap_or_else(|| "USDT".to_string()),
            timeframes,
            candle_limit: setting(&lookup, "CANDLE_LIMIT", |v: &usize| *v > 0).unwrap_or(200),
            signal_cooldown_secs: setting(&lookup, "SIGNAL_COOLDOWN_SECS", |_| true)
                .unwrap_or(15 * 60),
            fetch_timeout_secs: setting(&lookup, "FETCH_TIMEOUT_SECS", |v: &u64| *v > 0)
                .unwrap_or(10),
            scan_concurrency: setting(&lookup, "SCAN_CONCURRENCY", |v: &usize| *v > 0)
                .unwrap_or(8),
            default_leverage: setting(&lookup, "DEFAULT_LEVERAGE", |v: &u32| *v > 0)
                .unwrap_or(20),
            enabled_rules,
            binance_fapi_url: lookup("BINANCE_FAPI_URL").filter(|v| !v.is_empty()),
            telegram,
            rules: rule_config(&lookup),
        }
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            quote_suffix: self.quote_suffix.clone(),
            symbol_limit: self.symbols_limit,
            timeframes: self.timeframes.clone(),
            candle_limit: self.candle_limit,
            call_timeout: Duration::from_secs(self.fetch_timeout_secs),
            concurrency: self.scan_concurrency,
            leverage: self.default_leverage,
            scan_interval: Duration::from_secs(self.scan_interval_secs),
        }
    }

    pub fn cooldown_window(&self) -> Duration {
        Duration::from_secs(self.signal_cooldown_secs)
    }
}

/// Per-rule thresholds. Each family keeps its own defaults; the shared
/// variables below only override the family they name.
fn rule_config<F>(lookup: &F) -> RuleConfig
where
    F: Fn(&str) -> Option<String>,
{
    let float = |key: &str| setting(lookup, key, |v: &f64| v.is_finite() && *v >= 0.0);

    let trend_defaults = TrendAlignmentConfig::default();
    let trend = TrendAlignmentConfig {
        engulf: EngulfOptions {
            min_body_pct: float("ENGULF_MIN_BODY_PCT").unwrap_or(trend_defaults.engulf.min_body_pct),
            partial_engulf_pct: float("ENGULF_PARTIAL_PCT")
                .unwrap_or(trend_defaults.engulf.partial_engulf_pct),
            require_volume: setting(lookup, "ENGULF_REQUIRE_VOLUME", |_| true)
                .unwrap_or(trend_defaults.engulf.require_volume),
            volume_multiplier: float("ENGULF_VOLUME_MULT")
                .unwrap_or(trend_defaults.engulf.volume_multiplier),
            ..trend_defaults.engulf
        },
        ..trend_defaults
    };

    let fibo_defaults = FiboPullbackConfig::default();
    let fibo = FiboPullbackConfig {
        zone_proximity: float("ZONE_PROXIMITY").unwrap_or(fibo_defaults.zone_proximity),
        ema_confluence_tolerance: float("EMA_CONFLUENCE_TOLERANCE")
            .unwrap_or(fibo_defaults.ema_confluence_tolerance),
        ..fibo_defaults
    };

    let reversal_defaults = SwingReversalConfig::default();
    let reversal = SwingReversalConfig {
        divergence_lookback: setting(lookup, "DIVERGENCE_LOOKBACK", |v: &usize| *v >= 2)
            .unwrap_or(reversal_defaults.divergence_lookback),
        ema_proximity: float("EMA_PROXIMITY").unwrap_or(reversal_defaults.ema_proximity),
        ..reversal_defaults
    };

    let crt_defaults = CrtConfig::default();
    let crt = CrtConfig {
        max_overlap: float("CRT_MAX_OVERLAP").unwrap_or(crt_defaults.max_overlap),
        min_tail: float("CRT_MIN_TAIL").unwrap_or(crt_defaults.min_tail),
        swing_lookback: setting(lookup, "CRT_SWING_LOOKBACK", |v: &usize| *v > 0)
            .unwrap_or(crt_defaults.swing_lookback),
        close_window: lookup("CRT_CLOSE_WINDOW")
            .and_then(|v| {
                let window = parse_window(&v);
                if window.is_none() {
                    warn!("Ignoring invalid CRT_CLOSE_WINDOW='{}', expected min-max", v);
                }
                window
            })
            .or(crt_defaults.close_window),
    };

    RuleConfig {
        trend,
        fibo,
        reversal,
        crt,
        target_multiples: DEFAULT_TARGET_MULTIPLES,
    }
}

/// Parsed value of `key`. Values that fail to parse or are rejected by
/// `valid` are logged and treated as unset.
fn setting<T, F>(lookup: &F, key: &str, valid: impl Fn(&T) -> bool) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => Some(value),
        _ => {
            warn!("Ignoring invalid {}='{}', using default", key, raw);
            None
        }
    }
}

/// Comma-separated list; unknown entries are logged and skipped.
fn parse_list<T>(value: &str, parse: impl Fn(&str) -> Option<T>, what: &str) -> Vec<T> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let parsed = parse(s);
            if parsed.is_none() {
                warn!("Ignoring unknown {} '{}'", what, s);
            }
            parsed
        })
        .collect()
}

/// `"min-max"` in minutes.
fn parse_window(value: &str) -> Option<(i64, i64)> {
    let (min, max) = value.split_once('-')?;
    let min: i64 = min.trim().parse().ok()?;
    let max: i64 = max.trim().parse().ok()?;
    (min <= max).then_some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scan_interval_secs, 60);
        assert_eq!(config.symbols_limit, 100);
        assert_eq!(config.quote_suffix, "USDT");
        assert_eq!(config.timeframes.len(), 4);
        assert_eq!(config.candle_limit, 200);
        assert_eq!(config.cooldown_window(), Duration::from_secs(900));
        assert_eq!(config.default_leverage, 20);
        assert_eq!(config.enabled_rules, RuleFamily::all());
        assert!(config.telegram.is_none());
        assert_eq!(config.rules, RuleConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("SCAN_INTERVAL_SECS", "30"),
            ("TIMEFRAMES", "5m, 1h,bogus"),
            ("ENABLED_RULES", "crt,reversal"),
            ("TELEGRAM_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-100"),
            ("CRT_CLOSE_WINDOW", "2-5"),
            ("ENGULF_MIN_BODY_PCT", "0.3"),
            ("ZONE_PROXIMITY", "0.004"),
        ]);

        assert_eq!(config.scan_interval_secs, 30);
        assert_eq!(
            config.timeframes,
            vec![Timeframe::FiveMinutes, Timeframe::OneHour]
        );
        assert_eq!(config.enabled_rules, vec![RuleFamily::Crt, RuleFamily::Reversal]);
        assert_eq!(config.telegram.as_ref().map(|t| t.chat_id.as_str()), Some("-100"));
        assert_eq!(config.rules.crt.close_window, Some((2, 5)));
        assert_eq!(config.rules.trend.engulf.min_body_pct, 0.3);
        assert_eq!(config.rules.fibo.zone_proximity, 0.004);
        // other families keep their own thresholds
        assert_eq!(config.rules.fibo.confirmation.engulf.min_body_pct, 0.4);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("SCAN_INTERVAL_SECS", "0"),
            ("SCAN_CONCURRENCY", "many"),
            ("TIMEFRAMES", "7m"),
            ("CRT_CLOSE_WINDOW", "5-2"),
            ("TELEGRAM_TOKEN", "123:abc"),
        ]);

        assert_eq!(config.scan_interval_secs, 60);
        assert_eq!(config.scan_concurrency, 8);
        assert_eq!(config.timeframes.len(), 4);
        assert_eq!(config.rules.crt.close_window, None);
        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_invalid_numbers_are_logged() {
        #[derive(Clone, Default)]
        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let config = tracing::subscriber::with_default(subscriber, || {
            config(&[
                ("SYMBOLS_LIMIT", "lots"),
                ("CRT_MAX_OVERLAP", "NaN"),
                ("DIVERGENCE_LOOKBACK", "1"),
            ])
        });

        assert_eq!(config.symbols_limit, 100);
        assert_eq!(config.rules.crt.max_overlap, CrtConfig::default().max_overlap);
        assert_eq!(
            config.rules.reversal.divergence_lookback,
            SwingReversalConfig::default().divergence_lookback
        );

        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("SYMBOLS_LIMIT='lots'"));
        assert!(logs.contains("CRT_MAX_OVERLAP='NaN'"));
        assert!(logs.contains("DIVERGENCE_LOOKBACK='1'"));
    }

    #[test]
    fn test_parse_window() {
        assert_eq!(parse_window("2-5"), Some((2, 5)));
        assert_eq!(parse_window(" 0 - 3 "), Some((0, 3)));
        assert_eq!(parse_window("5"), None);
    }
}
