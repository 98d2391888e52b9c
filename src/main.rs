use scout::config::Config;
use scout::services::{CooldownTable, RuleEngine, Scanner};
use scout::sources::{BinanceFuturesClient, LogNotifier, MarketDataSource, Notifier, TelegramNotifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Starting Scout: {} symbols max, timeframes [{}], every {}s",
        config.symbols_limit,
        config
            .timeframes
            .iter()
            .map(|tf| tf.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        config.scan_interval_secs
    );

    let call_timeout = Duration::from_secs(config.fetch_timeout_secs);
    let source: Arc<dyn MarketDataSource> = Arc::new(BinanceFuturesClient::new(
        config.binance_fapi_url.clone(),
        call_timeout,
    ));

    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(telegram) => {
            info!("Telegram notifications enabled");
            Arc::new(TelegramNotifier::new(
                telegram.token.clone(),
                telegram.chat_id.clone(),
                call_timeout,
            ))
        }
        None => {
            warn!("TELEGRAM_TOKEN/TELEGRAM_CHAT_ID not set, signals will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let engine = RuleEngine::from_config(&config.rules, &config.enabled_rules);
    if engine.is_empty() {
        anyhow::bail!("No rules enabled; check ENABLED_RULES");
    }
    info!("Rules loaded: {}", engine.rule_names().join(", "));

    let scanner = Arc::new(Scanner::new(
        source,
        notifier,
        engine,
        CooldownTable::new(config.cooldown_window()),
        config.scan_settings(),
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(scanner.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, finishing current scan cycle");
    let _ = shutdown_tx.send(());
    handle.await?;

    info!("Scout stopped");
    Ok(())
}
