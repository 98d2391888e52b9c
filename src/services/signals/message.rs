//! Notification text for fired signals (Telegram Markdown).

use crate::types::{Direction, PendingSetup, Rationale, Setup, Signal, TradePlan};
use std::fmt::Write;

/// Render a signal as a Markdown notification.
///
/// Prices are printed with 5 decimals; rationale values with 2.
pub fn format_signal(signal: &Signal, leverage: u32) -> String {
    match &signal.setup {
        Setup::Trade(plan) => format_trade(signal, plan, leverage),
        Setup::Pending(setup) => format_pending(signal, setup),
    }
}

fn marker(direction: Direction) -> &'static str {
    match direction {
        Direction::Long => "🚀",
        Direction::Short => "🔻",
    }
}

fn format_trade(signal: &Signal, plan: &TradePlan, leverage: u32) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{} *{}*", marker(plan.direction), signal.kind.title());
    let _ = writeln!(text, "Symbol: {}", signal.symbol);
    let _ = writeln!(text, "Timeframe: {}", signal.timeframe);
    text.push('\n');
    let _ = writeln!(text, "*Entry:* {:.5}", plan.entry);
    let _ = writeln!(text, "*Stop Loss:* {:.5}", plan.stop_loss);
    let _ = writeln!(text, "*TP1:* {:.5}", plan.take_profit_1);
    let _ = writeln!(text, "*TP2:* {:.5}", plan.take_profit_2);
    let _ = writeln!(text, "*TP3:* {:.5}", plan.take_profit_3);
    text.push('\n');
    let _ = writeln!(text, "*Leverage:* {}x", leverage);

    for line in rationale_lines(&signal.rationale, plan.direction) {
        text.push_str(&line);
        text.push('\n');
    }

    text.trim_end().to_string()
}

fn format_pending(signal: &Signal, setup: &PendingSetup) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "{} *{}* - {} ({})",
        marker(setup.direction),
        signal.kind.title(),
        signal.symbol,
        signal.timeframe
    );
    text.push('\n');
    let _ = writeln!(text, "Range: {:.5} - {:.5}", setup.range_low, setup.range_high);
    let sweep_label = match setup.direction {
        Direction::Long => "Sweep Low",
        Direction::Short => "Sweep High",
    };
    let _ = writeln!(text, "{}: {:.5}", sweep_label, setup.sweep_extreme);
    let _ = writeln!(text, "Zone: {}", setup.zone.label());
    let _ = writeln!(
        text,
        "Swing: {:.5} - {:.5}",
        setup.swing.low.price, setup.swing.high.price
    );
    let _ = writeln!(text, "Close: {:.5}", setup.close);
    text.push('\n');
    text.push_str(&signal.summary);

    text
}

fn rationale_lines(rationale: &Rationale, direction: Direction) -> Vec<String> {
    let mut lines = Vec::new();

    if rationale.ema20.is_some() && rationale.ema200.is_some() {
        lines.push(
            match direction {
                Direction::Long => "EMA20>EMA50>EMA200",
                Direction::Short => "EMA20<EMA50<EMA200",
            }
            .to_string(),
        );
    }
    if let Some(rsi) = rationale.rsi {
        lines.push(format!("RSI={:.2}", rsi));
    }
    if let Some(slope) = rationale.trend_slope {
        lines.push(format!("Trend slope: {:.6}", slope));
    }
    if let Some(zone) = rationale.zone {
        lines.push(format!("Zone: [{:.5} - {:.5}]", zone.lower, zone.upper));
    }
    if let Some(fib) = rationale.fib_zone {
        lines.push(format!("Fibo: [{:.2} - {:.2}]", fib.lower, fib.upper));
        if let Some(ema50) = rationale.ema50 {
            lines.push(format!("EMA50: {:.2}", ema50));
        }
    }
    if let Some(extreme) = rationale.swing_extreme {
        let label = match direction {
            Direction::Long => "Swing Low",
            Direction::Short => "Swing High",
        };
        lines.push(format!("{}: {:.5}", label, extreme));
    }
    if rationale.divergence == Some(true) {
        lines.push(format!(
            "Divergence: {}",
            match direction {
                Direction::Long => "Bullish",
                Direction::Short => "Bearish",
            }
        ));
    }
    if let Some(near) = &rationale.near_ema {
        lines.push(format!("Near EMA: {}", near));
    }

    lines
}
