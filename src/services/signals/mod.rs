//! Signal detection core.
//!
//! Indicator computations, candle pattern and market-structure classifiers,
//! trend estimation and the composite rule engine that turns them into
//! trade signals.

pub mod context;
pub mod indicators;
pub mod message;
pub mod patterns;
pub mod rules;
pub mod structure;
pub mod trend;

pub use context::MarketContext;
pub use message::format_signal;
pub use rules::{
    Evaluation, Rule, RuleConfig, RuleEngine, RuleFamily, RuleResult, Verdict,
};
pub use trend::estimate_trend;
