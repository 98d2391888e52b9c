pub mod cooldown;
pub mod scanner;
pub mod signals;

pub use cooldown::CooldownTable;
pub use scanner::{CycleReport, ScanSettings, Scanner};
pub use signals::{MarketContext, RuleConfig, RuleEngine, RuleFamily};
