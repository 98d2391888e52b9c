//! Technical indicator implementations.
//!
//! All indicators are pure functions over a chronological slice of values.
//! Appending one sample to the input appends exactly one element to the
//! output and leaves the earlier elements untouched.

pub mod ema;
pub mod macd;
pub mod rsi;

pub use ema::{ema, last_ema};
pub use macd::{macd, macd_line, macd_with, MacdParams, MacdPoint};
pub use rsi::{rsi, DEFAULT_RSI_PERIOD};
