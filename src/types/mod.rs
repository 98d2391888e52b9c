pub mod candle;
pub mod signals;
pub mod structure;

pub use candle::*;
pub use signals::*;
pub use structure::*;
