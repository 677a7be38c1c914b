mod candle;
mod period;
mod quote;

pub use candle::Candle;
pub use period::{Period, Resolution};
pub use quote::Quote;
