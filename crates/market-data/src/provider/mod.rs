//! Market data providers.

pub mod alpha_vantage;
pub mod finnhub;
mod traits;

pub use alpha_vantage::AlphaVantageProvider;
pub use finnhub::FinnhubProvider;
pub use traits::MarketDataProvider;
