use async_trait::async_trait;

use super::instruments_model::{Instrument, NewInstrument};
use crate::errors::Result;

/// Storage operations over instrument rows.
#[async_trait]
pub trait InstrumentRepositoryTrait: Send + Sync {
    /// Instruments the user already has for any of the given tickers.
    fn list_by_tickers(&self, user_id: &str, tickers: &[String]) -> Result<Vec<Instrument>>;

    /// Create an instrument. The (user, ticker) pair is unique.
    async fn create(&self, instrument: NewInstrument) -> Result<Instrument>;
}
