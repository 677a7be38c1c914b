//! Ordered provider fallback for live quotes.

use std::sync::Arc;

use log::warn;

use crate::errors::MarketDataError;
use crate::models::Quote;
use crate::provider::MarketDataProvider;

/// Tries providers in order until one produces a quote.
///
/// Callers may name a preferred provider and the chain rotates it to the
/// front. Every failure (network, non-2xx, missing price, informational
/// rate-limit payload) is handled the same way: log it and move to the
/// next provider. When all providers fail, the caller sees the last
/// provider's error.
pub struct QuoteChain {
    providers: Vec<Arc<dyn MarketDataProvider>>,
}

impl QuoteChain {
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        Self { providers }
    }

    /// Providers in call order for this request.
    fn ordered(&self, preferred: Option<&str>) -> Vec<Arc<dyn MarketDataProvider>> {
        let mut ordered: Vec<Arc<dyn MarketDataProvider>> = Vec::with_capacity(self.providers.len());

        if let Some(preferred_id) = preferred {
            for provider in &self.providers {
                if provider.id().eq_ignore_ascii_case(preferred_id) {
                    ordered.push(provider.clone());
                }
            }
        }
        for provider in &self.providers {
            if !ordered.iter().any(|p| p.id() == provider.id()) {
                ordered.push(provider.clone());
            }
        }

        ordered
    }

    /// Fetch a quote, falling back through the provider list.
    pub async fn get_quote(
        &self,
        symbol: &str,
        preferred: Option<&str>,
    ) -> Result<Quote, MarketDataError> {
        let providers = self.ordered(preferred);
        if providers.is_empty() {
            return Err(MarketDataError::NoProvidersConfigured);
        }

        let mut last_error = None;
        for provider in providers {
            match provider.get_quote(symbol).await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    warn!(
                        "Quote provider '{}' failed for {}: {}",
                        provider.id(),
                        symbol,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(MarketDataError::NoProvidersConfigured))
    }
}
