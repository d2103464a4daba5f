use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ExchangeRate, Instrument};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            ProviderError::RateLimited
        } else if e.is_decode() {
            ProviderError::Parse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// One call returning the top crypto listings, already mapped to catalogue rows.
#[async_trait]
pub trait CryptoListingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_listings(&self) -> Result<Vec<Instrument>, ProviderError>;
}

/// One call returning the full tradable-stocks list.
#[async_trait]
pub trait StockListingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_stocks(&self) -> Result<Vec<Instrument>, ProviderError>;
}

/// One call per ordered currency pair.
#[async_trait]
pub trait FxRateProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<ExchangeRate, ProviderError>;
}
