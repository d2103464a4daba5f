use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

use crate::external::provider::{CryptoListingProvider, ProviderError};
use crate::models::{Instrument, InstrumentType};
use crate::utils::decimal_from_f64;

const BASE_URL: &str = "https://pro-api.coinmarketcap.com/v1/cryptocurrency/listings/latest";

/// Number of listings requested per refresh.
pub const DEFAULT_LISTING_LIMIT: u32 = 300;

pub struct CoinMarketCapProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limit: u32,
}

impl CoinMarketCapProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
            limit: DEFAULT_LISTING_LIMIT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CmcListingResponse {
    data: Option<Vec<CmcListing>>,
    status: Option<CmcStatus>,
}

#[derive(Debug, Deserialize)]
struct CmcStatus {
    error_code: Option<i64>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CmcListing {
    #[allow(dead_code)]
    id: i64,
    name: String,
    symbol: String,
    quote: HashMap<String, CmcQuote>,
}

#[derive(Debug, Deserialize)]
struct CmcQuote {
    price: Option<f64>,
}

/// Maps a listings body to `crypto` rows quoted in USD. Rows without a usable
/// USD price are dropped.
pub(crate) fn map_listings(body: CmcListingResponse) -> Result<Vec<Instrument>, ProviderError> {
    let listings = match body.data {
        Some(data) => data,
        None => {
            let status = body.status;
            // 1008/1011: minute and daily rate limits
            if let Some(1008) | Some(1011) = status.as_ref().and_then(|s| s.error_code) {
                return Err(ProviderError::RateLimited);
            }
            let message = status
                .and_then(|s| s.error_message)
                .unwrap_or_else(|| "missing data".to_string());
            return Err(ProviderError::BadResponse(message));
        }
    };

    let instruments = listings
        .into_iter()
        .filter_map(|l| {
            let price = l.quote.get("USD")?.price.and_then(decimal_from_f64)?;
            if price < bigdecimal::BigDecimal::from(0) {
                return None;
            }
            Some(Instrument::new(
                l.symbol,
                InstrumentType::Crypto,
                "",
                l.name,
                price,
                Some("USD".to_string()),
            ))
        })
        .collect();

    Ok(instruments)
}

#[async_trait]
impl CryptoListingProvider for CoinMarketCapProvider {
    fn name(&self) -> &str {
        "coinmarketcap"
    }

    async fn fetch_listings(&self) -> Result<Vec<Instrument>, ProviderError> {
        let limit = self.limit.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("start", "1"),
                ("limit", limit.as_str()),
                ("convert", "USD"),
                ("CMC_PRO_API_KEY", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        let body = resp.json::<CmcListingResponse>().await?;
        map_listings(body)
    }
}
