use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::external::provider::{ProviderError, StockListingProvider};
use crate::models::{Instrument, InstrumentType};
use crate::utils::decimal_from_f64;

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3/stock/list";

pub struct FinancialModelingPrepProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl FinancialModelingPrepProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FmpResponse {
    Listing(Vec<FmpStock>),
    Error {
        #[serde(rename = "Error Message")]
        error_message: String,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct FmpStock {
    symbol: String,
    name: Option<String>,
    price: Option<f64>,
    exchange: Option<String>,
    #[serde(rename = "exchangeShortName")]
    exchange_short_name: Option<String>,
    currency: Option<String>,
}

/// Maps the stock list to `stock` rows. The market tag is the upstream
/// exchange; rows without a usable price are dropped.
pub(crate) fn map_stocks(body: FmpResponse) -> Result<Vec<Instrument>, ProviderError> {
    let stocks = match body {
        FmpResponse::Listing(stocks) => stocks,
        FmpResponse::Error { error_message } => {
            if error_message.contains("Limit Reach") {
                return Err(ProviderError::RateLimited);
            }
            return Err(ProviderError::BadResponse(error_message));
        }
    };

    let instruments = stocks
        .into_iter()
        .filter_map(|s| {
            let price = s.price.and_then(decimal_from_f64)?;
            if price < BigDecimal::from(0) {
                return None;
            }
            let market = s.exchange.or(s.exchange_short_name).unwrap_or_default();
            let name = s.name.unwrap_or_else(|| s.symbol.clone());
            Some(Instrument::new(
                s.symbol,
                InstrumentType::Stock,
                market,
                name,
                price,
                s.currency,
            ))
        })
        .collect();

    Ok(instruments)
}

#[async_trait]
impl StockListingProvider for FinancialModelingPrepProvider {
    fn name(&self) -> &str {
        "financialmodelingprep"
    }

    async fn fetch_stocks(&self) -> Result<Vec<Instrument>, ProviderError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        let body = resp.json::<FmpResponse>().await?;
        map_stocks(body)
    }
}
