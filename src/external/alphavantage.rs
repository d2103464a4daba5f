use crate::external::provider::{FxRateProvider, ProviderError};
use crate::models::ExchangeRate;
use crate::utils::decimal_from_str;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Deserialize;

const BASE_URL: &str = "https://www.alphavantage.co/query";

pub struct AlphaVantageProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
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
pub(crate) struct AvExchangeRateResponse {
    #[serde(rename = "Realtime Currency Exchange Rate")]
    realtime: Option<AvRealtimeRate>,

    // When rate-limited Alpha Vantage returns:
    // { "Note": "Thank you for using Alpha Vantage! ... 5 calls per minute ..." }
    #[serde(rename = "Note")]
    note: Option<String>,

    // Newer free-tier throttle message
    #[serde(rename = "Information")]
    information: Option<String>,

    // When invalid:
    // { "Error Message": "Invalid API call. ..." }
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvRealtimeRate {
    #[serde(rename = "1. From_Currency Code")]
    from_code: String,
    #[serde(rename = "3. To_Currency Code")]
    to_code: String,
    #[serde(rename = "5. Exchange Rate")]
    rate: String,
}

pub(crate) fn map_exchange_rate(body: AvExchangeRateResponse) -> Result<ExchangeRate, ProviderError> {
    if body.note.is_some() || body.information.is_some() {
        return Err(ProviderError::RateLimited);
    }

    if let Some(msg) = body.error_message {
        return Err(ProviderError::BadResponse(msg));
    }

    let realtime = body
        .realtime
        .ok_or_else(|| ProviderError::BadResponse("missing exchange rate".into()))?;

    let rate = decimal_from_str(&realtime.rate)
        .ok_or_else(|| ProviderError::Parse(format!("invalid rate '{}'", realtime.rate)))?;

    if rate <= BigDecimal::from(0) {
        return Err(ProviderError::BadResponse(format!(
            "non-positive rate {} for {}->{}",
            rate, realtime.from_code, realtime.to_code
        )));
    }

    Ok(ExchangeRate::new(realtime.from_code, realtime.to_code, rate))
}

#[async_trait]
impl FxRateProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alphavantage"
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<ExchangeRate, ProviderError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "CURRENCY_EXCHANGE_RATE"),
                ("from_currency", from),
                ("to_currency", to),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let body = resp.json::<AvExchangeRateResponse>().await?;
        map_exchange_rate(body)
    }
}
