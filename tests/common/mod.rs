#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fintrack::external::provider::{
    CryptoListingProvider, FxRateProvider, ProviderError, StockListingProvider,
};
use fintrack::models::{ExchangeRate, Instrument, DEFAULT_SUPPORTED_CURRENCIES};
use fintrack::services::job_scheduler_service::{JobContext, Providers};
use fintrack::services::rate_limiter::RateLimiter;
use fintrack::store::memory::MemoryStores;

pub fn d(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn currencies() -> Vec<String> {
    DEFAULT_SUPPORTED_CURRENCIES.iter().map(|c| c.to_string()).collect()
}

/// Units of each currency per USD; cross rates are derived from these.
fn usd_value(code: &str) -> BigDecimal {
    match code {
        "USD" => d("1"),
        "EUR" => d("0.9"),
        "JPY" => d("150"),
        "KRW" => d("1300"),
        "GBP" => d("0.8"),
        _ => d("2"),
    }
}

/// FX provider answering every pair from a fixed table, optionally failing
/// chosen pairs.
pub struct MockFx {
    failing: HashSet<(String, String)>,
    calls: AtomicUsize,
}

impl MockFx {
    pub fn stable() -> Self {
        Self {
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(pairs: &[(&str, &str)]) -> Self {
        Self {
            failing: pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FxRateProvider for MockFx {
    fn name(&self) -> &str {
        "mock-fx"
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<ExchangeRate, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&(from.to_string(), to.to_string())) {
            return Err(ProviderError::Network("connection reset".to_string()));
        }
        let rate = usd_value(to) / usd_value(from);
        Ok(ExchangeRate::new(from, to, rate))
    }
}

/// Listing provider returning whatever rows it currently holds, or an error.
pub struct MockListings {
    rows: Mutex<Result<Vec<Instrument>, String>>,
}

impl MockListings {
    pub fn with(rows: Vec<Instrument>) -> Self {
        Self {
            rows: Mutex::new(Ok(rows)),
        }
    }

    pub fn broken() -> Self {
        Self {
            rows: Mutex::new(Err("upstream 503".to_string())),
        }
    }

    pub fn set(&self, rows: Vec<Instrument>) {
        *self.rows.lock() = Ok(rows);
    }

    pub fn break_upstream(&self) {
        *self.rows.lock() = Err("upstream 503".to_string());
    }

    fn current(&self) -> Result<Vec<Instrument>, ProviderError> {
        self.rows.lock().clone().map_err(ProviderError::Network)
    }
}

#[async_trait]
impl CryptoListingProvider for MockListings {
    fn name(&self) -> &str {
        "mock-crypto"
    }

    async fn fetch_listings(&self) -> Result<Vec<Instrument>, ProviderError> {
        self.current()
    }
}

#[async_trait]
impl StockListingProvider for MockListings {
    fn name(&self) -> &str {
        "mock-stocks"
    }

    async fn fetch_stocks(&self) -> Result<Vec<Instrument>, ProviderError> {
        self.current()
    }
}

pub fn fast_pacer() -> RateLimiter {
    RateLimiter::paced(Duration::from_millis(1))
}

pub fn job_context(stores: &MemoryStores) -> JobContext {
    JobContext {
        state: stores.state(),
        providers: Providers {
            crypto: Arc::new(MockListings::with(Vec::new())),
            stocks: Arc::new(MockListings::with(Vec::new())),
            fx: Arc::new(MockFx::stable()),
        },
        fx_pacer: Arc::new(fast_pacer()),
        supported_currencies: Arc::new(currencies()),
    }
}

pub fn as_map(rates: &[ExchangeRate]) -> HashMap<(String, String), BigDecimal> {
    rates
        .iter()
        .map(|r| ((r.from_currency.clone(), r.to_currency.clone()), r.rate.clone()))
        .collect()
}
