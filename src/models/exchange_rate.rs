use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

/// Default set of fiat currencies the FX matrix is built over.
pub const DEFAULT_SUPPORTED_CURRENCIES: [&str; 5] = ["EUR", "JPY", "KRW", "GBP", "USD"];

// Directed exchange rate: 1 unit of `from_currency` buys `rate` units of `to_currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: BigDecimal,
}

impl ExchangeRate {
    pub fn new(from: impl Into<String>, to: impl Into<String>, rate: BigDecimal) -> Self {
        Self {
            from_currency: from.into(),
            to_currency: to.into(),
            rate,
        }
    }
}

/// In-memory lookup over one FX generation.
///
/// Directions are independent: `rate(a, b)` never falls back to `1 / rate(b, a)`.
#[derive(Debug, Clone, Default)]
pub struct FxTable {
    rates: HashMap<(String, String), BigDecimal>,
}

impl FxTable {
    pub fn from_rates(rates: Vec<ExchangeRate>) -> Self {
        let rates = rates
            .into_iter()
            .map(|r| ((r.from_currency, r.to_currency), r.rate))
            .collect();
        Self { rates }
    }

    pub fn rate(&self, from: &str, to: &str) -> Option<&BigDecimal> {
        self.rates.get(&(from.to_string(), to.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Every ordered pair `(i, j)` with `i != j` over `currencies`, in input order.
pub fn ordered_pairs(currencies: &[String]) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(currencies.len() * currencies.len().saturating_sub(1));
    for from in currencies {
        for to in currencies {
            if from != to {
                pairs.push((from.clone(), to.clone()));
            }
        }
    }
    pairs
}
