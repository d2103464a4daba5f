use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Quote currency assumed when an upstream row omits one.
pub const DEFAULT_QUOTE_CURRENCY: &str = "USD";

/// Category of an investable instrument. Also used as the `asset_type` of
/// holdings events and snapshot rows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Crypto,
    Stock,
    Exchange,
    Commodity,
}

impl InstrumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::Crypto => "crypto",
            InstrumentType::Stock => "stock",
            InstrumentType::Exchange => "exchange",
            InstrumentType::Commodity => "commodity",
        }
    }
}

impl std::fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstrumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crypto" => Ok(InstrumentType::Crypto),
            "stock" => Ok(InstrumentType::Stock),
            "exchange" => Ok(InstrumentType::Exchange),
            "commodity" => Ok(InstrumentType::Commodity),
            _ => Err(format!("Invalid instrument type: {}", s)),
        }
    }
}

/// Composite primary key of the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub market: String,
}

impl InstrumentKey {
    pub fn new(
        symbol: impl Into<String>,
        instrument_type: InstrumentType,
        market: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            instrument_type,
            market: market.into(),
        }
    }
}

// A catalogue entry: last observed price of an instrument in its quote currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Instrument {
    pub symbol: String,
    pub instrument_type: InstrumentType,
    pub market: String,
    pub name: String,
    pub price: BigDecimal,
    pub currency: String,
}

impl Instrument {
    pub fn new(
        symbol: impl Into<String>,
        instrument_type: InstrumentType,
        market: impl Into<String>,
        name: impl Into<String>,
        price: BigDecimal,
        currency: Option<String>,
    ) -> Self {
        let currency = currency
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_QUOTE_CURRENCY.to_string());

        Self {
            symbol: symbol.into(),
            instrument_type,
            market: market.into(),
            name: name.into(),
            price,
            currency,
        }
    }

    /// Row-level checks mirrored by the `investings` table constraints.
    pub fn validate(&self) -> Result<(), String> {
        if self.symbol.trim().is_empty() {
            return Err("symbol must not be empty".to_string());
        }
        if self.price < BigDecimal::from(0) {
            return Err(format!("price must not be negative, got {}", self.price));
        }
        Ok(())
    }

    pub fn key(&self) -> InstrumentKey {
        InstrumentKey::new(self.symbol.clone(), self.instrument_type, self.market.clone())
    }
}
