use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::instrument::InstrumentType;

/// Direction of a holdings event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HoldingType {
    Buy,
    Sell,
}

impl std::fmt::Display for HoldingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoldingType::Buy => write!(f, "buy"),
            HoldingType::Sell => write!(f, "sell"),
        }
    }
}

// One row of the holdings log (`assets` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct HoldingsEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub to_asset: String,
    pub from_asset: String,
    pub asset_type: InstrumentType,
    pub asset_market: String,
    /// Per-unit price in `from_asset`. For sells this is the disposal price.
    pub bought_price: BigDecimal,
    pub amount: BigDecimal,
    pub holding_type: HoldingType,
    /// Legacy rows that recorded acquisition and disposal together.
    pub sold_price: Option<BigDecimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHoldingsEvent {
    pub to_asset: String,
    pub from_asset: String,
    pub asset_type: InstrumentType,
    #[serde(default)]
    pub asset_market: String,
    pub bought_price: BigDecimal,
    pub amount: BigDecimal,
    pub holding_type: HoldingType,
    #[serde(default)]
    pub sold_price: Option<BigDecimal>,
}

impl NewHoldingsEvent {
    pub fn buy(
        to_asset: &str,
        from_asset: &str,
        asset_type: InstrumentType,
        bought_price: BigDecimal,
        amount: BigDecimal,
    ) -> Self {
        Self {
            to_asset: to_asset.to_string(),
            from_asset: from_asset.to_string(),
            asset_type,
            asset_market: String::new(),
            bought_price,
            amount,
            holding_type: HoldingType::Buy,
            sold_price: None,
        }
    }

    pub fn sell(
        to_asset: &str,
        from_asset: &str,
        asset_type: InstrumentType,
        price: BigDecimal,
        amount: BigDecimal,
    ) -> Self {
        Self {
            holding_type: HoldingType::Sell,
            ..Self::buy(to_asset, from_asset, asset_type, price, amount)
        }
    }

    pub fn with_market(mut self, market: &str) -> Self {
        self.asset_market = market.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.to_asset.trim().is_empty() || self.from_asset.trim().is_empty() {
            return Err("to_asset and from_asset must not be empty".to_string());
        }
        if self.amount <= BigDecimal::from(0) {
            return Err(format!("amount must be positive, got {}", self.amount));
        }
        if self.bought_price < BigDecimal::from(0) {
            return Err(format!("bought_price must not be negative, got {}", self.bought_price));
        }
        if let Some(sold) = &self.sold_price {
            if *sold < BigDecimal::from(0) {
                return Err(format!("sold_price must not be negative, got {}", sold));
            }
        }
        Ok(())
    }

    pub fn into_event(self, id: Uuid, user_id: Uuid, created_at: DateTime<Utc>) -> HoldingsEvent {
        HoldingsEvent {
            id,
            user_id,
            to_asset: self.to_asset,
            from_asset: self.from_asset,
            asset_type: self.asset_type,
            asset_market: self.asset_market,
            bought_price: self.bought_price,
            amount: self.amount,
            holding_type: self.holding_type,
            sold_price: self.sold_price,
            created_at,
        }
    }
}

/// Rollup of every event for one `(user, to_asset, from_asset)` tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub user_id: Uuid,
    pub to_asset: String,
    pub from_asset: String,
    pub asset_type: InstrumentType,
    pub asset_market: String,
    /// Σ price·amount over buys, in `from_asset`.
    pub total_bought: BigDecimal,
    /// Σ price·amount over sells, in `from_asset`.
    pub total_sold: BigDecimal,
    pub remaining_amount: BigDecimal,
}
