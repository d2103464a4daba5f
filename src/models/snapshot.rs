use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::instrument::InstrumentType;

// One row of the daily valuation series (`daily_asset_stats`).
// `asset_type = None` marks the per-run roll-up over all types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PortfolioSnapshot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub currency: String,
    pub asset_type: Option<InstrumentType>,
    pub total_assets: BigDecimal,
    #[serde(rename = "total_pl")]
    pub total_p_and_l: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    pub fn is_rollup(&self) -> bool {
        self.asset_type.is_none()
    }
}

/// Resolution of a snapshot series read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotInterval {
    /// Last 7 days, one point per stored run.
    Weekly,
    /// Last 30 days, one point per stored run.
    Monthly,
    /// Current calendar year, summed per month.
    Yearly,
}

impl SnapshotInterval {
    /// Non-premium users may only read the weekly series.
    pub fn is_premium_only(&self) -> bool {
        !matches!(self, SnapshotInterval::Weekly)
    }
}

impl std::fmt::Display for SnapshotInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotInterval::Weekly => write!(f, "weekly"),
            SnapshotInterval::Monthly => write!(f, "monthly"),
            SnapshotInterval::Yearly => write!(f, "yearly"),
        }
    }
}

impl std::str::FromStr for SnapshotInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(SnapshotInterval::Weekly),
            "monthly" => Ok(SnapshotInterval::Monthly),
            "yearly" => Ok(SnapshotInterval::Yearly),
            _ => Err(format!("Invalid interval: {}", s)),
        }
    }
}

/// Index-aligned arrays ready for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSeries {
    pub currency: String,
    pub dates: Vec<DateTime<Utc>>,
    pub total_assets: Vec<BigDecimal>,
    #[serde(rename = "total_pl")]
    pub total_p_and_l: Vec<BigDecimal>,
}

impl SnapshotSeries {
    pub fn empty(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            dates: Vec::new(),
            total_assets: Vec::new(),
            total_p_and_l: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// The newest run for a user: the roll-up and its per-type rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    pub total: PortfolioSnapshot,
    pub breakdown: Vec<PortfolioSnapshot>,
}
