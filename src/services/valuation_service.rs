//! Portfolio valuation.
//!
//! Turns the holdings log into one snapshot run per user: positions are
//! rolled up from raw buy/sell events, priced against the catalogue,
//! converted into the user's display currency and summed per instrument
//! type plus one roll-up row. Everything is computed in process from the
//! four inputs (holdings, catalogue, FX, preferences).

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    FxTable, HoldingType, HoldingsEvent, Instrument, InstrumentKey, InstrumentType,
    PortfolioSnapshot, Position, UserPreference,
};
use crate::state::AppState;
use crate::utils::zero;

/// Catalogue generation indexed by primary key.
pub type CatalogueIndex = HashMap<InstrumentKey, Instrument>;

/// A position after pricing, before user-currency conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedPosition {
    pub position: Position,
    /// `None` when the instrument is missing from the catalogue.
    pub price: Option<BigDecimal>,
    pub current_value: BigDecimal,
    /// `total_bought - (total_sold + current_value)`. Negative means a gain.
    pub p_and_l: BigDecimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValuationReport {
    pub users_valued: usize,
    pub users_skipped: usize,
    pub users_failed: usize,
    pub rows_written: usize,
}

/// Groups events by `(user, to_asset, from_asset)`.
///
/// A group that sold more than it bought is clamped to a zero remaining
/// amount and reported as an integrity warning.
pub fn rollup_positions(events: &[HoldingsEvent]) -> Vec<Position> {
    let mut groups: BTreeMap<(Uuid, &str, &str), Position> = BTreeMap::new();

    for event in events {
        let position = groups
            .entry((event.user_id, event.to_asset.as_str(), event.from_asset.as_str()))
            .or_insert_with(|| Position {
                user_id: event.user_id,
                to_asset: event.to_asset.clone(),
                from_asset: event.from_asset.clone(),
                asset_type: event.asset_type,
                asset_market: event.asset_market.clone(),
                total_bought: zero(),
                total_sold: zero(),
                remaining_amount: zero(),
            });

        let cost = &event.bought_price * &event.amount;
        match event.holding_type {
            HoldingType::Buy => {
                position.total_bought += cost;
                position.remaining_amount += &event.amount;
            }
            HoldingType::Sell => {
                position.total_sold += cost;
                position.remaining_amount -= &event.amount;
            }
        }
    }

    groups
        .into_values()
        .map(|mut position| {
            if position.remaining_amount < zero() {
                warn!(
                    uid = %position.user_id,
                    "⚠️ Integrity: {}/{} sold {} more than bought, clamping to 0",
                    position.to_asset,
                    position.from_asset,
                    -position.remaining_amount.clone()
                );
                position.remaining_amount = zero();
            }
            position
        })
        .collect()
}

/// Spot price of the position's instrument, expressed for valuation.
///
/// Exchange instruments are quoted in their own currency, so their price is
/// converted `to_asset -> from_asset` when that rate exists. Every other type
/// uses the catalogue price as-is.
pub fn resolve_price(
    position: &Position,
    catalogue: &CatalogueIndex,
    fx: &FxTable,
) -> Option<BigDecimal> {
    let key = InstrumentKey::new(
        position.to_asset.clone(),
        position.asset_type,
        position.asset_market.clone(),
    );
    let instrument = catalogue.get(&key)?;

    if position.asset_type == InstrumentType::Exchange && position.to_asset != position.from_asset {
        if let Some(rate) = fx.rate(&position.to_asset, &position.from_asset) {
            return Some(&instrument.price * rate);
        }
    }

    Some(instrument.price.clone())
}

pub fn value_position(position: Position, price: Option<BigDecimal>) -> ValuedPosition {
    let current_value = match &price {
        Some(price) => &position.remaining_amount * price,
        None => zero(),
    };
    let p_and_l = &position.total_bought - (&position.total_sold + &current_value);

    ValuedPosition {
        position,
        price,
        current_value,
        p_and_l,
    }
}

/// Converts from the position's `from_asset` into the user's currency.
/// Same currency or a missing pair leaves the value untouched.
fn to_user_currency(value: &BigDecimal, from: &str, user_currency: &str, fx: &FxTable) -> BigDecimal {
    if from == user_currency {
        return value.clone();
    }
    match fx.rate(from, user_currency) {
        Some(rate) => value * rate,
        None => value.clone(),
    }
}

/// Builds one run for one user: a row per instrument type plus the roll-up
/// (`asset_type = None`), all stamped `now` in the user's currency.
pub fn snapshot_user(
    preference: &UserPreference,
    positions: Vec<Position>,
    catalogue: &CatalogueIndex,
    fx: &FxTable,
    now: DateTime<Utc>,
) -> Vec<PortfolioSnapshot> {
    let currency = preference.currency.as_str();
    let mut per_type: BTreeMap<InstrumentType, (BigDecimal, BigDecimal)> = BTreeMap::new();

    for position in positions {
        let price = resolve_price(&position, catalogue, fx);
        let valued = value_position(position, price);
        let from = valued.position.from_asset.as_str();

        let (assets, p_and_l) = per_type
            .entry(valued.position.asset_type)
            .or_insert_with(|| (zero(), zero()));
        *assets += to_user_currency(&valued.current_value, from, currency, fx);
        *p_and_l += to_user_currency(&valued.p_and_l, from, currency, fx);
    }

    if per_type.is_empty() {
        return Vec::new();
    }

    let row = |asset_type: Option<InstrumentType>, total_assets: BigDecimal, total_p_and_l: BigDecimal| {
        PortfolioSnapshot {
            id: Uuid::new_v4(),
            user_id: preference.user_id,
            currency: currency.to_string(),
            asset_type,
            total_assets,
            total_p_and_l,
            created_at: now,
        }
    };

    let mut total_assets = zero();
    let mut total_p_and_l = zero();
    let mut rows = Vec::with_capacity(per_type.len() + 1);
    for (asset_type, (assets, p_and_l)) in per_type {
        total_assets += &assets;
        total_p_and_l += &p_and_l;
        rows.push(row(Some(asset_type), assets, p_and_l));
    }
    rows.push(row(None, total_assets, total_p_and_l));
    rows
}

/// Values every user with holdings and appends their snapshot rows.
///
/// Loading the inputs is all-or-nothing; after that a user without a
/// preference is skipped and a failed write only loses that user's run.
pub async fn run_valuation(state: &AppState, now: DateTime<Utc>) -> Result<ValuationReport, AppError> {
    let (events, instruments, rates) = futures::try_join!(
        state.holdings.list_all(),
        state.catalogue.list_all(),
        state.fx.list_all(),
    )?;

    let catalogue: CatalogueIndex = instruments.into_iter().map(|i| (i.key(), i)).collect();
    let fx = FxTable::from_rates(rates);

    let mut by_user: BTreeMap<Uuid, Vec<Position>> = BTreeMap::new();
    for position in rollup_positions(&events) {
        by_user.entry(position.user_id).or_default().push(position);
    }

    info!(
        "📸 Valuing {} users ({} events, {} instruments, {} rates)",
        by_user.len(),
        events.len(),
        catalogue.len(),
        fx.len()
    );

    let mut report = ValuationReport::default();
    for (user_id, positions) in by_user {
        let preference = match state.users.get(user_id).await? {
            Some(preference) => preference,
            None => {
                warn!(uid = %user_id, "No preferences for user, skipping valuation");
                report.users_skipped += 1;
                continue;
            }
        };

        let rows = snapshot_user(&preference, positions, &catalogue, &fx, now);
        match state.snapshots.insert_many(rows).await {
            Ok(written) => {
                report.users_valued += 1;
                report.rows_written += written;
            }
            Err(e) => {
                error!(uid = %user_id, "❌ Failed to store snapshot: {}", e);
                report.users_failed += 1;
            }
        }
    }

    Ok(report)
}
