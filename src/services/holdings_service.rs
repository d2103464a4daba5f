use bigdecimal::BigDecimal;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{HoldingType, HoldingsEvent, NewHoldingsEvent, Position};
use crate::services::valuation_service::rollup_positions;
use crate::state::AppState;
use crate::utils::zero;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeletedUserData {
    pub events: u64,
    pub snapshots: u64,
}

/// Net amount of `to_asset` held against `from_asset`.
fn held_amount(events: &[HoldingsEvent], to_asset: &str, from_asset: &str) -> BigDecimal {
    events
        .iter()
        .filter(|e| e.to_asset == to_asset && e.from_asset == from_asset)
        .fold(zero(), |held, e| match e.holding_type {
            HoldingType::Buy => held + &e.amount,
            HoldingType::Sell => held - &e.amount,
        })
}

/// Rejects a log in which the `(to_asset, from_asset)` position sells more than it bought.
fn ensure_not_oversold(events: &[HoldingsEvent], to_asset: &str, from_asset: &str) -> Result<(), AppError> {
    let held = held_amount(events, to_asset, from_asset);
    if held < zero() {
        return Err(AppError::Validation(format!(
            "{}/{} would be oversold by {}",
            to_asset,
            from_asset,
            -held
        )));
    }
    Ok(())
}

pub async fn append_event(
    state: &AppState,
    user_id: Uuid,
    input: NewHoldingsEvent,
) -> Result<Uuid, AppError> {
    input.validate()?;

    let event = input.into_event(Uuid::new_v4(), user_id, Utc::now());
    if event.holding_type == HoldingType::Sell {
        let mut events = state.holdings.list_by_user(user_id).await?;
        events.push(event.clone());
        ensure_not_oversold(&events, &event.to_asset, &event.from_asset)?;
    }

    let id = event.id;
    state.holdings.insert(event).await?;

    info!(uid = %user_id, "Recorded holdings event {}", id);
    Ok(id)
}

pub async fn update_event(
    state: &AppState,
    user_id: Uuid,
    event_id: Uuid,
    input: NewHoldingsEvent,
) -> Result<HoldingsEvent, AppError> {
    input.validate()?;

    let mut events = state.holdings.list_by_user(user_id).await?;
    let index = events
        .iter()
        .position(|e| e.id == event_id)
        .ok_or(AppError::NotFound)?;

    let existing = events[index].clone();
    let event = input.into_event(event_id, user_id, existing.created_at);
    events[index] = event.clone();

    // Both the old and the new pair must stay covered.
    ensure_not_oversold(&events, &existing.to_asset, &existing.from_asset)?;
    ensure_not_oversold(&events, &event.to_asset, &event.from_asset)?;

    if !state.holdings.update(event.clone()).await? {
        return Err(AppError::NotFound);
    }
    Ok(event)
}

pub async fn delete_event(state: &AppState, user_id: Uuid, event_id: Uuid) -> Result<(), AppError> {
    let mut events = state.holdings.list_by_user(user_id).await?;
    let index = events
        .iter()
        .position(|e| e.id == event_id)
        .ok_or(AppError::NotFound)?;

    let removed = events.remove(index);
    ensure_not_oversold(&events, &removed.to_asset, &removed.from_asset)?;

    if !state.holdings.delete(user_id, event_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn list_events(state: &AppState, user_id: Uuid) -> Result<Vec<HoldingsEvent>, AppError> {
    state.holdings.list_by_user(user_id).await
}

/// Rolled-up positions without valuation.
pub async fn list_positions(state: &AppState, user_id: Uuid) -> Result<Vec<Position>, AppError> {
    let events = state.holdings.list_by_user(user_id).await?;
    Ok(rollup_positions(&events))
}

/// Removes the user's holdings log and snapshot series.
pub async fn delete_user_data(state: &AppState, user_id: Uuid) -> Result<DeletedUserData, AppError> {
    let events = state.holdings.delete_by_user(user_id).await?;
    let snapshots = state.snapshots.delete_by_user(user_id).await?;

    if events == 0 && snapshots == 0 {
        warn!(uid = %user_id, "Nothing to delete for user");
    } else {
        info!(uid = %user_id, "🗑️ Deleted {} holdings events and {} snapshots", events, snapshots);
    }

    Ok(DeletedUserData { events, snapshots })
}
