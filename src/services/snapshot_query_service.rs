use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{LatestSnapshot, PortfolioSnapshot, SnapshotInterval, SnapshotSeries, UserPreference};
use crate::state::AppState;
use crate::utils::{sum, zero};

async fn preference(state: &AppState, user_id: Uuid) -> Result<UserPreference, AppError> {
    state.users.get(user_id).await?.ok_or(AppError::NotFound)
}

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight))
        .unwrap_or(at)
}

fn start_of_month(at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0).single()
}

/// First instant included in `interval` as seen at `now`.
///
/// Weekly and monthly windows are whole UTC days: today plus the previous
/// 6 (resp. 29) days. Yearly starts on January 1st.
pub fn window_start(interval: SnapshotInterval, now: DateTime<Utc>) -> DateTime<Utc> {
    match interval {
        SnapshotInterval::Weekly => start_of_day(now) - Duration::days(6),
        SnapshotInterval::Monthly => start_of_day(now) - Duration::days(29),
        SnapshotInterval::Yearly => Utc
            .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(|| start_of_day(now)),
    }
}

/// Sums rows per calendar month, keyed by the month's first instant.
fn bucket_by_month(rows: Vec<PortfolioSnapshot>) -> Vec<(DateTime<Utc>, BigDecimal, BigDecimal)> {
    let mut buckets: BTreeMap<DateTime<Utc>, (BigDecimal, BigDecimal)> = BTreeMap::new();
    for row in rows {
        let Some(month) = start_of_month(row.created_at) else {
            continue;
        };
        let (assets, p_and_l) = buckets.entry(month).or_insert_with(|| (zero(), zero()));
        *assets += row.total_assets;
        *p_and_l += row.total_p_and_l;
    }
    buckets
        .into_iter()
        .map(|(month, (assets, p_and_l))| (month, assets, p_and_l))
        .collect()
}

pub async fn get_snapshot_series(
    state: &AppState,
    user_id: Uuid,
    interval: SnapshotInterval,
) -> Result<SnapshotSeries, AppError> {
    get_snapshot_series_at(state, user_id, interval, Utc::now()).await
}

/// The user's roll-up series over `interval`, ascending and index-aligned,
/// tagged with the user's current currency.
#[instrument(skip_all, fields(uid = %user_id, interval = %interval))]
pub async fn get_snapshot_series_at(
    state: &AppState,
    user_id: Uuid,
    interval: SnapshotInterval,
    now: DateTime<Utc>,
) -> Result<SnapshotSeries, AppError> {
    let preference = preference(state, user_id).await?;
    let since = window_start(interval, now);

    let rows = state.snapshots.list_rollups_since(user_id, since).await?;
    debug!("{} roll-up rows since {}", rows.len(), since);

    let points: Vec<(DateTime<Utc>, BigDecimal, BigDecimal)> = match interval {
        SnapshotInterval::Weekly | SnapshotInterval::Monthly => {
            let mut rows: Vec<PortfolioSnapshot> =
                rows.into_iter().filter(|r| r.created_at <= now).collect();
            rows.sort_by_key(|r| r.created_at);
            rows.into_iter()
                .map(|r| (r.created_at, r.total_assets, r.total_p_and_l))
                .collect()
        }
        SnapshotInterval::Yearly => {
            bucket_by_month(rows.into_iter().filter(|r| r.created_at <= now).collect())
        }
    };

    let mut series = SnapshotSeries::empty(preference.currency);
    for (date, assets, p_and_l) in points {
        series.dates.push(date);
        series.total_assets.push(assets);
        series.total_p_and_l.push(p_and_l);
    }

    Ok(series)
}

/// The newest run: its roll-up plus the per-type rows behind it.
pub async fn get_latest_snapshot(
    state: &AppState,
    user_id: Uuid,
) -> Result<Option<LatestSnapshot>, AppError> {
    preference(state, user_id).await?;

    let run = state.snapshots.latest_run(user_id).await?;
    if run.is_empty() {
        return Ok(None);
    }

    let (rollups, breakdown): (Vec<PortfolioSnapshot>, Vec<PortfolioSnapshot>) =
        run.into_iter().partition(|r| r.is_rollup());

    let total = match rollups.into_iter().next() {
        Some(total) => total,
        // Runs written without a roll-up row: rebuild it from the breakdown.
        None => {
            let Some(first) = breakdown.first() else {
                return Ok(None);
            };
            PortfolioSnapshot {
                id: first.id,
                user_id,
                currency: first.currency.clone(),
                asset_type: None,
                total_assets: sum(breakdown.iter().map(|r| &r.total_assets)),
                total_p_and_l: sum(breakdown.iter().map(|r| &r.total_p_and_l)),
                created_at: first.created_at,
            }
        }
    };

    Ok(Some(LatestSnapshot { total, breakdown }))
}
