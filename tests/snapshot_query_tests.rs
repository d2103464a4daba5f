/// Snapshot series and latest-snapshot reads.
mod common;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use common::d;
use fintrack::errors::AppError;
use fintrack::models::{InstrumentType, PortfolioSnapshot, SnapshotInterval, UserPreference};
use fintrack::services::snapshot_query_service::{get_latest_snapshot, get_snapshot_series_at};
use fintrack::store::memory::MemoryStores;
use fintrack::store::SnapshotStore;

fn row(user: Uuid, asset_type: Option<InstrumentType>, assets: i64, at: DateTime<Utc>) -> PortfolioSnapshot {
    PortfolioSnapshot {
        id: Uuid::new_v4(),
        user_id: user,
        currency: "USD".to_string(),
        asset_type,
        total_assets: BigDecimal::from(assets),
        total_p_and_l: BigDecimal::from(-assets / 10),
        created_at: at,
    }
}

/// One run per day for `days` days ending at `now`: a crypto row and its roll-up.
async fn seed_daily_runs(stores: &MemoryStores, user: Uuid, now: DateTime<Utc>, days: i64) {
    let mut rows = Vec::new();
    for k in 0..days {
        let at = now - Duration::days(k);
        let assets = 1000 + k * 10;
        rows.push(row(user, Some(InstrumentType::Crypto), assets, at));
        rows.push(row(user, None, assets, at));
    }
    stores.snapshots.insert_many(rows).await.unwrap();
}

fn user(stores: &MemoryStores, currency: &str, premium: bool) -> Uuid {
    let id = Uuid::new_v4();
    let preference = UserPreference::new(id, currency);
    stores
        .users
        .upsert(if premium { preference.premium() } else { preference });
    id
}

#[tokio::test]
async fn test_weekly_series_keeps_last_seven_days() {
    let stores = MemoryStores::new();
    let uid = user(&stores, "USD", false);
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    seed_daily_runs(&stores, uid, now - Duration::hours(11), 10).await;

    let series = get_snapshot_series_at(&stores.state(), uid, SnapshotInterval::Weekly, now)
        .await
        .unwrap();

    assert_eq!(series.len(), 7);
    assert_eq!(series.total_assets.len(), 7);
    assert_eq!(series.total_p_and_l.len(), 7);
    assert!(series.dates.windows(2).all(|w| w[0] < w[1]));
    assert!(series.dates[0] >= now - Duration::days(7));
    // newest point is today's run, unaffected by per-type rows
    assert_eq!(series.total_assets[6], d("1000"));
    assert_eq!(series.total_p_and_l[6], d("-100"));
}

#[tokio::test]
async fn test_monthly_series_returns_raw_points() {
    let stores = MemoryStores::new();
    let uid = user(&stores, "USD", true);
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
    seed_daily_runs(&stores, uid, now - Duration::hours(11), 40).await;

    let series = get_snapshot_series_at(&stores.state(), uid, SnapshotInterval::Monthly, now)
        .await
        .unwrap();

    assert_eq!(series.len(), 30);
    assert!(series.dates.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_yearly_series_sums_per_month() {
    let stores = MemoryStores::new();
    let uid = user(&stores, "USD", true);
    let at = |m, day| Utc.with_ymd_and_hms(2024, m, day, 1, 0, 0).unwrap();

    stores
        .snapshots
        .insert_many(vec![
            row(uid, None, 100, Utc.with_ymd_and_hms(2023, 12, 31, 1, 0, 0).unwrap()),
            row(uid, None, 100, at(1, 10)),
            row(uid, None, 200, at(1, 11)),
            row(uid, Some(InstrumentType::Stock), 999, at(1, 11)),
            row(uid, None, 50, at(3, 2)),
        ])
        .await
        .unwrap();

    let now = at(3, 20);
    let series = get_snapshot_series_at(&stores.state(), uid, SnapshotInterval::Yearly, now)
        .await
        .unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series.dates[0], Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(series.dates[1], Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    assert_eq!(series.total_assets, vec![d("300"), d("50")]);
    assert_eq!(series.total_p_and_l, vec![d("-30"), d("-5")]);
}

#[tokio::test]
async fn test_series_is_tagged_with_current_currency() {
    let stores = MemoryStores::new();
    let uid = user(&stores, "USD", false);
    let now = Utc::now();
    seed_daily_runs(&stores, uid, now, 2).await;

    stores.users.upsert(UserPreference::new(uid, "GBP"));
    let series = get_snapshot_series_at(&stores.state(), uid, SnapshotInterval::Weekly, now)
        .await
        .unwrap();

    assert_eq!(series.currency, "GBP");
    assert_eq!(series.len(), 2);
}

#[tokio::test]
async fn test_user_without_snapshots_gets_empty_series() {
    let stores = MemoryStores::new();
    let uid = user(&stores, "JPY", true);

    for interval in [SnapshotInterval::Weekly, SnapshotInterval::Monthly, SnapshotInterval::Yearly] {
        let series = get_snapshot_series_at(&stores.state(), uid, interval, Utc::now())
            .await
            .unwrap();
        assert!(series.is_empty());
        assert_eq!(series.currency, "JPY");
    }

    assert!(get_latest_snapshot(&stores.state(), uid).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let stores = MemoryStores::new();
    let result =
        get_snapshot_series_at(&stores.state(), Uuid::new_v4(), SnapshotInterval::Weekly, Utc::now()).await;
    assert!(matches!(result, Err(AppError::NotFound)));

    let latest = get_latest_snapshot(&stores.state(), Uuid::new_v4()).await;
    assert!(matches!(latest, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_latest_snapshot_returns_newest_run() {
    let stores = MemoryStores::new();
    let uid = user(&stores, "USD", false);
    let now = Utc::now();
    seed_daily_runs(&stores, uid, now, 3).await;

    let latest = get_latest_snapshot(&stores.state(), uid).await.unwrap().unwrap();
    assert!(latest.total.is_rollup());
    assert_eq!(latest.total.created_at, now);
    assert_eq!(latest.total.total_assets, d("1000"));
    assert_eq!(latest.breakdown.len(), 1);
    assert_eq!(latest.breakdown[0].asset_type, Some(InstrumentType::Crypto));
}

#[test]
fn test_only_weekly_is_free() {
    assert!(!SnapshotInterval::Weekly.is_premium_only());
    assert!(SnapshotInterval::Monthly.is_premium_only());
    assert!(SnapshotInterval::Yearly.is_premium_only());
}
