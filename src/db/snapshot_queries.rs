use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PortfolioSnapshot;

pub async fn insert_many(pool: &PgPool, rows: &[PortfolioSnapshot]) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for row in rows {
        let result = sqlx::query(
            "INSERT INTO daily_asset_stats
             (id, user_id, currency, asset_type, total_assets, total_p_and_l, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(&row.currency)
        .bind(row.asset_type)
        .bind(&row.total_assets)
        .bind(&row.total_p_and_l)
        .bind(row.created_at)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

pub async fn fetch_rollups_since(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<Vec<PortfolioSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioSnapshot>(
        "SELECT id, user_id, currency, asset_type, total_assets, total_p_and_l, created_at
         FROM daily_asset_stats
         WHERE user_id = $1 AND asset_type IS NULL AND created_at >= $2
         ORDER BY created_at ASC",
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await
}

pub async fn fetch_latest_run(pool: &PgPool, user_id: Uuid) -> Result<Vec<PortfolioSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, PortfolioSnapshot>(
        "SELECT id, user_id, currency, asset_type, total_assets, total_p_and_l, created_at
         FROM daily_asset_stats
         WHERE user_id = $1
           AND created_at = (SELECT MAX(created_at) FROM daily_asset_stats WHERE user_id = $1)
         ORDER BY asset_type NULLS FIRST",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn delete_by_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM daily_asset_stats WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
