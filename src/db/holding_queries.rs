use sqlx::PgPool;
use uuid::Uuid;

use crate::models::HoldingsEvent;

const SELECT_COLUMNS: &str = "SELECT id, user_id, to_asset, from_asset, asset_type, asset_market,
                                     bought_price, amount, holding_type, sold_price, created_at
                              FROM assets";

pub async fn insert(pool: &PgPool, event: &HoldingsEvent) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO assets
         (id, user_id, to_asset, from_asset, asset_type, asset_market,
          bought_price, amount, holding_type, sold_price, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(event.id)
    .bind(event.user_id)
    .bind(&event.to_asset)
    .bind(&event.from_asset)
    .bind(event.asset_type)
    .bind(&event.asset_market)
    .bind(&event.bought_price)
    .bind(&event.amount)
    .bind(event.holding_type)
    .bind(&event.sold_price)
    .bind(event.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update(pool: &PgPool, event: &HoldingsEvent) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE assets
         SET to_asset = $3, from_asset = $4, asset_type = $5, asset_market = $6,
             bought_price = $7, amount = $8, holding_type = $9, sold_price = $10
         WHERE id = $1 AND user_id = $2",
    )
    .bind(event.id)
    .bind(event.user_id)
    .bind(&event.to_asset)
    .bind(&event.from_asset)
    .bind(event.asset_type)
    .bind(&event.asset_market)
    .bind(&event.bought_price)
    .bind(&event.amount)
    .bind(event.holding_type)
    .bind(&event.sold_price)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, user_id: Uuid, event_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assets WHERE id = $1 AND user_id = $2")
        .bind(event_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn fetch_one(pool: &PgPool, user_id: Uuid, event_id: Uuid) -> Result<Option<HoldingsEvent>, sqlx::Error> {
    sqlx::query_as::<_, HoldingsEvent>(&format!("{SELECT_COLUMNS} WHERE id = $1 AND user_id = $2"))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<HoldingsEvent>, sqlx::Error> {
    sqlx::query_as::<_, HoldingsEvent>(&format!(
        "{SELECT_COLUMNS} WHERE user_id = $1 ORDER BY created_at DESC, id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<HoldingsEvent>, sqlx::Error> {
    sqlx::query_as::<_, HoldingsEvent>(&format!("{SELECT_COLUMNS} ORDER BY user_id, created_at, id"))
        .fetch_all(pool)
        .await
}

pub async fn delete_by_user(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM assets WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
