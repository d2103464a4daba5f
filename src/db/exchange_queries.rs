use sqlx::{PgConnection, PgPool};

use crate::models::ExchangeRate;

pub async fn delete_all(conn: &mut PgConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exchanges").execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn insert(conn: &mut PgConnection, rate: &ExchangeRate) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO exchanges (from_currency, to_currency, rate)
         VALUES ($1, $2, $3)
         ON CONFLICT (from_currency, to_currency) DO UPDATE SET rate = EXCLUDED.rate",
    )
    .bind(&rate.from_currency)
    .bind(&rate.to_currency)
    .bind(&rate.rate)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn fetch_one(pool: &PgPool, from: &str, to: &str) -> Result<Option<ExchangeRate>, sqlx::Error> {
    sqlx::query_as::<_, ExchangeRate>(
        "SELECT from_currency, to_currency, rate
         FROM exchanges
         WHERE from_currency = $1 AND to_currency = $2",
    )
    .bind(from)
    .bind(to)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<ExchangeRate>, sqlx::Error> {
    sqlx::query_as::<_, ExchangeRate>(
        "SELECT from_currency, to_currency, rate
         FROM exchanges
         ORDER BY from_currency, to_currency",
    )
    .fetch_all(pool)
    .await
}
