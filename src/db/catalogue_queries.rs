use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::{Instrument, InstrumentKey, InstrumentType};

const SELECT_COLUMNS: &str = "SELECT symbol, instrument_type, market, name, price, currency FROM investings";

pub async fn upsert(pool: &PgPool, instrument: &Instrument) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO investings (symbol, instrument_type, market, name, price, currency)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (symbol, instrument_type, market)
         DO UPDATE SET name = EXCLUDED.name,
                       price = EXCLUDED.price,
                       currency = EXCLUDED.currency,
                       updated_at = NOW()",
    )
    .bind(&instrument.symbol)
    .bind(instrument.instrument_type)
    .bind(&instrument.market)
    .bind(&instrument.name)
    .bind(&instrument.price)
    .bind(&instrument.currency)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Rows per multi-row insert; six binds each stays well under the Postgres bind limit.
pub const INSERT_CHUNK: usize = 1000;

/// Multi-row insert that silently drops duplicate keys, first row wins.
/// Used inside a replacement transaction.
pub async fn insert_batch(conn: &mut PgConnection, instruments: &[Instrument]) -> Result<u64, sqlx::Error> {
    if instruments.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO investings (symbol, instrument_type, market, name, price, currency) ");
    builder.push_values(instruments, |mut row, instrument| {
        row.push_bind(&instrument.symbol)
            .push_bind(instrument.instrument_type)
            .push_bind(&instrument.market)
            .push_bind(&instrument.name)
            .push_bind(&instrument.price)
            .push_bind(&instrument.currency);
    });
    builder.push(" ON CONFLICT (symbol, instrument_type, market) DO NOTHING");

    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn delete_by_type(conn: &mut PgConnection, instrument_type: InstrumentType) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM investings WHERE instrument_type = $1")
        .bind(instrument_type)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn fetch_one(pool: &PgPool, key: &InstrumentKey) -> Result<Option<Instrument>, sqlx::Error> {
    sqlx::query_as::<_, Instrument>(&format!(
        "{SELECT_COLUMNS} WHERE symbol = $1 AND instrument_type = $2 AND market = $3"
    ))
    .bind(&key.symbol)
    .bind(key.instrument_type)
    .bind(&key.market)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_by_type(
    pool: &PgPool,
    instrument_type: InstrumentType,
    market: Option<&str>,
) -> Result<Vec<Instrument>, sqlx::Error> {
    sqlx::query_as::<_, Instrument>(&format!(
        "{SELECT_COLUMNS}
         WHERE instrument_type = $1 AND ($2::TEXT IS NULL OR market = $2)
         ORDER BY symbol, market"
    ))
    .bind(instrument_type)
    .bind(market)
    .fetch_all(pool)
    .await
}

pub async fn fetch_all(pool: &PgPool) -> Result<Vec<Instrument>, sqlx::Error> {
    sqlx::query_as::<_, Instrument>(&format!(
        "{SELECT_COLUMNS} ORDER BY instrument_type, symbol, market"
    ))
    .fetch_all(pool)
    .await
}
