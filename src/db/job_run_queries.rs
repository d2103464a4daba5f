use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::JobRun;

pub async fn record_start(pool: &PgPool, job_name: &str) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO job_runs (id, job_name, status, started_at)
         VALUES ($1, $2, 'running', NOW())",
    )
    .bind(id)
    .bind(job_name)
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn record_success(
    pool: &PgPool,
    run_id: Uuid,
    items_processed: i32,
    items_failed: i32,
    duration_ms: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE job_runs
         SET completed_at = NOW(),
             status = 'success',
             items_processed = $2,
             items_failed = $3,
             duration_ms = $4
         WHERE id = $1",
    )
    .bind(run_id)
    .bind(items_processed)
    .bind(items_failed)
    .bind(duration_ms)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn record_failure(
    pool: &PgPool,
    run_id: Uuid,
    error_message: &str,
    duration_ms: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE job_runs
         SET completed_at = NOW(),
             status = 'failed',
             error_message = $2,
             duration_ms = $3
         WHERE id = $1",
    )
    .bind(run_id)
    .bind(error_message)
    .bind(duration_ms)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_last_success(pool: &PgPool, job_name: &str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
        "SELECT MAX(started_at) FROM job_runs WHERE job_name = $1 AND status = 'success'",
    )
    .bind(job_name)
    .fetch_one(pool)
    .await
}

pub async fn fetch_recent(pool: &PgPool, job_name: &str, limit: i64) -> Result<Vec<JobRun>, sqlx::Error> {
    sqlx::query_as::<_, JobRun>(
        "SELECT id, job_name, status, started_at, completed_at,
                items_processed, items_failed, duration_ms, error_message
         FROM job_runs
         WHERE job_name = $1
         ORDER BY started_at DESC
         LIMIT $2",
    )
    .bind(job_name)
    .bind(limit)
    .fetch_all(pool)
    .await
}
