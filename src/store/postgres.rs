use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::db::{
    catalogue_queries, exchange_queries, holding_queries, job_run_queries, snapshot_queries,
    user_preferences_queries,
};
use crate::errors::AppError;
use crate::models::{
    ExchangeRate, HoldingsEvent, Instrument, InstrumentKey, InstrumentType, JobRun,
    PortfolioSnapshot, UserPreference,
};

use super::{
    BatchReport, CatalogueStore, FxStore, HoldingsLog, JobRunLog, SnapshotStore, UserPreferences,
};

/// All stores on one Postgres pool. Every statement runs under `op_timeout`.
#[derive(Clone)]
pub struct PgStores {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgStores {
    pub fn new(pool: PgPool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::Timeout(self.op_timeout.as_secs())),
        }
    }
}

#[async_trait]
impl CatalogueStore for PgStores {
    async fn upsert_many(&self, entries: Vec<Instrument>) -> Result<BatchReport, AppError> {
        let mut report = BatchReport::default();

        for instrument in &entries {
            match self.timed(catalogue_queries::upsert(&self.pool, instrument)).await {
                Ok(_) => report.written += 1,
                Err(e) => {
                    warn!(
                        "Skipping instrument {} ({}/{}): {}",
                        instrument.symbol, instrument.instrument_type, instrument.market, e
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn replace_all(
        &self,
        instrument_type: InstrumentType,
        entries: Vec<Instrument>,
    ) -> Result<BatchReport, AppError> {
        let mut tx = self.timed(self.pool.begin()).await?;

        let removed = self
            .timed(catalogue_queries::delete_by_type(&mut *tx, instrument_type))
            .await?;

        let scoped: Vec<Instrument> = entries
            .into_iter()
            .filter(|i| i.instrument_type == instrument_type)
            .collect();

        // Any database error rolls back the whole generation; rows are
        // validated before they reach the store.
        let mut report = BatchReport::default();
        for chunk in scoped.chunks(catalogue_queries::INSERT_CHUNK) {
            let inserted = self
                .timed(catalogue_queries::insert_batch(&mut *tx, chunk))
                .await
                .map_err(|e| {
                    error!("Aborting {} catalogue replacement: {}", instrument_type, e);
                    e
                })?;
            report.written += inserted as usize;
        }

        self.timed(tx.commit()).await?;

        debug!(
            "Replaced {} catalogue: {} removed, {} written",
            instrument_type, removed, report.written
        );
        Ok(report)
    }

    async fn find(&self, key: &InstrumentKey) -> Result<Option<Instrument>, AppError> {
        self.timed(catalogue_queries::fetch_one(&self.pool, key)).await
    }

    async fn find_by_type(
        &self,
        instrument_type: InstrumentType,
        market: Option<&str>,
    ) -> Result<Vec<Instrument>, AppError> {
        self.timed(catalogue_queries::fetch_by_type(&self.pool, instrument_type, market))
            .await
    }

    async fn list_all(&self) -> Result<Vec<Instrument>, AppError> {
        self.timed(catalogue_queries::fetch_all(&self.pool)).await
    }
}

#[async_trait]
impl FxStore for PgStores {
    async fn replace_all(&self, rates: Vec<ExchangeRate>) -> Result<usize, AppError> {
        let mut tx = self.timed(self.pool.begin()).await?;

        self.timed(exchange_queries::delete_all(&mut *tx)).await?;

        let mut written = 0;
        for rate in &rates {
            self.timed(exchange_queries::insert(&mut *tx, rate)).await?;
            written += 1;
        }

        self.timed(tx.commit()).await?;
        Ok(written)
    }

    async fn find(&self, from: &str, to: &str) -> Result<Option<ExchangeRate>, AppError> {
        self.timed(exchange_queries::fetch_one(&self.pool, from, to)).await
    }

    async fn list_all(&self) -> Result<Vec<ExchangeRate>, AppError> {
        self.timed(exchange_queries::fetch_all(&self.pool)).await
    }
}

#[async_trait]
impl HoldingsLog for PgStores {
    async fn insert(&self, event: HoldingsEvent) -> Result<(), AppError> {
        self.timed(holding_queries::insert(&self.pool, &event)).await
    }

    async fn update(&self, event: HoldingsEvent) -> Result<bool, AppError> {
        let affected = self.timed(holding_queries::update(&self.pool, &event)).await?;
        Ok(affected > 0)
    }

    async fn delete(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, AppError> {
        let affected = self
            .timed(holding_queries::delete(&self.pool, user_id, event_id))
            .await?;
        Ok(affected > 0)
    }

    async fn find(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<HoldingsEvent>, AppError> {
        self.timed(holding_queries::fetch_one(&self.pool, user_id, event_id))
            .await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<HoldingsEvent>, AppError> {
        self.timed(holding_queries::fetch_by_user(&self.pool, user_id)).await
    }

    async fn list_all(&self) -> Result<Vec<HoldingsEvent>, AppError> {
        self.timed(holding_queries::fetch_all(&self.pool)).await
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.timed(holding_queries::delete_by_user(&self.pool, user_id)).await
    }
}

#[async_trait]
impl SnapshotStore for PgStores {
    async fn insert_many(&self, rows: Vec<PortfolioSnapshot>) -> Result<usize, AppError> {
        let inserted = self
            .timed(snapshot_queries::insert_many(&self.pool, &rows))
            .await?;
        Ok(inserted as usize)
    }

    async fn list_rollups_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<PortfolioSnapshot>, AppError> {
        self.timed(snapshot_queries::fetch_rollups_since(&self.pool, user_id, since))
            .await
    }

    async fn latest_run(&self, user_id: Uuid) -> Result<Vec<PortfolioSnapshot>, AppError> {
        self.timed(snapshot_queries::fetch_latest_run(&self.pool, user_id))
            .await
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.timed(snapshot_queries::delete_by_user(&self.pool, user_id))
            .await
    }
}

#[async_trait]
impl UserPreferences for PgStores {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserPreference>, AppError> {
        self.timed(user_preferences_queries::get_by_user_id(&self.pool, user_id))
            .await
    }
}

#[async_trait]
impl JobRunLog for PgStores {
    async fn record_start(&self, job_name: &str) -> Result<Uuid, AppError> {
        self.timed(job_run_queries::record_start(&self.pool, job_name)).await
    }

    async fn record_success(
        &self,
        run_id: Uuid,
        items_processed: i32,
        items_failed: i32,
        duration_ms: i64,
    ) -> Result<(), AppError> {
        self.timed(job_run_queries::record_success(
            &self.pool,
            run_id,
            items_processed,
            items_failed,
            duration_ms,
        ))
        .await
    }

    async fn record_failure(
        &self,
        run_id: Uuid,
        error_message: &str,
        duration_ms: i64,
    ) -> Result<(), AppError> {
        self.timed(job_run_queries::record_failure(
            &self.pool,
            run_id,
            error_message,
            duration_ms,
        ))
        .await
    }

    async fn last_success(&self, job_name: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        self.timed(job_run_queries::fetch_last_success(&self.pool, job_name))
            .await
    }

    async fn recent(&self, job_name: &str, limit: i64) -> Result<Vec<JobRun>, AppError> {
        self.timed(job_run_queries::fetch_recent(&self.pool, job_name, limit))
            .await
    }
}
