//! Persistence seams.
//!
//! The core only talks to these traits. `postgres::PgStores` backs them with
//! the `db::*_queries` modules; `memory::MemoryStores` keeps everything in
//! process for tests and embedding.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    ExchangeRate, HoldingsEvent, Instrument, InstrumentKey, InstrumentType, JobRun,
    PortfolioSnapshot, UserPreference,
};

/// Outcome of an unordered batch write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub written: usize,
    pub failed: usize,
}

/// Investable instruments keyed by `(symbol, type, market)` (`investings`).
#[async_trait]
pub trait CatalogueStore: Send + Sync {
    /// Unordered upsert: a failing row is logged and counted, the rest commit.
    async fn upsert_many(&self, entries: Vec<Instrument>) -> Result<BatchReport, AppError>;

    /// Swaps the whole key-space of `instrument_type` for `entries`.
    /// Readers observe either the old or the new key-space, never a mix.
    /// Duplicate keys inside `entries` keep the first occurrence. A storage
    /// error aborts the replacement and leaves the previous key-space intact.
    async fn replace_all(
        &self,
        instrument_type: InstrumentType,
        entries: Vec<Instrument>,
    ) -> Result<BatchReport, AppError>;

    async fn find(&self, key: &InstrumentKey) -> Result<Option<Instrument>, AppError>;

    async fn find_by_type(
        &self,
        instrument_type: InstrumentType,
        market: Option<&str>,
    ) -> Result<Vec<Instrument>, AppError>;

    async fn list_all(&self) -> Result<Vec<Instrument>, AppError>;
}

/// Directed exchange rates keyed by `(from, to)` (`exchanges`).
#[async_trait]
pub trait FxStore: Send + Sync {
    /// Delete-all-then-insert-all as one step. Returns the number of rows written.
    async fn replace_all(&self, rates: Vec<ExchangeRate>) -> Result<usize, AppError>;

    async fn find(&self, from: &str, to: &str) -> Result<Option<ExchangeRate>, AppError>;

    /// Ordered by `(from, to)`.
    async fn list_all(&self) -> Result<Vec<ExchangeRate>, AppError>;
}

/// Per-user buy/sell log (`assets`).
#[async_trait]
pub trait HoldingsLog: Send + Sync {
    async fn insert(&self, event: HoldingsEvent) -> Result<(), AppError>;

    /// Replaces the event with the same id and owner. `false` when absent.
    async fn update(&self, event: HoldingsEvent) -> Result<bool, AppError>;

    async fn delete(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, AppError>;

    async fn find(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<HoldingsEvent>, AppError>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<HoldingsEvent>, AppError>;

    async fn list_all(&self) -> Result<Vec<HoldingsEvent>, AppError>;

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, AppError>;
}

/// Daily valuation series (`daily_asset_stats`).
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn insert_many(&self, rows: Vec<PortfolioSnapshot>) -> Result<usize, AppError>;

    /// Roll-up rows (`asset_type` unset) created at or after `since`, oldest first.
    async fn list_rollups_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<PortfolioSnapshot>, AppError>;

    /// Every row of the user's most recent run.
    async fn latest_run(&self, user_id: Uuid) -> Result<Vec<PortfolioSnapshot>, AppError>;

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, AppError>;
}

/// Read-only view of the user service.
#[async_trait]
pub trait UserPreferences: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserPreference>, AppError>;
}

/// Scheduler bookkeeping (`job_runs`).
#[async_trait]
pub trait JobRunLog: Send + Sync {
    async fn record_start(&self, job_name: &str) -> Result<Uuid, AppError>;

    async fn record_success(
        &self,
        run_id: Uuid,
        items_processed: i32,
        items_failed: i32,
        duration_ms: i64,
    ) -> Result<(), AppError>;

    async fn record_failure(
        &self,
        run_id: Uuid,
        error_message: &str,
        duration_ms: i64,
    ) -> Result<(), AppError>;

    async fn last_success(&self, job_name: &str) -> Result<Option<DateTime<Utc>>, AppError>;

    /// Newest first.
    async fn recent(&self, job_name: &str, limit: i64) -> Result<Vec<JobRun>, AppError>;
}
