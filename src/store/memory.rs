use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::models::{
    ExchangeRate, HoldingsEvent, Instrument, InstrumentKey, InstrumentType, JobRun, JobStatus,
    PortfolioSnapshot, UserPreference,
};

use super::{
    BatchReport, CatalogueStore, FxStore, HoldingsLog, JobRunLog, SnapshotStore, UserPreferences,
};

/// Catalogue held behind one lock; a replacement swaps its key-space while
/// holding the write lock, so readers never see a half-written generation.
#[derive(Default)]
pub struct MemoryCatalogue {
    rows: RwLock<BTreeMap<InstrumentKey, Instrument>>,
}

#[async_trait]
impl CatalogueStore for MemoryCatalogue {
    async fn upsert_many(&self, entries: Vec<Instrument>) -> Result<BatchReport, AppError> {
        let mut rows = self.rows.write();
        let written = entries.len();
        for instrument in entries {
            rows.insert(instrument.key(), instrument);
        }
        Ok(BatchReport { written, failed: 0 })
    }

    async fn replace_all(
        &self,
        instrument_type: InstrumentType,
        entries: Vec<Instrument>,
    ) -> Result<BatchReport, AppError> {
        let mut fresh: BTreeMap<InstrumentKey, Instrument> = BTreeMap::new();
        for instrument in entries.into_iter().filter(|i| i.instrument_type == instrument_type) {
            fresh.entry(instrument.key()).or_insert(instrument);
        }
        let written = fresh.len();

        let mut rows = self.rows.write();
        rows.retain(|key, _| key.instrument_type != instrument_type);
        rows.extend(fresh);

        Ok(BatchReport { written, failed: 0 })
    }

    async fn find(&self, key: &InstrumentKey) -> Result<Option<Instrument>, AppError> {
        Ok(self.rows.read().get(key).cloned())
    }

    async fn find_by_type(
        &self,
        instrument_type: InstrumentType,
        market: Option<&str>,
    ) -> Result<Vec<Instrument>, AppError> {
        Ok(self
            .rows
            .read()
            .values()
            .filter(|i| i.instrument_type == instrument_type)
            .filter(|i| market.map_or(true, |m| i.market == m))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Instrument>, AppError> {
        Ok(self.rows.read().values().cloned().collect())
    }
}

#[derive(Default)]
pub struct MemoryFx {
    rows: RwLock<BTreeMap<(String, String), ExchangeRate>>,
}

#[async_trait]
impl FxStore for MemoryFx {
    async fn replace_all(&self, rates: Vec<ExchangeRate>) -> Result<usize, AppError> {
        let fresh: BTreeMap<(String, String), ExchangeRate> = rates
            .into_iter()
            .map(|r| ((r.from_currency.clone(), r.to_currency.clone()), r))
            .collect();
        let written = fresh.len();
        *self.rows.write() = fresh;
        Ok(written)
    }

    async fn find(&self, from: &str, to: &str) -> Result<Option<ExchangeRate>, AppError> {
        Ok(self
            .rows
            .read()
            .get(&(from.to_string(), to.to_string()))
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<ExchangeRate>, AppError> {
        Ok(self.rows.read().values().cloned().collect())
    }
}

#[derive(Default)]
pub struct MemoryHoldings {
    rows: DashMap<Uuid, HoldingsEvent>,
}

#[async_trait]
impl HoldingsLog for MemoryHoldings {
    async fn insert(&self, event: HoldingsEvent) -> Result<(), AppError> {
        self.rows.insert(event.id, event);
        Ok(())
    }

    async fn update(&self, event: HoldingsEvent) -> Result<bool, AppError> {
        match self.rows.get_mut(&event.id) {
            Some(mut existing) if existing.user_id == event.user_id => {
                *existing = event;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, user_id: Uuid, event_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .rows
            .remove_if(&event_id, |_, e| e.user_id == user_id)
            .is_some())
    }

    async fn find(&self, user_id: Uuid, event_id: Uuid) -> Result<Option<HoldingsEvent>, AppError> {
        Ok(self
            .rows
            .get(&event_id)
            .filter(|e| e.user_id == user_id)
            .map(|e| e.value().clone()))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<HoldingsEvent>, AppError> {
        let mut events: Vec<HoldingsEvent> = self
            .rows
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.value().clone())
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn list_all(&self) -> Result<Vec<HoldingsEvent>, AppError> {
        let mut events: Vec<HoldingsEvent> = self.rows.iter().map(|e| e.value().clone()).collect();
        events.sort_by(|a, b| {
            a.user_id
                .cmp(&b.user_id)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(events)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let before = self.rows.len();
        self.rows.retain(|_, e| e.user_id != user_id);
        Ok((before - self.rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemorySnapshots {
    rows: RwLock<Vec<PortfolioSnapshot>>,
}

impl MemorySnapshots {
    /// All stored rows in insertion order.
    pub fn all(&self) -> Vec<PortfolioSnapshot> {
        self.rows.read().clone()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshots {
    async fn insert_many(&self, rows: Vec<PortfolioSnapshot>) -> Result<usize, AppError> {
        let inserted = rows.len();
        self.rows.write().extend(rows);
        Ok(inserted)
    }

    async fn list_rollups_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<PortfolioSnapshot>, AppError> {
        let mut rows: Vec<PortfolioSnapshot> = self
            .rows
            .read()
            .iter()
            .filter(|s| s.user_id == user_id && s.is_rollup() && s.created_at >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.created_at);
        Ok(rows)
    }

    async fn latest_run(&self, user_id: Uuid) -> Result<Vec<PortfolioSnapshot>, AppError> {
        let rows = self.rows.read();
        let latest = rows
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.created_at)
            .max();

        let Some(latest) = latest else {
            return Ok(Vec::new());
        };

        let mut run: Vec<PortfolioSnapshot> = rows
            .iter()
            .filter(|s| s.user_id == user_id && s.created_at == latest)
            .cloned()
            .collect();
        // roll-up first, then by type
        run.sort_by_key(|s| s.asset_type.map(|t| (1, t)).unwrap_or((0, InstrumentType::Crypto)));
        Ok(run)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|s| s.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    rows: DashMap<Uuid, UserPreference>,
}

impl MemoryUsers {
    pub fn upsert(&self, preference: UserPreference) {
        self.rows.insert(preference.user_id, preference);
    }
}

#[async_trait]
impl UserPreferences for MemoryUsers {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserPreference>, AppError> {
        Ok(self.rows.get(&user_id).map(|p| p.value().clone()))
    }
}

#[derive(Default)]
pub struct MemoryJobRuns {
    rows: RwLock<Vec<JobRun>>,
}

impl MemoryJobRuns {
    fn finish(&self, run_id: Uuid, apply: impl FnOnce(&mut JobRun)) -> Result<(), AppError> {
        let mut rows = self.rows.write();
        let run = rows
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or(AppError::NotFound)?;
        run.completed_at = Some(Utc::now());
        apply(run);
        Ok(())
    }
}

#[async_trait]
impl JobRunLog for MemoryJobRuns {
    async fn record_start(&self, job_name: &str) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        self.rows.write().push(JobRun {
            id,
            job_name: job_name.to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            items_processed: 0,
            items_failed: 0,
            duration_ms: None,
            error_message: None,
        });
        Ok(id)
    }

    async fn record_success(
        &self,
        run_id: Uuid,
        items_processed: i32,
        items_failed: i32,
        duration_ms: i64,
    ) -> Result<(), AppError> {
        self.finish(run_id, |run| {
            run.status = JobStatus::Success;
            run.items_processed = items_processed;
            run.items_failed = items_failed;
            run.duration_ms = Some(duration_ms);
        })
    }

    async fn record_failure(
        &self,
        run_id: Uuid,
        error_message: &str,
        duration_ms: i64,
    ) -> Result<(), AppError> {
        self.finish(run_id, |run| {
            run.status = JobStatus::Failed;
            run.error_message = Some(error_message.to_string());
            run.duration_ms = Some(duration_ms);
        })
    }

    async fn last_success(&self, job_name: &str) -> Result<Option<DateTime<Utc>>, AppError> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|r| r.job_name == job_name && r.status == JobStatus::Success)
            .map(|r| r.started_at)
            .max())
    }

    async fn recent(&self, job_name: &str, limit: i64) -> Result<Vec<JobRun>, AppError> {
        let mut runs: Vec<JobRun> = self
            .rows
            .read()
            .iter()
            .filter(|r| r.job_name == job_name)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit.max(0) as usize);
        Ok(runs)
    }
}

/// Concrete handles to every in-memory store, for seeding and inspection.
#[derive(Clone, Default)]
pub struct MemoryStores {
    pub catalogue: Arc<MemoryCatalogue>,
    pub fx: Arc<MemoryFx>,
    pub holdings: Arc<MemoryHoldings>,
    pub snapshots: Arc<MemorySnapshots>,
    pub users: Arc<MemoryUsers>,
    pub job_runs: Arc<MemoryJobRuns>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AppState {
        AppState::from(self)
    }
}
