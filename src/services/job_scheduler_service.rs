use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::external::provider::{CryptoListingProvider, FxRateProvider, StockListingProvider};
use crate::jobs::{
    crypto_refresh_job, exchange_instruments_job, fx_refresh_job, portfolio_valuation_job,
    stock_refresh_job,
};
use crate::services::rate_limiter::RateLimiter;
use crate::state::AppState;
use crate::store::JobRunLog;

#[derive(Clone)]
pub struct Providers {
    pub crypto: Arc<dyn CryptoListingProvider>,
    pub stocks: Arc<dyn StockListingProvider>,
    pub fx: Arc<dyn FxRateProvider>,
}

// Context passed to job functions
#[derive(Clone)]
pub struct JobContext {
    pub state: AppState,
    pub providers: Providers,
    pub fx_pacer: Arc<RateLimiter>,
    pub supported_currencies: Arc<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

impl JobResult {
    pub fn new(items_processed: usize, items_failed: usize) -> Self {
        Self {
            items_processed: i32::try_from(items_processed).unwrap_or(i32::MAX),
            items_failed: i32::try_from(items_failed).unwrap_or(i32::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobResult),
    Failed(String),
    /// The previous run of the same job was still in progress.
    Skipped,
}

pub type JobFn = fn(JobContext) -> BoxFuture<'static, Result<JobResult, AppError>>;

/// A schedulable job: its cron expression, how stale its last success may
/// get before startup catches it up, and the function to run.
#[derive(Clone)]
pub struct JobSpec {
    pub name: &'static str,
    pub description: String,
    pub schedule: String,
    pub cadence: Duration,
    pub run: JobFn,
}

/// Crypto hourly, stocks every 6h, FX and exchange instruments daily at the
/// configured time, valuation daily after FX. Listed in catch-up order.
pub fn job_specs(config: &AppConfig) -> Vec<JobSpec> {
    let fx_cron = config.schedule_fx_at.daily_cron();
    let pve_cron = config.schedule_pve_at.daily_cron();

    vec![
        JobSpec {
            name: "refresh_exchange_instruments",
            description: format!("Daily at {} UTC", config.schedule_fx_at),
            schedule: fx_cron.clone(),
            cadence: Duration::hours(24),
            run: |ctx| exchange_instruments_job::refresh_exchange_instruments(ctx).boxed(),
        },
        JobSpec {
            name: "refresh_fx",
            description: format!("Daily at {} UTC", config.schedule_fx_at),
            schedule: fx_cron,
            cadence: Duration::hours(24),
            run: |ctx| fx_refresh_job::refresh_fx(ctx).boxed(),
        },
        JobSpec {
            name: "refresh_crypto",
            description: "Every hour at :00".to_string(),
            schedule: "0 0 * * * *".to_string(),
            cadence: Duration::hours(1),
            run: |ctx| crypto_refresh_job::refresh_crypto(ctx).boxed(),
        },
        JobSpec {
            name: "refresh_stocks",
            description: "Every 6 hours".to_string(),
            schedule: "0 0 */6 * * *".to_string(),
            cadence: Duration::hours(6),
            run: |ctx| stock_refresh_job::refresh_stocks(ctx).boxed(),
        },
        JobSpec {
            name: "value_portfolios",
            description: format!("Daily at {} UTC", config.schedule_pve_at),
            schedule: pve_cron,
            cadence: Duration::hours(24),
            run: |ctx| portfolio_valuation_job::value_portfolios(ctx).boxed(),
        },
    ]
}

/// Names of jobs with an instance in flight. A job name can be claimed
/// once; the claim is released when the returned guard drops.
#[derive(Clone, Default)]
pub struct RunningJobs {
    inner: Arc<DashMap<&'static str, DateTime<Utc>>>,
}

pub struct RunningGuard {
    inner: Arc<DashMap<&'static str, DateTime<Utc>>>,
    job_name: &'static str,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.inner.remove(self.job_name);
    }
}

impl RunningJobs {
    pub fn try_claim(&self, job_name: &'static str) -> Option<RunningGuard> {
        match self.inner.entry(job_name) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Some(RunningGuard {
                    inner: self.inner.clone(),
                    job_name,
                })
            }
        }
    }

    pub fn is_running(&self, job_name: &str) -> bool {
        self.inner.contains_key(job_name)
    }
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: JobContext,
    running: RunningJobs,
    jobs: Vec<JobSpec>,
}

impl JobSchedulerService {
    pub async fn new(context: JobContext, config: &AppConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            context,
            running: RunningJobs::default(),
            jobs: job_specs(config),
        })
    }

    /// Start all scheduled jobs
    pub async fn start(&mut self) -> Result<(), AppError> {
        info!("🚀 Starting job scheduler...");

        for spec in self.jobs.clone() {
            self.schedule_job(spec).await?;
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;

        info!("✅ Job scheduler started successfully with {} jobs", self.jobs.len());
        Ok(())
    }

    /// Stop the scheduler gracefully
    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("🛑 Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to stop scheduler: {}", e)))?;
        info!("✅ Job scheduler stopped");
        Ok(())
    }

    /// Runs every job whose last success is older than its cadence.
    pub async fn run_overdue_jobs(&self) -> Vec<(&'static str, JobOutcome)> {
        run_overdue_jobs(&self.context, &self.running, &self.jobs, Utc::now()).await
    }

    async fn schedule_job(&mut self, spec: JobSpec) -> Result<(), AppError> {
        let context = self.context.clone();
        let running = self.running.clone();
        let job_name = spec.name;
        let job_fn = spec.run;

        let job = Job::new_async(spec.schedule.as_str(), move |_uuid, _l| {
            let context = context.clone();
            let running = running.clone();
            Box::pin(async move {
                execute_job_with_tracking(&running, job_name, context, job_fn).await;
            })
        })
        .map_err(|e| AppError::Scheduler(format!("Failed to create job {}: {}", job_name, e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to add job {}: {}", job_name, e)))?;

        info!("📅 Scheduled: {} - {} [cron: {}]", job_name, spec.description, spec.schedule);
        Ok(())
    }
}

/// Catch-up pass for ticks missed while the process was down. Jobs run one
/// after another in `jobs` order, so valuation sees the refreshed FX table.
pub async fn run_overdue_jobs(
    context: &JobContext,
    running: &RunningJobs,
    jobs: &[JobSpec],
    now: DateTime<Utc>,
) -> Vec<(&'static str, JobOutcome)> {
    let mut outcomes = Vec::new();

    for spec in jobs {
        let last_success = match context.state.job_runs.last_success(spec.name).await {
            Ok(last) => last,
            Err(e) => {
                warn!(job = spec.name, "Could not read last run, skipping catch-up: {}", e);
                continue;
            }
        };

        let overdue = match last_success {
            Some(at) => now - at >= spec.cadence,
            None => true,
        };
        if !overdue {
            continue;
        }

        info!(job = spec.name, "⏰ Overdue (last success: {:?}), running now", last_success);
        let outcome = execute_job_with_tracking(running, spec.name, context.clone(), spec.run).await;
        outcomes.push((spec.name, outcome));
    }

    outcomes
}

// Job tracking wrapper
pub async fn execute_job_with_tracking(
    running: &RunningJobs,
    job_name: &'static str,
    context: JobContext,
    job_fn: JobFn,
) -> JobOutcome {
    let Some(_claim) = running.try_claim(job_name) else {
        warn!(job = job_name, "⏭️ Previous run still in progress, skipping tick");
        return JobOutcome::Skipped;
    };

    info!(job = job_name, "🏃 Starting job: {}", job_name);
    let job_runs: Arc<dyn JobRunLog> = context.state.job_runs.clone();
    let started_at = Utc::now();

    // Record job start
    let run_id = match job_runs.record_start(job_name).await {
        Ok(id) => Some(id),
        Err(e) => {
            error!(job = job_name, "Failed to record job start: {}", e);
            None
        }
    };

    let result = job_fn(context).await;

    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match result {
        Ok(job_result) => {
            info!(
                job = job_name,
                "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                job_name, job_result.items_processed, job_result.items_failed, duration_ms
            );

            if let Some(run_id) = run_id {
                if let Err(e) = job_runs
                    .record_success(run_id, job_result.items_processed, job_result.items_failed, duration_ms)
                    .await
                {
                    error!(job = job_name, "Failed to record job success: {}", e);
                }
            }
            JobOutcome::Completed(job_result)
        }
        Err(e) => {
            error!(job = job_name, "❌ Job failed: {} - {}", job_name, e);
            let message = e.to_string();

            if let Some(run_id) = run_id {
                if let Err(e) = job_runs.record_failure(run_id, &message, duration_ms).await {
                    error!(job = job_name, "Failed to record job failure: {}", e);
                }
            }
            JobOutcome::Failed(message)
        }
    }
}
