//! Daily portfolio valuation.
//!
//! Scheduled after the FX refresh so the run converts with the day's rates.
//! Each user with holdings gets one row per instrument type plus a roll-up
//! row, all sharing the run's timestamp.

use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::valuation_service;

pub async fn value_portfolios(ctx: JobContext) -> Result<JobResult, AppError> {
    info!("💼 Valuing portfolios...");

    let report = valuation_service::run_valuation(&ctx.state, Utc::now()).await?;

    if report.users_skipped > 0 {
        info!("Skipped {} users without preferences", report.users_skipped);
    }

    Ok(JobResult::new(report.users_valued, report.users_failed + report.users_skipped))
}
