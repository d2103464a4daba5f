//! Daily FX matrix refresh.
//!
//! Requests every ordered pair over the supported currencies through the
//! shared pacer (13 s apart by default, sized for Alpha Vantage's 5 calls
//! per minute), then swaps the whole `exchanges` table in one transaction.
//! Pairs that fail are counted in `items_failed` and left out.

use crate::errors::AppError;
use crate::services::ingestion_service;
use crate::services::job_scheduler_service::{JobContext, JobResult};

pub async fn refresh_fx(ctx: JobContext) -> Result<JobResult, AppError> {
    let report = ingestion_service::refresh_fx(
        &ctx.state,
        ctx.providers.fx.as_ref(),
        ctx.fx_pacer.as_ref(),
        &ctx.supported_currencies,
    )
    .await?;

    Ok(JobResult::new(report.written, report.failed))
}
