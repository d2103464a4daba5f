use crate::errors::AppError;
use crate::services::ingestion_service;
use crate::services::job_scheduler_service::{JobContext, JobResult};

/// Replaces the stock catalogue every six hours.
pub async fn refresh_stocks(ctx: JobContext) -> Result<JobResult, AppError> {
    let report = ingestion_service::refresh_stocks(&ctx.state, ctx.providers.stocks.as_ref()).await?;
    Ok(JobResult::new(report.written, report.failed))
}
