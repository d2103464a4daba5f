use crate::errors::AppError;
use crate::services::ingestion_service;
use crate::services::job_scheduler_service::{JobContext, JobResult};

pub async fn refresh_exchange_instruments(ctx: JobContext) -> Result<JobResult, AppError> {
    let report =
        ingestion_service::refresh_exchange_instruments(&ctx.state, &ctx.supported_currencies).await?;
    Ok(JobResult::new(report.written, report.failed))
}
