//! Hourly crypto catalogue refresh.
//!
//! One upstream call returns the top listings; the crypto key-space of the
//! catalogue is replaced only after the whole response is in hand, so an
//! upstream failure leaves the previous generation untouched.

use crate::errors::AppError;
use crate::services::ingestion_service;
use crate::services::job_scheduler_service::{JobContext, JobResult};

pub async fn refresh_crypto(ctx: JobContext) -> Result<JobResult, AppError> {
    let report = ingestion_service::refresh_crypto(&ctx.state, ctx.providers.crypto.as_ref()).await?;
    Ok(JobResult::new(report.written, report.failed))
}
