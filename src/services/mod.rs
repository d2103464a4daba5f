pub mod holdings_service;
pub mod ingestion_service;
pub mod job_scheduler_service;
pub mod rate_limiter;
pub mod snapshot_query_service;
pub mod valuation_service;
