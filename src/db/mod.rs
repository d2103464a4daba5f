pub mod catalogue_queries;
pub mod exchange_queries;
pub mod holding_queries;
pub mod job_run_queries;
pub mod snapshot_queries;
pub mod user_preferences_queries;
