//! Background Jobs Module
//!
//! Jobs scheduled by `JobSchedulerService`. Each takes a `JobContext`,
//! does one refresh or valuation pass and reports how many items it
//! processed or dropped. Errors go back to the tracking wrapper, which logs
//! them and records the run; they never escape the scheduler.
//!
//! # Available Jobs
//!
//! - `crypto_refresh_job` - Crypto listings into the catalogue (hourly)
//! - `stock_refresh_job` - Stock list into the catalogue (every 6h)
//! - `exchange_instruments_job` - Supported fiat currencies as `exchange` instruments (daily)
//! - `fx_refresh_job` - Paced FX matrix refresh (daily)
//! - `portfolio_valuation_job` - Daily snapshot per user (after FX)

pub mod crypto_refresh_job;
pub mod exchange_instruments_job;
pub mod fx_refresh_job;
pub mod portfolio_valuation_job;
pub mod stock_refresh_job;
