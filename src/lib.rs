//! Portfolio tracking core: catalogue and FX ingestion, the holdings log,
//! daily portfolio valuation and the snapshot read path.

pub mod config;
pub mod db;
pub mod errors;
pub mod external;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
