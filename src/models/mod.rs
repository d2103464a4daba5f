mod exchange_rate;
mod holding;
mod instrument;
mod job_run;
mod snapshot;
mod user_preferences;

pub use exchange_rate::{ordered_pairs, ExchangeRate, FxTable, DEFAULT_SUPPORTED_CURRENCIES};
pub use holding::{HoldingType, HoldingsEvent, NewHoldingsEvent, Position};
pub use instrument::{Instrument, InstrumentKey, InstrumentType, DEFAULT_QUOTE_CURRENCY};
pub use job_run::{JobRun, JobStatus};
pub use snapshot::{LatestSnapshot, PortfolioSnapshot, SnapshotInterval, SnapshotSeries};
pub use user_preferences::UserPreference;
