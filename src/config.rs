use std::time::Duration;

use crate::errors::AppError;
use crate::logging::LoggingConfig;
use crate::models::DEFAULT_SUPPORTED_CURRENCIES;

/// A wall-clock time of day in UTC, parsed from `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DailyTime {
    pub hour: u32,
    pub minute: u32,
}

impl DailyTime {
    pub fn parse(value: &str) -> Result<Self, String> {
        let (h, m) = value
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got '{}'", value))?;
        let hour: u32 = h.parse().map_err(|_| format!("invalid hour in '{}'", value))?;
        let minute: u32 = m.parse().map_err(|_| format!("invalid minute in '{}'", value))?;
        if hour > 23 || minute > 59 {
            return Err(format!("time out of range: '{}'", value));
        }
        Ok(Self { hour, minute })
    }

    /// Six-field cron expression (sec min hour day month weekday) firing once a day.
    pub fn daily_cron(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub crypto_api_key: String,
    pub stock_api_key: String,
    pub fx_api_key: String,
    pub database_uri: String,
    pub database_max_connections: u32,
    pub fx_refresh_pacing: Duration,
    pub db_operation_timeout: Duration,
    pub schedule_fx_at: DailyTime,
    pub schedule_pve_at: DailyTime,
    pub supported_currencies: Vec<String>,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup so it can be exercised without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Config(format!("{} is not set", key)))
        };

        let number = |key: &str, default: u64| -> Result<u64, AppError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| AppError::Config(format!("{} must be a whole number, got '{}'", key, raw))),
                None => Ok(default),
            }
        };

        let time = |key: &str, default: &str| -> Result<DailyTime, AppError> {
            let raw = lookup(key).unwrap_or_else(|| default.to_string());
            DailyTime::parse(&raw).map_err(|e| AppError::Config(format!("{}: {}", key, e)))
        };

        let supported_currencies = match lookup("SUPPORTED_CURRENCIES") {
            Some(raw) => raw
                .split(',')
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .collect(),
            None => DEFAULT_SUPPORTED_CURRENCIES.iter().map(|c| c.to_string()).collect(),
        };

        let max_connections = number("DATABASE_MAX_CONNECTIONS", 10)?;

        let config = Self {
            crypto_api_key: required("CRYPTO_API_KEY")?,
            stock_api_key: required("STOCK_API_KEY")?,
            fx_api_key: required("FX_API_KEY")?,
            database_uri: required("DATABASE_URI")?,
            database_max_connections: u32::try_from(max_connections)
                .map_err(|_| AppError::Config("DATABASE_MAX_CONNECTIONS is too large".to_string()))?,
            fx_refresh_pacing: Duration::from_secs(number("FX_REFRESH_PACING_SECONDS", 13)?),
            db_operation_timeout: Duration::from_secs(number("DB_OPERATION_TIMEOUT_SECONDS", 10)?),
            schedule_fx_at: time("SCHEDULE_FX_AT", "00:00")?,
            schedule_pve_at: time("SCHEDULE_PVE_AT", "01:00")?,
            supported_currencies,
            logging: LoggingConfig::from_lookup(&lookup)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.schedule_pve_at <= self.schedule_fx_at {
            return Err(AppError::Config(format!(
                "SCHEDULE_PVE_AT ({}) must be after SCHEDULE_FX_AT ({})",
                self.schedule_pve_at, self.schedule_fx_at
            )));
        }

        if self.supported_currencies.len() < 2 {
            return Err(AppError::Config(
                "SUPPORTED_CURRENCIES needs at least two currencies".to_string(),
            ));
        }

        for (i, code) in self.supported_currencies.iter().enumerate() {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(AppError::Config(format!("'{}' is not an ISO-4217 code", code)));
            }
            if self.supported_currencies[..i].contains(code) {
                return Err(AppError::Config(format!("duplicate currency '{}'", code)));
            }
        }

        if self.db_operation_timeout.is_zero() {
            return Err(AppError::Config(
                "DB_OPERATION_TIMEOUT_SECONDS must be positive".to_string(),
            ));
        }

        if self.database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
