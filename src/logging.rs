use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::AppError;

/// Where and how log events go. Read alongside [`crate::config::AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `RUST_LOG` directive, `info` when unset.
    pub filter: String,
    pub service_name: String,
    pub environment: String,
    /// Loki push endpoint; only used when `LOKI_ENABLED` is true.
    pub loki_url: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            service_name: "fintrack".to_string(),
            environment: "development".to_string(),
            loki_url: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let loki_enabled = match lookup("LOKI_ENABLED") {
            Some(raw) => raw
                .trim()
                .parse::<bool>()
                .map_err(|_| AppError::Config(format!("LOKI_ENABLED must be true or false, got '{}'", raw)))?,
            None => false,
        };

        let loki_url = match (loki_enabled, lookup("LOKI_URL")) {
            (false, _) => None,
            (true, Some(url)) if !url.trim().is_empty() => Some(url),
            (true, _) => {
                return Err(AppError::Config("LOKI_ENABLED is true but LOKI_URL is not set".to_string()))
            }
        };

        Ok(Self {
            filter: lookup("RUST_LOG").unwrap_or(defaults.filter),
            service_name: lookup("SERVICE_NAME").unwrap_or(defaults.service_name),
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            loki_url,
        })
    }

    fn env_filter(&self) -> Result<EnvFilter, AppError> {
        EnvFilter::try_new(&self.filter)
            .map_err(|e| AppError::Config(format!("RUST_LOG '{}': {}", self.filter, e)))
    }
}

/// Installs the global subscriber. Events carry the `job`, `upstream`, `uid`
/// and `interval` fields set at their call sites; the Loki layer additionally
/// labels every stream with `service` and `environment`.
pub fn init_logging(config: &LoggingConfig) -> Result<(), AppError> {
    let filter = config.env_filter()?;

    #[cfg(feature = "loki")]
    let loki = match &config.loki_url {
        Some(loki_url) => Some(loki_layer(config, loki_url)?),
        None => None,
    };
    #[cfg(not(feature = "loki"))]
    {
        if config.loki_url.is_some() {
            return Err(AppError::Config("LOKI_URL set but built without the loki feature".to_string()));
        }
    }

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false));

    #[cfg(feature = "loki")]
    let registry = registry.with(loki);

    registry
        .try_init()
        .map_err(|e| AppError::Config(format!("logging already initialised: {}", e)))?;

    info!(
        service = %config.service_name,
        environment = %config.environment,
        loki = config.loki_url.is_some(),
        "📊 Logging initialized"
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn loki_layer(config: &LoggingConfig, loki_url: &str) -> Result<tracing_loki::Layer, AppError> {
    let url = url::Url::parse(loki_url).map_err(|e| AppError::Config(format!("LOKI_URL: {}", e)))?;

    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)
        .and_then(|b| b.label("environment", &config.environment))
        .and_then(|b| b.build_url(url))
        .map_err(|e| AppError::Config(format!("loki: {}", e)))?;

    // Ships buffered events in the background.
    tokio::spawn(task);
    Ok(layer)
}
