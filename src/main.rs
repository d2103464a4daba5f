use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use fintrack::config::AppConfig;
use fintrack::external::alphavantage::AlphaVantageProvider;
use fintrack::external::coinmarketcap::CoinMarketCapProvider;
use fintrack::external::financialmodelingprep::FinancialModelingPrepProvider;
use fintrack::logging::init_logging;
use fintrack::services::job_scheduler_service::{JobContext, JobOutcome, JobSchedulerService, Providers};
use fintrack::services::rate_limiter::RateLimiter;
use fintrack::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    init_logging(&config.logging).context("failed to initialize logging")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.db_operation_timeout)
        .connect(&config.database_uri)
        .await
        .context("failed to connect to the database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let state = AppState::postgres(pool, config.db_operation_timeout);

    let providers = Providers {
        crypto: Arc::new(CoinMarketCapProvider::new(config.crypto_api_key.clone())),
        stocks: Arc::new(FinancialModelingPrepProvider::new(config.stock_api_key.clone())),
        fx: Arc::new(AlphaVantageProvider::new(config.fx_api_key.clone())),
    };

    let context = JobContext {
        state,
        providers,
        fx_pacer: Arc::new(RateLimiter::paced(config.fx_refresh_pacing)),
        supported_currencies: Arc::new(config.supported_currencies.clone()),
    };

    let mut scheduler = JobSchedulerService::new(context, &config).await?;
    scheduler.start().await?;

    tracing::info!(
        "🚀 fintrack running (FX at {} UTC, valuation at {} UTC, currencies: {})",
        config.schedule_fx_at,
        config.schedule_pve_at,
        config.supported_currencies.join(",")
    );

    let catch_up = async {
        for (job, outcome) in scheduler.run_overdue_jobs().await {
            if let JobOutcome::Failed(e) = outcome {
                tracing::warn!(job, "Catch-up run failed: {}", e);
            }
        }
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = catch_up => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            tracing::info!("Shutdown signal received");
        }
    }

    scheduler.stop().await?;
    Ok(())
}
