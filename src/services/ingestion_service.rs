use std::collections::HashSet;
use tracing::{info, warn};

use bigdecimal::BigDecimal;

use crate::errors::AppError;
use crate::external::provider::{CryptoListingProvider, FxRateProvider, StockListingProvider};
use crate::models::{ordered_pairs, ExchangeRate, Instrument, InstrumentType};
use crate::services::rate_limiter::RateLimiter;
use crate::state::AppState;

/// What one refresh fetched and what made it into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub fetched: usize,
    pub written: usize,
    pub failed: usize,
}

/// Replaces the crypto key-space with the provider's current listings.
pub async fn refresh_crypto(
    state: &AppState,
    provider: &dyn CryptoListingProvider,
) -> Result<RefreshReport, AppError> {
    info!(upstream = provider.name(), "🪙 Refreshing crypto listings...");

    let listings = provider.fetch_listings().await.map_err(|e| {
        warn!(upstream = provider.name(), "Crypto listings unavailable: {}", e);
        e
    })?;

    replace_generation(state, InstrumentType::Crypto, listings).await
}

/// Replaces the stock key-space with the provider's tradable-stocks list.
pub async fn refresh_stocks(
    state: &AppState,
    provider: &dyn StockListingProvider,
) -> Result<RefreshReport, AppError> {
    info!(upstream = provider.name(), "📈 Refreshing stock listings...");

    let stocks = provider.fetch_stocks().await.map_err(|e| {
        warn!(upstream = provider.name(), "Stock list unavailable: {}", e);
        e
    })?;

    replace_generation(state, InstrumentType::Stock, stocks).await
}

async fn replace_generation(
    state: &AppState,
    instrument_type: InstrumentType,
    entries: Vec<Instrument>,
) -> Result<RefreshReport, AppError> {
    let fetched = entries.len();

    let mut invalid = 0;
    let valid: Vec<Instrument> = entries
        .into_iter()
        .filter(|instrument| match instrument.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping {} instrument '{}': {}", instrument_type, instrument.symbol, e);
                invalid += 1;
                false
            }
        })
        .collect();

    // An empty upstream answer would wipe the catalogue; keep the old generation.
    if valid.is_empty() {
        warn!("No {} instruments fetched, keeping previous generation", instrument_type);
        return Ok(RefreshReport {
            fetched,
            written: 0,
            failed: invalid,
        });
    }

    let batch = state.catalogue.replace_all(instrument_type, valid).await?;
    let failed = batch.failed + invalid;

    info!(
        "✅ {} catalogue replaced: {} fetched, {} written, {} skipped (duplicates dropped: {})",
        instrument_type,
        fetched,
        batch.written,
        failed,
        fetched.saturating_sub(batch.written + failed)
    );

    Ok(RefreshReport {
        fetched,
        written: batch.written,
        failed,
    })
}

/// The supported fiat currencies as `exchange` instruments priced at 1 in
/// their own currency.
pub fn exchange_instruments(currencies: &[String]) -> Vec<Instrument> {
    currencies
        .iter()
        .map(|code| {
            Instrument::new(
                code.clone(),
                InstrumentType::Exchange,
                "",
                code.clone(),
                BigDecimal::from(1),
                Some(code.clone()),
            )
        })
        .collect()
}

pub async fn refresh_exchange_instruments(
    state: &AppState,
    currencies: &[String],
) -> Result<RefreshReport, AppError> {
    let entries = exchange_instruments(currencies);
    let fetched = entries.len();

    let batch = state.catalogue.upsert_many(entries).await?;
    info!("💱 Exchange instruments written: {}/{}", batch.written, fetched);

    Ok(RefreshReport {
        fetched,
        written: batch.written,
        failed: batch.failed,
    })
}

/// Fetches every ordered pair over `currencies`, one paced request at a
/// time, and swaps the FX table only once the whole set is collected.
///
/// A failed pair is left out of the generation together with its reverse
/// direction, so each pair is present in both directions or not at all.
pub async fn refresh_fx(
    state: &AppState,
    provider: &dyn FxRateProvider,
    pacer: &RateLimiter,
    currencies: &[String],
) -> Result<RefreshReport, AppError> {
    let pairs = ordered_pairs(currencies);
    info!(
        upstream = provider.name(),
        "💱 Refreshing {} FX pairs ({}s apart)...",
        pairs.len(),
        pacer.min_delay().as_secs()
    );

    let mut collected = Vec::with_capacity(pairs.len());
    let mut failed = 0;

    for (from, to) in &pairs {
        let _guard = pacer.acquire().await?;

        match provider.fetch_rate(from, to).await {
            Ok(rate) if rate.rate > BigDecimal::from(0) => {
                collected.push(ExchangeRate::new(from.clone(), to.clone(), rate.rate));
            }
            Ok(rate) => {
                warn!(upstream = provider.name(), "Dropping {}->{}: non-positive rate {}", from, to, rate.rate);
                failed += 1;
            }
            Err(e) => {
                warn!(upstream = provider.name(), "Dropping {}->{}: {}", from, to, e);
                failed += 1;
            }
        }
    }

    let fetched = collected.len();
    let rates = keep_paired(collected);
    let orphans = fetched - rates.len();
    if orphans > 0 {
        warn!("Dropping {} FX rates whose reverse direction is missing", orphans);
    }

    if rates.is_empty() {
        warn!(upstream = provider.name(), "No FX rates collected, keeping previous generation");
        return Ok(RefreshReport {
            fetched,
            written: 0,
            failed,
        });
    }

    let written = state.fx.replace_all(rates).await?;
    info!("✅ FX table replaced with {} rates", written);

    Ok(RefreshReport {
        fetched,
        written,
        failed: failed + orphans,
    })
}

/// Keeps only rates whose reverse direction is also present.
pub fn keep_paired(rates: Vec<ExchangeRate>) -> Vec<ExchangeRate> {
    let present: HashSet<(String, String)> = rates
        .iter()
        .map(|r| (r.from_currency.clone(), r.to_currency.clone()))
        .collect();

    rates
        .into_iter()
        .filter(|r| present.contains(&(r.to_currency.clone(), r.from_currency.clone())))
        .collect()
}
