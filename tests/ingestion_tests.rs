/// Catalogue and FX refresh behaviour against mock upstreams.
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{as_map, currencies, d, fast_pacer, MockFx, MockListings};
use fintrack::errors::AppError;
use fintrack::models::{Instrument, InstrumentKey, InstrumentType};
use fintrack::services::ingestion_service;
use fintrack::store::memory::MemoryStores;
use fintrack::store::{CatalogueStore, FxStore};

// ---------------------------------------------------------------------------
// FX refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_fx_refresh_covers_every_ordered_pair() {
    let stores = MemoryStores::new();
    let provider = MockFx::stable();

    let report = ingestion_service::refresh_fx(&stores.state(), &provider, &fast_pacer(), &currencies())
        .await
        .unwrap();

    assert_eq!(provider.calls(), 20);
    assert_eq!(report.written, 20);
    assert_eq!(report.failed, 0);

    let rates = stores.fx.list_all().await.unwrap();
    assert_eq!(rates.len(), 20);
    assert!(rates.iter().all(|r| r.rate > d("0") && r.from_currency != r.to_currency));
}

#[tokio::test]
async fn test_fx_refresh_is_idempotent() {
    let stores = MemoryStores::new();
    let state = stores.state();
    let provider = MockFx::stable();
    let pacer = fast_pacer();

    ingestion_service::refresh_fx(&state, &provider, &pacer, &currencies()).await.unwrap();
    let first = stores.fx.list_all().await.unwrap();
    ingestion_service::refresh_fx(&state, &provider, &pacer, &currencies()).await.unwrap();
    let second = stores.fx.list_all().await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failed_pair_is_dropped_in_both_directions() {
    let stores = MemoryStores::new();
    let provider = MockFx::failing(&[("USD", "KRW")]);

    let report = ingestion_service::refresh_fx(&stores.state(), &provider, &fast_pacer(), &currencies())
        .await
        .unwrap();

    assert_eq!(report.written, 18);
    assert_eq!(report.failed, 2);

    let rates = as_map(&stores.fx.list_all().await.unwrap());
    assert!(!rates.contains_key(&("USD".to_string(), "KRW".to_string())));
    assert!(!rates.contains_key(&("KRW".to_string(), "USD".to_string())));
    assert!(rates.contains_key(&("USD".to_string(), "EUR".to_string())));
}

#[tokio::test]
async fn test_fx_refresh_with_nothing_collected_keeps_previous_table() {
    let stores = MemoryStores::new();
    let state = stores.state();
    ingestion_service::refresh_fx(&state, &MockFx::stable(), &fast_pacer(), &currencies())
        .await
        .unwrap();

    let all_pairs: Vec<(String, String)> = fintrack::models::ordered_pairs(&currencies());
    let borrowed: Vec<(&str, &str)> = all_pairs.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    let down = MockFx::failing(&borrowed);

    let report = ingestion_service::refresh_fx(&state, &down, &fast_pacer(), &currencies())
        .await
        .unwrap();

    assert_eq!(report.written, 0);
    assert_eq!(report.failed, 20);
    assert_eq!(stores.fx.list_all().await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_fx_requests_are_paced() {
    let stores = MemoryStores::new();
    let two: Vec<String> = vec!["USD".into(), "EUR".into()];
    let pacer = fintrack::services::rate_limiter::RateLimiter::paced(Duration::from_millis(50));

    let started = std::time::Instant::now();
    ingestion_service::refresh_fx(&stores.state(), &MockFx::stable(), &pacer, &two)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(45));
}

// ---------------------------------------------------------------------------
// Catalogue refresh
// ---------------------------------------------------------------------------

fn crypto_generation(tag: usize, size: usize) -> Vec<Instrument> {
    (0..size)
        .map(|i| {
            Instrument::new(
                format!("C{}", i),
                InstrumentType::Crypto,
                "",
                format!("gen-{}", tag),
                d("1"),
                None,
            )
        })
        .collect()
}

#[tokio::test]
async fn test_crypto_refresh_replaces_only_crypto_rows() {
    let stores = MemoryStores::new();
    let state = stores.state();
    let stocks = MockListings::with(vec![Instrument::new(
        "AAPL",
        InstrumentType::Stock,
        "NASDAQ",
        "Apple Inc.",
        d("150"),
        None,
    )]);
    ingestion_service::refresh_stocks(&state, &stocks).await.unwrap();

    let crypto = MockListings::with(crypto_generation(1, 3));
    ingestion_service::refresh_crypto(&state, &crypto).await.unwrap();
    crypto.set(crypto_generation(2, 2));
    let report = ingestion_service::refresh_crypto(&state, &crypto).await.unwrap();

    assert_eq!(report.written, 2);
    let rows = stores.catalogue.find_by_type(InstrumentType::Crypto, None).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.name == "gen-2"));

    let aapl = stores
        .catalogue
        .find(&InstrumentKey::new("AAPL", InstrumentType::Stock, "NASDAQ"))
        .await
        .unwrap();
    assert!(aapl.is_some());
}

#[tokio::test]
async fn test_upstream_failure_keeps_previous_generation() {
    let stores = MemoryStores::new();
    let state = stores.state();
    let crypto = MockListings::with(crypto_generation(1, 5));
    ingestion_service::refresh_crypto(&state, &crypto).await.unwrap();

    crypto.break_upstream();
    let result = ingestion_service::refresh_crypto(&state, &crypto).await;
    assert!(matches!(result, Err(AppError::External(_))));

    crypto.set(Vec::new());
    let report = ingestion_service::refresh_crypto(&state, &crypto).await.unwrap();
    assert_eq!(report.written, 0);

    let rows = stores.catalogue.find_by_type(InstrumentType::Crypto, None).await.unwrap();
    assert_eq!(rows.len(), 5);

    let broken = MockListings::broken();
    assert!(ingestion_service::refresh_stocks(&state, &broken).await.is_err());
}

#[tokio::test]
async fn test_duplicate_upstream_keys_do_not_fail_the_batch() {
    let stores = MemoryStores::new();
    let mut rows = crypto_generation(1, 3);
    rows.push(Instrument::new("C0", InstrumentType::Crypto, "", "duplicate", d("9"), None));

    let report = ingestion_service::refresh_crypto(&stores.state(), &MockListings::with(rows))
        .await
        .unwrap();

    assert_eq!(report.fetched, 4);
    assert_eq!(report.written, 3);
    let c0 = stores
        .catalogue
        .find(&InstrumentKey::new("C0", InstrumentType::Crypto, ""))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c0.name, "gen-1");
}

#[tokio::test]
async fn test_invalid_rows_are_skipped_not_fatal() {
    let stores = MemoryStores::new();
    let mut rows = crypto_generation(1, 3);
    rows.push(Instrument::new("BAD", InstrumentType::Crypto, "", "negative", d("-1"), None));
    rows.push(Instrument::new(" ", InstrumentType::Crypto, "", "blank", d("1"), None));

    let report = ingestion_service::refresh_crypto(&stores.state(), &MockListings::with(rows))
        .await
        .unwrap();

    assert_eq!(report.fetched, 5);
    assert_eq!(report.written, 3);
    assert_eq!(report.failed, 2);
    let stored = stores.catalogue.find_by_type(InstrumentType::Crypto, None).await.unwrap();
    assert!(stored.iter().all(|i| i.name == "gen-1"));

    // A generation made only of bad rows leaves the previous one in place.
    let only_bad = vec![Instrument::new("BAD", InstrumentType::Crypto, "", "negative", d("-1"), None)];
    let report = ingestion_service::refresh_crypto(&stores.state(), &MockListings::with(only_bad))
        .await
        .unwrap();
    assert_eq!(report.written, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(stores.catalogue.find_by_type(InstrumentType::Crypto, None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_exchange_instruments_refresh() {
    let stores = MemoryStores::new();

    let report = ingestion_service::refresh_exchange_instruments(&stores.state(), &currencies())
        .await
        .unwrap();
    assert_eq!(report.written, 5);

    let rows = stores.catalogue.find_by_type(InstrumentType::Exchange, None).await.unwrap();
    assert_eq!(rows.len(), 5);
    let krw = rows.iter().find(|r| r.symbol == "KRW").unwrap();
    assert_eq!(krw.price, d("1"));
    assert_eq!(krw.currency, "KRW");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_a_mixed_generation() {
    const SIZE: usize = 50;
    let stores = MemoryStores::new();
    stores
        .catalogue
        .replace_all(InstrumentType::Crypto, crypto_generation(0, SIZE))
        .await
        .unwrap();

    let writer_store = stores.catalogue.clone();
    let writer = tokio::spawn(async move {
        for tag in 1..=200 {
            writer_store
                .replace_all(InstrumentType::Crypto, crypto_generation(tag, SIZE))
                .await
                .unwrap();
            tokio::task::yield_now().await;
        }
    });

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let catalogue: Arc<dyn CatalogueStore> = stores.catalogue.clone();
            tokio::spawn(async move {
                for _ in 0..300 {
                    let rows = catalogue.find_by_type(InstrumentType::Crypto, None).await.unwrap();
                    assert_eq!(rows.len(), SIZE);
                    let tag = &rows[0].name;
                    assert!(rows.iter().all(|r| &r.name == tag), "mixed generations observed");
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
