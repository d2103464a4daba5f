/// Holdings log writes, position rollup and user deletion.
mod common;

use chrono::Utc;
use uuid::Uuid;

use common::d;
use fintrack::errors::AppError;
use fintrack::models::{HoldingType, InstrumentType, NewHoldingsEvent, UserPreference};
use fintrack::services::{holdings_service, valuation_service};
use fintrack::store::memory::MemoryStores;

fn buy_btc(amount: &str) -> NewHoldingsEvent {
    NewHoldingsEvent::buy("BTC", "USD", InstrumentType::Crypto, d("10000"), d(amount))
}

fn sell_btc(amount: &str) -> NewHoldingsEvent {
    NewHoldingsEvent::sell("BTC", "USD", InstrumentType::Crypto, d("12000"), d(amount))
}

#[tokio::test]
async fn test_append_and_list_newest_first() {
    let stores = MemoryStores::new();
    let state = stores.state();
    let user = Uuid::new_v4();

    let first = holdings_service::append_event(&state, user, buy_btc("1")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = holdings_service::append_event(&state, user, buy_btc("2")).await.unwrap();

    let events = holdings_service::list_events(&state, user).await.unwrap();
    let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![second, first]);
    assert!(holdings_service::list_events(&state, Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_events_are_rejected() {
    let state = MemoryStores::new().state();
    let user = Uuid::new_v4();

    let zero = holdings_service::append_event(&state, user, buy_btc("0")).await;
    assert!(matches!(zero, Err(AppError::Validation(_))));

    let negative_price = NewHoldingsEvent::buy("BTC", "USD", InstrumentType::Crypto, d("-1"), d("1"));
    let result = holdings_service::append_event(&state, user, negative_price).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_cannot_sell_more_than_held() {
    let state = MemoryStores::new().state();
    let user = Uuid::new_v4();

    holdings_service::append_event(&state, user, buy_btc("2")).await.unwrap();
    holdings_service::append_event(&state, user, sell_btc("1.5")).await.unwrap();

    let oversell = holdings_service::append_event(&state, user, sell_btc("1")).await;
    assert!(matches!(oversell, Err(AppError::Validation(_))));

    // Holdings against another currency are a separate position.
    let other_pair = NewHoldingsEvent::sell("BTC", "EUR", InstrumentType::Crypto, d("9000"), d("0.1"));
    assert!(holdings_service::append_event(&state, user, other_pair).await.is_err());

    holdings_service::append_event(&state, user, sell_btc("0.5")).await.unwrap();
    let positions = holdings_service::list_positions(&state, user).await.unwrap();
    assert_eq!(positions[0].remaining_amount, d("0"));
}

#[tokio::test]
async fn test_update_event() {
    let state = MemoryStores::new().state();
    let user = Uuid::new_v4();

    holdings_service::append_event(&state, user, buy_btc("1")).await.unwrap();
    let sell = holdings_service::append_event(&state, user, sell_btc("1")).await.unwrap();

    // Raising the sell above what is held fails; the old amount is excluded from the check.
    let too_big = holdings_service::update_event(&state, user, sell, sell_btc("1.5")).await;
    assert!(matches!(too_big, Err(AppError::Validation(_))));

    let updated = holdings_service::update_event(&state, user, sell, sell_btc("0.25")).await.unwrap();
    assert_eq!(updated.id, sell);
    assert_eq!(updated.holding_type, HoldingType::Sell);
    assert_eq!(updated.amount, d("0.25"));

    let missing = holdings_service::update_event(&state, user, Uuid::new_v4(), buy_btc("1")).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    let foreign = holdings_service::update_event(&state, Uuid::new_v4(), sell, buy_btc("1")).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_delete_event() {
    let state = MemoryStores::new().state();
    let user = Uuid::new_v4();
    let id = holdings_service::append_event(&state, user, buy_btc("1")).await.unwrap();

    let foreign = holdings_service::delete_event(&state, Uuid::new_v4(), id).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));

    holdings_service::delete_event(&state, user, id).await.unwrap();
    let again = holdings_service::delete_event(&state, user, id).await;
    assert!(matches!(again, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_positions_group_by_pair() {
    let state = MemoryStores::new().state();
    let user = Uuid::new_v4();

    holdings_service::append_event(&state, user, buy_btc("1")).await.unwrap();
    holdings_service::append_event(&state, user, buy_btc("2")).await.unwrap();
    holdings_service::append_event(
        &state,
        user,
        NewHoldingsEvent::buy("AAPL", "USD", InstrumentType::Stock, d("100"), d("4")).with_market("NASDAQ"),
    )
    .await
    .unwrap();

    let positions = holdings_service::list_positions(&state, user).await.unwrap();
    assert_eq!(positions.len(), 2);

    let btc = positions.iter().find(|p| p.to_asset == "BTC").unwrap();
    assert_eq!(btc.remaining_amount, d("3"));
    assert_eq!(btc.total_bought, d("30000"));

    let aapl = positions.iter().find(|p| p.to_asset == "AAPL").unwrap();
    assert_eq!(aapl.asset_type, InstrumentType::Stock);
    assert_eq!(aapl.asset_market, "NASDAQ");
}

#[tokio::test]
async fn test_delete_user_data_cascades() {
    let stores = MemoryStores::new();
    let state = stores.state();
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();
    stores.users.upsert(UserPreference::new(user, "USD"));
    stores.users.upsert(UserPreference::new(other, "USD"));

    holdings_service::append_event(&state, user, buy_btc("1")).await.unwrap();
    holdings_service::append_event(&state, user, buy_btc("1")).await.unwrap();
    holdings_service::append_event(&state, other, buy_btc("1")).await.unwrap();
    valuation_service::run_valuation(&state, Utc::now()).await.unwrap();

    let deleted = holdings_service::delete_user_data(&state, user).await.unwrap();
    assert_eq!(deleted.events, 2);
    // crypto row + roll-up
    assert_eq!(deleted.snapshots, 2);

    assert!(holdings_service::list_events(&state, user).await.unwrap().is_empty());
    assert_eq!(holdings_service::list_events(&state, other).await.unwrap().len(), 1);
    assert!(stores.snapshots.all().iter().all(|s| s.user_id == other));
}

#[tokio::test]
async fn test_shrinking_or_removing_buys_cannot_oversell() {
    let state = MemoryStores::new().state();
    let user = Uuid::new_v4();

    let buy = holdings_service::append_event(&state, user, buy_btc("2")).await.unwrap();
    holdings_service::append_event(&state, user, sell_btc("1.5")).await.unwrap();

    let shrunk = holdings_service::update_event(&state, user, buy, buy_btc("0.5")).await;
    assert!(matches!(shrunk, Err(AppError::Validation(_))));

    // Moving the buy to another pair leaves the BTC/USD sell uncovered.
    let moved = NewHoldingsEvent::buy("BTC", "EUR", InstrumentType::Crypto, d("9000"), d("2"));
    let result = holdings_service::update_event(&state, user, buy, moved).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let removed = holdings_service::delete_event(&state, user, buy).await;
    assert!(matches!(removed, Err(AppError::Validation(_))));

    // Nothing was written by the rejected changes.
    let positions = holdings_service::list_positions(&state, user).await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].remaining_amount, d("0.5"));
    assert_eq!(positions[0].total_bought, d("20000"));

    // Shrinking to exactly what was sold is allowed.
    let exact = holdings_service::update_event(&state, user, buy, buy_btc("1.5")).await.unwrap();
    assert_eq!(exact.amount, d("1.5"));
}
