//! Integration tests for the snapshot path: REST client, cache and storage

use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tickerwatch::cache::{CacheStore, FileStore, ManualClock, SnapshotCache};
use tickerwatch::codec;
use tickerwatch::market::{CoinGeckoClient, CoinGeckoConfig, FetchError, MarketsQuery};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn markets_body() -> Value {
    json!([
        {
            "id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
            "image": "https://example.com/btc.png",
            "current_price": 67012.45, "market_cap_rank": 1,
            "price_change_percentage_24h": 2.5
        },
        {
            "id": "ethereum", "symbol": "eth", "name": "Ethereum",
            "current_price": 3501.1, "market_cap_rank": 2,
            "price_change_percentage_24h": null
        }
    ])
}

fn client_for(server: &MockServer) -> Arc<CoinGeckoClient> {
    let config = CoinGeckoConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
    };
    Arc::new(CoinGeckoClient::with_config(config).unwrap())
}

#[tokio::test]
async fn test_fresh_snapshot_served_from_file_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/markets"))
        .and(query_param("per_page", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(markets_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cache.json");
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let cache = SnapshotCache::new(client_for(&server), Arc::new(FileStore::new(&file)))
        .with_clock(clock.clone());
    let query = MarketsQuery::default();

    let first = cache
        .fetch_snapshot(&query, "crypto", Duration::from_millis(1000))
        .await
        .unwrap();
    clock.advance_ms(999);
    let second = cache
        .fetch_snapshot(&query, "crypto", Duration::from_millis(1000))
        .await
        .unwrap();

    assert_eq!(first.assets, second.assets);
    assert_eq!(first.assets[0].current_price, dec!(67012.45));
    assert_eq!(first.assets[1].price_change_percentage_24h, dec!(0));

    // Storage layout matches the browser local storage keys
    let raw: Value = serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
    assert!(raw["cryptoData"].is_string());
    assert_eq!(raw["cryptoDataTimestamp"], "1700000000000");
    let decoded = codec::decode(raw["cryptoData"].as_str().unwrap()).unwrap();
    assert_eq!(decoded, markets_body());
}

#[tokio::test]
async fn test_expired_snapshot_refetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(markets_body()))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path().join("cache.json")));
    let clock = Arc::new(ManualClock::new(0));
    let cache = SnapshotCache::new(client_for(&server), store).with_clock(clock.clone());
    let query = MarketsQuery::default();

    cache
        .fetch_snapshot(&query, "crypto", Duration::from_millis(1000))
        .await
        .unwrap();
    clock.advance_ms(1000);
    let snapshot = cache
        .fetch_snapshot(&query, "crypto", Duration::from_millis(1000))
        .await
        .unwrap();
    assert_eq!(snapshot.captured_at.timestamp_millis(), 1000);
}

#[tokio::test]
async fn test_cache_survives_new_store_instance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(markets_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cache.json");
    let clock = Arc::new(ManualClock::new(5_000));
    let query = MarketsQuery::new(30, true);

    SnapshotCache::new(client_for(&server), Arc::new(FileStore::new(&file)))
        .with_clock(clock.clone())
        .fetch_snapshot(&query, "converter", Duration::from_secs(60))
        .await
        .unwrap();

    let reopened = FileStore::new(&file);
    assert!(reopened.get("converter").is_some());
    assert!(reopened.get("crypto").is_none());

    let snapshot = SnapshotCache::new(client_for(&server), Arc::new(reopened))
        .with_clock(clock)
        .fetch_snapshot(&query, "converter", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(snapshot.len(), 2);
}

#[tokio::test]
async fn test_http_error_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/markets"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path().join("cache.json")));
    let cache = SnapshotCache::new(client_for(&server), store.clone());

    let err = cache
        .fetch_snapshot(&MarketsQuery::default(), "crypto", Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 429, .. }));
    assert!(store.get("crypto").is_none());
}
