//! End-to-end: REST snapshot seeds the board, live ticks reprice it

use futures_util::SinkExt;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tickerwatch::board::{BoardOptions, BoardState, PriceBoard, RefreshOutcome};
use tickerwatch::cache::{MemoryStore, SnapshotCache};
use tickerwatch::convert::convert;
use tickerwatch::feed::LiveFeedClient;
use tickerwatch::market::{CoinGeckoClient, CoinGeckoConfig};
use tickerwatch::reconcile::ChangeBasis;
use tickerwatch::ws::{ReconnectConfig, WsConfig};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn snapshot_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/coins/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin",
             "current_price": 100, "price_change_percentage_24h": 0},
            {"id": "ethereum", "symbol": "eth", "name": "Ethereum",
             "current_price": 50, "price_change_percentage_24h": 0}
        ])))
        .mount(&server)
        .await;
    server
}

async fn tick_server(frames: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let frames = frames.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                for frame in frames {
                    if ws.send(Message::Text(frame.to_string())).await.is_err() {
                        return;
                    }
                }
                // Hold the connection open
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });
    format!("ws://{}", addr)
}

fn board_for(server: &MockServer, basis: ChangeBasis) -> PriceBoard {
    let client = CoinGeckoClient::with_config(CoinGeckoConfig {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    let cache = SnapshotCache::new(Arc::new(client), Arc::new(MemoryStore::new()));
    PriceBoard::new(
        Arc::new(cache),
        BoardOptions {
            basis,
            ..BoardOptions::default()
        },
    )
}

#[tokio::test]
async fn test_snapshot_then_live_ticks() {
    let rest = snapshot_server().await;
    let board = board_for(&rest, ChangeBasis::PreviousPrice);
    assert!(board.state().is_loading());

    let outcome = board.refresh().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Applied { assets: 2 });

    let url = tick_server(vec![r#"{"bitcoin":"110"}"#, r#"{"bitcoin":"121"}"#]).await;
    let feed = LiveFeedClient::new(
        WsConfig::new(url).reconnect(ReconnectConfig::fixed(Duration::from_millis(50))),
    );
    let mut changes = board.changes();
    changes.borrow_and_update();
    let _sub = board.attach(&feed);

    let view = timeout(Duration::from_secs(5), async {
        loop {
            changes.changed().await.unwrap();
            let state = changes.borrow_and_update().clone();
            if let BoardState::Ready(view) = state {
                if view.assets[0].current_price == dec!(121) {
                    return view;
                }
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(view.version, 3);
    assert_eq!(view.assets[0].price_change_percentage_24h, dec!(10));
    assert_eq!(view.assets[1].current_price, dec!(50));

    let value = convert(&view.assets, dec!(1), "bitcoin", "ethereum").unwrap();
    assert_eq!(value, dec!(2.42));

    feed.disconnect();
}

#[tokio::test]
async fn test_day_open_basis_end_to_end() {
    let rest = snapshot_server().await;
    let board = board_for(&rest, ChangeBasis::DayOpen);
    board.refresh().await.unwrap();

    let url = tick_server(vec![r#"{"btc":"110"}"#, r#"{"btc":"121"}"#]).await;
    let feed = LiveFeedClient::new(WsConfig::new(url));
    let mut changes = board.changes();
    let _sub = board.attach(&feed);

    let view = timeout(Duration::from_secs(5), async {
        loop {
            changes.changed().await.unwrap();
            let state = changes.borrow_and_update().clone();
            if let BoardState::Ready(view) = state {
                if view.assets[0].current_price == dec!(121) {
                    return view;
                }
            }
        }
    })
    .await
    .unwrap();

    // Measured against the snapshot's day-open price, not the previous tick
    assert_eq!(view.assets[0].price_change_percentage_24h, dec!(21));
    feed.disconnect();
}
