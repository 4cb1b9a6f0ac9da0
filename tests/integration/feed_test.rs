//! Integration tests for the live feed against a local WebSocket server

use futures_util::SinkExt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tickerwatch::feed::{ConnectionState, LiveFeedClient, LiveTick};
use tickerwatch::ws::{ReconnectConfig, WsConfig};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

/// Serve `frames` to each connection, then close it
async fn spawn_server(frames: Vec<String>) -> (String, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicU32::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let frames = frames.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                for frame in frames {
                    let frame = frame.replace("{n}", &n.to_string());
                    if ws.send(Message::Text(frame)).await.is_err() {
                        return;
                    }
                }
                let _ = ws.close(None).await;
            });
        }
    });

    (format!("ws://{}", addr), connections)
}

fn fast_config(url: &str) -> WsConfig {
    WsConfig::new(url).reconnect(ReconnectConfig::fixed(Duration::from_millis(50)))
}

#[tokio::test]
async fn test_ticks_delivered_from_socket() {
    let (url, _) = spawn_server(vec![
        r#"{"bitcoin":"67000.5","ethereum":"3500"}"#.to_string(),
        "garbage".to_string(),
        r#"{"bitcoin":"67001"}"#.to_string(),
    ])
    .await;

    let feed = LiveFeedClient::new(fast_config(&url));
    let (tx, mut rx) = mpsc::unbounded_channel::<LiveTick>();
    let _sub = feed.subscribe(move |tick| {
        let _ = tx.send(tick.clone());
    });

    let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    let second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first.get("bitcoin"), Some("67000.5"));
    assert_eq!(first.get("ethereum"), Some("3500"));
    assert_eq!(second.get("bitcoin"), Some("67001"));

    feed.disconnect();
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let (url, connections) = spawn_server(vec![r#"{"bitcoin":"{n}"}"#.to_string()]).await;

    let feed = LiveFeedClient::new(fast_config(&url));
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let _sub = feed.subscribe(move |tick| {
        if let Some(price) = tick.get("bitcoin") {
            let _ = tx.send(price.to_string());
        }
    });

    let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    let second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, "1");
    assert_eq!(second, "2");
    assert!(connections.load(Ordering::SeqCst) >= 2);

    // The single subscriber survived the reconnect
    assert_eq!(feed.subscriber_count(), 1);
    feed.disconnect();
    assert_eq!(feed.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_single_connection_for_many_subscribers() {
    let (url, connections) = spawn_server(vec![r#"{"bitcoin":"1"}"#.to_string()]).await;
    let config = WsConfig::new(&url).reconnect(ReconnectConfig::fixed(Duration::from_secs(60)));

    let feed = LiveFeedClient::new(config);
    let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
    let subs: Vec<_> = (0..3)
        .map(|i| {
            let tx = tx.clone();
            feed.subscribe(move |_| {
                let _ = tx.send(i);
            })
        })
        .collect();

    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap());
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(connections.load(Ordering::SeqCst), 1);

    drop(subs);
    assert_eq!(feed.subscriber_count(), 0);
}
