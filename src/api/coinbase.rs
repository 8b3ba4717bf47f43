use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::PriceFeed;

const COINBASE_WS_URL: &str = "wss://ws-feed.exchange.coinbase.com";
const FIRST_TICK_TIMEOUT: Duration = Duration::from_secs(10);

/// Coinbase Exchange ticker feed, one subscription per tick.
///
/// Every call dials the websocket, subscribes to the ticker channel,
/// takes the first valid price and closes the socket again. Anything
/// that goes wrong — malformed payload, non-positive price, socket
/// error, close before a tick — degrades to None and the orchestrator
/// simply polls again next cycle.
pub struct CoinbaseFeed {
    url: String,
    product_id: String,
}

#[derive(Debug, Deserialize)]
struct TickerMessage {
    #[serde(rename = "type")]
    kind: String,
    price: Option<String>,
}

impl CoinbaseFeed {
    pub fn new() -> Self {
        Self::with_url(COINBASE_WS_URL, "SOL-USD")
    }

    pub fn with_url(url: &str, product_id: &str) -> Self {
        Self {
            url: url.to_string(),
            product_id: product_id.to_string(),
        }
    }

    async fn fetch_once(&self) -> Option<f64> {
        let (mut socket, _) = connect_async(&self.url).await.ok()?;

        let subscribe = json!({
            "type": "subscribe",
            "channels": [{ "name": "ticker", "product_ids": [self.product_id] }],
        });
        socket
            .send(Message::Text(subscribe.to_string()))
            .await
            .ok()?;

        let price = loop {
            let text = match socket.next().await {
                Some(Ok(Message::Text(text))) => text,
                // Control frames are handled by the library.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                // Socket error or closed before a valid tick arrived.
                _ => break None,
            };

            let Ok(message) = serde_json::from_str::<TickerMessage>(&text) else {
                break None;
            };
            if message.kind != "ticker" {
                // Subscription ack and friends; keep waiting.
                continue;
            }

            break message
                .price
                .and_then(|p| p.parse::<f64>().ok())
                .filter(|p| p.is_finite() && *p > 0.0);
        };

        let _ = socket.close(None).await;
        price
    }
}

impl Default for CoinbaseFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceFeed for CoinbaseFeed {
    async fn next_tick(&self) -> Option<f64> {
        tokio::time::timeout(FIRST_TICK_TIMEOUT, self.fetch_once())
            .await
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Spin up a local websocket server that replies to the subscribe
    /// message with the given frames, then closes.
    async fn mock_ticker_server(responses: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            // Wait for the subscribe message.
            let _ = ws.next().await;

            for response in responses {
                if ws.send(Message::Text(response)).await.is_err() {
                    return;
                }
            }
            let _ = ws.close(None).await;
        });

        format!("ws://{}", addr)
    }

    #[tokio::test]
    async fn test_first_valid_ticker_returned() {
        let url = mock_ticker_server(vec![
            // Subscription ack comes first, must be skipped.
            json!({"type": "subscriptions", "channels": []}).to_string(),
            json!({"type": "ticker", "product_id": "SOL-USD", "price": "142.37"}).to_string(),
        ])
        .await;

        let feed = CoinbaseFeed::with_url(&url, "SOL-USD");
        assert_eq!(feed.next_tick().await, Some(142.37));
    }

    #[tokio::test]
    async fn test_non_positive_price_is_none() {
        let url = mock_ticker_server(vec![
            json!({"type": "ticker", "price": "0"}).to_string(),
        ])
        .await;

        let feed = CoinbaseFeed::with_url(&url, "SOL-USD");
        assert_eq!(feed.next_tick().await, None);
    }

    #[tokio::test]
    async fn test_non_numeric_price_is_none() {
        let url = mock_ticker_server(vec![
            json!({"type": "ticker", "price": "not-a-number"}).to_string(),
        ])
        .await;

        let feed = CoinbaseFeed::with_url(&url, "SOL-USD");
        assert_eq!(feed.next_tick().await, None);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_none() {
        let url = mock_ticker_server(vec!["{not json".to_string()]).await;

        let feed = CoinbaseFeed::with_url(&url, "SOL-USD");
        assert_eq!(feed.next_tick().await, None);
    }

    #[tokio::test]
    async fn test_close_before_tick_is_none() {
        let url = mock_ticker_server(vec![]).await;

        let feed = CoinbaseFeed::with_url(&url, "SOL-USD");
        assert_eq!(feed.next_tick().await, None);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_none() {
        let feed = CoinbaseFeed::with_url("ws://127.0.0.1:1", "SOL-USD");
        assert_eq!(feed.next_tick().await, None);
    }
}
