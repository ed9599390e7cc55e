//! WebSocket transport: one connection per subscription, read by a spawned task.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

use crate::channel::{Channel, EventSink, Subscription};
use crate::wire::{decode, StreamEvent};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum WsConfigError {
    #[error("invalid agent url: {0}")]
    Parse(#[from] url::ParseError),
    #[error("agent url must use ws:// or wss://, got {0}")]
    Scheme(String),
}

// Connect to the agent and return the WS stream
pub async fn connect(url: &str) -> Result<WsStream, tokio_tungstenite::tungstenite::Error> {
    let (ws, _) = connect_async(url).await?;
    Ok(ws)
}

/// Streams from `{base}/resources/{id}/stats/stream`.
#[derive(Debug, Clone)]
pub struct WsChannel {
    base: Url,
}

impl WsChannel {
    pub fn new(base_url: &str) -> Result<Self, WsConfigError> {
        let base = Url::parse(base_url)?;
        if !matches!(base.scheme(), "ws" | "wss") || base.cannot_be_a_base() {
            return Err(WsConfigError::Scheme(base.scheme().to_string()));
        }
        Ok(Self { base })
    }

    pub fn stream_url(&self, resource: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().extend(["resources", resource, "stats", "stream"]);
        }
        url
    }
}

pub struct WsSubscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription for WsSubscription {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WsSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl Channel for WsChannel {
    type Subscription = WsSubscription;

    /// Must be called from within a tokio runtime.
    fn subscribe(&mut self, resource: &str, sink: EventSink) -> WsSubscription {
        let url = self.stream_url(resource);
        let task = tokio::spawn(pump(url, sink));
        WsSubscription { task: Some(task) }
    }
}

async fn pump(url: Url, sink: EventSink) {
    let mut ws = match connect(url.as_str()).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%url, "stats stream connect failed: {e}");
            sink.error(format!("connect {url}: {e}"));
            return;
        }
    };
    debug!(%url, "stats stream connected");
    if !sink.opened() {
        return;
    }

    while let Some(msg) = ws.next().await {
        match msg {
            Ok(Message::Text(text)) => match decode(&text) {
                Ok(StreamEvent::Stats(sample)) => {
                    if !sink.sample(sample) {
                        let _ = ws.close(None).await;
                        return;
                    }
                }
                Ok(StreamEvent::Error(payload)) => {
                    sink.error(payload.error);
                    let _ = ws.close(None).await;
                    return;
                }
                Err(e) => {
                    sink.error(e.to_string());
                    let _ = ws.close(None).await;
                    return;
                }
            },
            Ok(Message::Close(_)) => {
                sink.error("stream closed by server");
                return;
            }
            // Pings are answered by tungstenite; other frames carry nothing for us
            Ok(_) => {}
            Err(e) => {
                sink.error(e.to_string());
                return;
            }
        }
    }
    sink.error("stream ended");
}
