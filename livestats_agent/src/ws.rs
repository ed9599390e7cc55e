//! WebSocket upgrade and per-connection stats stream.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use sysinfo::MINIMUM_CPU_UPDATE_INTERVAL;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::metrics::{collect_sample, prime_cpu};
use crate::state::AppState;
use crate::types::StreamEvent;

pub const KEEPALIVE: Duration = Duration::from_secs(30);

pub async fn stream_handler(
    ws: WebSocketUpgrade,
    Path(pid): Path<u32>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| stream_stats(socket, state, pid))
}

async fn stream_stats(socket: WebSocket, state: AppState, pid: u32) {
    info!(pid, "starting stats stream");
    let (mut tx, mut rx) = socket.split();

    // First sample waits until sysinfo can report a real CPU delta
    prime_cpu(&state, pid).await;
    let first = Instant::now() + MINIMUM_CPU_UPDATE_INTERVAL;
    let mut sample_tick = interval_at(first, state.interval);
    sample_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut keepalive = interval_at(Instant::now() + KEEPALIVE, KEEPALIVE);

    loop {
        tokio::select! {
            msg = rx.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(pid, "client read failed: {e}");
                    break;
                }
                Some(Ok(_)) => {}
            },
            _ = sample_tick.tick() => {
                let event = match collect_sample(&state, pid).await {
                    Some(sample) => StreamEvent::Stats(sample),
                    None => StreamEvent::Error { error: format!("resource {pid} is not running") },
                };
                let terminal = matches!(event, StreamEvent::Error { .. });
                let js = match serde_json::to_string(&event) {
                    Ok(js) => js,
                    Err(e) => {
                        warn!(pid, "failed to encode stats: {e}");
                        continue;
                    }
                };
                if tx.send(Message::Text(js)).await.is_err() {
                    break;
                }
                if terminal {
                    info!(pid, "resource is not running; ending stream");
                    let _ = tx.send(Message::Close(None)).await;
                    break;
                }
            }
            _ = keepalive.tick() => {
                if tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
    debug!(pid, "stats stream closed");
}
