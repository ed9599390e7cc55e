//! livestats_agent: streams live telemetry samples for local processes over WebSocket.

mod metrics;
mod state;
mod types;
mod ws;

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Router};
use state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
const INTERVAL_ENV: &str = "LIVESTATS_AGENT_INTERVAL_MS";

fn parse_port<I: IntoIterator<Item = String>>(args: I, default_port: u16) -> u16 {
    let mut it = args.into_iter();
    let _ = it.next(); // program name
    let mut long: Option<String> = None;
    let mut short: Option<String> = None;
    while let Some(a) = it.next() {
        match a.as_str() {
            "--port" => long = it.next(),
            "-p" => short = it.next(),
            _ if a.starts_with("--port=") => {
                if let Some((_, v)) = a.split_once('=') {
                    long = Some(v.to_string());
                }
            }
            _ => {}
        }
    }
    long.or(short)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(default_port)
}

// --interval-ms wins over the env var; zero or garbage falls back to the default
fn parse_interval<I: IntoIterator<Item = String>>(args: I, env_value: Option<String>) -> Duration {
    let mut it = args.into_iter();
    let _ = it.next();
    let mut flag: Option<String> = None;
    while let Some(a) = it.next() {
        match a.as_str() {
            "--interval-ms" => flag = it.next(),
            _ if a.starts_with("--interval-ms=") => {
                flag = a.split_once('=').map(|(_, v)| v.to_string());
            }
            _ => {}
        }
    }
    flag.or(env_value)
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_INTERVAL)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("Usage: livestats_agent [--port PORT|-p PORT] [--interval-ms MS]");
        return Ok(());
    }
    let port = parse_port(args.clone(), DEFAULT_PORT);
    let interval = parse_interval(args, std::env::var(INTERVAL_ENV).ok());

    let app = Router::new()
        .route("/resources/:pid/stats/stream", get(ws::stream_handler))
        .with_state(AppState::new(interval));

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    let addr = listener.local_addr()?;
    info!(%addr, interval_ms = interval.as_millis() as u64, "livestats agent listening");
    // Machine-readable line so callers binding port 0 can find us
    println!("listening on {addr}");
    std::io::stdout().flush()?;

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("agent")
            .chain(v.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn port_long_short_and_assign() {
        assert_eq!(parse_port(args(&["--port", "9001"]), 3000), 9001);
        assert_eq!(parse_port(args(&["-p", "9002"]), 3000), 9002);
        assert_eq!(parse_port(args(&["--port=9003"]), 3000), 9003);
        assert_eq!(parse_port(args(&[]), 3000), 3000);
    }

    #[test]
    fn interval_flag_beats_env_and_rejects_zero() {
        assert_eq!(
            parse_interval(args(&["--interval-ms", "250"]), Some("900".into())),
            Duration::from_millis(250)
        );
        assert_eq!(
            parse_interval(args(&[]), Some("900".into())),
            Duration::from_millis(900)
        );
        assert_eq!(parse_interval(args(&["--interval-ms=0"]), None), DEFAULT_INTERVAL);
        assert_eq!(parse_interval(args(&[]), Some("soon".into())), DEFAULT_INTERVAL);
    }
}
