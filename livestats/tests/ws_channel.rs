//! WebSocket transport against a local in-process agent stand-in.
mod common;

use std::time::Duration;

use futures_util::SinkExt;
use livestats::wire::{encode, ErrorPayload, StreamEvent};
use livestats::{ChannelEvent, Delivery, StreamConnectionManager, WsChannel};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

async fn next(mgr: &mut StreamConnectionManager<WsChannel>) -> Delivery {
    tokio::time::timeout(Duration::from_secs(5), mgr.next_event())
        .await
        .expect("event within timeout")
        .expect("manager queue open")
}

/// Accept one client, send `frames`, then either close or hold the socket.
async fn serve_once(frames: Vec<Message>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(frame).await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
    });
    port
}

fn manager(port: u16) -> StreamConnectionManager<WsChannel> {
    StreamConnectionManager::new(WsChannel::new(&format!("ws://127.0.0.1:{port}")).unwrap())
}

fn stats(secs: i64) -> Message {
    Message::Text(encode(&StreamEvent::Stats(common::sample_at(secs))).unwrap())
}

#[test]
fn rejects_non_websocket_urls() {
    assert!(WsChannel::new("http://agent:3000").is_err());
    assert!(WsChannel::new("not a url").is_err());
    assert!(WsChannel::new("wss://agent:3000").is_ok());
}

#[test]
fn stream_url_appends_resource_path() {
    let ch = WsChannel::new("ws://agent:3000").unwrap();
    assert_eq!(
        ch.stream_url("abc").as_str(),
        "ws://agent:3000/resources/abc/stats/stream"
    );
    let prefixed = WsChannel::new("ws://agent:3000/api/").unwrap();
    assert_eq!(
        prefixed.stream_url("7").as_str(),
        "ws://agent:3000/api/resources/7/stats/stream"
    );
}

#[tokio::test]
async fn delivers_samples_then_server_error() {
    let error = Message::Text(
        encode(&StreamEvent::Error(ErrorPayload {
            error: "resource 42 is not running".into(),
        }))
        .unwrap(),
    );
    let port = serve_once(vec![stats(0), stats(2), error, stats(4)]).await;
    let mut mgr = manager(port);
    let h = mgr.open("42").unwrap();

    assert_eq!(next(&mut mgr).await.event, ChannelEvent::Opened);
    assert_eq!(
        next(&mut mgr).await.event,
        ChannelEvent::Sample(common::sample_at(0))
    );
    assert_eq!(
        next(&mut mgr).await.event,
        ChannelEvent::Sample(common::sample_at(2))
    );
    let d = next(&mut mgr).await;
    assert_eq!(d.handle, h);
    assert_eq!(
        d.event,
        ChannelEvent::Error("resource 42 is not running".into())
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mgr.try_next_event(), None);
    assert!(mgr.close(h));
}

#[tokio::test]
async fn malformed_frame_is_an_error() {
    let port = serve_once(vec![Message::Text("{\"event\":\"stats\"}".into())]).await;
    let mut mgr = manager(port);
    mgr.open("1").unwrap();

    assert_eq!(next(&mut mgr).await.event, ChannelEvent::Opened);
    match next(&mut mgr).await.event {
        ChannelEvent::Error(msg) => assert!(msg.starts_with("malformed stream message"), "{msg}"),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_close_is_reported() {
    let port = serve_once(vec![stats(0), Message::Close(None)]).await;
    let mut mgr = manager(port);
    mgr.open("1").unwrap();

    assert_eq!(next(&mut mgr).await.event, ChannelEvent::Opened);
    assert!(matches!(next(&mut mgr).await.event, ChannelEvent::Sample(_)));
    assert_eq!(
        next(&mut mgr).await.event,
        ChannelEvent::Error("stream closed by server".into())
    );
}

#[tokio::test]
async fn connect_failure_is_an_error() {
    // Grab a free port and release it so nothing is listening there
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut mgr = manager(port);
    mgr.open("1").unwrap();
    match next(&mut mgr).await.event {
        ChannelEvent::Error(msg) => assert!(msg.starts_with("connect ws://127.0.0.1"), "{msg}"),
        other => panic!("expected error, got {other:?}"),
    }
}
