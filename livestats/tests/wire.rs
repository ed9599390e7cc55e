//! Push message envelopes as sent by the agent.
mod common;

use livestats::wire::{decode, encode, ErrorPayload, StreamEvent};

#[test]
fn decodes_stats_envelope_with_camel_case_fields() {
    let text = r#"{"event":"stats","data":{"timestamp":"2023-11-14T22:13:22Z","cpuPercent":12.5,
        "memUsage":1024,"memLimit":4096,"memPercent":25.0,"netInput":10,"netOutput":20,
        "blockInput":30,"blockOutput":40}}"#;
    let StreamEvent::Stats(s) = decode(text).unwrap() else {
        panic!("expected stats");
    };
    assert_eq!(s.timestamp, common::at(2));
    assert_eq!(s.cpu_percent, 12.5);
    assert_eq!(s.mem_limit, 4096);
    assert_eq!((s.net_input, s.net_output), (10, 20));
    assert_eq!((s.block_input, s.block_output), (30, 40));
}

#[test]
fn decodes_error_envelope() {
    let ev = decode(r#"{"event":"error","data":{"error":"resource 7 is not running"}}"#).unwrap();
    assert_eq!(
        ev,
        StreamEvent::Error(ErrorPayload {
            error: "resource 7 is not running".into()
        })
    );
}

#[test]
fn negative_counters_still_decode() {
    let mut s = common::sample_at(0);
    s.net_input = -5;
    let text = encode(&StreamEvent::Stats(s.clone())).unwrap();
    assert!(text.starts_with(r#"{"event":"stats","data":{"#), "{text}");
    assert_eq!(decode(&text).unwrap(), StreamEvent::Stats(s));
}

#[test]
fn rejects_unknown_events_and_garbage() {
    assert!(decode(r#"{"event":"keepalive","data":{}}"#).is_err());
    assert!(decode("not json").is_err());
    let err = decode(r#"{"event":"stats","data":{"cpuPercent":1}}"#).unwrap_err();
    assert!(err.to_string().starts_with("malformed stream message"));
}
