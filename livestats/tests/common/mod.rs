//! Shared helpers: an in-memory channel the test drives by hand, and sample builders.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use livestats::{Channel, EventSink, Sample, Subscription};

pub struct Opened {
    pub resource: String,
    pub sink: EventSink,
    pub closed: Arc<AtomicBool>,
}

/// Records every subscription so the test can push events into its sink.
#[derive(Clone, Default)]
pub struct ScriptedChannel {
    opened: Arc<Mutex<Vec<Opened>>>,
}

impl ScriptedChannel {
    pub fn count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn sink(&self, i: usize) -> EventSink {
        self.opened.lock().unwrap()[i].sink.clone()
    }

    pub fn last_sink(&self) -> EventSink {
        let opened = self.opened.lock().unwrap();
        opened.last().expect("no subscription opened").sink.clone()
    }

    pub fn resource(&self, i: usize) -> String {
        self.opened.lock().unwrap()[i].resource.clone()
    }

    pub fn is_closed(&self, i: usize) -> bool {
        self.opened.lock().unwrap()[i].closed.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSubscription {
    closed: Arc<AtomicBool>,
}

impl Subscription for ScriptedSubscription {
    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Channel for ScriptedChannel {
    type Subscription = ScriptedSubscription;

    fn subscribe(&mut self, resource: &str, sink: EventSink) -> ScriptedSubscription {
        let closed = Arc::new(AtomicBool::new(false));
        self.opened.lock().unwrap().push(Opened {
            resource: resource.to_string(),
            sink,
            closed: closed.clone(),
        });
        ScriptedSubscription { closed }
    }
}

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

pub fn sample_at(secs: i64) -> Sample {
    Sample {
        timestamp: at(secs),
        cpu_percent: 10.0,
        mem_usage: 256 * 1024 * 1024,
        mem_limit: 1024 * 1024 * 1024,
        mem_percent: 25.0,
        net_input: 0,
        net_output: 0,
        block_input: 0,
        block_output: 0,
    }
}

pub fn cpu_sample(secs: i64, cpu: f64) -> Sample {
    Sample {
        cpu_percent: cpu,
        ..sample_at(secs)
    }
}
