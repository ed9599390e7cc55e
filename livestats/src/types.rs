//! Types that mirror the agent's JSON schema, plus the derived values the
//! controller publishes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::History;

/// One telemetry reading for a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub mem_usage: u64,
    pub mem_limit: u64,
    pub mem_percent: f64,
    // cumulative totals since the resource started; client diffs to compute rates.
    // Signed so an upstream reset that goes negative still decodes.
    pub net_input: i64,
    pub net_output: i64,
    pub block_input: i64,
    pub block_output: i64,
}

impl Sample {
    /// CPU percentage clamped to 0..=100 for charting.
    pub fn cpu_clamped(&self) -> f64 {
        clamp_percent(self.cpu_percent)
    }

    /// Memory percentage clamped to 0..=100 for charting.
    pub fn mem_clamped(&self) -> f64 {
        clamp_percent(self.mem_percent)
    }
}

pub fn clamp_percent(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 100.0)
}

/// Per-second throughput derived from two cumulative samples. All fields are >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RateSet {
    pub net_in_per_sec: f64,
    pub net_out_per_sec: f64,
    pub blk_in_per_sec: f64,
    pub blk_out_per_sec: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trend {
    Up,
    Down,
    #[default]
    Flat,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// No subscription has been opened yet.
    #[default]
    Idle,
    Streaming,
    /// Closed because a guard condition went false.
    Stopped,
    /// Closed because the transport reported an error; live mode was turned off.
    Errored,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Streaming => "streaming",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Errored => "errored",
        })
    }
}

/// Snapshot handed to the dashboard after every update.
///
/// Histories are shared immutably, so cloning a `ViewState` is cheap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub resource: Option<String>,
    pub state: LifecycleState,
    pub live_requested: bool,
    pub latest: Option<Sample>,
    pub cpu_history: History,
    pub mem_history: History,
    pub rates: Option<RateSet>,
    pub cpu_trend: Trend,
    pub mem_trend: Trend,
    pub last_error: Option<String>,
}
