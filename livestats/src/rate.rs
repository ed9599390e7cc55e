//! Per-second I/O rates from two cumulative samples.

use crate::types::{RateSet, Sample};

/// Smallest time step used when dividing counter deltas, in seconds.
pub const MIN_DT_SECS: f64 = 1.0;

/// Rates between `previous` and `current`, or `None` for the first sample of a session.
///
/// Counter decreases (resource restart, upstream reset) clamp to zero instead of
/// producing negative throughput.
pub fn rate(current: &Sample, previous: Option<&Sample>) -> Option<RateSet> {
    let prev = previous?;
    let elapsed_ms = (current.timestamp - prev.timestamp).num_milliseconds();
    let dt = (elapsed_ms as f64 / 1000.0).max(MIN_DT_SECS);
    Some(RateSet {
        net_in_per_sec: per_sec(current.net_input, prev.net_input, dt),
        net_out_per_sec: per_sec(current.net_output, prev.net_output, dt),
        blk_in_per_sec: per_sec(current.block_input, prev.block_input, dt),
        blk_out_per_sec: per_sec(current.block_output, prev.block_output, dt),
    })
}

fn per_sec(cur: i64, prev: i64, dt: f64) -> f64 {
    ((cur as f64 - prev as f64) / dt).max(0.0)
}
