//! One-line console rendering of a view-state update.

use livestats::{LifecycleState, RateSet, ViewState};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Binary-scaled byte count; whole bytes, one decimal above that.
pub fn bytes(b: f64) -> String {
    let mut v = b.max(0.0);
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{v:.0}B")
    } else {
        format!("{v:.1}{}", UNITS[unit])
    }
}

fn io_summary(rates: Option<RateSet>) -> String {
    let Some(r) = rates else {
        return "net - | blk -".to_string();
    };
    let per_sec = |v: f64| format!("{}/s", bytes(v));
    format!(
        "net {} in {} out | blk {} read {} write",
        per_sec(r.net_in_per_sec),
        per_sec(r.net_out_per_sec),
        per_sec(r.blk_in_per_sec),
        per_sec(r.blk_out_per_sec)
    )
}

pub fn status_line(v: &ViewState) -> String {
    let resource = v.resource.as_deref().unwrap_or("-");
    let live = if v.live_requested { "live" } else { "paused" };
    let Some(s) = v.latest.as_ref() else {
        return match (v.state, v.last_error.as_deref()) {
            (LifecycleState::Errored, Some(err)) => {
                format!("[{resource}] {} ({live}): {err}", v.state)
            }
            (LifecycleState::Streaming, _) => format!("[{resource}] waiting for stats..."),
            _ => format!("[{resource}] {} ({live})", v.state),
        };
    };

    let io = io_summary(v.rates);
    let stale = if v.state == LifecycleState::Streaming { "" } else { " (stale)" };
    format!(
        "[{resource}] {} cpu {:5.1}% {} | mem {} / {} {:5.1}% {} | {io} | {}{stale}",
        s.timestamp.format("%H:%M:%S"),
        s.cpu_clamped(),
        v.cpu_trend,
        bytes(s.mem_usage as f64),
        bytes(s.mem_limit as f64),
        s.mem_clamped(),
        v.mem_trend,
        v.state,
    )
}
