//! Coarse up/down/flat labels for a series' recent direction.

use crate::types::Trend;

/// Trailing window the newest point is compared against (newest included).
pub const TREND_WINDOW: usize = 8;
/// Absolute change below which a series counts as flat.
pub const NOISE_FLOOR: f64 = 0.5;

/// Compare the newest value with the mean of the up to seven values before it.
pub fn classify(history: &[f64]) -> Trend {
    let (last, rest) = match history.split_last() {
        Some((last, rest)) if !rest.is_empty() => (*last, rest),
        _ => return Trend::Flat,
    };
    let n = TREND_WINDOW.min(history.len());
    let window = &rest[rest.len() - (n - 1)..];
    let baseline = window.iter().sum::<f64>() / window.len() as f64;
    let delta = last - baseline;
    if delta.abs() < NOISE_FLOOR {
        Trend::Flat
    } else if delta > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    }
}
