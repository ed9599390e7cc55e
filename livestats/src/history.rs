//! Bounded history windows for sparkline and trend rendering.
//!
//! A [`History`] is an immutable snapshot: `append` and `clear` return a new
//! window and leave the receiver untouched, so readers holding an older
//! snapshot never observe it changing.

use std::sync::Arc;

/// Samples kept per series (one minute at 1 Hz).
pub const HISTORY_CAP: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct History {
    values: Arc<[f64]>,
    cap: usize,
}

impl History {
    pub fn new(cap: usize) -> Self {
        Self {
            values: Arc::from(Vec::new()),
            cap,
        }
    }

    // Oldest values fall off the front once the window is full
    pub fn append(&self, v: f64) -> Self {
        let skip = (self.values.len() + 1).saturating_sub(self.cap);
        let values: Arc<[f64]> = self
            .values
            .iter()
            .copied()
            .chain(std::iter::once(v))
            .skip(skip)
            .collect();
        Self {
            values,
            cap: self.cap,
        }
    }

    pub fn clear(&self) -> Self {
        Self::new(self.cap)
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values oldest-first.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_leaves_previous_snapshot_untouched() {
        let a = History::new(3).append(1.0).append(2.0);
        let b = a.append(3.0).append(4.0);
        assert_eq!(a.as_slice(), &[1.0, 2.0]);
        assert_eq!(b.as_slice(), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn clear_keeps_capacity() {
        let h = History::new(5).append(1.0).clear();
        assert!(h.is_empty());
        assert_eq!(h.capacity(), 5);
    }
}
