// CLASSIFICATION: COMMUNITY
// Filename: clock.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-19

//! Coarse tick source used to age ack entries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Length of one ack tick.
pub const TICK_MILLIS: u64 = 10;

/// Source of monotonically increasing milliseconds.
pub trait TickSource {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_millis(&self) -> u64;

    /// Current one-byte ack timestamp.
    fn now_tick(&self) -> u8 {
        quantize(self.now_millis())
    }
}

/// Reduce a millisecond reading to a one-byte tick, never 0.
///
/// 0 marks an empty ack slot, so a genuine zero reading becomes 1.
#[must_use]
pub fn quantize(millis: u64) -> u8 {
    match ((millis / TICK_MILLIS) % 256) as u8 {
        0 => 1,
        tick => tick,
    }
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Clock advanced by hand; clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn advance_ticks(&self, ticks: u64) {
        self.advance(ticks * TICK_MILLIS);
    }
}

impl TickSource for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tick_is_coerced() {
        assert_eq!(quantize(0), 1);
        assert_eq!(quantize(9), 1);
        assert_eq!(quantize(2560), 1);
        assert_eq!(quantize(10), 1);
        assert_eq!(quantize(20), 2);
        assert_eq!(quantize(2550), 255);
    }

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new(100);
        let other = clock.clone();
        other.advance_ticks(3);
        assert_eq!(clock.now_millis(), 130);
        assert_eq!(clock.now_tick(), 13);
    }
}
