//! Time calculation utilities for animations
//!
//! Everything takes the current instant explicitly so playback is
//! deterministic under a test clock.

use std::time::{Duration, Instant};

/// Longest delay a deadline is ever scheduled out
pub const MAX_DELAY: Duration = Duration::from_secs(60 * 60);

/// Seconds elapsed between two instants, zero if `now` precedes `start`
#[inline]
pub fn elapsed_secs(start: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(start).as_secs_f64()
}

/// `now + delay`, with delays beyond `MAX_DELAY` capped so the instant cannot overflow
#[inline]
pub fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now + delay.min(MAX_DELAY)
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}
