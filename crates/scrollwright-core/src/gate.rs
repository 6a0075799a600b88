//! Scroll suppression
//!
//! While any `ScrollLock` is alive, scroll input is intercepted and
//! discarded. Locks release on drop, so suppression lifts on every exit
//! path of whoever holds one.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollKey {
    Space,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    Home,
    End,
}

/// Scroll-producing input from the host; deltas are in scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum InputEvent {
    Wheel { delta_y: f64 },
    TouchMove { delta_y: f64 },
    Key { key: ScrollKey },
    /// Programmatic scroll to an absolute offset
    Scroll { offset: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputDisposition {
    Suppressed,
    Passed,
}

#[derive(Debug, Default)]
struct GateState {
    locks: AtomicUsize,
    discarded: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct ScrollGate {
    state: Arc<GateState>,
}

impl ScrollGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress scrolling until the returned lock is dropped
    pub fn lock(&self) -> ScrollLock {
        if self.state.locks.fetch_add(1, Ordering::SeqCst) == 0 {
            debug!("Scroll suppressed");
        }
        ScrollLock {
            state: Arc::clone(&self.state),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.state.locks.load(Ordering::SeqCst) > 0
    }

    pub fn filter(&self, event: &InputEvent) -> InputDisposition {
        if self.is_suppressed() {
            self.state.discarded.fetch_add(1, Ordering::SeqCst);
            debug!(event = ?event, "Discarded scroll input");
            InputDisposition::Suppressed
        } else {
            InputDisposition::Passed
        }
    }

    /// Inputs discarded since the gate was created
    pub fn discarded(&self) -> u64 {
        self.state.discarded.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ScrollLock {
    state: Arc<GateState>,
}

impl Drop for ScrollLock {
    fn drop(&mut self) {
        if self.state.locks.fetch_sub(1, Ordering::SeqCst) == 1 {
            debug!("Scroll suppression lifted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_suppresses_until_dropped() {
        let gate = ScrollGate::new();
        assert_eq!(gate.filter(&InputEvent::Wheel { delta_y: 10.0 }), InputDisposition::Passed);

        let lock = gate.lock();
        assert_eq!(
            gate.filter(&InputEvent::Key { key: ScrollKey::Space }),
            InputDisposition::Suppressed
        );
        assert_eq!(
            gate.filter(&InputEvent::TouchMove { delta_y: -4.0 }),
            InputDisposition::Suppressed
        );
        assert_eq!(gate.discarded(), 2);

        drop(lock);
        assert!(!gate.is_suppressed());
    }

    #[test]
    fn test_lock_released_on_unwind() {
        let gate = ScrollGate::new();
        let cloned = gate.clone();
        let result = std::panic::catch_unwind(move || {
            let _lock = cloned.lock();
            panic!("stage failed");
        });
        assert!(result.is_err());
        assert!(!gate.is_suppressed());
    }

    #[test]
    fn test_nested_locks() {
        let gate = ScrollGate::new();
        let a = gate.lock();
        let b = gate.lock();
        drop(a);
        assert!(gate.is_suppressed());
        drop(b);
        assert!(!gate.is_suppressed());
    }
}
