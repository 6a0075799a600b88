//! Debounced teardown and rebuild after viewport changes

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info};

use crate::animation::timing::deadline_after;
use crate::Result;

/// Coalesces bursts of events into one action after a quiet period
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
    pending: usize,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
            pending: 0,
        }
    }

    /// Record an event, pushing the deadline out
    pub fn record(&mut self, now: Instant) -> Instant {
        let deadline = deadline_after(now, self.quiet);
        self.deadline = Some(deadline);
        self.pending += 1;
        deadline
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the pending burst if its quiet period has elapsed, returning its size
    pub fn take_due(&mut self, now: Instant) -> Option<usize> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(std::mem::take(&mut self.pending))
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending = 0;
    }
}

/// The rebuild pass, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildStep {
    ResetScroll,
    UnregisterTriggers,
    RevertSplits,
    ResetBaseline,
    DeriveTargets,
    BuildTriggers,
    RefreshBoundaries,
}

impl RebuildStep {
    pub const ALL: [RebuildStep; 7] = [
        RebuildStep::ResetScroll,
        RebuildStep::UnregisterTriggers,
        RebuildStep::RevertSplits,
        RebuildStep::ResetBaseline,
        RebuildStep::DeriveTargets,
        RebuildStep::BuildTriggers,
        RebuildStep::RefreshBoundaries,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RebuildStep::ResetScroll => "reset_scroll",
            RebuildStep::UnregisterTriggers => "unregister_triggers",
            RebuildStep::RevertSplits => "revert_splits",
            RebuildStep::ResetBaseline => "reset_baseline",
            RebuildStep::DeriveTargets => "derive_targets",
            RebuildStep::BuildTriggers => "build_triggers",
            RebuildStep::RefreshBoundaries => "refresh_boundaries",
        }
    }
}

impl fmt::Display for RebuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step: RebuildStep,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RebuildReport {
    pub steps: Vec<StepOutcome>,
}

impl RebuildReport {
    pub fn failures(&self) -> Vec<&StepOutcome> {
        self.steps.iter().filter(|s| s.error.is_some()).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(|s| s.error.is_none())
    }
}

/// Run every rebuild step in order; a failing step is logged and the next one still runs
pub fn run_rebuild<F>(mut step_fn: F) -> RebuildReport
where
    F: FnMut(RebuildStep) -> Result<()>,
{
    let mut report = RebuildReport::default();
    for step in RebuildStep::ALL {
        let error = match step_fn(step) {
            Ok(()) => None,
            Err(e) => {
                error!(step = step.name(), error = %e, "Rebuild step failed, continuing");
                Some(e.to_string())
            }
        };
        report.steps.push(StepOutcome { step, error });
    }
    report
}

#[derive(Debug)]
pub struct ResizeRebuildController {
    debouncer: Debouncer,
    passes: u64,
    last_report: Option<RebuildReport>,
}

impl ResizeRebuildController {
    pub fn new(quiet: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(quiet),
            passes: 0,
            last_report: None,
        }
    }

    pub fn on_resize(&mut self, now: Instant) -> Instant {
        self.debouncer.record(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Whether a debounced rebuild is due now; consumes the pending burst
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.debouncer.take_due(now) {
            Some(coalesced) => {
                info!(coalesced, "Resize settled, rebuilding");
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }

    pub fn record_pass(&mut self, report: RebuildReport) -> u64 {
        self.passes += 1;
        self.last_report = Some(report);
        self.passes
    }

    /// Completed rebuild passes
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn last_report(&self) -> Option<&RebuildReport> {
        self.last_report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_debounce_coalesces_burst() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(ms(250));
        d.record(t0);
        d.record(t0 + ms(50));
        assert_eq!(d.take_due(t0 + ms(260)), None);
        assert_eq!(d.take_due(t0 + ms(300)), Some(2));
        assert_eq!(d.take_due(t0 + ms(900)), None);
    }

    #[test]
    fn test_huge_quiet_period_is_capped() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(u64::MAX));
        assert_eq!(d.record(t0), t0 + crate::animation::timing::MAX_DELAY);
        assert_eq!(d.take_due(t0 + ms(1000)), None);
    }

    #[test]
    fn test_rebuild_runs_every_step_despite_failures() {
        let mut ran = Vec::new();
        let report = run_rebuild(|step| {
            ran.push(step);
            match step {
                RebuildStep::RevertSplits => Err(Error::Other("split vanished".to_string())),
                RebuildStep::BuildTriggers => Err(Error::MissingElement("about".to_string())),
                _ => Ok(()),
            }
        });
        assert_eq!(ran, RebuildStep::ALL.to_vec());
        assert_eq!(report.failures().len(), 2);
        assert!(!report.is_clean());
        assert_eq!(report.steps[6].step, RebuildStep::RefreshBoundaries);
    }

    #[test]
    fn test_controller_counts_passes() {
        let t0 = Instant::now();
        let mut c = ResizeRebuildController::new(ms(250));
        c.on_resize(t0);
        c.on_resize(t0 + ms(50));
        assert!(!c.take_due(t0 + ms(200)));
        assert!(c.take_due(t0 + ms(300)));
        c.record_pass(RebuildReport::default());
        assert!(!c.take_due(t0 + ms(1000)));
        assert_eq!(c.passes(), 1);
    }
}
