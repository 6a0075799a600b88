use serde::Serialize;

use crate::intro::IntroState;
use crate::responsive::ResponsiveMode;
use crate::reveal::SectionVisual;
use crate::trigger::Signal;

/// Events emitted by a page for observers (CLI, tests, host bridges)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum EngineEvent {
    /// The intro entered a new stage
    IntroStage { stage: IntroState },
    /// A trigger crossed a boundary or reported progress
    TriggerFired { trigger: String, signal: Signal },
    SectionChanged { index: usize, visual: SectionVisual },
    /// A section's detail content started its reveal
    DetailRevealed { index: usize },
    /// The pinned region took over; conflicting triggers are suspended
    RegionActivated { suspended: usize },
    RegionDeactivated { restored: usize },
    ModeChanged {
        from: Option<ResponsiveMode>,
        to: ResponsiveMode,
    },
    /// A debounced rebuild pass finished
    RebuildCompleted {
        pass: u64,
        triggers: usize,
        failures: usize,
    },
    /// Scroll position was forced back to the top
    ScrollReset { discarded: u64 },
    SceneLoaded,
    /// Something optional failed and the page carried on without it
    SoftFailure { source: String, message: String },
}
