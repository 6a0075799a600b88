//! Scroll triggers
//!
//! - `boundary` - Boundary expressions and their resolution to scroll offsets
//! - `model` - Trigger definition, edges and phases
//! - `registry` - Live trigger set and per-pass evaluation

pub mod boundary;
pub mod model;
pub mod registry;

pub use boundary::{Anchor, BoundaryEnd, BoundaryExpr};
pub use model::{Edge, Fired, Phase, Route, Signal, Trigger, TriggerGroup};
pub use registry::{Pass, ScrollAxes, TriggerRegistry};
