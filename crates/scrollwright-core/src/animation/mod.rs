//! Animation primitives
//!
//! - `easing` - Easing curves
//! - `timing` - Elapsed time, capped deadlines and interpolation
//! - `timeline` - Keyframed property changes with relative scheduling
//! - `animator` - The `Animator` seam and the in-process `Tweener`

pub mod easing;
pub mod timing;
pub mod timeline;

pub mod animator;

pub use animator::{kill_slot, AnimationEvent, Animator, HandleId, Tweener};
pub use easing::EasingType;
pub use timeline::{Position, Property, Target, Timeline, Tween};
