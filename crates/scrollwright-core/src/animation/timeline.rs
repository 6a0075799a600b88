//! Timeline description: keyframed property changes with relative scheduling

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::easing::EasingType;
use crate::dom::ElementId;

/// Something whose properties an animation can drive
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Target {
    Element(ElementId),
    SceneObject(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Element(id) => write!(f, "#{}", id),
            Target::SceneObject(name) => write!(f, "scene:{}", name),
        }
    }
}

impl From<ElementId> for Target {
    fn from(value: ElementId) -> Self {
        Target::Element(value)
    }
}

impl From<&ElementId> for Target {
    fn from(value: &ElementId) -> Self {
        Target::Element(value.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Opacity,
    /// Horizontal translation in px
    X,
    /// Vertical translation in px
    Y,
    Scale,
    PositionX,
    PositionY,
    PositionZ,
    RotationY,
    /// 1.0 visible, 0.0 hidden
    Visible,
}

impl Property {
    /// Value a property holds before anything has written it
    pub fn initial_value(self) -> f64 {
        match self {
            Property::Opacity | Property::Scale | Property::Visible => 1.0,
            _ => 0.0,
        }
    }
}

/// A single property change
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub target: Target,
    pub property: Property,
    /// Explicit start value; `None` starts from whatever the property holds
    pub from: Option<f64>,
    pub to: f64,
    pub duration: Duration,
    pub easing: EasingType,
}

impl Tween {
    pub fn to(target: impl Into<Target>, property: Property, value: f64) -> Self {
        Self {
            target: target.into(),
            property,
            from: None,
            to: value,
            duration: Duration::ZERO,
            easing: EasingType::default(),
        }
    }

    pub fn from(mut self, value: f64) -> Self {
        self.from = Some(value);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn easing(mut self, easing: EasingType) -> Self {
        self.easing = easing;
        self
    }
}

/// Where a step is placed on its timeline
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    /// Start when the previous step ends
    AfterPrevious,
    /// Start together with the previous step
    WithPrevious,
    /// Start at an absolute time from the timeline origin
    At(Duration),
    /// Start at a label plus a signed offset in seconds
    Label(String, f64),
    /// Start at the end of everything scheduled so far plus a signed offset in seconds
    Offset(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Start time in seconds from the timeline origin
    pub start: f64,
    pub tween: Tween,
}

impl Step {
    pub fn end(&self) -> f64 {
        self.start + self.tween.duration.as_secs_f64()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    steps: Vec<Step>,
    labels: HashMap<String, f64>,
    last_start: f64,
    last_end: f64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-tween timeline
    pub fn single(tween: Tween) -> Self {
        Self::new().add(tween, Position::AfterPrevious)
    }

    fn resolve(&self, position: &Position) -> f64 {
        let start = match position {
            Position::AfterPrevious => self.last_end,
            Position::WithPrevious => self.last_start,
            Position::At(at) => at.as_secs_f64(),
            Position::Label(name, offset) => match self.labels.get(name) {
                Some(at) => at + offset,
                None => {
                    tracing::debug!(label = %name, "Unknown timeline label, appending");
                    self.duration() + offset
                }
            },
            Position::Offset(offset) => self.duration() + offset,
        };
        start.max(0.0)
    }

    pub fn add(mut self, tween: Tween, position: Position) -> Self {
        let start = self.resolve(&position);
        let step = Step { start, tween };
        self.last_start = start;
        self.last_end = step.end();
        self.steps.push(step);
        self
    }

    /// Mark the current end of the timeline with a name
    pub fn label(mut self, name: impl Into<String>) -> Self {
        let at = self.duration();
        self.labels.insert(name.into(), at);
        self
    }

    /// Add tweens that start `each` apart, the first at `position`
    pub fn stagger(mut self, tweens: Vec<Tween>, each: Duration, position: Position) -> Self {
        let first = self.resolve(&position);
        let mut last_end = first;
        for (i, tween) in tweens.into_iter().enumerate() {
            let start = first + each.as_secs_f64() * i as f64;
            let step = Step { start, tween };
            last_end = last_end.max(step.end());
            self.steps.push(step);
        }
        self.last_start = first;
        self.last_end = last_end;
        self
    }

    /// Total length in seconds
    pub fn duration(&self) -> f64 {
        self.steps.iter().map(Step::end).fold(0.0, f64::max)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every (target, property) pair this timeline writes
    pub fn keys(&self) -> impl Iterator<Item = (&Target, Property)> {
        self.steps.iter().map(|s| (&s.tween.target, s.tween.property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn tween(id: &str, ms_: u64) -> Tween {
        Tween::to(ElementId::new(id), Property::Opacity, 1.0).duration(ms(ms_))
    }

    #[test]
    fn test_after_previous_chains() {
        let tl = Timeline::new()
            .add(tween("a", 500), Position::AfterPrevious)
            .add(tween("b", 500), Position::AfterPrevious);
        assert_eq!(tl.steps()[1].start, 0.5);
        assert!((tl.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_label_offset() {
        let tl = Timeline::new()
            .add(tween("a", 400), Position::AfterPrevious)
            .label("intro")
            .add(tween("b", 400), Position::AfterPrevious)
            .add(tween("c", 100), Position::Label("intro".to_string(), 0.2));
        assert!((tl.steps()[2].start - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_with_previous_and_negative_offset() {
        let tl = Timeline::new()
            .add(tween("a", 1000), Position::AfterPrevious)
            .add(tween("b", 200), Position::WithPrevious)
            .add(tween("c", 200), Position::Offset(-0.3));
        assert_eq!(tl.steps()[1].start, 0.0);
        assert!((tl.steps()[2].start - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_stagger() {
        let tl = Timeline::new().stagger(
            vec![tween("a", 100), tween("b", 100), tween("c", 100)],
            ms(50),
            Position::At(ms(200)),
        );
        let starts: Vec<f64> = tl.steps().iter().map(|s| s.start).collect();
        assert!((starts[2] - 0.3).abs() < 1e-9);
        assert!((tl.duration() - 0.4).abs() < 1e-9);
    }
}
