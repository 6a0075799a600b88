use std::fmt;

use serde::{Deserialize, Serialize};

use super::boundary::{BoundaryEnd, BoundaryExpr};
use crate::animation::HandleId;
use crate::dom::ElementId;

/// Grouping tag used for bulk teardown and conflict membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerGroup {
    Section,
    Region,
    RegionItem,
    Scene,
    Custom,
}

/// Which controller handles a trigger's callbacks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Route {
    Section(usize),
    RegionPin,
    RegionItem(usize),
    SceneScrub,
    Custom(String),
}

impl Route {
    pub fn group(&self) -> TriggerGroup {
        match self {
            Route::Section(_) => TriggerGroup::Section,
            Route::RegionPin => TriggerGroup::Region,
            Route::RegionItem(_) => TriggerGroup::RegionItem,
            Route::SceneScrub => TriggerGroup::Scene,
            Route::Custom(_) => TriggerGroup::Custom,
        }
    }
}

/// The four boundary crossings of a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    /// Crossed start moving forward
    Enter,
    /// Crossed end moving forward
    Leave,
    /// Crossed end moving backward
    EnterBack,
    /// Crossed start moving backward
    LeaveBack,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Edge::Enter => "enter",
            Edge::Leave => "leave",
            Edge::EnterBack => "enter_back",
            Edge::LeaveBack => "leave_back",
        };
        f.write_str(name)
    }
}

/// Where the driving axis sits relative to a trigger's range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Before,
    Active,
    After,
}

impl Phase {
    /// Edges fired moving from `self` to `next`, in causal order
    pub fn transition(self, next: Phase) -> &'static [Edge] {
        match (self, next) {
            (Phase::Before, Phase::Active) => &[Edge::Enter],
            (Phase::Before, Phase::After) => &[Edge::Enter, Edge::Leave],
            (Phase::Active, Phase::After) => &[Edge::Leave],
            (Phase::Active, Phase::Before) => &[Edge::LeaveBack],
            (Phase::After, Phase::Active) => &[Edge::EnterBack],
            (Phase::After, Phase::Before) => &[Edge::EnterBack, Edge::LeaveBack],
            _ => &[],
        }
    }
}

/// A scroll-bound rule
#[derive(Debug, Clone)]
pub struct Trigger {
    pub(crate) id: String,
    pub(crate) route: Route,
    pub(crate) group: TriggerGroup,
    pub(crate) element: ElementId,
    pub(crate) start: BoundaryExpr,
    pub(crate) end: BoundaryEnd,
    pub(crate) enabled: bool,
    pub(crate) pin: bool,
    pub(crate) conflicting: bool,
    pub(crate) scrub: bool,
    /// Pinned region whose internal travel drives this trigger
    pub(crate) container: Option<ElementId>,
    pub(crate) bounds: Option<(f64, f64)>,
    pub(crate) phase: Phase,
    pub(crate) last_progress: Option<f64>,
    pub(crate) handles: Vec<HandleId>,
}

impl Trigger {
    pub fn new(id: impl Into<String>, route: Route, element: ElementId) -> Self {
        let group = route.group();
        Self {
            id: id.into(),
            route,
            group,
            element,
            start: BoundaryExpr::new(super::Anchor::START, super::Anchor::END),
            end: BoundaryEnd::Expr(BoundaryExpr::new(super::Anchor::END, super::Anchor::START)),
            enabled: true,
            pin: false,
            conflicting: false,
            scrub: false,
            container: None,
            bounds: None,
            phase: Phase::Before,
            last_progress: None,
            handles: Vec::new(),
        }
    }

    pub fn start(mut self, start: BoundaryExpr) -> Self {
        self.start = start;
        self
    }

    pub fn end(mut self, end: BoundaryExpr) -> Self {
        self.end = BoundaryEnd::Expr(end);
        self
    }

    pub fn end_distance(mut self, distance: f64) -> Self {
        self.end = BoundaryEnd::Distance(distance);
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pin = true;
        self
    }

    pub fn conflicting(mut self, conflicting: bool) -> Self {
        self.conflicting = conflicting;
        self
    }

    /// Report progress through the range, not just edge crossings
    pub fn scrubbed(mut self) -> Self {
        self.scrub = true;
        self
    }

    pub fn contained_in(mut self, region: ElementId) -> Self {
        self.container = Some(region);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn tag(&self) -> TriggerGroup {
        self.group
    }

    pub fn element(&self) -> &ElementId {
        &self.element
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_pin(&self) -> bool {
        self.pin
    }

    pub fn is_conflicting(&self) -> bool {
        self.conflicting
    }

    pub fn container(&self) -> Option<&ElementId> {
        self.container.as_ref()
    }

    /// Resolved (start, end) scroll positions, if the last refresh could measure them
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.bounds
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn handles(&self) -> &[HandleId] {
        &self.handles
    }
}

/// What a trigger reported during one evaluation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Signal {
    Edge { edge: Edge },
    Progress { progress: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fired {
    pub id: String,
    pub route: Route,
    pub signal: Signal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert_eq!(Phase::Before.transition(Phase::Active), &[Edge::Enter]);
        assert_eq!(Phase::Active.transition(Phase::Before), &[Edge::LeaveBack]);
        assert_eq!(Phase::Before.transition(Phase::After), &[Edge::Enter, Edge::Leave]);
        assert_eq!(Phase::After.transition(Phase::Before), &[Edge::EnterBack, Edge::LeaveBack]);
        assert!(Phase::Active.transition(Phase::Active).is_empty());
    }

    #[test]
    fn test_route_groups() {
        assert_eq!(Route::Section(3).group(), TriggerGroup::Section);
        assert_eq!(Route::RegionPin.group(), TriggerGroup::Region);
        assert_eq!(Route::SceneScrub.group(), TriggerGroup::Scene);
    }
}
