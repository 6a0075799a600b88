//! Registry of every live trigger, in registration order

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::boundary::BoundaryEnd;
use super::model::{Fired, Phase, Signal, Trigger, TriggerGroup};
use crate::animation::{Animator, HandleId};
use crate::dom::{Document, ElementId, Viewport};
use crate::{Error, Result};

/// Positions of every driving axis for one evaluation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollAxes {
    /// Page scroll offset
    pub page: f64,
    /// Internal travel of each pinned region, keyed by region element
    pub regions: BTreeMap<ElementId, f64>,
}

impl ScrollAxes {
    pub fn page(offset: f64) -> Self {
        Self {
            page: offset,
            regions: BTreeMap::new(),
        }
    }
}

/// Which triggers an evaluation pass covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Triggers driven by page scroll
    Page,
    /// Triggers driven by a pinned region's internal travel
    Contained,
}

#[derive(Debug, Default)]
pub struct TriggerRegistry {
    triggers: Vec<Trigger>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trigger; one already registered under the same id is torn down first
    pub fn register(&mut self, trigger: Trigger, animator: &mut dyn Animator) -> bool {
        let replaced = self.unregister_by_id(&trigger.id, animator);
        if replaced {
            debug!(trigger = %trigger.id, "Replaced existing trigger");
        }
        self.triggers.push(trigger);
        replaced
    }

    /// Release a trigger's animations; properties keep their interpolated values
    fn teardown(trigger: Trigger, animator: &mut dyn Animator) {
        for handle in trigger.handles {
            animator.kill(handle);
        }
    }

    fn unregister_where<F>(&mut self, animator: &mut dyn Animator, mut predicate: F) -> usize
    where
        F: FnMut(&Trigger) -> bool,
    {
        let mut removed = 0;
        let mut kept = Vec::with_capacity(self.triggers.len());
        for trigger in std::mem::take(&mut self.triggers) {
            if predicate(&trigger) {
                removed += 1;
                Self::teardown(trigger, animator);
            } else {
                kept.push(trigger);
            }
        }
        self.triggers = kept;
        removed
    }

    pub fn unregister_by_id(&mut self, id: &str, animator: &mut dyn Animator) -> bool {
        self.unregister_where(animator, |t| t.id == id) > 0
    }

    pub fn unregister_group(&mut self, group: TriggerGroup, animator: &mut dyn Animator) -> usize {
        let removed = self.unregister_where(animator, |t| t.group == group);
        debug!(group = ?group, removed, "Unregistered trigger group");
        removed
    }

    /// Tear down every trigger; safe to call on an empty registry
    pub fn unregister_all(&mut self, animator: &mut dyn Animator) -> usize {
        let removed = self.unregister_where(animator, |_| true);
        if removed > 0 {
            debug!(removed, "Unregistered all triggers");
        }
        removed
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Trigger> {
        self.triggers.iter_mut().find(|t| t.id == id)
    }

    /// Stop a trigger responding to scroll, keeping its state
    pub fn disable(&mut self, id: &str) -> bool {
        match self.find_mut(id) {
            Some(t) => {
                t.enabled = false;
                true
            }
            None => false,
        }
    }

    pub fn enable(&mut self, id: &str) -> bool {
        match self.find_mut(id) {
            Some(t) => {
                t.enabled = true;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.get(id).map(|t| t.enabled)
    }

    /// Tie an animation to a trigger so teardown stops it
    pub fn attach_handle(&mut self, id: &str, handle: HandleId) {
        if let Some(t) = self.find_mut(id) {
            t.handles.push(handle);
        }
    }

    pub fn set_end_distance(&mut self, id: &str, distance: f64) {
        if let Some(t) = self.find_mut(id) {
            t.end = BoundaryEnd::Distance(distance);
        }
    }

    fn measure(trigger: &Trigger, doc: &Document, viewport: Viewport) -> Result<(f64, f64)> {
        if !viewport.is_measurable() {
            return Err(Error::Boundary(format!(
                "viewport {}x{} cannot be measured",
                viewport.width, viewport.height
            )));
        }
        let rect = doc
            .rect(&trigger.element)
            .ok_or_else(|| Error::MissingElement(trigger.element.to_string()))?;
        let (pos, size, extent) = match &trigger.container {
            None => (rect.y, rect.height, viewport.height),
            Some(container) => {
                let outer = doc
                    .rect(container)
                    .ok_or_else(|| Error::MissingElement(container.to_string()))?;
                (rect.x - outer.x, rect.width, viewport.width)
            }
        };

        let start = trigger.start.resolve(pos, size, extent)?;
        let end = match trigger.end {
            BoundaryEnd::Expr(expr) => expr.resolve(pos, size, extent)?,
            BoundaryEnd::Distance(d) if d.is_finite() => start + d.max(0.0),
            BoundaryEnd::Distance(d) => {
                return Err(Error::Boundary(format!("non-finite distance {}", d)));
            }
        };
        Ok((start, end.max(start)))
    }

    /// Recompute every trigger's pixel range from current geometry
    ///
    /// Triggers that cannot be measured stay registered but inert until the
    /// next refresh; the first such failure is returned after all others
    /// have been refreshed.
    pub fn refresh_boundaries(&mut self, doc: &Document, viewport: Viewport) -> Result<usize> {
        let mut resolved = 0;
        let mut first_error = None;
        for trigger in &mut self.triggers {
            match Self::measure(trigger, doc, viewport) {
                Ok(bounds) => {
                    trigger.bounds = Some(bounds);
                    resolved += 1;
                }
                Err(e) => {
                    warn!(trigger = %trigger.id, error = %e, "Cannot resolve trigger boundaries");
                    trigger.bounds = None;
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(resolved),
        }
    }

    /// Evaluate the triggers covered by `pass` against the current axes
    ///
    /// Signals are returned in registration order.
    pub fn update(&mut self, axes: &ScrollAxes, pass: Pass) -> Vec<Fired> {
        let mut fired = Vec::new();
        for trigger in &mut self.triggers {
            let in_pass = match pass {
                Pass::Page => trigger.container.is_none(),
                Pass::Contained => trigger.container.is_some(),
            };
            if !in_pass || !trigger.enabled {
                continue;
            }
            let Some((start, end)) = trigger.bounds else {
                continue;
            };
            let pos = match &trigger.container {
                None => axes.page,
                Some(region) => axes.regions.get(region).copied().unwrap_or(0.0),
            };
            if !pos.is_finite() {
                continue;
            }

            let next = if pos < start {
                Phase::Before
            } else if pos > end {
                Phase::After
            } else {
                Phase::Active
            };
            for edge in trigger.phase.transition(next) {
                fired.push(Fired {
                    id: trigger.id.clone(),
                    route: trigger.route.clone(),
                    signal: Signal::Edge { edge: *edge },
                });
            }
            let changed = next != trigger.phase;
            trigger.phase = next;

            if trigger.scrub && (changed || next == Phase::Active) {
                let progress = if end > start {
                    ((pos - start) / (end - start)).clamp(0.0, 1.0)
                } else if pos >= start {
                    1.0
                } else {
                    0.0
                };
                if trigger.last_progress != Some(progress) {
                    trigger.last_progress = Some(progress);
                    fired.push(Fired {
                        id: trigger.id.clone(),
                        route: trigger.route.clone(),
                        signal: Signal::Progress { progress },
                    });
                }
            }
        }
        fired
    }

    pub fn get(&self, id: &str) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.triggers.iter().map(|t| t.id.clone()).collect()
    }

    pub fn count_group(&self, group: TriggerGroup) -> usize {
        self.triggers.iter().filter(|t| t.group == group).count()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}
