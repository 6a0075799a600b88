//! Pinned horizontal-scroll region
//!
//! While the region is pinned, page scroll is translated into horizontal
//! travel of its track and every conflicting trigger is suspended. Items in
//! the track are driven by the region's own travel, not by page scroll.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::animation::{kill_slot, EasingType, HandleId, Property, Target};
use crate::config::RegionConfig;
use crate::dom::{Document, ElementId};
use crate::session::EffectContext;
use crate::trigger::{Anchor, BoundaryExpr, Edge, Route, Trigger, TriggerRegistry};
use crate::Result;

pub const PIN_TRIGGER: &str = "region:pin";

#[derive(Debug, Clone, PartialEq)]
pub struct RegionLayout {
    /// Element pinned to the viewport
    pub element: ElementId,
    /// Content that moves horizontally inside it
    pub track: ElementId,
    pub items: Vec<ElementId>,
    pub item_start: BoundaryExpr,
    pub item_end: BoundaryExpr,
}

#[derive(Debug)]
pub struct ExclusiveRegionCoordinator {
    layout: RegionLayout,
    easing: EasingType,
    item_duration: Duration,
    budget: f64,
    progress: f64,
    active: bool,
    /// Enabled state of each suspended trigger before activation
    saved: Vec<(String, bool)>,
    items: Vec<Option<HandleId>>,
}

impl ExclusiveRegionCoordinator {
    pub fn new(layout: RegionLayout, config: &RegionConfig) -> Self {
        let items = vec![None; layout.items.len()];
        Self {
            layout,
            easing: config.easing,
            item_duration: Duration::from_millis(config.item_duration_ms),
            budget: 0.0,
            progress: 0.0,
            active: false,
            saved: Vec::new(),
            items,
        }
    }

    pub fn element(&self) -> &ElementId {
        &self.layout.element
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current horizontal travel in px
    pub fn travel(&self) -> f64 {
        self.budget * self.progress
    }

    fn item_trigger_id(item: &ElementId) -> String {
        format!("region:item:{}", item)
    }

    /// Scroll distance the region consumes: track width minus visible width
    ///
    /// Anything that cannot be measured, or content narrower than the
    /// region, yields zero.
    pub fn recompute_budget(&mut self, doc: &Document) -> f64 {
        let visible = doc.rect(&self.layout.element).map(|r| r.width);
        let content = doc.rect(&self.layout.track).map(|r| r.width);
        let budget = match (visible, content) {
            (Some(visible), Some(content)) => content - visible,
            _ => {
                warn!(region = %self.layout.element, "Region elements missing, budget is zero");
                0.0
            }
        };
        self.budget = if budget.is_finite() && budget > 0.0 {
            budget
        } else {
            if !budget.is_finite() {
                warn!(region = %self.layout.element, "Non-finite region budget, treating as zero");
            }
            0.0
        };
        debug!(region = %self.layout.element, budget = self.budget, "Region budget computed");
        self.budget
    }

    /// Register the pin trigger and one contained trigger per item
    ///
    /// A region with nothing to scroll registers nothing and shows its items.
    pub fn build_triggers(&mut self, cx: &mut EffectContext<'_>) -> usize {
        self.recompute_budget(cx.doc);
        cx.doc.set_pin_spacing(&self.layout.element, self.budget);
        self.progress = 0.0;
        cx.animator.set(&Target::from(&self.layout.track), Property::X, 0.0);

        if self.budget <= 0.0 {
            info!(region = %self.layout.element, "Region has no scroll budget, leaving it static");
            for item in self.layout.items.iter().filter(|i| cx.doc.contains(i)) {
                cx.animator.set(&Target::from(item), Property::Opacity, 1.0);
            }
            return 0;
        }

        let pin = Trigger::new(PIN_TRIGGER, Route::RegionPin, self.layout.element.clone())
            .start(BoundaryExpr::new(Anchor::START, Anchor::START))
            .end_distance(self.budget)
            .pinned()
            .scrubbed();
        cx.registry.register(pin, cx.animator);
        let mut built = 1;

        for (index, item) in self.layout.items.iter().enumerate() {
            if !cx.doc.contains(item) {
                warn!(item = %item, "Region item missing, skipping trigger");
                continue;
            }
            cx.animator.set(&Target::from(item), Property::Opacity, 0.0);
            let trigger = Trigger::new(Self::item_trigger_id(item), Route::RegionItem(index), item.clone())
                .start(self.layout.item_start)
                .end(self.layout.item_end)
                .contained_in(self.layout.element.clone());
            cx.registry.register(trigger, cx.animator);
            built += 1;
        }
        debug!(region = %self.layout.element, triggers = built, "Region triggers built");
        built
    }

    /// Re-measure after a layout change and keep travel inside the new budget
    pub fn refresh(&mut self, cx: &mut EffectContext<'_>) -> Result<()> {
        let previous = self.budget;
        self.recompute_budget(cx.doc);
        cx.doc.set_pin_spacing(&self.layout.element, self.budget);
        if cx.registry.get(PIN_TRIGGER).is_some() {
            cx.registry.set_end_distance(PIN_TRIGGER, self.budget);
        }
        if self.budget <= 0.0 {
            self.progress = 0.0;
            if self.active {
                self.deactivate(cx.registry);
            }
        }
        if previous != self.budget {
            debug!(from = previous, to = self.budget, "Region budget changed");
        }
        cx.animator.set(&Target::from(&self.layout.track), Property::X, -self.travel());
        Ok(())
    }

    /// Suspend conflicting triggers, remembering their current enabled state
    pub fn activate(&mut self, registry: &mut TriggerRegistry) -> usize {
        if self.active {
            return 0;
        }
        self.active = true;
        self.saved = registry
            .iter()
            .filter(|t| t.is_conflicting())
            .map(|t| (t.id().to_string(), t.is_enabled()))
            .collect();
        for (id, _) in &self.saved {
            registry.disable(id);
        }
        info!(region = %self.layout.element, suspended = self.saved.len(), "Region activated");
        self.saved.len()
    }

    /// Restore every suspended trigger to exactly its state before activation
    pub fn deactivate(&mut self, registry: &mut TriggerRegistry) -> usize {
        if !self.active {
            return 0;
        }
        self.active = false;
        let saved = std::mem::take(&mut self.saved);
        for (id, was_enabled) in &saved {
            if *was_enabled {
                registry.enable(id);
            } else {
                registry.disable(id);
            }
        }
        info!(region = %self.layout.element, restored = saved.len(), "Region deactivated");
        saved.len()
    }

    /// Scrub the track to a fraction of the budget
    pub fn on_progress(&mut self, progress: f64, cx: &mut EffectContext<'_>) -> f64 {
        self.progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
        let travel = self.travel();
        cx.animator.set(&Target::from(&self.layout.track), Property::X, -travel);
        travel
    }

    pub fn on_item_edge(&mut self, index: usize, edge: Edge, cx: &mut EffectContext<'_>) {
        let Some(item) = self.layout.items.get(index) else {
            return;
        };
        let opacity = match edge {
            Edge::Enter | Edge::EnterBack => 1.0,
            Edge::LeaveBack => 0.0,
            Edge::Leave => return,
        };
        let slot = &mut self.items[index];
        kill_slot(cx.animator, slot);
        let handle = cx.animator.animate_to(
            Target::from(item),
            &[(Property::Opacity, opacity)],
            self.item_duration,
            self.easing,
            cx.now,
        );
        cx.registry.attach_handle(&Self::item_trigger_id(item), handle);
        *slot = Some(handle);
    }

    /// Forget runtime state; the region's triggers are already unregistered
    pub fn reset(&mut self) {
        self.active = false;
        self.saved.clear();
        self.progress = 0.0;
        for slot in &mut self.items {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animator, Tweener};
    use crate::dom::{Element, LayoutBox, Length, Viewport};
    use crate::text::SplitRegistry;
    use std::time::Instant;

    fn doc(track_vw: f64) -> Document {
        let mut doc = Document::new();
        doc.insert(Element::new(
            "work",
            LayoutBox {
                top: Length::Vh(100.0),
                width: Length::Vw(100.0),
                height: Length::Vh(100.0),
                ..Default::default()
            },
        ));
        doc.insert(Element::new(
            "work-track",
            LayoutBox {
                top: Length::Vh(100.0),
                width: Length::Vw(track_vw),
                height: Length::Vh(100.0),
                ..Default::default()
            },
        ));
        doc.insert(Element::new(
            "card-1",
            LayoutBox {
                left: Length::Vw(150.0),
                width: Length::Vw(50.0),
                ..Default::default()
            },
        ));
        doc.reflow(Viewport::new(1000.0, 800.0));
        doc
    }

    fn coordinator() -> ExclusiveRegionCoordinator {
        ExclusiveRegionCoordinator::new(
            RegionLayout {
                element: "work".into(),
                track: "work-track".into(),
                items: vec!["card-1".into()],
                item_start: "left 85%".parse().unwrap(),
                item_end: "right 0%".parse().unwrap(),
            },
            &RegionConfig::default(),
        )
    }

    fn cx<'a>(
        doc: &'a mut Document,
        tw: &'a mut Tweener,
        registry: &'a mut TriggerRegistry,
        splits: &'a mut SplitRegistry,
    ) -> EffectContext<'a> {
        EffectContext {
            doc,
            animator: tw,
            splitter: None,
            registry,
            splits,
            now: Instant::now(),
        }
    }

    #[test]
    fn test_budget_from_track_width() {
        let mut c = coordinator();
        assert_eq!(c.recompute_budget(&doc(300.0)), 2000.0);
    }

    #[test]
    fn test_narrow_content_is_noop() {
        let (mut d, mut tw, mut reg, mut splits) = (doc(80.0), Tweener::new(), TriggerRegistry::new(), SplitRegistry::new());
        let mut c = coordinator();
        assert_eq!(c.build_triggers(&mut cx(&mut d, &mut tw, &mut reg, &mut splits)), 0);
        assert_eq!(c.budget(), 0.0);
        assert_eq!(d.pin_spacing(), 0.0);
        assert!(reg.is_empty());
        assert_eq!(c.on_progress(f64::NAN, &mut cx(&mut d, &mut tw, &mut reg, &mut splits)), 0.0);
        assert_eq!(tw.value(&Target::from(&ElementId::new("card-1")), Property::Opacity), 1.0);
    }

    #[test]
    fn test_missing_track_is_zero_budget() {
        let mut d = doc(300.0);
        d.remove(&"work-track".into());
        let mut c = coordinator();
        assert_eq!(c.recompute_budget(&d), 0.0);
    }

    #[test]
    fn test_activation_restores_exact_states() {
        let mut tw = Tweener::new();
        let mut reg = TriggerRegistry::new();
        reg.register(Trigger::new("a", Route::Section(0), "x".into()).conflicting(true), &mut tw);
        reg.register(Trigger::new("b", Route::Section(1), "y".into()).conflicting(true), &mut tw);
        reg.register(Trigger::new("c", Route::Section(2), "z".into()), &mut tw);
        reg.disable("b");

        let mut c = coordinator();
        assert_eq!(c.activate(&mut reg), 2);
        assert_eq!(reg.is_enabled("a"), Some(false));
        assert_eq!(reg.is_enabled("c"), Some(true));
        assert_eq!(c.activate(&mut reg), 0);

        assert_eq!(c.deactivate(&mut reg), 2);
        assert_eq!(reg.is_enabled("a"), Some(true));
        assert_eq!(reg.is_enabled("b"), Some(false));
        assert_eq!(c.deactivate(&mut reg), 0);
    }

    #[test]
    fn test_build_and_scrub() {
        let (mut d, mut tw, mut reg, mut splits) = (doc(300.0), Tweener::new(), TriggerRegistry::new(), SplitRegistry::new());
        let mut c = coordinator();
        assert_eq!(c.build_triggers(&mut cx(&mut d, &mut tw, &mut reg, &mut splits)), 2);
        assert!(reg.get(PIN_TRIGGER).unwrap().is_pin());
        assert_eq!(d.pin_spacing(), 2000.0);
        assert_eq!(d.max_scroll(Viewport::new(1000.0, 800.0)), 2800.0);
        assert_eq!(reg.get("region:item:card-1").unwrap().container(), Some(&ElementId::new("work")));

        assert_eq!(c.on_progress(0.25, &mut cx(&mut d, &mut tw, &mut reg, &mut splits)), 500.0);
        assert_eq!(tw.value(&Target::from(&ElementId::new("work-track")), Property::X), -500.0);
        assert_eq!(c.on_progress(4.0, &mut cx(&mut d, &mut tw, &mut reg, &mut splits)), 2000.0);
    }

    #[test]
    fn test_refresh_shrinks_budget_and_travel() {
        let (mut d, mut tw, mut reg, mut splits) = (doc(300.0), Tweener::new(), TriggerRegistry::new(), SplitRegistry::new());
        let mut c = coordinator();
        c.build_triggers(&mut cx(&mut d, &mut tw, &mut reg, &mut splits));
        c.on_progress(0.5, &mut cx(&mut d, &mut tw, &mut reg, &mut splits));

        d.reflow(Viewport::new(500.0, 800.0));
        c.refresh(&mut cx(&mut d, &mut tw, &mut reg, &mut splits)).unwrap();
        assert_eq!(c.budget(), 1000.0);
        assert_eq!(d.pin_spacing(), 1000.0);
        assert_eq!(c.travel(), 500.0);
        assert_eq!(tw.value(&Target::from(&ElementId::new("work-track")), Property::X), -500.0);
    }
}
