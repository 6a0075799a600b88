//! Per-section reveal state machines
//!
//! Each section is Hidden or Revealed. Forward and backward entries use the
//! same reveal with the slide coming from the scroll direction. A section's
//! detail content only starts once the section's own reveal has completed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::animation::{
    kill_slot, AnimationEvent, EasingType, HandleId, Position, Property, Target, Timeline, Tween,
};
use crate::config::RevealConfig;
use crate::dom::ElementId;
use crate::session::EffectContext;
use crate::text::Granularity;
use crate::trigger::{BoundaryExpr, Edge, Route, Trigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealPolicy {
    /// Hide again on leave, reveal again on re-entry
    #[default]
    Reversible,
    /// Reveal on the first entry and stay revealed
    EnterOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionVisual {
    Hidden,
    Revealed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionConfig {
    pub element: ElementId,
    pub heading: Option<ElementId>,
    pub detail: Option<ElementId>,
    pub policy: RevealPolicy,
    pub start: BoundaryExpr,
    pub end: BoundaryExpr,
    pub conflicting: bool,
}

impl SectionConfig {
    pub fn trigger_id(&self) -> String {
        format!("section:{}", self.element)
    }
}

#[derive(Debug)]
struct SectionState {
    visual: SectionVisual,
    revealed_once: bool,
    /// Edge that started the current reveal
    entered_by: Option<Edge>,
    reveal: Option<HandleId>,
    detail: Option<HandleId>,
    tokens: Vec<ElementId>,
}

impl SectionState {
    fn new() -> Self {
        Self {
            visual: SectionVisual::Hidden,
            revealed_once: false,
            entered_by: None,
            reveal: None,
            detail: None,
            tokens: Vec::new(),
        }
    }
}

/// Outcome of routing one edge to a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionChange {
    pub index: usize,
    pub visual: SectionVisual,
}

#[derive(Debug)]
pub struct SectionRevealController {
    config: RevealConfig,
    sections: Vec<SectionConfig>,
    states: Vec<SectionState>,
    /// Slide distance for the current responsive tier, px
    offset: f64,
}

impl SectionRevealController {
    pub fn new(config: RevealConfig, sections: Vec<SectionConfig>) -> Self {
        let states = sections.iter().map(|_| SectionState::new()).collect();
        Self {
            config,
            sections,
            states,
            offset: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[SectionConfig] {
        &self.sections
    }

    pub fn visual(&self, index: usize) -> Option<SectionVisual> {
        self.states.get(index).map(|s| s.visual)
    }

    fn duration(&self) -> Duration {
        Duration::from_millis(self.config.duration_ms)
    }

    fn easing(&self) -> EasingType {
        self.config.easing
    }

    /// Forget handles and per-section state; the owning triggers are already gone
    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = SectionState::new();
        }
    }

    /// Put every section back to its hidden starting pose
    pub fn baseline(&mut self, cx: &mut EffectContext<'_>, offset: f64) {
        self.offset = if offset.is_finite() { offset } else { 0.0 };
        for (section, state) in self.sections.iter().zip(self.states.iter_mut()) {
            kill_slot(cx.animator, &mut state.reveal);
            kill_slot(cx.animator, &mut state.detail);
            *state = SectionState::new();

            if !cx.doc.contains(&section.element) {
                warn!(element = %section.element, "Section element missing, skipping baseline");
                continue;
            }
            let target = Target::from(&section.element);
            cx.animator.set(&target, Property::Opacity, 0.0);
            cx.animator.set(&target, Property::Y, self.offset);
            if let Some(detail) = section.detail.as_ref().filter(|d| cx.doc.contains(d)) {
                let target = Target::from(detail);
                cx.animator.set(&target, Property::Opacity, 0.0);
                cx.animator.set(&target, Property::Y, self.offset / 2.0);
            }
        }
    }

    /// Register one four-edge trigger per present section
    ///
    /// Headings are split into tokens when a splitter is available; a
    /// heading that cannot be split is revealed as part of its section.
    pub fn build_triggers(&mut self, cx: &mut EffectContext<'_>, conflicting: bool) -> usize {
        let mut built = 0;
        for (index, section) in self.sections.iter().enumerate() {
            if !cx.doc.contains(&section.element) {
                warn!(element = %section.element, "Section element missing, skipping trigger");
                continue;
            }

            let tokens = match (&section.heading, cx.splitter) {
                (Some(heading), Some(splitter)) if cx.doc.contains(heading) => {
                    match cx.splits.split(splitter, cx.doc, heading, Granularity::Chars) {
                        Ok(split) => split.tokens().to_vec(),
                        Err(e) => {
                            warn!(element = %heading, error = %e, "Heading split failed, using whole-section reveal");
                            Vec::new()
                        }
                    }
                }
                _ => Vec::new(),
            };
            for token in &tokens {
                cx.animator.set(&Target::from(token), Property::Opacity, 0.0);
            }
            self.states[index].tokens = tokens;

            let trigger = Trigger::new(section.trigger_id(), Route::Section(index), section.element.clone())
                .start(section.start)
                .end(section.end)
                .conflicting(conflicting || section.conflicting);
            cx.registry.register(trigger, cx.animator);
            built += 1;
        }
        debug!(sections = built, "Section triggers built");
        built
    }

    /// Route an edge crossing to a section
    pub fn on_edge(&mut self, index: usize, edge: Edge, cx: &mut EffectContext<'_>) -> Option<SectionChange> {
        let policy = self.sections.get(index)?.policy;
        let state = self.states.get(index)?;

        let reveal = matches!(edge, Edge::Enter | Edge::EnterBack);
        if policy == RevealPolicy::EnterOnce && (state.revealed_once || !reveal) {
            debug!(section = index, edge = %edge, "Enter-once section ignores edge");
            return None;
        }

        if reveal {
            self.reveal(index, edge, cx);
        } else {
            self.hide(index, edge, cx);
        }
        let visual = self.states[index].visual;
        info!(section = index, edge = %edge, visual = ?visual, "Section changed");
        Some(SectionChange { index, visual })
    }

    fn reveal(&mut self, index: usize, edge: Edge, cx: &mut EffectContext<'_>) {
        let duration = self.duration();
        let easing = self.easing();
        let each = Duration::from_millis(self.config.token_stagger_ms);
        // Entering from below slides up; entering from above slides down.
        let from_y = if edge == Edge::Enter { self.offset } else { -self.offset };
        let section = &self.sections[index];
        let state = &mut self.states[index];

        kill_slot(cx.animator, &mut state.detail);
        kill_slot(cx.animator, &mut state.reveal);

        let mut timeline = Timeline::new()
            .add(
                Tween::to(&section.element, Property::Opacity, 1.0)
                    .duration(duration)
                    .easing(easing),
                Position::At(Duration::ZERO),
            )
            .add(
                Tween::to(&section.element, Property::Y, 0.0)
                    .from(from_y)
                    .duration(duration)
                    .easing(easing),
                Position::WithPrevious,
            );
        if !state.tokens.is_empty() {
            let fades = state
                .tokens
                .iter()
                .map(|t| {
                    Tween::to(t, Property::Opacity, 1.0)
                        .duration(duration)
                        .easing(easing)
                })
                .collect();
            timeline = timeline.stagger(fades, each, Position::At(Duration::ZERO));
        }

        let handle = cx.animator.play(timeline, cx.now);
        cx.registry.attach_handle(&section.trigger_id(), handle);
        state.reveal = Some(handle);
        state.entered_by = Some(edge);
        state.visual = SectionVisual::Revealed;
        state.revealed_once = true;
    }

    fn hide(&mut self, index: usize, edge: Edge, cx: &mut EffectContext<'_>) {
        let duration = self.duration();
        let easing = self.easing();
        let offset = self.offset;
        let to_y = if edge == Edge::Leave { -offset } else { offset };
        let section = &self.sections[index];
        let state = &mut self.states[index];
        state.visual = SectionVisual::Hidden;
        kill_slot(cx.animator, &mut state.detail);

        // Backing out the way we came plays the reveal in reverse from where it is.
        if edge == Edge::LeaveBack && state.entered_by == Some(Edge::Enter) {
            if let Some(handle) = state.reveal.filter(|h| cx.animator.exists(*h)) {
                cx.animator.reverse(handle, cx.now);
                if let Some(detail) = &section.detail {
                    let target = Target::from(detail);
                    cx.animator.set(&target, Property::Opacity, 0.0);
                    cx.animator.set(&target, Property::Y, offset / 2.0);
                }
                return;
            }
        }

        kill_slot(cx.animator, &mut state.reveal);
        let mut timeline = Timeline::new()
            .add(
                Tween::to(&section.element, Property::Opacity, 0.0)
                    .duration(duration)
                    .easing(easing),
                Position::At(Duration::ZERO),
            )
            .add(
                Tween::to(&section.element, Property::Y, to_y)
                    .duration(duration)
                    .easing(easing),
                Position::WithPrevious,
            );
        for token in &state.tokens {
            timeline = timeline.add(Tween::to(token, Property::Opacity, 0.0), Position::At(Duration::ZERO));
        }
        if let Some(detail) = section.detail.as_ref().filter(|d| cx.doc.contains(d)) {
            timeline = timeline
                .add(
                    Tween::to(detail, Property::Opacity, 0.0)
                        .duration(duration / 2)
                        .easing(easing),
                    Position::At(Duration::ZERO),
                )
                .add(
                    Tween::to(detail, Property::Y, offset / 2.0)
                        .duration(duration / 2)
                        .easing(easing),
                    Position::WithPrevious,
                );
        }
        let handle = cx.animator.play(timeline, cx.now);
        cx.registry.attach_handle(&section.trigger_id(), handle);
        state.reveal = Some(handle);
        state.entered_by = None;
    }

    /// Start detail reveals whose section reveal just completed
    pub fn on_animation_event(&mut self, event: AnimationEvent, cx: &mut EffectContext<'_>) -> Option<usize> {
        let AnimationEvent::Completed(handle) = event else {
            return None;
        };
        let index = self
            .states
            .iter()
            .position(|s| s.reveal == Some(handle) && s.visual == SectionVisual::Revealed)?;
        let section = &self.sections[index];
        let detail = section.detail.as_ref().filter(|d| cx.doc.contains(d))?;

        let duration = Duration::from_millis(self.config.detail_duration_ms);
        let state = &mut self.states[index];
        kill_slot(cx.animator, &mut state.detail);
        let handle = cx.animator.animate_to(
            Target::from(detail),
            &[(Property::Opacity, 1.0), (Property::Y, 0.0)],
            duration,
            self.config.easing,
            cx.now,
        );
        cx.registry.attach_handle(&section.trigger_id(), handle);
        state.detail = Some(handle);
        debug!(section = index, "Detail reveal started");
        Some(index)
    }
}
