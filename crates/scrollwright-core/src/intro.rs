//! One-time intro sequence
//!
//! `Idle → LoadingAssets → RevealingBranding → RevealingHeadline →
//! RevealingScene → Complete`. Stages advance on animation completion, so
//! the ordering lives in this state machine rather than in nested
//! callbacks. Scroll is held locked from `LoadingAssets` until `Complete`.
//!
//! Every failure path still reaches `Complete`: an asset failure or asset
//! timeout plays the remaining stages with instant visuals, a missing
//! element skips its stage's effect, and a stage overrunning its budget is
//! forced to its final values.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::animation::{
    kill_slot, AnimationEvent, EasingType, HandleId, Position, Property, Target, Timeline, Tween,
};
use crate::animation::timing::deadline_after;
use crate::capabilities::SceneStatus;
use crate::config::IntroConfig;
use crate::dom::ElementId;
use crate::gate::{ScrollGate, ScrollLock};
use crate::scene::Vec3;
use crate::session::EffectContext;
use crate::text::Granularity;

/// Slide distance for intro elements, px
const INTRO_SLIDE: f64 = 24.0;

fn show(cx: &mut EffectContext<'_>, element: &ElementId) {
    let target = Target::from(element);
    cx.animator.set(&target, Property::Opacity, 1.0);
    cx.animator.set(&target, Property::Y, 0.0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntroState {
    Idle,
    LoadingAssets,
    RevealingBranding,
    RevealingHeadline,
    RevealingScene,
    Complete,
}

impl IntroState {
    /// States during which scroll must stay suppressed
    pub fn is_gating(self) -> bool {
        !matches!(self, IntroState::Idle | IntroState::Complete)
    }
}

/// Scene object revealed by the intro and where it should end up
#[derive(Debug, Clone, PartialEq)]
pub struct SceneCue {
    pub object: String,
    pub scale: f64,
    pub position: Vec3,
}

/// The elements the intro animates
#[derive(Debug, Clone, Default)]
pub struct IntroCast {
    pub branding: Option<ElementId>,
    pub headline: Option<ElementId>,
    pub granularity: Granularity,
    pub scene: Option<SceneCue>,
}

#[derive(Debug)]
struct StageRun {
    handle: Option<HandleId>,
    deadline: Instant,
}

#[derive(Debug)]
pub struct IntroSequencer {
    config: IntroConfig,
    easing: EasingType,
    state: IntroState,
    lock: Option<ScrollLock>,
    asset_deadline: Option<Instant>,
    stage: Option<StageRun>,
    /// Remaining stages play with instant visuals
    degraded: bool,
    reveal_scene: bool,
}

impl IntroSequencer {
    pub fn new(config: IntroConfig, easing: EasingType) -> Self {
        Self {
            config,
            easing,
            state: IntroState::Idle,
            lock: None,
            asset_deadline: None,
            stage: None,
            degraded: false,
            reveal_scene: false,
        }
    }

    pub fn state(&self) -> IntroState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == IntroState::Complete
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Earliest instant at which `poll` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.asset_deadline, self.stage.as_ref().map(|s| s.deadline)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Start the sequence on page-ready; later calls are ignored
    pub fn begin(&mut self, gate: &ScrollGate, cx: &mut EffectContext<'_>, cast: &IntroCast) -> Vec<IntroState> {
        if self.state != IntroState::Idle {
            debug!(state = ?self.state, "Intro already started");
            return Vec::new();
        }
        self.lock = Some(gate.lock());
        self.asset_deadline = Some(deadline_after(cx.now, self.config.asset_timeout()));

        for element in [&cast.branding, &cast.headline].into_iter().flatten() {
            if cx.doc.contains(element) {
                let target = Target::from(element);
                cx.animator.set(&target, Property::Opacity, 0.0);
                cx.animator.set(&target, Property::Y, INTRO_SLIDE);
            }
        }

        self.state = IntroState::LoadingAssets;
        info!("Intro started, waiting for assets");
        vec![IntroState::LoadingAssets]
    }

    /// Assets finished loading, failed, or were never requested
    pub fn assets_settled(
        &mut self,
        status: SceneStatus,
        cx: &mut EffectContext<'_>,
        cast: &IntroCast,
    ) -> Vec<IntroState> {
        if self.state != IntroState::LoadingAssets {
            debug!(state = ?self.state, status = ?status, "Asset result ignored outside LoadingAssets");
            return Vec::new();
        }
        self.asset_deadline = None;
        match status {
            SceneStatus::Failed | SceneStatus::Pending => {
                warn!(status = ?status, "Intro assets unavailable, continuing with instant visuals");
                self.degraded = true;
            }
            _ => {}
        }
        self.reveal_scene = status == SceneStatus::Ready && cast.scene.is_some();

        let mut entered = Vec::new();
        self.enter(IntroState::RevealingBranding, cx, cast, &mut entered);
        entered
    }

    /// Feed animator completions; the current stage ends when its handle completes
    pub fn on_animation_event(
        &mut self,
        event: AnimationEvent,
        cx: &mut EffectContext<'_>,
        cast: &IntroCast,
    ) -> Vec<IntroState> {
        let AnimationEvent::Completed(handle) = event else {
            return Vec::new();
        };
        let ours = self
            .stage
            .as_ref()
            .map(|s| s.handle == Some(handle))
            .unwrap_or(false);
        if !ours {
            return Vec::new();
        }
        self.stage = None;
        let mut entered = Vec::new();
        let next = self.next_after(self.state);
        self.enter(next, cx, cast, &mut entered);
        entered
    }

    /// Enforce the asset timeout and per-stage time budgets
    pub fn poll(&mut self, cx: &mut EffectContext<'_>, cast: &IntroCast) -> Vec<IntroState> {
        if let Some(deadline) = self.asset_deadline {
            if cx.now >= deadline {
                warn!(
                    timeout_ms = self.config.asset_timeout_ms,
                    "Intro assets timed out"
                );
                return self.assets_settled(SceneStatus::Failed, cx, cast);
            }
        }

        let overrun = self
            .stage
            .as_ref()
            .map(|s| cx.now >= s.deadline)
            .unwrap_or(false);
        if overrun {
            warn!(stage = ?self.state, "Intro stage overran its budget, forcing it forward");
            if let Some(mut run) = self.stage.take() {
                kill_slot(cx.animator, &mut run.handle);
            }
            self.apply_final(self.state, cx, cast);
            let mut entered = Vec::new();
            let next = self.next_after(self.state);
            self.enter(next, cx, cast, &mut entered);
            return entered;
        }
        Vec::new()
    }

    /// Stop the sequence and lift scroll suppression without completing
    pub fn abort(&mut self, cx: &mut EffectContext<'_>) {
        if let Some(mut run) = self.stage.take() {
            kill_slot(cx.animator, &mut run.handle);
        }
        self.asset_deadline = None;
        if self.lock.take().is_some() {
            info!(state = ?self.state, "Intro aborted");
        }
    }

    fn next_after(&self, state: IntroState) -> IntroState {
        match state {
            IntroState::Idle => IntroState::LoadingAssets,
            IntroState::LoadingAssets => IntroState::RevealingBranding,
            IntroState::RevealingBranding => IntroState::RevealingHeadline,
            IntroState::RevealingHeadline if self.reveal_scene => IntroState::RevealingScene,
            IntroState::RevealingHeadline | IntroState::RevealingScene | IntroState::Complete => {
                IntroState::Complete
            }
        }
    }

    fn enter(
        &mut self,
        mut state: IntroState,
        cx: &mut EffectContext<'_>,
        cast: &IntroCast,
        entered: &mut Vec<IntroState>,
    ) {
        loop {
            self.state = state;
            entered.push(state);
            info!(stage = ?state, degraded = self.degraded, "Intro stage");

            if state == IntroState::Complete {
                self.stage = None;
                self.asset_deadline = None;
                self.lock = None;
                return;
            }

            if self.degraded {
                self.apply_final(state, cx, cast);
            } else if let Some(run) = self.start_stage(state, cx, cast) {
                self.stage = Some(run);
                return;
            }
            state = self.next_after(state);
        }
    }

    /// Play the stage's animation, or `None` when it has nothing to animate
    fn start_stage(&mut self, state: IntroState, cx: &mut EffectContext<'_>, cast: &IntroCast) -> Option<StageRun> {
        let (timeline, budget) = match state {
            IntroState::RevealingBranding => self.branding_timeline(cx, cast)?,
            IntroState::RevealingHeadline => self.headline_timeline(cx, cast)?,
            IntroState::RevealingScene => self.scene_timeline(cast)?,
            _ => return None,
        };
        let handle = cx.animator.play(timeline, cx.now);
        Some(StageRun {
            handle: Some(handle),
            deadline: deadline_after(cx.now, budget.saturating_add(self.config.stage_grace())),
        })
    }

    fn present(cx: &EffectContext<'_>, element: Option<&ElementId>, stage: &str) -> Option<ElementId> {
        let element = element?;
        if cx.doc.contains(element) {
            Some(element.clone())
        } else {
            warn!(element = %element, stage, "Intro element missing, skipping effect");
            None
        }
    }

    fn branding_timeline(&self, cx: &EffectContext<'_>, cast: &IntroCast) -> Option<(Timeline, Duration)> {
        let branding = Self::present(cx, cast.branding.as_ref(), "branding")?;
        let duration = Duration::from_millis(self.config.branding_duration_ms);
        let timeline = Timeline::new()
            .add(
                Tween::to(&branding, Property::Opacity, 1.0)
                    .duration(duration)
                    .easing(self.easing),
                Position::At(Duration::ZERO),
            )
            .add(
                Tween::to(&branding, Property::Y, 0.0)
                    .duration(duration)
                    .easing(self.easing),
                Position::WithPrevious,
            );
        Some((timeline, duration))
    }

    fn headline_timeline(&self, cx: &mut EffectContext<'_>, cast: &IntroCast) -> Option<(Timeline, Duration)> {
        let headline = Self::present(cx, cast.headline.as_ref(), "headline")?;
        let duration = Duration::from_millis(self.config.headline_duration_ms);

        let tokens = match cx.splitter {
            Some(splitter) => match cx.splits.split(splitter, cx.doc, &headline, cast.granularity) {
                Ok(split) => split.tokens().to_vec(),
                Err(e) => {
                    warn!(element = %headline, error = %e, "Headline split failed, fading whole element");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if tokens.is_empty() {
            let timeline = Timeline::new()
                .add(
                    Tween::to(&headline, Property::Opacity, 1.0)
                        .duration(duration)
                        .easing(self.easing),
                    Position::At(Duration::ZERO),
                )
                .add(
                    Tween::to(&headline, Property::Y, 0.0)
                        .duration(duration)
                        .easing(self.easing),
                    Position::WithPrevious,
                );
            return Some((timeline, duration));
        }

        // The container becomes visible at once; its tokens carry the motion.
        cx.animator.set(&Target::from(&headline), Property::Y, 0.0);
        let each = Duration::from_millis(self.config.token_stagger_ms);
        let fades = tokens
            .iter()
            .map(|t| {
                Tween::to(t, Property::Opacity, 1.0)
                    .from(0.0)
                    .duration(duration)
                    .easing(self.easing)
            })
            .collect();
        let lifts = tokens
            .iter()
            .map(|t| {
                Tween::to(t, Property::Y, 0.0)
                    .from(INTRO_SLIDE)
                    .duration(duration)
                    .easing(self.easing)
            })
            .collect();
        let timeline = Timeline::new()
            .add(Tween::to(&headline, Property::Opacity, 1.0), Position::At(Duration::ZERO))
            .stagger(fades, each, Position::At(Duration::ZERO))
            .stagger(lifts, each, Position::At(Duration::ZERO));
        let budget = Duration::from_secs_f64(timeline.duration());
        Some((timeline, budget))
    }

    fn scene_timeline(&self, cast: &IntroCast) -> Option<(Timeline, Duration)> {
        let cue = cast.scene.as_ref()?;
        let target = Target::SceneObject(cue.object.clone());
        let duration = Duration::from_millis(self.config.scene_duration_ms);
        let timeline = Timeline::new()
            .add(Tween::to(target.clone(), Property::Visible, 1.0), Position::At(Duration::ZERO))
            .add(
                Tween::to(target.clone(), Property::Scale, cue.scale)
                    .from(0.0)
                    .duration(duration)
                    .easing(self.easing),
                Position::WithPrevious,
            )
            .add(
                Tween::to(target.clone(), Property::PositionX, cue.position.x)
                    .duration(duration)
                    .easing(self.easing),
                Position::WithPrevious,
            )
            .add(
                Tween::to(target, Property::PositionY, cue.position.y)
                    .duration(duration)
                    .easing(self.easing),
                Position::WithPrevious,
            );
        Some((timeline, duration))
    }

    /// Jump a stage's elements straight to their revealed values
    fn apply_final(&self, state: IntroState, cx: &mut EffectContext<'_>, cast: &IntroCast) {
        match state {
            IntroState::RevealingBranding => {
                if let Some(branding) = Self::present(cx, cast.branding.as_ref(), "branding") {
                    show(cx, &branding);
                }
            }
            IntroState::RevealingHeadline => {
                if let Some(headline) = Self::present(cx, cast.headline.as_ref(), "headline") {
                    show(cx, &headline);
                    let tokens = cx
                        .splits
                        .get(&headline)
                        .map(|s| s.tokens().to_vec())
                        .unwrap_or_default();
                    for token in &tokens {
                        show(cx, token);
                    }
                }
            }
            IntroState::RevealingScene => {
                if let Some(cue) = &cast.scene {
                    let target = Target::SceneObject(cue.object.clone());
                    cx.animator.set(&target, Property::Visible, 1.0);
                    cx.animator.set(&target, Property::Scale, cue.scale);
                    cx.animator.set(&target, Property::PositionX, cue.position.x);
                    cx.animator.set(&target, Property::PositionY, cue.position.y);
                }
            }
            _ => {}
        }
    }
}
