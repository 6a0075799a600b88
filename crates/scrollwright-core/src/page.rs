//! A page: the document, its animation surface, and every controller wired together
//!
//! `Page` is driven entirely by its caller: host events (`on_ready`,
//! `on_scroll`, `on_input`, `on_resize`, `teardown`), asynchronous results
//! (`on_scene_loaded`), and the clock (`tick`). Every entry point takes the
//! current instant so the same page runs under a real frame loop or a
//! scripted simulation.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::animation::{Animator, Property, Target, Tweener};
use crate::capabilities::{Capabilities, SceneStatus};
use crate::config::AppConfig;
use crate::content::{self, ContentLoader};
use crate::dom::{Document, ElementId, Viewport};
use crate::event::EngineEvent;
use crate::gate::{InputDisposition, InputEvent, ScrollGate, ScrollKey};
use crate::intro::{IntroCast, IntroSequencer, IntroState, SceneCue};
use crate::manifest::PageManifest;
use crate::region::ExclusiveRegionCoordinator;
use crate::resize::{run_rebuild, RebuildReport, RebuildStep, ResizeRebuildController};
use crate::responsive::{ModeDecision, ResponsiveMode, ResponsiveModeSwitcher};
use crate::reveal::SectionRevealController;
use crate::scene::{self, seed_from_scene, Scene, SceneObject};
use crate::session::{AnimationSession, EffectContext};
use crate::text::{GraphemeSplitter, SplitRegistry, TextSplitter};
use crate::trigger::{
    Anchor, BoundaryExpr, Edge, Fired, Pass, Route, ScrollAxes, Signal, Trigger, TriggerGroup,
    TriggerRegistry,
};
use crate::{Error, Result};

/// Id of the trigger that scrubs the scene object's rotation
pub const SCENE_TRIGGER: &str = "scene:scroll";

/// Fraction of the viewport a page key scrolls
const PAGE_STEP: f64 = 0.9;
/// Distance an arrow key scrolls, px
const LINE_STEP: f64 = 40.0;

fn send_event(tx: &Option<mpsc::UnboundedSender<EngineEvent>>, event: EngineEvent) {
    if let Some(ref tx) = tx {
        if tx.send(event).is_err() {
            warn!("Failed to send engine event: receiver dropped");
        }
    }
}

/// The parts of a page that effects write to
struct Surface {
    doc: Document,
    animator: Box<dyn Animator>,
    splitter: Option<Box<dyn TextSplitter>>,
    session: AnimationSession,
    scene: Option<Box<dyn Scene>>,
}

impl Surface {
    fn cx(&mut self, now: Instant) -> EffectContext<'_> {
        EffectContext {
            doc: &mut self.doc,
            animator: self.animator.as_mut(),
            splitter: self.splitter.as_deref(),
            registry: &mut self.session.registry,
            splits: &mut self.session.splits,
            now,
        }
    }
}

/// Assembles a `Page`, detecting capabilities once
pub struct PageBuilder {
    config: Arc<AppConfig>,
    manifest: PageManifest,
    viewport: Option<Viewport>,
    animator: Option<Box<dyn Animator>>,
    splitter: Option<Box<dyn TextSplitter>>,
    scene_loader: bool,
    event_tx: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl PageBuilder {
    pub fn new(config: Arc<AppConfig>, manifest: PageManifest) -> Self {
        Self {
            config,
            manifest,
            viewport: None,
            animator: Some(Box::new(Tweener::new())),
            splitter: Some(Box::new(GraphemeSplitter)),
            scene_loader: false,
            event_tx: None,
        }
    }

    /// Override the manifest's viewport
    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// `None` when the host cannot animate; visuals then jump to their final values
    pub fn animator(mut self, animator: Option<Box<dyn Animator>>) -> Self {
        self.animator = animator;
        self
    }

    pub fn text_splitter(mut self, splitter: Option<Box<dyn TextSplitter>>) -> Self {
        self.splitter = splitter;
        self
    }

    /// Whether a scene will be loaded for this page
    pub fn scene_loader(mut self, present: bool) -> Self {
        self.scene_loader = present;
        self
    }

    pub fn event_sender(mut self, tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn build(self) -> Result<Page> {
        self.manifest.validate()?;
        let viewport = self.viewport.unwrap_or(self.manifest.viewport);
        if !viewport.is_measurable() {
            return Err(Error::Config(format!(
                "viewport {}x{} is not measurable",
                viewport.width, viewport.height
            )));
        }

        let doc = Document::from_specs(&self.manifest.elements, viewport)?;
        let sections = self.manifest.section_configs(&self.config)?;
        let region = self
            .manifest
            .region_layout(&self.config)?
            .map(|layout| ExclusiveRegionCoordinator::new(layout, &self.config.region));
        let capabilities = Capabilities::detect(
            self.animator.is_some(),
            self.splitter.is_some(),
            self.scene_loader,
        );
        let animator: Box<dyn Animator> = match self.animator {
            Some(animator) => animator,
            None => Box::new(Tweener::instant()),
        };

        let config = self.config;
        info!(
            title = self.manifest.title.as_deref().unwrap_or("untitled"),
            width = viewport.width,
            height = viewport.height,
            sections = sections.len(),
            region = region.is_some(),
            "Page assembled"
        );

        Ok(Page {
            surface: Surface {
                doc,
                animator,
                splitter: self.splitter,
                session: AnimationSession::new(),
                scene: None,
            },
            intro: IntroSequencer::new(config.intro.clone(), config.animation.easing),
            reveal: SectionRevealController::new(config.reveal.clone(), sections),
            region,
            switcher: ResponsiveModeSwitcher::new(&config.breakpoints),
            resize: ResizeRebuildController::new(config.resize.debounce()),
            gate: ScrollGate::new(),
            capabilities,
            scene_expected: self.scene_loader,
            scene_object: None,
            viewport,
            scroll: 0.0,
            steady: false,
            event_tx: self.event_tx,
            manifest: self.manifest,
            config,
        })
    }
}

pub struct Page {
    config: Arc<AppConfig>,
    manifest: PageManifest,
    surface: Surface,
    intro: IntroSequencer,
    reveal: SectionRevealController,
    region: Option<ExclusiveRegionCoordinator>,
    switcher: ResponsiveModeSwitcher,
    resize: ResizeRebuildController,
    gate: ScrollGate,
    capabilities: Capabilities,
    scene_expected: bool,
    /// Scene object found in the loaded scene and seeded into the animator
    scene_object: Option<String>,
    viewport: Viewport,
    scroll: f64,
    /// Intro done and steady-state triggers live
    steady: bool,
    event_tx: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl Page {
    pub fn builder(config: Arc<AppConfig>, manifest: PageManifest) -> PageBuilder {
        PageBuilder::new(config, manifest)
    }

    fn emit(&self, event: EngineEvent) {
        send_event(&self.event_tx, event);
    }

    fn soft_failure(&self, source: &str, error: &Error) {
        warn!(source, error = %error, "Continuing after soft failure");
        self.emit(EngineEvent::SoftFailure {
            source: source.to_string(),
            message: error.to_string(),
        });
    }

    fn intro_cast(&self) -> IntroCast {
        let targets = self.switcher.derive_targets(self.viewport);
        IntroCast {
            branding: self.manifest.intro.branding.clone().map(ElementId::new),
            headline: self.manifest.intro.headline.clone().map(ElementId::new),
            granularity: self.manifest.intro.granularity,
            scene: self.scene_object.clone().map(|object| SceneCue {
                object,
                scale: targets.scene_scale,
                position: targets.scene_position,
            }),
        }
    }

    // Lifecycle

    /// Load shared fragments into the document; failures are reported and skipped
    pub async fn inject_fragments(&mut self, loader: &dyn ContentLoader) -> usize {
        if self.manifest.fragments.is_empty() {
            return 0;
        }
        let failures =
            content::inject_fragments(loader, &self.manifest.fragments, &mut self.surface.doc).await;
        for error in &failures {
            self.soft_failure("content", error);
        }
        failures.len()
    }

    /// Page-ready: start the intro; returns false if it had already started
    pub fn on_ready(&mut self, now: Instant) -> bool {
        if self.intro.state() != IntroState::Idle {
            debug!(state = ?self.intro.state(), "Page already started");
            return false;
        }
        let cast = self.intro_cast();
        let stages = self.intro.begin(&self.gate, &mut self.surface.cx(now), &cast);
        self.after_intro(stages, now);

        if self.capabilities.scene == SceneStatus::Unavailable {
            let stages =
                self.intro
                    .assets_settled(SceneStatus::Unavailable, &mut self.surface.cx(now), &cast);
            self.after_intro(stages, now);
        }
        true
    }

    /// Deliver a scene load result tagged with the session that requested it
    ///
    /// Results for a torn-down session are dropped; returns whether it was applied.
    pub fn on_scene_loaded(&mut self, session: Uuid, result: Result<Box<dyn Scene>>, now: Instant) -> bool {
        if !self.surface.session.is_current(session) {
            debug!(
                stale = %session,
                current = %self.surface.session.id(),
                "Dropping scene load for a torn-down session"
            );
            return false;
        }
        match result {
            Ok(scene) => self.install_scene(scene, now),
            Err(e) => {
                self.capabilities.scene = SceneStatus::Failed;
                self.soft_failure("scene", &e);
                let cast = self.intro_cast();
                let stages =
                    self.intro
                        .assets_settled(SceneStatus::Failed, &mut self.surface.cx(now), &cast);
                self.after_intro(stages, now);
            }
        }
        true
    }

    fn install_scene(&mut self, mut scene: Box<dyn Scene>, now: Instant) {
        scene.resize(self.viewport);
        let mut object = self.manifest.scene.as_ref().map(|s| s.object.clone());
        if let Some(name) = &object {
            if !seed_from_scene(scene.as_mut(), self.surface.animator.as_mut(), name) {
                warn!(object = %name, "Scene object not found, scene effects disabled");
                object = None;
            }
        }
        self.capabilities.scene = SceneStatus::Ready;
        self.surface.scene = Some(scene);
        self.scene_object = object;
        info!(object = ?self.scene_object, "Scene ready");
        self.emit(EngineEvent::SceneLoaded);

        if let Some(name) = self.scene_object.clone() {
            let target = Target::SceneObject(name);
            if self.intro.state() == IntroState::LoadingAssets {
                // Hidden until the intro reveals it
                self.surface.animator.set(&target, Property::Visible, 0.0);
                self.surface.animator.set(&target, Property::Scale, 0.0);
            } else if self.intro.is_complete() {
                self.surface.animator.set(&target, Property::Visible, 1.0);
                self.apply_scene_targets();
            }
        }

        let cast = self.intro_cast();
        let stages = self
            .intro
            .assets_settled(SceneStatus::Ready, &mut self.surface.cx(now), &cast);
        self.after_intro(stages, now);
        self.sync_scene();
    }

    /// Tear the page down for navigation; returns the new session id
    ///
    /// Everything the page registered is released, scroll suppression is
    /// lifted, and asynchronous results for the old session become stale.
    /// A later `on_ready` runs the intro again.
    pub fn teardown(&mut self, now: Instant) -> Uuid {
        self.intro.abort(&mut self.surface.cx(now));
        self.resize.cancel();
        self.reveal.reset();
        if let Some(region) = self.region.as_mut() {
            region.reset();
        }
        let session = self
            .surface
            .session
            .renew(self.surface.animator.as_mut(), &mut self.surface.doc);

        self.intro = IntroSequencer::new(self.config.intro.clone(), self.config.animation.easing);
        self.switcher = ResponsiveModeSwitcher::new(&self.config.breakpoints);
        self.surface.scene = None;
        self.scene_object = None;
        self.capabilities.scene = if self.scene_expected {
            SceneStatus::Pending
        } else {
            SceneStatus::Unavailable
        };
        self.steady = false;
        self.scroll = 0.0;
        info!(session = %session, "Page torn down");
        session
    }

    fn after_intro(&mut self, stages: Vec<IntroState>, now: Instant) {
        for stage in stages {
            self.emit(EngineEvent::IntroStage { stage });
            if stage == IntroState::Complete {
                self.on_intro_complete(now);
            }
        }
    }

    fn on_intro_complete(&mut self, now: Instant) {
        self.reset_scroll();
        self.switch_mode_if_needed(now);
        self.steady = true;
        self.evaluate(now);
        info!(
            mode = ?self.switcher.current(),
            triggers = self.surface.session.registry.len(),
            "Page is steady"
        );
    }

    // Scroll

    /// Host-reported scroll position
    pub fn on_scroll(&mut self, offset: f64, now: Instant) -> InputDisposition {
        self.on_input(InputEvent::Scroll { offset }, now)
    }

    /// Scroll-producing input; discarded while the intro holds the gate
    pub fn on_input(&mut self, event: InputEvent, now: Instant) -> InputDisposition {
        if self.gate.filter(&event) == InputDisposition::Suppressed {
            return InputDisposition::Suppressed;
        }
        let page = self.viewport.height * PAGE_STEP;
        let target = match event {
            InputEvent::Wheel { delta_y } | InputEvent::TouchMove { delta_y } => self.scroll + delta_y,
            InputEvent::Key { key } => match key {
                ScrollKey::Space | ScrollKey::PageDown => self.scroll + page,
                ScrollKey::PageUp => self.scroll - page,
                ScrollKey::ArrowDown => self.scroll + LINE_STEP,
                ScrollKey::ArrowUp => self.scroll - LINE_STEP,
                ScrollKey::Home => 0.0,
                ScrollKey::End => self.max_scroll(),
            },
            InputEvent::Scroll { offset } => offset,
        };
        self.scroll_to(target, now);
        InputDisposition::Passed
    }

    fn scroll_to(&mut self, offset: f64, now: Instant) {
        if !offset.is_finite() {
            warn!(offset, "Ignoring non-finite scroll offset");
            return;
        }
        self.scroll = offset.clamp(0.0, self.max_scroll());
        self.evaluate(now);
    }

    pub fn max_scroll(&self) -> f64 {
        self.surface.doc.max_scroll(self.viewport)
    }

    fn reset_scroll(&mut self) {
        self.scroll = 0.0;
        self.emit(EngineEvent::ScrollReset {
            discarded: self.gate.discarded(),
        });
    }

    /// Evaluate every trigger against the current scroll and route what fired
    ///
    /// Page-scroll triggers go first so a region scrubbed in this pass has
    /// its new travel when the contained triggers are evaluated.
    fn evaluate(&mut self, now: Instant) {
        if !self.steady {
            return;
        }
        let fired = self
            .surface
            .session
            .registry
            .update(&ScrollAxes::page(self.scroll), Pass::Page);
        if self.dispatch(fired, now) {
            // Triggers the region just restored catch up with this scroll position.
            let fired = self
                .surface
                .session
                .registry
                .update(&ScrollAxes::page(self.scroll), Pass::Page);
            self.dispatch(fired, now);
        }

        if let Some(region) = &self.region {
            let mut axes = ScrollAxes::page(self.scroll);
            axes.regions.insert(region.element().clone(), region.travel());
            let fired = self.surface.session.registry.update(&axes, Pass::Contained);
            self.dispatch(fired, now);
        }
        self.sync_scene();
    }

    /// Route fired triggers, returning whether any suspended trigger was restored
    fn dispatch(&mut self, fired: Vec<Fired>, now: Instant) -> bool {
        let mut restored = false;
        for Fired { id, route, signal } in fired {
            debug!(trigger = %id, signal = ?signal, "Trigger fired");
            self.emit(EngineEvent::TriggerFired {
                trigger: id,
                signal: signal.clone(),
            });
            match (route, signal) {
                (Route::Section(index), Signal::Edge { edge }) => {
                    let change = self.reveal.on_edge(index, edge, &mut self.surface.cx(now));
                    if let Some(change) = change {
                        self.emit(EngineEvent::SectionChanged {
                            index: change.index,
                            visual: change.visual,
                        });
                    }
                }
                (Route::RegionPin, Signal::Edge { edge }) => restored |= self.on_region_edge(edge),
                (Route::RegionPin, Signal::Progress { progress }) => {
                    if let Some(region) = self.region.as_mut() {
                        region.on_progress(progress, &mut self.surface.cx(now));
                    }
                }
                (Route::RegionItem(index), Signal::Edge { edge }) => {
                    if let Some(region) = self.region.as_mut() {
                        region.on_item_edge(index, edge, &mut self.surface.cx(now));
                    }
                }
                (Route::SceneScrub, Signal::Progress { progress }) => self.on_scene_progress(progress),
                _ => {}
            }
        }
        restored
    }

    fn on_region_edge(&mut self, edge: Edge) -> bool {
        let Some(region) = self.region.as_mut() else {
            return false;
        };
        let registry = &mut self.surface.session.registry;
        let (event, restored) = match edge {
            Edge::Enter | Edge::EnterBack => {
                let suspended = region.activate(registry);
                (EngineEvent::RegionActivated { suspended }, false)
            }
            Edge::Leave | Edge::LeaveBack => {
                let restored = region.deactivate(registry);
                (EngineEvent::RegionDeactivated { restored }, restored > 0)
            }
        };
        self.emit(event);
        restored
    }

    fn on_scene_progress(&mut self, progress: f64) {
        if !self.intro.is_complete() {
            return;
        }
        if let Some(name) = &self.scene_object {
            let target = Target::SceneObject(name.clone());
            self.surface.animator.set(&target, Property::RotationY, progress * TAU);
        }
    }

    // Clock

    /// Advance animations and run whatever became due
    pub fn tick(&mut self, now: Instant) {
        let events = self.surface.animator.tick(now);
        for event in events {
            if !self.intro.is_complete() {
                let cast = self.intro_cast();
                let stages = self
                    .intro
                    .on_animation_event(event, &mut self.surface.cx(now), &cast);
                self.after_intro(stages, now);
            }
            let detail = self.reveal.on_animation_event(event, &mut self.surface.cx(now));
            if let Some(index) = detail {
                self.emit(EngineEvent::DetailRevealed { index });
            }
        }

        if self.intro.state().is_gating() {
            let cast = self.intro_cast();
            let stages = self.intro.poll(&mut self.surface.cx(now), &cast);
            self.after_intro(stages, now);
        }

        if self.resize.take_due(now) {
            self.rebuild(now);
        }
        self.sync_scene();
    }

    /// Earliest instant at which `tick` has timed work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.intro.next_deadline(), self.resize.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Whether animations are running and frames should be ticked
    pub fn is_animating(&self) -> bool {
        self.surface.animator.running() > 0
    }

    fn sync_scene(&mut self) {
        if let (Some(scene), Some(name)) = (self.surface.scene.as_mut(), self.scene_object.as_ref()) {
            scene::sync_scene(scene.as_mut(), self.surface.animator.as_ref(), name);
        }
    }

    // Resize and rebuild

    /// Record a viewport change; the rebuild runs once the debounce window is quiet
    pub fn on_resize(&mut self, viewport: Viewport, now: Instant) {
        if !viewport.is_measurable() {
            let error = Error::Boundary(format!(
                "viewport {}x{} is not measurable",
                viewport.width, viewport.height
            ));
            self.soft_failure("resize", &error);
            return;
        }
        self.viewport = viewport;
        self.surface.doc.reflow(viewport);
        if let Some(scene) = self.surface.scene.as_mut() {
            scene.resize(viewport);
        }
        let deadline = self.resize.on_resize(now);
        debug!(
            width = viewport.width,
            height = viewport.height,
            due_in_ms = deadline.saturating_duration_since(now).as_millis() as u64,
            "Viewport changed"
        );
    }

    /// Tear down and rebuild every steady-state trigger for the current viewport
    ///
    /// Returns `None` while the intro is still running; its completion builds
    /// against the latest viewport anyway.
    pub fn rebuild(&mut self, now: Instant) -> Option<RebuildReport> {
        if !self.steady {
            debug!(state = ?self.intro.state(), "Rebuild deferred until the intro completes");
            self.resize.cancel();
            return None;
        }
        let report = run_rebuild(|step| self.rebuild_step(step, now));
        let failures = report.failures().len();
        let pass = self.resize.record_pass(report.clone());
        info!(pass, failures, triggers = self.surface.session.registry.len(), "Rebuild complete");
        self.emit(EngineEvent::RebuildCompleted {
            pass,
            triggers: self.surface.session.registry.len(),
            failures,
        });
        self.evaluate(now);
        Some(report)
    }

    fn rebuild_step(&mut self, step: RebuildStep, now: Instant) -> Result<()> {
        match step {
            RebuildStep::ResetScroll => self.reset_scroll(),
            RebuildStep::UnregisterTriggers => {
                let removed = self.teardown_triggers();
                debug!(removed, "Triggers unregistered");
            }
            RebuildStep::RevertSplits => {
                let reverted = self.surface.session.splits.revert_all(&mut self.surface.doc);
                debug!(reverted, "Text splits reverted");
            }
            RebuildStep::ResetBaseline => self.reset_baseline(now),
            RebuildStep::DeriveTargets => {
                let decision = self.derive_targets();
                debug!(mode = %decision.mode(), "Targets derived");
            }
            RebuildStep::BuildTriggers => {
                self.build_steady_state(now)?;
            }
            RebuildStep::RefreshBoundaries => {
                self.refresh_boundaries(now)?;
            }
        }
        Ok(())
    }

    /// Rebuild for the viewport's mode if it differs from the active one
    ///
    /// Calling it again for the same viewport does nothing.
    pub fn switch_mode_if_needed(&mut self, now: Instant) -> bool {
        if !self.switcher.needs_switch(self.viewport) {
            debug!(mode = ?self.switcher.current(), "Responsive mode unchanged");
            return false;
        }
        self.teardown_triggers();
        self.surface.session.splits.revert_all(&mut self.surface.doc);
        self.reset_baseline(now);
        self.derive_targets();
        if let Err(e) = self.build_steady_state(now) {
            self.soft_failure("build", &e);
        }
        if let Err(e) = self.refresh_boundaries(now) {
            self.soft_failure("refresh", &e);
        }
        true
    }

    fn teardown_triggers(&mut self) -> usize {
        let removed = self
            .surface
            .session
            .registry
            .unregister_all(self.surface.animator.as_mut());
        self.reveal.reset();
        if let Some(region) = self.region.as_mut() {
            region.reset();
        }
        removed
    }

    fn reset_baseline(&mut self, now: Instant) {
        let offset = self.switcher.derive_targets(self.viewport).reveal_offset;
        self.reveal.baseline(&mut self.surface.cx(now), offset);
    }

    fn derive_targets(&mut self) -> ModeDecision {
        let decision = self.switcher.apply(self.viewport);
        if let ModeDecision::Changed { from, to } = decision {
            self.emit(EngineEvent::ModeChanged { from, to });
        }
        self.apply_scene_targets();
        decision
    }

    fn apply_scene_targets(&mut self) {
        if !self.intro.is_complete() {
            return;
        }
        let Some(name) = &self.scene_object else {
            return;
        };
        let targets = self.switcher.derive_targets(self.viewport);
        let target = Target::SceneObject(name.clone());
        let animator = self.surface.animator.as_mut();
        animator.set(&target, Property::Scale, targets.scene_scale);
        animator.set(&target, Property::PositionX, targets.scene_position.x);
        animator.set(&target, Property::PositionY, targets.scene_position.y);
    }

    fn scene_trigger(&self) -> Option<Trigger> {
        let element = ElementId::new(self.manifest.scene.as_ref()?.scroll_element.clone()?);
        if !self.surface.doc.contains(&element) {
            warn!(element = %element, "Scene scroll element missing, skipping trigger");
            return None;
        }
        Some(
            Trigger::new(SCENE_TRIGGER, Route::SceneScrub, element)
                .start(BoundaryExpr::new(Anchor::START, Anchor::START))
                .end(BoundaryExpr::new(Anchor::END, Anchor::START))
                .scrubbed()
                .conflicting(self.manifest.conflicts_with_region(TriggerGroup::Scene)),
        )
    }

    /// Build the steady-state trigger set for the active mode
    ///
    /// Present elements always get their triggers; missing section elements
    /// are reported afterwards as an error.
    fn build_steady_state(&mut self, now: Instant) -> Result<usize> {
        let conflicting = self.manifest.conflicts_with_region(TriggerGroup::Section);
        let scene_trigger = self.scene_trigger();
        let missing: Vec<String> = self
            .reveal
            .sections()
            .iter()
            .filter(|s| !self.surface.doc.contains(&s.element))
            .map(|s| s.element.to_string())
            .collect();

        let mut cx = self.surface.cx(now);
        let mut built = self.reveal.build_triggers(&mut cx, conflicting);
        if let Some(region) = self.region.as_mut() {
            built += region.build_triggers(&mut cx);
        }
        if let Some(trigger) = scene_trigger {
            cx.registry.register(trigger, cx.animator);
            built += 1;
        }
        info!(mode = ?self.switcher.current(), triggers = built, "Steady-state triggers built");

        if missing.is_empty() {
            Ok(built)
        } else {
            Err(Error::MissingElement(missing.join(", ")))
        }
    }

    /// Recompute every trigger's scroll boundaries from current layout
    pub fn refresh_boundaries(&mut self, now: Instant) -> Result<usize> {
        if let Some(region) = self.region.as_mut() {
            region.refresh(&mut self.surface.cx(now))?;
        }
        self.surface
            .session
            .registry
            .refresh_boundaries(&self.surface.doc, self.viewport)
    }

    // Inspection

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn manifest(&self) -> &PageManifest {
        &self.manifest
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn scroll(&self) -> f64 {
        self.scroll
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Handle onto the page's scroll gate
    pub fn gate(&self) -> ScrollGate {
        self.gate.clone()
    }

    pub fn intro_state(&self) -> IntroState {
        self.intro.state()
    }

    pub fn is_steady(&self) -> bool {
        self.steady
    }

    pub fn mode(&self) -> Option<ResponsiveMode> {
        self.switcher.current()
    }

    pub fn session_id(&self) -> Uuid {
        self.surface.session.id()
    }

    pub fn document(&self) -> &Document {
        &self.surface.doc
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.surface.session.registry
    }

    pub fn splits(&self) -> &SplitRegistry {
        &self.surface.session.splits
    }

    pub fn animator(&self) -> &dyn Animator {
        self.surface.animator.as_ref()
    }

    pub fn reveal(&self) -> &SectionRevealController {
        &self.reveal
    }

    pub fn region(&self) -> Option<&ExclusiveRegionCoordinator> {
        self.region.as_ref()
    }

    pub fn rebuild_passes(&self) -> u64 {
        self.resize.passes()
    }

    pub fn last_rebuild(&self) -> Option<&RebuildReport> {
        self.resize.last_report()
    }

    pub fn has_scene(&self) -> bool {
        self.surface.scene.is_some()
    }

    /// Current state of the scene object, as last synced
    pub fn scene_object(&mut self) -> Option<SceneObject> {
        let name = self.scene_object.clone()?;
        self.surface.scene.as_mut()?.find_object_by_name(&name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reveal::SectionVisual;
    use crate::scene::{StaticScene, Vec3};
    use std::time::Duration;

    const PAGE: &str = r#"
        [viewport]
        width = 1280
        height = 800

        [[elements]]
        id = "hero"
        width = "100vw"
        height = "100vh"

        [[elements]]
        id = "logo"
        width = "120px"
        height = "40px"

        [[elements]]
        id = "headline"
        top = "30vh"
        width = "100vw"
        height = "20vh"
        text = "Hello"

        [[elements]]
        id = "about"
        top = "100vh"
        width = "100vw"
        height = "100vh"

        [[elements]]
        id = "footer"
        top = "200vh"
        width = "100vw"
        height = "100vh"

        [intro]
        branding = "logo"
        headline = "headline"

        [scene]
        scroll_element = "hero"

        [[sections]]
        element = "about"
    "#;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn page(scene: bool) -> (Page, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manifest = PageManifest::from_toml(PAGE).unwrap();
        let page = Page::builder(Arc::new(AppConfig::default()), manifest)
            .scene_loader(scene)
            .event_sender(tx)
            .build()
            .unwrap();
        (page, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Tick every 16ms until `until`
    fn run_frames(page: &mut Page, t0: Instant, until: u64) {
        let mut at = 0;
        while at <= until {
            page.tick(t0 + ms(at));
            at += 16;
        }
    }

    #[test]
    fn test_intro_without_scene_reaches_steady_state() {
        let (mut page, mut rx) = page(false);
        let t0 = Instant::now();
        assert!(page.on_ready(t0));
        assert!(page.gate().is_suppressed());
        assert_eq!(page.on_scroll(500.0, t0 + ms(100)), InputDisposition::Suppressed);

        run_frames(&mut page, t0, 3000);
        assert_eq!(page.intro_state(), IntroState::Complete);
        assert!(page.is_steady());
        assert!(!page.gate().is_suppressed());
        assert_eq!(page.scroll(), 0.0);
        assert_eq!(page.mode(), Some(ResponsiveMode::Desktop));
        // section + scene scrub
        assert_eq!(page.registry().len(), 2);

        let events = drain(&mut rx);
        assert!(events.contains(&EngineEvent::IntroStage {
            stage: IntroState::RevealingHeadline
        }));
        assert!(events.contains(&EngineEvent::ScrollReset { discarded: 1 }));
    }

    #[test]
    fn test_scrolling_reveals_section() {
        let (mut page, mut rx) = page(false);
        let t0 = Instant::now();
        page.on_ready(t0);
        run_frames(&mut page, t0, 3000);
        drain(&mut rx);

        // "top 85%": about's top (800) meets 680 at scroll 120
        let now = t0 + ms(3100);
        assert_eq!(page.on_scroll(200.0, now), InputDisposition::Passed);
        assert_eq!(page.reveal().visual(0), Some(SectionVisual::Revealed));
        let events = drain(&mut rx);
        assert!(events.contains(&EngineEvent::SectionChanged {
            index: 0,
            visual: SectionVisual::Revealed
        }));
    }

    #[test]
    fn test_input_keys_move_and_clamp() {
        let (mut page, _rx) = page(false);
        let t0 = Instant::now();
        page.on_ready(t0);
        run_frames(&mut page, t0, 3000);

        let now = t0 + ms(3100);
        page.on_input(InputEvent::Key { key: ScrollKey::End }, now);
        assert_eq!(page.scroll(), page.max_scroll());
        page.on_input(InputEvent::Wheel { delta_y: 10_000.0 }, now);
        assert_eq!(page.scroll(), page.max_scroll());
        page.on_input(InputEvent::Key { key: ScrollKey::Home }, now);
        page.on_input(InputEvent::Key { key: ScrollKey::PageDown }, now);
        assert_eq!(page.scroll(), 720.0);
        page.on_input(InputEvent::Key { key: ScrollKey::ArrowUp }, now);
        assert_eq!(page.scroll(), 680.0);
    }

    #[test]
    fn test_stale_scene_result_is_dropped() {
        let (mut page, _rx) = page(true);
        let t0 = Instant::now();
        page.on_ready(t0);
        let stale = page.session_id();
        page.teardown(t0 + ms(100));
        assert!(!page.gate().is_suppressed());

        let scene = Box::new(StaticScene::new().with_object(SceneObject::new("sphere")));
        assert!(!page.on_scene_loaded(stale, Ok(scene), t0 + ms(200)));
        assert!(!page.has_scene());
        assert_eq!(page.intro_state(), IntroState::Idle);
    }

    #[test]
    fn test_scene_reveal_and_scrub() {
        let (mut page, _rx) = page(true);
        let t0 = Instant::now();
        page.on_ready(t0);
        let scene = Box::new(StaticScene::new().with_object(SceneObject::new("sphere")));
        let session = page.session_id();
        assert!(page.on_scene_loaded(session, Ok(scene), t0 + ms(500)));
        assert_eq!(page.intro_state(), IntroState::RevealingBranding);

        let mut at = 500;
        while at <= 5000 {
            page.tick(t0 + ms(at));
            at += 16;
        }
        assert_eq!(page.intro_state(), IntroState::Complete);
        let sphere = page.scene_object().unwrap();
        assert!(sphere.visible);
        assert_eq!(sphere.scale, Vec3::splat(1.0));

        // hero spans 0..800 of scroll
        page.on_scroll(400.0, t0 + ms(5100));
        let sphere = page.scene_object().unwrap();
        assert!((sphere.rotation.y - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_resize_during_intro_is_deferred() {
        let (mut page, _rx) = page(false);
        let t0 = Instant::now();
        page.on_ready(t0);
        page.on_resize(Viewport::new(600.0, 900.0), t0 + ms(10));
        run_frames(&mut page, t0, 3000);
        assert_eq!(page.rebuild_passes(), 0);
        assert_eq!(page.mode(), Some(ResponsiveMode::Mobile));
    }

    #[test]
    fn test_unmeasurable_resize_is_soft() {
        let (mut page, mut rx) = page(false);
        let t0 = Instant::now();
        page.on_resize(Viewport::new(0.0, 800.0), t0);
        assert_eq!(page.viewport(), Viewport::new(1280.0, 800.0));
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [EngineEvent::SoftFailure { .. }]
        ));
    }
}
