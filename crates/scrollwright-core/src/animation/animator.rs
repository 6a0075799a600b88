//! Animation controller: plays timelines over a property store
//!
//! `Animator` is the seam to whatever tweening engine hosts the page.
//! `Tweener` is the in-process implementation: playback is driven by
//! `tick(now)` so it runs deterministically under any clock.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use super::easing::EasingType;
use super::timeline::{Property, Target, Timeline, Tween};
use super::timing::{elapsed_secs, lerp};

/// Opaque reference to a started animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandleId(u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim#{}", self.0)
    }
}

/// Notification produced by `Animator::tick`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEvent {
    /// Played forward to its end
    Completed(HandleId),
    /// Played backward to its start after `reverse`
    ReverseCompleted(HandleId),
}

pub trait Animator: Send {
    /// Start a timeline, returning its handle
    fn play(&mut self, timeline: Timeline, now: Instant) -> HandleId;

    /// Stop a handle immediately; its properties keep their current values
    fn kill(&mut self, handle: HandleId);

    /// Run a handle backward from its current progress
    fn reverse(&mut self, handle: HandleId, now: Instant);

    /// Whether the handle is still progressing
    fn is_active(&self, handle: HandleId) -> bool;

    /// Whether the handle has not been killed (finished handles still exist)
    fn exists(&self, handle: HandleId) -> bool;

    /// Write a property immediately
    fn set(&mut self, target: &Target, property: Property, value: f64);

    /// Current value of a property
    fn value(&self, target: &Target, property: Property) -> f64;

    /// Advance every running handle to `now`
    fn tick(&mut self, now: Instant) -> Vec<AnimationEvent>;

    /// Number of running handles writing (target, property)
    fn running_on(&self, target: &Target, property: Property) -> usize;

    /// Number of running handles
    fn running(&self) -> usize;

    /// Tween several properties of one target together
    fn animate_to(
        &mut self,
        target: Target,
        properties: &[(Property, f64)],
        duration: Duration,
        easing: EasingType,
        now: Instant,
    ) -> HandleId {
        let mut timeline = Timeline::new();
        for (i, (property, value)) in properties.iter().enumerate() {
            let position = if i == 0 {
                super::timeline::Position::At(Duration::ZERO)
            } else {
                super::timeline::Position::WithPrevious
            };
            timeline = timeline.add(
                Tween::to(target.clone(), *property, *value)
                    .duration(duration)
                    .easing(easing),
                position,
            );
        }
        self.play(timeline, now)
    }
}

/// Kill whatever handle a slot holds, leaving the slot empty
pub fn kill_slot(animator: &mut dyn Animator, slot: &mut Option<HandleId>) {
    if let Some(handle) = slot.take() {
        animator.kill(handle);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayState {
    Running,
    Finished,
}

#[derive(Debug, Clone)]
struct Playback {
    timeline: Timeline,
    total: f64,
    anchor: Instant,
    anchor_pos: f64,
    direction: Direction,
    state: PlayState,
    /// Start value captured for each step the first time it renders
    origins: Vec<Option<f64>>,
}

impl Playback {
    fn position(&self, now: Instant) -> f64 {
        let dt = elapsed_secs(self.anchor, now);
        let pos = match self.direction {
            Direction::Forward => self.anchor_pos + dt,
            Direction::Reverse => self.anchor_pos - dt,
        };
        pos.clamp(0.0, self.total)
    }

    fn writes(&self, target: &Target, property: Property) -> bool {
        self.timeline
            .keys()
            .any(|(t, p)| t == target && p == property)
    }
}

/// In-process animator over a property store
#[derive(Debug, Default)]
pub struct Tweener {
    next_id: u64,
    playbacks: BTreeMap<HandleId, Playback>,
    values: HashMap<(Target, Property), f64>,
    /// Degraded mode: every timeline jumps to its end on the next tick
    instant: bool,
}

impl Tweener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Animator for hosts without animation support: final values, no motion
    pub fn instant() -> Self {
        Self {
            instant: true,
            ..Self::default()
        }
    }

    /// Drop handles that write the same properties as `timeline`
    ///
    /// Finished handles are discarded quietly; a running one means a
    /// controller forgot to kill its own animation first.
    fn overwrite_conflicts(&mut self, timeline: &Timeline) {
        let conflicting: Vec<(HandleId, PlayState)> = self
            .playbacks
            .iter()
            .filter(|(_, pb)| timeline.keys().any(|(t, p)| pb.writes(t, p)))
            .map(|(id, pb)| (*id, pb.state))
            .collect();
        for (id, state) in conflicting {
            if state == PlayState::Running {
                warn!(handle = %id, "Conflicting animation still running; killing it");
            }
            self.playbacks.remove(&id);
        }
    }

    fn render(values: &mut HashMap<(Target, Property), f64>, pb: &mut Playback, pos: f64) {
        for (i, step) in pb.timeline.steps().iter().enumerate() {
            if pos < step.start && pb.origins[i].is_none() {
                continue;
            }
            let key = (step.tween.target.clone(), step.tween.property);
            let origin = *pb.origins[i].get_or_insert_with(|| {
                step.tween.from.unwrap_or_else(|| {
                    values
                        .get(&key)
                        .copied()
                        .unwrap_or_else(|| step.tween.property.initial_value())
                })
            });
            let span = step.tween.duration.as_secs_f64();
            let local = if span <= 0.0 {
                if pos >= step.start {
                    1.0
                } else {
                    0.0
                }
            } else {
                ((pos - step.start) / span).clamp(0.0, 1.0)
            };
            let value = lerp(origin, step.tween.to, step.tween.easing.ease(local));
            if value.is_finite() {
                values.insert(key, value);
            }
        }
    }
}

impl Animator for Tweener {
    fn play(&mut self, timeline: Timeline, now: Instant) -> HandleId {
        self.overwrite_conflicts(&timeline);

        self.next_id += 1;
        let id = HandleId(self.next_id);
        let total = timeline.duration();
        let origins = vec![None; timeline.steps().len()];
        let anchor_pos = if self.instant { total } else { 0.0 };
        self.playbacks.insert(
            id,
            Playback {
                timeline,
                total,
                anchor: now,
                anchor_pos,
                direction: Direction::Forward,
                state: PlayState::Running,
                origins,
            },
        );
        debug!(handle = %id, duration = total, "Animation started");
        id
    }

    fn kill(&mut self, handle: HandleId) {
        if self.playbacks.remove(&handle).is_some() {
            debug!(handle = %handle, "Animation killed");
        }
    }

    fn reverse(&mut self, handle: HandleId, now: Instant) {
        let instant = self.instant;
        let Some(pb) = self.playbacks.get(&handle) else {
            debug!(handle = %handle, "Reverse on unknown handle");
            return;
        };
        let keys: Vec<(Target, Property)> =
            pb.timeline.keys().map(|(t, p)| (t.clone(), p)).collect();

        // A reversed handle becomes a writer again; anything else running on its properties yields.
        let conflicting: Vec<HandleId> = self
            .playbacks
            .iter()
            .filter(|(id, other)| **id != handle && other.state == PlayState::Running)
            .filter(|(_, other)| keys.iter().any(|(t, p)| other.writes(t, *p)))
            .map(|(id, _)| *id)
            .collect();
        for id in conflicting {
            warn!(handle = %id, "Conflicting animation still running; killing it");
            self.playbacks.remove(&id);
        }

        if let Some(pb) = self.playbacks.get_mut(&handle) {
            let pos = if pb.state == PlayState::Running {
                pb.position(now)
            } else {
                match pb.direction {
                    Direction::Forward => pb.total,
                    Direction::Reverse => 0.0,
                }
            };
            pb.anchor = now;
            pb.anchor_pos = if instant { 0.0 } else { pos };
            pb.direction = match pb.direction {
                Direction::Forward => Direction::Reverse,
                Direction::Reverse => Direction::Forward,
            };
            if instant && pb.direction == Direction::Forward {
                pb.anchor_pos = pb.total;
            }
            pb.state = PlayState::Running;
        }
    }

    fn is_active(&self, handle: HandleId) -> bool {
        self.playbacks
            .get(&handle)
            .map(|pb| pb.state == PlayState::Running)
            .unwrap_or(false)
    }

    fn exists(&self, handle: HandleId) -> bool {
        self.playbacks.contains_key(&handle)
    }

    fn set(&mut self, target: &Target, property: Property, value: f64) {
        if value.is_finite() {
            self.values.insert((target.clone(), property), value);
        } else {
            warn!(target = %target, property = ?property, "Ignoring non-finite property value");
        }
    }

    fn value(&self, target: &Target, property: Property) -> f64 {
        self.values
            .get(&(target.clone(), property))
            .copied()
            .unwrap_or_else(|| property.initial_value())
    }

    fn tick(&mut self, now: Instant) -> Vec<AnimationEvent> {
        let mut events = Vec::new();
        let values = &mut self.values;

        for (id, pb) in self.playbacks.iter_mut() {
            if pb.state != PlayState::Running {
                continue;
            }
            let pos = pb.position(now);
            Self::render(values, pb, pos);

            match pb.direction {
                Direction::Forward if pos >= pb.total => {
                    pb.state = PlayState::Finished;
                    events.push(AnimationEvent::Completed(*id));
                }
                Direction::Reverse if pos <= 0.0 => {
                    pb.state = PlayState::Finished;
                    events.push(AnimationEvent::ReverseCompleted(*id));
                }
                _ => {}
            }
        }

        events
    }

    fn running_on(&self, target: &Target, property: Property) -> usize {
        self.playbacks
            .values()
            .filter(|pb| pb.state == PlayState::Running && pb.writes(target, property))
            .count()
    }

    fn running(&self) -> usize {
        self.playbacks
            .values()
            .filter(|pb| pb.state == PlayState::Running)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::timeline::Position;
    use crate::dom::ElementId;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn el(id: &str) -> Target {
        Target::Element(ElementId::new(id))
    }

    fn fade(id: &str, to: f64) -> Timeline {
        Timeline::single(
            Tween::to(el(id), Property::Opacity, to)
                .duration(ms(100))
                .easing(EasingType::Linear),
        )
    }

    #[test]
    fn test_plays_to_completion() {
        let mut tw = Tweener::new();
        let t0 = Instant::now();
        tw.set(&el("a"), Property::Opacity, 0.0);
        let h = tw.play(fade("a", 1.0), t0);

        assert!(tw.tick(t0 + ms(50)).is_empty());
        assert!((tw.value(&el("a"), Property::Opacity) - 0.5).abs() < 1e-6);

        let events = tw.tick(t0 + ms(120));
        assert_eq!(events, vec![AnimationEvent::Completed(h)]);
        assert_eq!(tw.value(&el("a"), Property::Opacity), 1.0);
        assert!(!tw.is_active(h));
    }

    #[test]
    fn test_kill_leaves_current_value() {
        let mut tw = Tweener::new();
        let t0 = Instant::now();
        tw.set(&el("a"), Property::Opacity, 0.0);
        let h = tw.play(fade("a", 1.0), t0);
        tw.tick(t0 + ms(30));
        tw.kill(h);
        tw.tick(t0 + ms(200));
        assert!((tw.value(&el("a"), Property::Opacity) - 0.3).abs() < 1e-6);
        assert_eq!(tw.running(), 0);
    }

    #[test]
    fn test_reverse_runs_back_from_current_progress() {
        let mut tw = Tweener::new();
        let t0 = Instant::now();
        tw.set(&el("a"), Property::Opacity, 0.0);
        let h = tw.play(fade("a", 1.0), t0);
        tw.tick(t0 + ms(40));
        tw.reverse(h, t0 + ms(40));

        tw.tick(t0 + ms(60));
        assert!((tw.value(&el("a"), Property::Opacity) - 0.2).abs() < 1e-6);

        let events = tw.tick(t0 + ms(100));
        assert_eq!(events, vec![AnimationEvent::ReverseCompleted(h)]);
        assert_eq!(tw.value(&el("a"), Property::Opacity), 0.0);
    }

    #[test]
    fn test_conflicting_play_kills_previous() {
        let mut tw = Tweener::new();
        let t0 = Instant::now();
        let first = tw.play(fade("a", 1.0), t0);
        let second = tw.play(fade("a", 0.0), t0 + ms(10));
        assert!(!tw.is_active(first));
        assert!(tw.is_active(second));
        assert_eq!(tw.running_on(&el("a"), Property::Opacity), 1);
    }

    #[test]
    fn test_instant_mode_jumps_to_end() {
        let mut tw = Tweener::instant();
        let t0 = Instant::now();
        tw.set(&el("a"), Property::Opacity, 0.0);
        let h = tw.play(fade("a", 1.0), t0);
        assert_eq!(tw.tick(t0), vec![AnimationEvent::Completed(h)]);
        assert_eq!(tw.value(&el("a"), Property::Opacity), 1.0);
    }

    #[test]
    fn test_step_captures_origin_when_reached() {
        let mut tw = Tweener::new();
        let t0 = Instant::now();
        tw.set(&el("a"), Property::Y, 0.0);
        let tl = Timeline::new()
            .add(
                Tween::to(el("a"), Property::Y, 100.0).duration(ms(100)).easing(EasingType::Linear),
                Position::AfterPrevious,
            )
            .add(
                Tween::to(el("a"), Property::Y, 0.0).duration(ms(100)).easing(EasingType::Linear),
                Position::AfterPrevious,
            );
        tw.play(tl, t0);
        tw.tick(t0 + ms(100));
        tw.tick(t0 + ms(150));
        assert!((tw.value(&el("a"), Property::Y) - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_animate_to_multiple_properties() {
        let mut tw = Tweener::new();
        let t0 = Instant::now();
        let h = tw.animate_to(
            el("a"),
            &[(Property::Opacity, 0.0), (Property::Y, 40.0)],
            ms(100),
            EasingType::Linear,
            t0,
        );
        tw.tick(t0 + ms(100));
        assert!(!tw.is_active(h));
        assert_eq!(tw.value(&el("a"), Property::Opacity), 0.0);
        assert_eq!(tw.value(&el("a"), Property::Y), 40.0);
    }
}
