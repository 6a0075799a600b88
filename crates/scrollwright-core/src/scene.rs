//! 3D scene collaborator
//!
//! The engine only needs to find objects by name, drive a few numeric
//! properties on them, and tell the scene when the viewport changes.
//! Loading is asynchronous and may fail; a failed load degrades the page
//! rather than stalling it.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::animation::{Animator, Property, Target};
use crate::dom::Viewport;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const ONE: Vec3 = Vec3 { x: 1.0, y: 1.0, z: 1.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn splat(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Properties the engine drives on scene objects
pub const SCENE_PROPERTIES: [Property; 6] = [
    Property::PositionX,
    Property::PositionY,
    Property::PositionZ,
    Property::RotationY,
    Property::Scale,
    Property::Visible,
];

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub visible: bool,
}

impl SceneObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            visible: true,
        }
    }

    pub fn get(&self, property: Property) -> Option<f64> {
        match property {
            Property::PositionX => Some(self.position.x),
            Property::PositionY => Some(self.position.y),
            Property::PositionZ => Some(self.position.z),
            Property::RotationY => Some(self.rotation.y),
            Property::Scale => Some(self.scale.x),
            Property::Visible => Some(if self.visible { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Write one animated property; layout properties have no meaning here
    pub fn apply(&mut self, property: Property, value: f64) {
        if !value.is_finite() {
            return;
        }
        match property {
            Property::PositionX => self.position.x = value,
            Property::PositionY => self.position.y = value,
            Property::PositionZ => self.position.z = value,
            Property::RotationY => self.rotation.y = value,
            Property::Scale => self.scale = Vec3::splat(value),
            Property::Visible => self.visible = value >= 0.5,
            Property::Opacity | Property::X | Property::Y => {}
        }
    }
}

pub trait Scene: Send {
    fn find_object_by_name(&mut self, name: &str) -> Option<&mut SceneObject>;

    /// Adapt the render surface to a new viewport
    fn resize(&mut self, viewport: Viewport);
}

/// Copy the scene object's current state into the animator so tweens start from it
pub fn seed_from_scene(scene: &mut dyn Scene, animator: &mut dyn Animator, name: &str) -> bool {
    let Some(object) = scene.find_object_by_name(name) else {
        return false;
    };
    let target = Target::SceneObject(name.to_string());
    for property in SCENE_PROPERTIES {
        if let Some(value) = object.get(property) {
            animator.set(&target, property, value);
        }
    }
    true
}

/// Push animated values for the named object into the scene
pub fn sync_scene(scene: &mut dyn Scene, animator: &dyn Animator, name: &str) {
    if let Some(object) = scene.find_object_by_name(name) {
        let target = Target::SceneObject(name.to_string());
        for property in SCENE_PROPERTIES {
            object.apply(property, animator.value(&target, property));
        }
    }
}

/// In-memory scene holding named objects
#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    objects: BTreeMap<String, SceneObject>,
    viewport: Option<Viewport>,
    resizes: usize,
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, object: SceneObject) -> Self {
        self.objects.insert(object.name.clone(), object);
        self
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.get(name)
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn resize_count(&self) -> usize {
        self.resizes
    }
}

impl Scene for StaticScene {
    fn find_object_by_name(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.get_mut(name)
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.resizes += 1;
    }
}

/// Asynchronous scene asset loading
#[async_trait::async_trait]
pub trait SceneLoader: Send + Sync {
    async fn load(&self) -> Result<Box<dyn Scene>>;
}

#[derive(Debug, Clone)]
enum Outcome {
    Succeed(Vec<String>),
    Fail(String),
}

/// Loader that resolves or rejects after a fixed delay
#[derive(Debug, Clone)]
pub struct ScriptedSceneLoader {
    delay: Duration,
    outcome: Outcome,
}

impl ScriptedSceneLoader {
    /// Resolve after `delay` with a scene holding `objects`
    pub fn succeeding(delay: Duration, objects: &[&str]) -> Self {
        Self {
            delay,
            outcome: Outcome::Succeed(objects.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// Reject after `delay`
    pub fn failing(delay: Duration, reason: impl Into<String>) -> Self {
        Self {
            delay,
            outcome: Outcome::Fail(reason.into()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait::async_trait]
impl SceneLoader for ScriptedSceneLoader {
    async fn load(&self) -> Result<Box<dyn Scene>> {
        tokio::time::sleep(self.delay).await;
        match &self.outcome {
            Outcome::Succeed(objects) => {
                debug!(objects = objects.len(), "Scene assets loaded");
                let scene = objects
                    .iter()
                    .fold(StaticScene::new(), |scene, name| {
                        scene.with_object(SceneObject::new(name.clone()))
                    });
                Ok(Box::new(scene))
            }
            Outcome::Fail(reason) => Err(Error::AssetLoad(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Tweener;

    #[test]
    fn test_apply_ignores_non_finite() {
        let mut obj = SceneObject::new("sphere");
        obj.apply(Property::Scale, f64::NAN);
        assert_eq!(obj.scale, Vec3::ONE);
        obj.apply(Property::Scale, 2.0);
        assert_eq!(obj.scale, Vec3::splat(2.0));
        obj.apply(Property::Visible, 0.0);
        assert!(!obj.visible);
    }

    #[test]
    fn test_seed_then_sync_round_trips_values() {
        let mut scene = StaticScene::new().with_object(SceneObject::new("sphere"));
        let mut tw = Tweener::new();
        scene.find_object_by_name("sphere").unwrap().position.x = 3.0;

        assert!(seed_from_scene(&mut scene, &mut tw, "sphere"));
        let target = Target::SceneObject("sphere".to_string());
        assert_eq!(tw.value(&target, Property::PositionX), 3.0);

        tw.set(&target, Property::RotationY, 1.5);
        sync_scene(&mut scene, &tw, "sphere");
        assert_eq!(scene.object("sphere").unwrap().rotation.y, 1.5);
        assert_eq!(scene.object("sphere").unwrap().position.x, 3.0);
    }

    #[test]
    fn test_seed_missing_object() {
        let mut scene = StaticScene::new();
        let mut tw = Tweener::new();
        assert!(!seed_from_scene(&mut scene, &mut tw, "sphere"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_loader_outcomes() {
        let ok = ScriptedSceneLoader::succeeding(Duration::from_millis(500), &["sphere"]);
        let mut scene = ok.load().await.unwrap();
        assert!(scene.find_object_by_name("sphere").is_some());

        let failing = ScriptedSceneLoader::failing(Duration::from_millis(10), "404");
        assert!(matches!(failing.load().await, Err(Error::AssetLoad(_))));
    }
}
