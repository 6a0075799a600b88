use serde::Serialize;

/// State of the optional 3D scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    /// No scene loader configured
    #[default]
    Unavailable,
    Pending,
    Ready,
    Failed,
}

/// What the host can do, detected once when a page is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// A real animator is present; otherwise visuals jump to their final values
    pub animator: bool,
    pub text_splitter: bool,
    pub scene: SceneStatus,
}

impl Capabilities {
    pub fn detect(animator: bool, text_splitter: bool, scene_loader: bool) -> Self {
        let caps = Self {
            animator,
            text_splitter,
            scene: if scene_loader {
                SceneStatus::Pending
            } else {
                SceneStatus::Unavailable
            },
        };
        tracing::debug!(
            animator = caps.animator,
            text_splitter = caps.text_splitter,
            scene = ?caps.scene,
            "Capabilities detected"
        );
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_scene_status() {
        assert_eq!(Capabilities::detect(true, true, true).scene, SceneStatus::Pending);
        assert_eq!(Capabilities::detect(true, true, false).scene, SceneStatus::Unavailable);
        assert!(!Capabilities::detect(false, true, true).animator);
    }
}
