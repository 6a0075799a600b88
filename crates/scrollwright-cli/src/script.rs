//! Session scripts: timed host events played against a page

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use scrollwright_core::gate::{InputEvent, ScrollKey};
use scrollwright_core::{HostEvent, PageManifest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Milliseconds after the session starts
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: HostEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionScript {
    /// How long to keep running after the last step
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

fn default_settle_ms() -> u64 {
    1000
}

impl SessionScript {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut script: Self = toml::from_str(raw)?;
        script.steps.sort_by_key(|step| step.at_ms);
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing script {}", path.display()))
    }

    /// Ready, an early wheel the intro should swallow, a paged walk to the
    /// bottom, then a narrowing resize
    pub fn default_walk(manifest: &PageManifest) -> Self {
        let mut steps = vec![
            ScriptStep {
                at_ms: 0,
                event: HostEvent::Ready,
            },
            ScriptStep {
                at_ms: 200,
                event: HostEvent::Input {
                    event: InputEvent::Wheel { delta_y: 300.0 },
                },
            },
        ];

        let mut at_ms = 4000;
        for _ in 0..8 {
            steps.push(ScriptStep {
                at_ms,
                event: HostEvent::Input {
                    event: InputEvent::Key {
                        key: ScrollKey::PageDown,
                    },
                },
            });
            at_ms += 250;
        }

        let viewport = manifest.viewport;
        steps.push(ScriptStep {
            at_ms,
            event: HostEvent::Resize {
                width: (viewport.width * 0.6).round(),
                height: viewport.height,
            },
        });

        Self {
            settle_ms: default_settle_ms(),
            steps,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.steps.last().map(|s| s.at_ms).unwrap_or(0) + self.settle_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_sorts_steps() {
        let script = SessionScript::from_toml(
            r#"
            settle_ms = 250

            [[steps]]
            at_ms = 900
            kind = "scroll"
            offset = 400.0

            [[steps]]
            at_ms = 0
            kind = "ready"

            [[steps]]
            at_ms = 300
            kind = "input"
            event = { kind = "key", key = "page_down" }

            [[steps]]
            at_ms = 1200
            kind = "resize"
            width = 600.0
            height = 900.0
            "#,
        )
        .unwrap();

        assert_eq!(script.settle_ms, 250);
        assert_eq!(script.steps[0].event, HostEvent::Ready);
        assert_eq!(
            script.steps[1].event,
            HostEvent::Input {
                event: InputEvent::Key {
                    key: ScrollKey::PageDown
                }
            }
        );
        assert_eq!(script.steps[2].event, HostEvent::Scroll { offset: 400.0 });
        assert_eq!(script.duration_ms(), 1450);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let raw = r#"
            [[steps]]
            at_ms = 0
            kind = "teleport"
        "#;
        assert!(SessionScript::from_toml(raw).is_err());
    }

    #[test]
    fn test_default_walk_starts_with_ready() {
        let script = SessionScript::default_walk(&PageManifest::default());
        assert_eq!(script.steps[0].event, HostEvent::Ready);
        assert!(script.steps.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
        assert!(matches!(
            script.steps.last().unwrap().event,
            HostEvent::Resize { width, .. } if width == 768.0
        ));
    }
}
