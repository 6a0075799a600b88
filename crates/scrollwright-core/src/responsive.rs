//! Breakpoint tiers and the layout-dependent targets derived from them

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{BreakpointConfig, BreakpointTier};
use crate::dom::Viewport;
use crate::scene::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsiveMode {
    Mobile,
    Desktop,
    WideDesktop,
}

impl fmt::Display for ResponsiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponsiveMode::Mobile => "mobile",
            ResponsiveMode::Desktop => "desktop",
            ResponsiveMode::WideDesktop => "wide_desktop",
        };
        f.write_str(name)
    }
}

/// Numeric targets for the active tier at the current viewport size
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeTargets {
    pub mode: ResponsiveMode,
    pub scene_scale: f64,
    pub scene_position: Vec3,
    /// Section slide distance in px
    pub reveal_offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeDecision {
    Unchanged(ResponsiveMode),
    Changed {
        from: Option<ResponsiveMode>,
        to: ResponsiveMode,
    },
}

impl ModeDecision {
    pub fn mode(&self) -> ResponsiveMode {
        match *self {
            ModeDecision::Unchanged(mode) => mode,
            ModeDecision::Changed { to, .. } => to,
        }
    }
}

/// Owns the current mode; only this type mutates it
#[derive(Debug, Clone)]
pub struct ResponsiveModeSwitcher {
    tiers: Vec<BreakpointTier>,
    current: Option<ResponsiveMode>,
    targets: Option<ModeTargets>,
}

impl ResponsiveModeSwitcher {
    pub fn new(config: &BreakpointConfig) -> Self {
        let mut tiers = if config.tiers.is_empty() {
            BreakpointConfig::default().tiers
        } else {
            config.tiers.clone()
        };
        tiers.sort_by(|a, b| a.min_width.total_cmp(&b.min_width));
        Self {
            tiers,
            current: None,
            targets: None,
        }
    }

    fn tier_for(&self, width: f64) -> &BreakpointTier {
        let smallest = &self.tiers[0];
        if !width.is_finite() {
            return smallest;
        }
        self.tiers
            .iter()
            .rev()
            .find(|t| width >= t.min_width)
            .unwrap_or(smallest)
    }

    pub fn mode_for(&self, viewport: Viewport) -> ResponsiveMode {
        self.tier_for(viewport.width).mode
    }

    /// Whether `viewport` falls in a different tier than the last applied one
    pub fn needs_switch(&self, viewport: Viewport) -> bool {
        self.current != Some(self.mode_for(viewport))
    }

    /// Viewport-relative targets for the tier `viewport` selects
    pub fn derive_targets(&self, viewport: Viewport) -> ModeTargets {
        let tier = self.tier_for(viewport.width);
        let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
        ModeTargets {
            mode: tier.mode,
            scene_scale: finite(tier.scene_scale),
            scene_position: Vec3::new(
                finite(tier.scene_x_pct * viewport.width / 100.0),
                finite(tier.scene_y_pct * viewport.height / 100.0),
                0.0,
            ),
            reveal_offset: finite(tier.reveal_offset_pct * viewport.height / 100.0),
        }
    }

    /// Re-derive targets and record the mode
    ///
    /// Targets are refreshed on every call since they scale with the
    /// viewport; the mode only changes when a tier boundary is crossed.
    pub fn apply(&mut self, viewport: Viewport) -> ModeDecision {
        let targets = self.derive_targets(viewport);
        self.targets = Some(targets);
        let to = targets.mode;
        if self.current == Some(to) {
            return ModeDecision::Unchanged(to);
        }
        let from = self.current.replace(to);
        info!(from = ?from, to = %to, width = viewport.width, "Responsive mode changed");
        ModeDecision::Changed { from, to }
    }

    pub fn current(&self) -> Option<ResponsiveMode> {
        self.current
    }

    pub fn targets(&self) -> Option<&ModeTargets> {
        self.targets.as_ref()
    }

    pub fn tiers(&self) -> &[BreakpointTier] {
        &self.tiers
    }
}
