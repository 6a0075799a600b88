use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::responsive::ResponsiveMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub intro: IntroConfig,
    #[serde(default)]
    pub reveal: RevealConfig,
    #[serde(default)]
    pub region: RegionConfig,
    #[serde(default)]
    pub resize: ResizeConfig,
    #[serde(default)]
    pub breakpoints: BreakpointConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Easing curve applied to interpolated properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    /// No easing, jump at the end
    None,
    /// Constant velocity
    Linear,
    /// Cubic ease-out
    #[default]
    Cubic,
    /// Quintic ease-out
    Quintic,
    /// Exponential ease-out
    EaseOut,
    /// Cubic ease-in-out
    CubicInOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Animation frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Easing used when a tween does not name one
    #[serde(default)]
    pub easing: EasingType,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            easing: EasingType::default(),
        }
    }
}

/// Highest frame rate the driver will tick at
pub const MAX_FPS: u32 = 1000;

/// Longest configurable debounce or timeout
const MAX_DELAY_MS: u64 = 60 * 60 * 1000;

impl AnimationConfig {
    /// Interval between animation frames
    pub fn frame_interval(&self) -> Duration {
        if self.fps == 0 {
            Duration::from_millis(16) // ~60fps fallback
        } else {
            Duration::from_millis((1000 / self.fps as u64).max(1))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroConfig {
    #[serde(default = "default_branding_ms")]
    pub branding_duration_ms: u64,
    #[serde(default = "default_headline_ms")]
    pub headline_duration_ms: u64,
    /// Delay between consecutive headline tokens
    #[serde(default = "default_token_stagger_ms")]
    pub token_stagger_ms: u64,
    #[serde(default = "default_scene_ms")]
    pub scene_duration_ms: u64,
    /// Upper bound on waiting for assets before continuing degraded
    #[serde(default = "default_asset_timeout_ms")]
    pub asset_timeout_ms: u64,
    /// Extra time a reveal stage may overrun before it is forced forward
    #[serde(default = "default_stage_grace_ms")]
    pub stage_grace_ms: u64,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            branding_duration_ms: default_branding_ms(),
            headline_duration_ms: default_headline_ms(),
            token_stagger_ms: default_token_stagger_ms(),
            scene_duration_ms: default_scene_ms(),
            asset_timeout_ms: default_asset_timeout_ms(),
            stage_grace_ms: default_stage_grace_ms(),
        }
    }
}

impl IntroConfig {
    pub fn asset_timeout(&self) -> Duration {
        Duration::from_millis(self.asset_timeout_ms)
    }

    pub fn stage_grace(&self) -> Duration {
        Duration::from_millis(self.stage_grace_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Default start boundary for section triggers
    #[serde(default = "default_reveal_start")]
    pub start: String,
    /// Default end boundary for section triggers
    #[serde(default = "default_reveal_end")]
    pub end: String,
    #[serde(default = "default_reveal_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_detail_ms")]
    pub detail_duration_ms: u64,
    /// Stagger between heading tokens
    #[serde(default = "default_token_stagger_ms")]
    pub token_stagger_ms: u64,
    #[serde(default)]
    pub easing: EasingType,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            start: default_reveal_start(),
            end: default_reveal_end(),
            duration_ms: default_reveal_ms(),
            detail_duration_ms: default_detail_ms(),
            token_stagger_ms: default_token_stagger_ms(),
            easing: EasingType::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Start boundary for items inside the pinned region, on the horizontal axis
    #[serde(default = "default_item_start")]
    pub item_start: String,
    #[serde(default = "default_item_end")]
    pub item_end: String,
    #[serde(default = "default_item_ms")]
    pub item_duration_ms: u64,
    #[serde(default)]
    pub easing: EasingType,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            item_start: default_item_start(),
            item_end: default_item_end(),
            item_duration_ms: default_item_ms(),
            easing: EasingType::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeConfig {
    /// Quiet period after the last resize before a rebuild runs
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl ResizeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// One responsive tier and the viewport-relative targets used while it is active
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointTier {
    pub mode: ResponsiveMode,
    /// Smallest viewport width (px) that selects this tier
    pub min_width: f64,
    /// Scene object scale multiplier
    #[serde(default = "default_scene_scale")]
    pub scene_scale: f64,
    /// Scene object horizontal offset, percent of viewport width
    #[serde(default)]
    pub scene_x_pct: f64,
    /// Scene object vertical offset, percent of viewport height
    #[serde(default)]
    pub scene_y_pct: f64,
    /// Section slide distance, percent of viewport height
    #[serde(default = "default_reveal_offset_pct")]
    pub reveal_offset_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointConfig {
    #[serde(default = "default_tiers")]
    pub tiers: Vec<BreakpointTier>,
}

impl Default for BreakpointConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fps() -> u32 {
    60
}

fn default_branding_ms() -> u64 {
    800
}

fn default_headline_ms() -> u64 {
    900
}

fn default_token_stagger_ms() -> u64 {
    30
}

fn default_scene_ms() -> u64 {
    1200
}

fn default_asset_timeout_ms() -> u64 {
    4000
}

fn default_stage_grace_ms() -> u64 {
    1000
}

fn default_reveal_start() -> String {
    "top 85%".to_string()
}

fn default_reveal_end() -> String {
    "bottom 15%".to_string()
}

fn default_reveal_ms() -> u64 {
    700
}

fn default_detail_ms() -> u64 {
    500
}

fn default_item_start() -> String {
    "left 85%".to_string()
}

fn default_item_end() -> String {
    "right 0%".to_string()
}

fn default_item_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    250
}

fn default_scene_scale() -> f64 {
    1.0
}

fn default_reveal_offset_pct() -> f64 {
    8.0
}

fn default_tiers() -> Vec<BreakpointTier> {
    vec![
        BreakpointTier {
            mode: ResponsiveMode::Mobile,
            min_width: 0.0,
            scene_scale: 0.6,
            scene_x_pct: 0.0,
            scene_y_pct: -10.0,
            reveal_offset_pct: 5.0,
        },
        BreakpointTier {
            mode: ResponsiveMode::Desktop,
            min_width: 768.0,
            scene_scale: 1.0,
            scene_x_pct: 25.0,
            scene_y_pct: 0.0,
            reveal_offset_pct: 8.0,
        },
        BreakpointTier {
            mode: ResponsiveMode::WideDesktop,
            min_width: 1600.0,
            scene_scale: 1.3,
            scene_x_pct: 30.0,
            scene_y_pct: 0.0,
            reveal_offset_pct: 8.0,
        },
    ]
}

impl AppConfig {
    /// Load configuration from the default location or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit file, falling back to defaults when absent
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self =
                toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/scrollwright/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("scrollwright")
            .join("config.toml")
    }

    fn validate(&self) -> crate::Result<()> {
        if self.animation.fps > MAX_FPS {
            return Err(crate::Error::Config(format!(
                "animation.fps {} exceeds {}",
                self.animation.fps, MAX_FPS
            )));
        }
        for (name, ms) in [
            ("resize.debounce_ms", self.resize.debounce_ms),
            ("intro.asset_timeout_ms", self.intro.asset_timeout_ms),
            ("intro.stage_grace_ms", self.intro.stage_grace_ms),
        ] {
            if ms > MAX_DELAY_MS {
                return Err(crate::Error::Config(format!("{} {} exceeds {}", name, ms, MAX_DELAY_MS)));
            }
        }
        if self.breakpoints.tiers.is_empty() {
            return Err(crate::Error::Config(
                "breakpoints.tiers must name at least one tier".to_string(),
            ));
        }
        for tier in &self.breakpoints.tiers {
            if !tier.min_width.is_finite() || tier.min_width < 0.0 {
                return Err(crate::Error::Config(format!(
                    "tier {:?} has invalid min_width {}",
                    tier.mode, tier.min_width
                )));
            }
        }
        for expr in [
            &self.reveal.start,
            &self.reveal.end,
            &self.region.item_start,
            &self.region.item_end,
        ] {
            expr.parse::<crate::trigger::BoundaryExpr>()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.resize.debounce_ms, 250);
        assert_eq!(config.animation.fps, 60);
        assert_eq!(config.breakpoints.tiers.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [resize]
            debounce_ms = 100

            [reveal]
            easing = "linear"
            "#,
        )
        .unwrap();
        assert_eq!(config.resize.debounce(), Duration::from_millis(100));
        assert_eq!(config.reveal.easing, EasingType::Linear);
        assert_eq!(config.reveal.start, "top 85%");
        assert_eq!(config.intro.asset_timeout_ms, 4000);
    }

    #[test]
    fn test_frame_interval_fallback() {
        let config = AnimationConfig {
            fps: 0,
            ..Default::default()
        };
        assert_eq!(config.frame_interval(), Duration::from_millis(16));
    }

    #[test]
    fn test_frame_interval_never_zero() {
        let config = AnimationConfig {
            fps: 5000,
            ..Default::default()
        };
        assert_eq!(config.frame_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_validate_rejects_out_of_range_timing() {
        let mut config = AppConfig::default();
        config.animation.fps = 2000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.intro.asset_timeout_ms = u64::MAX;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.animation.fps = MAX_FPS;
        config.resize.debounce_ms = 10_000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_boundary() {
        let mut config = AppConfig::default();
        config.reveal.start = "sideways".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = std::env::temp_dir().join(format!("scrollwright-cfg-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");
        let mut config = AppConfig::default();
        config.resize.debounce_ms = 400;
        config.save(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.resize.debounce_ms, 400);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
