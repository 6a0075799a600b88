//! Page manifest: the content-specific half of the configuration
//!
//! Which elements exist, which of them the intro animates, how sections
//! reveal, and which trigger groups the pinned region suspends are all page
//! content, so they are declared here rather than in the engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::dom::{ElementId, ElementSpec, Viewport};
use crate::region::RegionLayout;
use crate::reveal::{RevealPolicy, SectionConfig};
use crate::text::Granularity;
use crate::trigger::{BoundaryExpr, TriggerGroup};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageManifest {
    /// Page title, informational
    #[serde(default)]
    pub title: Option<String>,
    /// Viewport used when the host does not report one
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    /// Shared fragments injected before setup
    #[serde(default)]
    pub fragments: Vec<String>,
    #[serde(default)]
    pub intro: IntroSpec,
    #[serde(default)]
    pub scene: Option<SceneSpec>,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
    #[serde(default)]
    pub region: Option<RegionSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntroSpec {
    #[serde(default)]
    pub branding: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub granularity: Granularity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSpec {
    /// Background object revealed by the intro and scaled per tier
    #[serde(default = "default_scene_object")]
    pub object: String,
    /// Element whose scroll range drives the object's rotation
    #[serde(default)]
    pub scroll_element: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub element: String,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub policy: RevealPolicy,
    /// Overrides `reveal.start`
    #[serde(default)]
    pub start: Option<String>,
    /// Overrides `reveal.end`
    #[serde(default)]
    pub end: Option<String>,
    /// Suspend this section while the region is pinned, regardless of group
    #[serde(default)]
    pub conflicting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub element: String,
    pub track: String,
    #[serde(default)]
    pub items: Vec<String>,
    /// Trigger groups suspended while the region is pinned
    #[serde(default = "default_conflicting_groups")]
    pub conflicting_groups: Vec<TriggerGroup>,
}

impl Default for PageManifest {
    fn default() -> Self {
        Self {
            title: None,
            viewport: default_viewport(),
            elements: Vec::new(),
            fragments: Vec::new(),
            intro: IntroSpec::default(),
            scene: None,
            sections: Vec::new(),
            region: None,
        }
    }
}

fn default_viewport() -> Viewport {
    Viewport::new(1280.0, 800.0)
}

fn default_scene_object() -> String {
    "sphere".to_string()
}

fn default_conflicting_groups() -> Vec<TriggerGroup> {
    vec![TriggerGroup::Section, TriggerGroup::Scene]
}

fn parse_boundary(raw: &str, context: &str) -> Result<BoundaryExpr> {
    raw.parse()
        .map_err(|e| Error::Manifest(format!("{}: {}", context, e)))
}

impl PageManifest {
    pub fn from_toml(raw: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(raw).map_err(|e| Error::Manifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for element in &self.elements {
            if !seen.insert(element.id.as_str()) {
                return Err(Error::Manifest(format!("duplicate element id '{}'", element.id)));
            }
        }
        for section in &self.sections {
            if let Some(start) = &section.start {
                parse_boundary(start, &section.element)?;
            }
            if let Some(end) = &section.end {
                parse_boundary(end, &section.element)?;
            }
        }
        if !self.viewport.is_measurable() {
            return Err(Error::Manifest(format!(
                "viewport {}x{} is not measurable",
                self.viewport.width, self.viewport.height
            )));
        }
        Ok(())
    }

    /// Section settings with boundaries resolved against configured defaults
    pub fn section_configs(&self, config: &AppConfig) -> Result<Vec<SectionConfig>> {
        let default_start = parse_boundary(&config.reveal.start, "reveal.start")?;
        let default_end = parse_boundary(&config.reveal.end, "reveal.end")?;
        self.sections
            .iter()
            .map(|s| {
                let start = match &s.start {
                    Some(raw) => parse_boundary(raw, &s.element)?,
                    None => default_start,
                };
                let end = match &s.end {
                    Some(raw) => parse_boundary(raw, &s.element)?,
                    None => default_end,
                };
                Ok(SectionConfig {
                    element: ElementId::new(s.element.clone()),
                    heading: s.heading.clone().map(ElementId::new),
                    detail: s.detail.clone().map(ElementId::new),
                    policy: s.policy,
                    start,
                    end,
                    conflicting: s.conflicting,
                })
            })
            .collect()
    }

    pub fn region_layout(&self, config: &AppConfig) -> Result<Option<RegionLayout>> {
        let Some(region) = &self.region else {
            return Ok(None);
        };
        Ok(Some(RegionLayout {
            element: ElementId::new(region.element.clone()),
            track: ElementId::new(region.track.clone()),
            items: region.items.iter().cloned().map(ElementId::new).collect(),
            item_start: parse_boundary(&config.region.item_start, "region.item_start")?,
            item_end: parse_boundary(&config.region.item_end, "region.item_end")?,
        }))
    }

    /// Whether triggers of `group` are suspended while the region is pinned
    pub fn conflicts_with_region(&self, group: TriggerGroup) -> bool {
        self.region
            .as_ref()
            .map(|r| r.conflicting_groups.contains(&group))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        title = "Portfolio"
        fragments = ["/partials/header.toml"]

        [viewport]
        width = 1440
        height = 900

        [[elements]]
        id = "hero"
        height = "100vh"
        width = "100vw"

        [[elements]]
        id = "about"
        top = "100vh"
        height = "100vh"
        width = "100vw"

        [intro]
        branding = "logo"
        headline = "hero-title"
        granularity = "lines"

        [scene]
        scroll_element = "hero"

        [[sections]]
        element = "about"
        heading = "about-title"
        policy = "enter_once"
        start = "top 70%"

        [region]
        element = "work"
        track = "work-track"
        items = ["card-1", "card-2"]
    "#;

    #[test]
    fn test_parse_manifest() {
        let manifest = PageManifest::from_toml(PAGE).unwrap();
        assert_eq!(manifest.viewport, Viewport::new(1440.0, 900.0));
        assert_eq!(manifest.elements.len(), 2);
        assert_eq!(manifest.intro.granularity, Granularity::Lines);
        assert_eq!(manifest.scene.as_ref().unwrap().object, "sphere");
        assert!(manifest.conflicts_with_region(TriggerGroup::Section));
        assert!(!manifest.conflicts_with_region(TriggerGroup::RegionItem));
    }

    #[test]
    fn test_section_configs_fill_defaults() {
        let manifest = PageManifest::from_toml(PAGE).unwrap();
        let sections = manifest.section_configs(&AppConfig::default()).unwrap();
        assert_eq!(sections[0].policy, RevealPolicy::EnterOnce);
        assert_eq!(sections[0].start, "top 70%".parse::<BoundaryExpr>().unwrap());
        assert_eq!(sections[0].end, "bottom 15%".parse::<BoundaryExpr>().unwrap());
    }

    #[test]
    fn test_rejects_duplicate_ids_and_bad_boundaries() {
        let dup = r#"
            [[elements]]
            id = "a"
            [[elements]]
            id = "a"
        "#;
        assert!(matches!(PageManifest::from_toml(dup), Err(Error::Manifest(_))));

        let bad = r#"
            [[sections]]
            element = "a"
            start = "sideways"
        "#;
        assert!(PageManifest::from_toml(bad).is_err());
    }
}
