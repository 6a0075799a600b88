//! Layout model consumed by the engine.
//!
//! A `Document` is a flat store of elements with document-space rectangles.
//! Geometry is declared in viewport-relative lengths and resolved by
//! [`Document::reflow`], which is what a resize does to a real page.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier of a layout element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A viewport with a non-finite or non-positive extent cannot be measured against
    pub fn is_measurable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A length in pixels or relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    Vw(f64),
    Vh(f64),
}

impl Default for Length {
    fn default() -> Self {
        Length::Px(0.0)
    }
}

impl Length {
    pub fn resolve(&self, viewport: Viewport) -> f64 {
        match *self {
            Length::Px(v) => v,
            Length::Vw(v) => v * viewport.width / 100.0,
            Length::Vh(v) => v * viewport.height / 100.0,
        }
    }
}

impl FromStr for Length {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (number, ctor): (&str, fn(f64) -> Length) = if let Some(n) = s.strip_suffix("vw") {
            (n, Length::Vw)
        } else if let Some(n) = s.strip_suffix("vh") {
            (n, Length::Vh)
        } else if let Some(n) = s.strip_suffix("px") {
            (n, Length::Px)
        } else {
            (s, Length::Px)
        };
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| Error::Manifest(format!("invalid length '{}'", s)))?;
        if !value.is_finite() {
            return Err(Error::Manifest(format!("invalid length '{}'", s)));
        }
        Ok(ctor(value))
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Px(v) => write!(f, "{}px", v),
            Length::Vw(v) => write!(f, "{}vw", v),
            Length::Vh(v) => write!(f, "{}vh", v),
        }
    }
}

impl TryFrom<String> for Length {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Length> for String {
    fn from(value: Length) -> Self {
        value.to_string()
    }
}

impl Serialize for Length {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Length {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Declared geometry of an element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutBox {
    #[serde(default)]
    pub left: Length,
    #[serde(default)]
    pub top: Length,
    #[serde(default)]
    pub width: Length,
    #[serde(default)]
    pub height: Length,
}

impl LayoutBox {
    pub fn resolve(&self, viewport: Viewport) -> Rect {
        Rect {
            x: self.left.resolve(viewport),
            y: self.top.resolve(viewport),
            width: self.width.resolve(viewport),
            height: self.height.resolve(viewport),
        }
    }
}

/// Element description as written in a page manifest or content fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub id: String,
    #[serde(flatten)]
    pub layout: LayoutBox,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    /// Declared geometry; `None` means the element occupies its parent's box
    pub layout: Option<LayoutBox>,
    pub rect: Rect,
    pub text: Option<String>,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
}

impl Element {
    pub fn new(id: impl Into<ElementId>, layout: LayoutBox) -> Self {
        Self {
            id: id.into(),
            layout: Some(layout),
            rect: Rect::default(),
            text: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Inline element that takes its parent's box (split text tokens)
    pub fn inline(id: ElementId, parent: ElementId, text: String) -> Self {
        Self {
            id,
            layout: None,
            rect: Rect::default(),
            text: Some(text),
            parent: Some(parent),
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<ElementId>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Scroll distance held open below a pinned element
#[derive(Debug, Clone, PartialEq)]
struct PinSpacer {
    element: ElementId,
    spacing: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: HashMap<ElementId, Element>,
    order: Vec<ElementId>,
    viewport: Option<Viewport>,
    spacer: Option<PinSpacer>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from element specs and lay it out for `viewport`
    pub fn from_specs(specs: &[ElementSpec], viewport: Viewport) -> Result<Self> {
        let mut doc = Self::new();
        for spec in specs {
            doc.insert_spec(spec)?;
        }
        doc.reflow(viewport);
        Ok(doc)
    }

    pub fn insert_spec(&mut self, spec: &ElementSpec) -> Result<()> {
        if spec.id.trim().is_empty() {
            return Err(Error::Manifest("element id must not be empty".to_string()));
        }
        let mut element = Element::new(ElementId::new(spec.id.clone()), spec.layout);
        element.text = spec.text.clone();
        element.parent = spec.parent.clone().map(ElementId::new);
        self.insert(element);
        Ok(())
    }

    /// Insert an element, replacing any element with the same id
    pub fn insert(&mut self, mut element: Element) {
        if self.elements.contains_key(&element.id) {
            self.remove(&element.id);
        }

        if let Some(viewport) = self.viewport {
            element.rect = match element.layout {
                Some(layout) => Self::spaced(layout.resolve(viewport), self.spacer_line(viewport)),
                None => self.inherited_rect(element.parent.as_ref()),
            };
        } else if element.layout.is_none() {
            element.rect = self.inherited_rect(element.parent.as_ref());
        }

        if let Some(parent) = element.parent.clone() {
            match self.elements.get_mut(&parent) {
                Some(p) => p.children.push(element.id.clone()),
                None => tracing::debug!(element = %element.id, parent = %parent, "Parent not present"),
            }
        }

        self.order.push(element.id.clone());
        self.elements.insert(element.id.clone(), element);
    }

    fn inherited_rect(&self, parent: Option<&ElementId>) -> Rect {
        parent
            .and_then(|p| self.elements.get(p))
            .map(|p| p.rect)
            .unwrap_or_default()
    }

    /// Remove an element and its subtree
    pub fn remove(&mut self, id: &ElementId) -> Option<Element> {
        let element = self.elements.remove(id)?;
        for child in &element.children {
            self.remove(child);
        }
        if let Some(parent) = &element.parent {
            if let Some(p) = self.elements.get_mut(parent) {
                p.children.retain(|c| c != id);
            }
        }
        self.order.retain(|e| e != id);
        Some(element)
    }

    /// Remove every child of `id`, keeping the element itself
    pub fn remove_children(&mut self, id: &ElementId) -> usize {
        let children = match self.elements.get(id) {
            Some(e) => e.children.clone(),
            None => return 0,
        };
        for child in &children {
            self.remove(child);
        }
        children.len()
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Look up an element that an effect cannot run without
    pub fn require(&self, id: &ElementId) -> Result<&Element> {
        self.elements
            .get(id)
            .ok_or_else(|| Error::MissingElement(id.to_string()))
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    pub fn rect(&self, id: &ElementId) -> Option<Rect> {
        self.elements.get(id).map(|e| e.rect)
    }

    pub fn set_text(&mut self, id: &ElementId, text: Option<String>) -> Result<()> {
        let element = self
            .elements
            .get_mut(id)
            .ok_or_else(|| Error::MissingElement(id.to_string()))?;
        element.text = text;
        Ok(())
    }

    /// Rendered text of an element: its own text, or the text of its children in order
    pub fn text_content(&self, id: &ElementId) -> Option<String> {
        let element = self.elements.get(id)?;
        if let Some(text) = &element.text {
            return Some(text.clone());
        }
        let mut out = String::new();
        for child in &element.children {
            if let Some(t) = self.text_content(child) {
                out.push_str(&t);
            }
        }
        Some(out)
    }

    pub fn children(&self, id: &ElementId) -> &[ElementId] {
        self.elements
            .get(id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// Hold `spacing` px of scroll open below `element` while it is pinned
    ///
    /// Every element laid out at or below the pinned element's bottom edge
    /// moves down by the spacing. Zero or a non-finite value removes it.
    pub fn set_pin_spacing(&mut self, element: &ElementId, spacing: f64) {
        let spacer = (spacing.is_finite() && spacing > 0.0).then(|| PinSpacer {
            element: element.clone(),
            spacing,
        });
        if spacer == self.spacer {
            return;
        }
        tracing::debug!(element = %element, spacing = spacer.as_ref().map_or(0.0, |s| s.spacing), "Pin spacing changed");
        self.spacer = spacer;
        if let Some(viewport) = self.viewport {
            self.reflow(viewport);
        }
    }

    /// Current pin spacing in px
    pub fn pin_spacing(&self) -> f64 {
        self.spacer.as_ref().map_or(0.0, |s| s.spacing)
    }

    /// Bottom edge of the pinned element and the spacing below it
    fn spacer_line(&self, viewport: Viewport) -> Option<(f64, f64)> {
        let spacer = self.spacer.as_ref()?;
        let layout = self.elements.get(&spacer.element)?.layout?;
        Some((layout.resolve(viewport).bottom(), spacer.spacing))
    }

    fn spaced(mut rect: Rect, line: Option<(f64, f64)>) -> Rect {
        if let Some((bottom, spacing)) = line {
            if rect.y + 1e-6 >= bottom {
                rect.y += spacing;
            }
        }
        rect
    }

    /// Resolve every element's rectangle against a new viewport
    pub fn reflow(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        let line = self.spacer_line(viewport);
        for id in &self.order {
            let (layout, parent) = match self.elements.get(id) {
                Some(e) => (e.layout, e.parent.clone()),
                None => continue,
            };
            let rect = match layout {
                Some(layout) => Self::spaced(layout.resolve(viewport), line),
                None => parent
                    .as_ref()
                    .and_then(|p| self.elements.get(p))
                    .map(|p| p.rect)
                    .unwrap_or_default(),
            };
            if let Some(e) = self.elements.get_mut(id) {
                e.rect = rect;
            }
        }
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Total scrollable height of the document
    pub fn scroll_height(&self) -> f64 {
        let spaced = self
            .viewport
            .and_then(|vp| self.spacer_line(vp))
            .map_or(0.0, |(bottom, spacing)| bottom + spacing);
        self.elements
            .values()
            .map(|e| e.rect.bottom())
            .filter(|b| b.is_finite())
            .fold(spaced, f64::max)
    }

    pub fn max_scroll(&self, viewport: Viewport) -> f64 {
        (self.scroll_height() - viewport.height).max(0.0)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ElementId> {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, top: &str, height: &str) -> ElementSpec {
        ElementSpec {
            id: id.to_string(),
            layout: LayoutBox {
                left: Length::Px(0.0),
                top: top.parse().unwrap(),
                width: Length::Vw(100.0),
                height: height.parse().unwrap(),
            },
            text: None,
            parent: None,
        }
    }

    #[test]
    fn test_length_parse() {
        assert_eq!("120vh".parse::<Length>().unwrap(), Length::Vh(120.0));
        assert_eq!("50vw".parse::<Length>().unwrap(), Length::Vw(50.0));
        assert_eq!("300px".parse::<Length>().unwrap(), Length::Px(300.0));
        assert_eq!("42".parse::<Length>().unwrap(), Length::Px(42.0));
        assert!("tall".parse::<Length>().is_err());
    }

    #[test]
    fn test_reflow_resolves_viewport_units() {
        let mut doc =
            Document::from_specs(&[spec("hero", "0vh", "100vh"), spec("about", "100vh", "80vh")], Viewport::new(1000.0, 800.0))
                .unwrap();
        assert_eq!(doc.rect(&"about".into()).unwrap().y, 800.0);
        assert_eq!(doc.scroll_height(), 1440.0);

        doc.reflow(Viewport::new(400.0, 600.0));
        assert_eq!(doc.rect(&"about".into()).unwrap().y, 600.0);
        assert_eq!(doc.rect(&"about".into()).unwrap().width, 400.0);
        assert_eq!(doc.max_scroll(Viewport::new(400.0, 600.0)), 480.0);
    }

    #[test]
    fn test_pin_spacing_pushes_later_content_down() {
        let vp = Viewport::new(1000.0, 800.0);
        let mut doc = Document::from_specs(
            &[
                spec("hero", "0vh", "100vh"),
                spec("work", "100vh", "100vh"),
                spec("work-track", "100vh", "50vh"),
                spec("contact", "200vh", "100vh"),
            ],
            vp,
        )
        .unwrap();
        assert_eq!(doc.max_scroll(vp), 1600.0);

        doc.set_pin_spacing(&"work".into(), 2000.0);
        assert_eq!(doc.rect(&"work".into()).unwrap().y, 800.0);
        assert_eq!(doc.rect(&"work-track".into()).unwrap().y, 800.0);
        assert_eq!(doc.rect(&"contact".into()).unwrap().y, 3600.0);
        assert_eq!(doc.max_scroll(vp), 3600.0);

        doc.insert_spec(&spec("footer", "300vh", "10vh")).unwrap();
        assert_eq!(doc.rect(&"footer".into()).unwrap().y, 4400.0);

        doc.set_pin_spacing(&"work".into(), f64::NAN);
        assert_eq!(doc.pin_spacing(), 0.0);
        assert_eq!(doc.rect(&"contact".into()).unwrap().y, 1600.0);
    }

    #[test]
    fn test_pin_spacing_alone_extends_scroll() {
        let vp = Viewport::new(1000.0, 800.0);
        let mut doc = Document::from_specs(&[spec("work", "0vh", "100vh")], vp).unwrap();
        assert_eq!(doc.max_scroll(vp), 0.0);
        doc.set_pin_spacing(&"work".into(), 1200.0);
        assert_eq!(doc.max_scroll(vp), 1200.0);
    }

    #[test]
    fn test_remove_subtree() {
        let mut doc = Document::new();
        doc.insert(Element::new("list", LayoutBox::default()));
        doc.insert(Element::new("item", LayoutBox::default()).with_parent("list"));
        assert_eq!(doc.children(&"list".into()).len(), 1);

        doc.remove(&"list".into());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_text_content_concatenates_children() {
        let mut doc = Document::new();
        doc.insert(Element::new("title", LayoutBox::default()));
        doc.insert(Element::inline("a".into(), "title".into(), "Hel".to_string()));
        doc.insert(Element::inline("b".into(), "title".into(), "lo".to_string()));
        assert_eq!(doc.text_content(&"title".into()).unwrap(), "Hello");
    }

    #[test]
    fn test_require_reports_missing() {
        let doc = Document::new();
        assert!(matches!(doc.require(&"nope".into()), Err(Error::MissingElement(_))));
    }
}
