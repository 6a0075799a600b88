//! Split text: decomposing an element's text into animatable tokens

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::dom::{Document, Element, ElementId};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Chars,
    Lines,
}

/// Live split of one element; `revert` restores the original text
#[derive(Debug, Clone)]
pub struct SplitText {
    element: ElementId,
    original: String,
    tokens: Vec<ElementId>,
    granularity: Granularity,
}

impl SplitText {
    pub fn element(&self) -> &ElementId {
        &self.element
    }

    pub fn tokens(&self) -> &[ElementId] {
        &self.tokens
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Remove the token elements and put the original text back
    pub fn revert(self, doc: &mut Document) -> Result<()> {
        for token in &self.tokens {
            doc.remove(token);
        }
        doc.set_text(&self.element, Some(self.original))
    }
}

pub trait TextSplitter: Send + Sync {
    fn split(&self, doc: &mut Document, element: &ElementId, granularity: Granularity) -> Result<SplitText>;
}

/// Splits on grapheme clusters (chars) or hard line breaks (lines)
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphemeSplitter;

impl GraphemeSplitter {
    fn check_markup(element: &ElementId, text: &str) -> Result<()> {
        let mut open = false;
        for c in text.chars() {
            match c {
                '<' if open => return Err(split_error(element, "nested '<' in markup")),
                '<' => open = true,
                '>' if !open => return Err(split_error(element, "unmatched '>' in markup")),
                '>' => open = false,
                _ => {}
            }
        }
        if open {
            return Err(split_error(element, "unterminated tag"));
        }
        Ok(())
    }
}

fn split_error(element: &ElementId, reason: &str) -> Error {
    Error::TextSplit {
        element: element.to_string(),
        reason: reason.to_string(),
    }
}

impl TextSplitter for GraphemeSplitter {
    fn split(&self, doc: &mut Document, element: &ElementId, granularity: Granularity) -> Result<SplitText> {
        let text = doc
            .require(element)?
            .text
            .clone()
            .ok_or_else(|| split_error(element, "element has no text"))?;
        Self::check_markup(element, &text)?;

        let pieces: Vec<String> = match granularity {
            Granularity::Chars => text.graphemes(true).map(str::to_string).collect(),
            Granularity::Lines => text.split_inclusive('\n').map(str::to_string).collect(),
        };
        if pieces.is_empty() {
            return Err(split_error(element, "nothing to split"));
        }

        let prefix = match granularity {
            Granularity::Chars => 'c',
            Granularity::Lines => 'l',
        };
        doc.set_text(element, None)?;
        let mut tokens = Vec::with_capacity(pieces.len());
        for (i, piece) in pieces.into_iter().enumerate() {
            let id = ElementId::new(format!("{}::{}{}", element, prefix, i));
            doc.insert(Element::inline(id.clone(), element.clone(), piece));
            tokens.push(id);
        }

        Ok(SplitText {
            element: element.clone(),
            original: text,
            tokens,
            granularity,
        })
    }
}

/// Every live split, at most one per element
#[derive(Debug, Default)]
pub struct SplitRegistry {
    splits: BTreeMap<ElementId, SplitText>,
}

impl SplitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `element`, reverting any split it already has first
    pub fn split(
        &mut self,
        splitter: &dyn TextSplitter,
        doc: &mut Document,
        element: &ElementId,
        granularity: Granularity,
    ) -> Result<&SplitText> {
        if let Some(previous) = self.splits.remove(element) {
            debug!(element = %element, "Reverting previous split before re-splitting");
            previous.revert(doc)?;
        }
        let split = splitter.split(doc, element, granularity)?;
        Ok(self.splits.entry(element.clone()).or_insert(split))
    }

    pub fn get(&self, element: &ElementId) -> Option<&SplitText> {
        self.splits.get(element)
    }

    pub fn revert(&mut self, doc: &mut Document, element: &ElementId) -> Result<bool> {
        match self.splits.remove(element) {
            Some(split) => split.revert(doc).map(|_| true),
            None => Ok(false),
        }
    }

    /// Revert every split; failures are logged and the rest still revert
    pub fn revert_all(&mut self, doc: &mut Document) -> usize {
        let splits = std::mem::take(&mut self.splits);
        let mut reverted = 0;
        for (element, split) in splits {
            match split.revert(doc) {
                Ok(()) => reverted += 1,
                Err(e) => tracing::warn!(element = %element, error = %e, "Failed to revert split"),
            }
        }
        reverted
    }

    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LayoutBox;

    fn doc_with(text: &str) -> Document {
        let mut doc = Document::new();
        doc.insert(Element::new("title", LayoutBox::default()).with_text(text));
        doc
    }

    #[test]
    fn test_split_chars() {
        let mut doc = doc_with("Héllo");
        let split = GraphemeSplitter
            .split(&mut doc, &"title".into(), Granularity::Chars)
            .unwrap();
        assert_eq!(split.tokens().len(), 5);
        assert_eq!(doc.text_content(&"title".into()).unwrap(), "Héllo");
    }

    #[test]
    fn test_split_lines_keeps_breaks() {
        let mut doc = doc_with("first line\nsecond line");
        let split = GraphemeSplitter
            .split(&mut doc, &"title".into(), Granularity::Lines)
            .unwrap();
        assert_eq!(split.tokens().len(), 2);
        assert_eq!(doc.text_content(&split.tokens()[0]).unwrap(), "first line\n");
    }

    #[test]
    fn test_revert_is_lossless() {
        let original = "Design, build & ship · 👩‍💻 twice";
        let mut doc = doc_with(original);
        let split = GraphemeSplitter
            .split(&mut doc, &"title".into(), Granularity::Chars)
            .unwrap();
        split.revert(&mut doc).unwrap();
        assert_eq!(doc.get(&"title".into()).unwrap().text.as_deref(), Some(original));
        assert!(doc.children(&"title".into()).is_empty());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_malformed_markup_fails() {
        let mut doc = doc_with("broken <em markup");
        let err = GraphemeSplitter
            .split(&mut doc, &"title".into(), Granularity::Chars)
            .unwrap_err();
        assert!(matches!(err, Error::TextSplit { .. }));
        assert_eq!(doc.text_content(&"title".into()).unwrap(), "broken <em markup");
    }

    #[test]
    fn test_registry_resplit_does_not_duplicate_tokens() {
        let mut doc = doc_with("abc");
        let mut registry = SplitRegistry::new();
        registry
            .split(&GraphemeSplitter, &mut doc, &"title".into(), Granularity::Chars)
            .unwrap();
        registry
            .split(&GraphemeSplitter, &mut doc, &"title".into(), Granularity::Chars)
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(doc.children(&"title".into()).len(), 3);
        assert_eq!(doc.len(), 4);

        assert_eq!(registry.revert_all(&mut doc), 1);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.text_content(&"title".into()).unwrap(), "abc");
    }
}
