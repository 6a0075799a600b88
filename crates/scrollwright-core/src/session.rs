//! Animation session state
//!
//! Everything a page's animations own lives here instead of in ambient
//! globals: the live trigger set, the live text splits, and an id that
//! asynchronous work captures so a result arriving after teardown can be
//! recognised and dropped.

use std::time::Instant;

use tracing::debug;
use uuid::Uuid;

use crate::animation::Animator;
use crate::dom::Document;
use crate::text::{SplitRegistry, TextSplitter};
use crate::trigger::TriggerRegistry;

#[derive(Debug)]
pub struct AnimationSession {
    id: Uuid,
    pub registry: TriggerRegistry,
    pub splits: SplitRegistry,
}

impl Default for AnimationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            registry: TriggerRegistry::new(),
            splits: SplitRegistry::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_current(&self, id: Uuid) -> bool {
        self.id == id
    }

    /// Tear down every trigger and split, keeping the session id
    pub fn reset(&mut self, animator: &mut dyn Animator, doc: &mut Document) -> (usize, usize) {
        let triggers = self.registry.unregister_all(animator);
        let splits = self.splits.revert_all(doc);
        debug!(session = %self.id, triggers, splits, "Session reset");
        (triggers, splits)
    }

    /// Reset and start a new session; results tagged with the old id become stale
    pub fn renew(&mut self, animator: &mut dyn Animator, doc: &mut Document) -> Uuid {
        self.reset(animator, doc);
        let previous = std::mem::replace(&mut self.id, Uuid::new_v4());
        debug!(previous = %previous, session = %self.id, "Session renewed");
        self.id
    }
}

/// Mutable view over the page surface handed to controllers for one operation
pub struct EffectContext<'a> {
    pub doc: &'a mut Document,
    pub animator: &'a mut dyn Animator,
    /// `None` when text splitting is unavailable
    pub splitter: Option<&'a dyn TextSplitter>,
    pub registry: &'a mut TriggerRegistry,
    pub splits: &'a mut SplitRegistry,
    pub now: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Tweener;
    use crate::dom::{Element, ElementId, LayoutBox};
    use crate::text::{GraphemeSplitter, Granularity};
    use crate::trigger::{Route, Trigger};

    #[test]
    fn test_reset_keeps_id_and_clears_state() {
        let mut session = AnimationSession::new();
        let mut tw = Tweener::new();
        let mut doc = Document::new();
        doc.insert(Element::new("title", LayoutBox::default()).with_text("hi"));

        session
            .splits
            .split(&GraphemeSplitter, &mut doc, &"title".into(), Granularity::Chars)
            .unwrap();
        session
            .registry
            .register(Trigger::new("s", Route::Section(0), ElementId::new("title")), &mut tw);

        let id = session.id();
        assert_eq!(session.reset(&mut tw, &mut doc), (1, 1));
        assert_eq!(session.id(), id);
        assert!(session.registry.is_empty());
        assert_eq!(doc.text_content(&"title".into()).unwrap(), "hi");
    }

    #[test]
    fn test_renew_invalidates_previous_id() {
        let mut session = AnimationSession::new();
        let mut tw = Tweener::new();
        let mut doc = Document::new();
        let old = session.id();
        let new = session.renew(&mut tw, &mut doc);
        assert_ne!(old, new);
        assert!(!session.is_current(old));
        assert!(session.is_current(new));
    }
}
