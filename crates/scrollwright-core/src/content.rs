//! Shared markup fragments injected before setup
//!
//! Setup queries the document for its elements, so fragments (header,
//! footer, menu) must be in place first. A fragment that fails to load is
//! logged and skipped; the elements it would have provided are simply
//! absent.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dom::{Document, ElementSpec};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

#[async_trait::async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load_fragment(&self, url: &str) -> Result<ContentNode>;
}

/// Fragments held in memory, served after an optional delay
#[derive(Debug, Clone, Default)]
pub struct StaticContentLoader {
    fragments: HashMap<String, ContentNode>,
    delay: Duration,
}

impl StaticContentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fragment(mut self, url: impl Into<String>, node: ContentNode) -> Self {
        self.fragments.insert(url.into(), node);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl ContentLoader for StaticContentLoader {
    async fn load_fragment(&self, url: &str) -> Result<ContentNode> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.fragments
            .get(url)
            .cloned()
            .ok_or_else(|| Error::ContentLoad(format!("no fragment at '{}'", url)))
    }
}

/// Fragments stored as TOML files under a root directory
#[derive(Debug, Clone)]
pub struct DirContentLoader {
    root: PathBuf,
}

impl DirContentLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl ContentLoader for DirContentLoader {
    async fn load_fragment(&self, url: &str) -> Result<ContentNode> {
        let path = self.root.join(url.trim_start_matches('/'));
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::ContentLoad(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&raw).map_err(|e| Error::ContentLoad(format!("{}: {}", path.display(), e)))
    }
}

/// Load every fragment in order and insert its elements
///
/// Returns the failures; the document is reflowed once if anything was added.
pub async fn inject_fragments(
    loader: &dyn ContentLoader,
    urls: &[String],
    doc: &mut Document,
) -> Vec<Error> {
    let mut failures = Vec::new();
    let mut inserted = 0;
    for url in urls {
        let node = match loader.load_fragment(url).await {
            Ok(node) => node,
            Err(e) => {
                warn!(url = %url, error = %e, "Fragment failed to load, continuing without it");
                failures.push(e);
                continue;
            }
        };
        for spec in &node.elements {
            match doc.insert_spec(spec) {
                Ok(()) => inserted += 1,
                Err(e) => {
                    warn!(url = %url, error = %e, "Skipping invalid fragment element");
                    failures.push(e);
                }
            }
        }
        debug!(url = %url, elements = node.elements.len(), "Fragment injected");
    }
    if inserted > 0 {
        if let Some(viewport) = doc.viewport() {
            doc.reflow(viewport);
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementId, Viewport};

    fn header() -> ContentNode {
        toml::from_str(
            r#"
            [[elements]]
            id = "site-header"
            top = "0px"
            width = "100vw"
            height = "10vh"
            text = "Studio"
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_inject_fragments_reflows() {
        let loader = StaticContentLoader::new().with_fragment("/header.html", header());
        let mut doc = Document::from_specs(&[], Viewport::new(1000.0, 800.0)).unwrap();
        let failures = inject_fragments(&loader, &["/header.html".to_string()], &mut doc).await;
        assert!(failures.is_empty());
        let rect = doc.rect(&ElementId::new("site-header")).unwrap();
        assert_eq!(rect.height, 80.0);
    }

    #[tokio::test]
    async fn test_missing_fragment_is_soft() {
        let loader = StaticContentLoader::new().with_fragment("/header.html", header());
        let mut doc = Document::new();
        let urls = vec!["/menu.html".to_string(), "/header.html".to_string()];
        let failures = inject_fragments(&loader, &urls, &mut doc).await;
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], Error::ContentLoad(_)));
        assert!(doc.contains(&ElementId::new("site-header")));
    }

    #[tokio::test]
    async fn test_dir_loader_reads_toml() {
        let dir = std::env::temp_dir().join(format!("scrollwright-frag-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("footer.toml"),
            "[[elements]]\nid = \"footer\"\nheight = \"20vh\"\n",
        )
        .unwrap();

        let loader = DirContentLoader::new(&dir);
        let node = loader.load_fragment("/footer.toml").await.unwrap();
        assert_eq!(node.elements[0].id, "footer");
        assert!(loader.load_fragment("missing.toml").await.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
