//! Async driver for a page
//!
//! Owns the page and feeds it host events, scene load results, animation
//! frames, and timed deadlines from a single `select!` loop until shutdown.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

use crate::content::ContentLoader;
use crate::dom::Viewport;
use crate::gate::InputEvent;
use crate::intro::IntroState;
use crate::page::{Page, PageBuilder};
use crate::scene::{Scene, SceneLoader};
use crate::Result;

/// Something the host reports to the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum HostEvent {
    /// Document is ready; starts the intro
    Ready,
    Scroll { offset: f64 },
    Input { event: InputEvent },
    Resize { width: f64, height: f64 },
    /// The page is being replaced
    Navigate,
}

struct SceneLoad {
    session: Uuid,
    result: Result<Box<dyn Scene>>,
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

pub struct PageRuntime {
    page: Page,
    scene_loader: Option<Arc<dyn SceneLoader>>,
    content_loader: Option<Arc<dyn ContentLoader>>,
}

impl PageRuntime {
    /// Build the page, telling it whether a scene will be loaded
    pub fn new(
        builder: PageBuilder,
        scene_loader: Option<Arc<dyn SceneLoader>>,
        content_loader: Option<Arc<dyn ContentLoader>>,
    ) -> Result<Self> {
        let page = builder.scene_loader(scene_loader.is_some()).build()?;
        Ok(Self {
            page,
            scene_loader,
            content_loader,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Run until shutdown is signalled or the host channel closes, returning the page
    pub async fn run(
        mut self,
        mut host_rx: mpsc::UnboundedReceiver<HostEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Page {
        let (scene_tx, mut scene_rx) = mpsc::unbounded_channel::<SceneLoad>();
        let frame = self.page.config().animation.frame_interval();
        let mut frames = tokio::time::interval(frame);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(frame_ms = frame.as_millis() as u64, "Page runtime started");

        loop {
            let deadline = self.page.next_deadline();
            let animating = self.page.is_animating();

            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("Page runtime received shutdown signal");
                        break;
                    }
                }

                event = host_rx.recv() => {
                    match event {
                        Some(event) => self.handle_host(event, &scene_tx).await,
                        None => {
                            debug!("Host channel closed");
                            break;
                        }
                    }
                }

                Some(load) = scene_rx.recv() => {
                    self.page.on_scene_loaded(load.session, load.result, now());
                }

                _ = frames.tick(), if animating => {
                    self.page.tick(now());
                }

                _ = sleep_until(deadline), if deadline.is_some() => {
                    self.page.tick(now());
                }
            }
        }

        info!("Page runtime stopped");
        self.page
    }

    async fn handle_host(&mut self, event: HostEvent, scene_tx: &mpsc::UnboundedSender<SceneLoad>) {
        debug!(event = ?event, "Host event");
        match event {
            HostEvent::Ready => {
                if self.page.intro_state() != IntroState::Idle {
                    debug!("Ready received twice, ignoring");
                    return;
                }
                if let Some(loader) = &self.content_loader {
                    self.page.inject_fragments(loader.as_ref()).await;
                }
                self.page.on_ready(now());
                if let Some(loader) = &self.scene_loader {
                    self.spawn_scene_load(loader.clone(), scene_tx.clone());
                }
            }
            HostEvent::Scroll { offset } => {
                self.page.on_scroll(offset, now());
            }
            HostEvent::Input { event } => {
                self.page.on_input(event, now());
            }
            HostEvent::Resize { width, height } => {
                self.page.on_resize(Viewport::new(width, height), now());
            }
            HostEvent::Navigate => {
                self.page.teardown(now());
            }
        }
    }

    /// Load the scene in the background, tagged with the current session
    fn spawn_scene_load(&self, loader: Arc<dyn SceneLoader>, tx: mpsc::UnboundedSender<SceneLoad>) {
        let session = self.page.session_id();
        tokio::spawn(async move {
            let result = loader.load().await;
            if tx.send(SceneLoad { session, result }).is_err() {
                debug!(session = %session, "Runtime stopped before scene load finished");
            }
        });
    }
}
