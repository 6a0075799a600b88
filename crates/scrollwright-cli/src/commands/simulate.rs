use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use scrollwright_core::capabilities::SceneStatus;
use scrollwright_core::content::{ContentLoader, DirContentLoader};
use scrollwright_core::intro::IntroState;
use scrollwright_core::responsive::ResponsiveMode;
use scrollwright_core::scene::{SceneLoader, ScriptedSceneLoader};
use scrollwright_core::trigger::Signal;
use scrollwright_core::{AppConfig, EngineEvent, Page, PageManifest, PageRuntime};

use crate::script::SessionScript;

pub struct SimulateOptions {
    pub script: Option<PathBuf>,
    pub scene_delay_ms: u64,
    pub scene_fail: bool,
    pub fragments: Option<PathBuf>,
    pub json: bool,
}

#[derive(Serialize)]
struct EventLine<'a> {
    at_ms: u64,
    #[serde(flatten)]
    event: &'a EngineEvent,
}

#[derive(Debug, Serialize)]
struct Summary {
    intro: IntroState,
    mode: Option<ResponsiveMode>,
    scroll: f64,
    triggers: usize,
    rebuild_passes: u64,
    discarded_inputs: u64,
    scene: SceneStatus,
}

impl Summary {
    fn from_page(page: &Page) -> Self {
        Self {
            intro: page.intro_state(),
            mode: page.mode(),
            scroll: page.scroll(),
            triggers: page.registry().len(),
            rebuild_passes: page.rebuild_passes(),
            discarded_inputs: page.gate().discarded(),
            scene: page.capabilities().scene,
        }
    }
}

pub async fn run(config: Arc<AppConfig>, manifest_path: &Path, options: SimulateOptions) -> Result<()> {
    let manifest = PageManifest::load_from(manifest_path)?;
    let script = match &options.script {
        Some(path) => SessionScript::load(path)?,
        None => SessionScript::default_walk(&manifest),
    };

    let scene_loader = manifest.scene.as_ref().map(|scene| {
        let delay = Duration::from_millis(options.scene_delay_ms);
        let loader = if options.scene_fail {
            ScriptedSceneLoader::failing(delay, "scene assets unavailable")
        } else {
            ScriptedSceneLoader::succeeding(delay, &[scene.object.as_str()])
        };
        Arc::new(loader) as Arc<dyn SceneLoader>
    });

    let content_loader = if manifest.fragments.is_empty() {
        None
    } else {
        let root = options
            .fragments
            .clone()
            .or_else(|| manifest_path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        debug!(root = %root.display(), "Reading fragments from directory");
        Some(Arc::new(DirContentLoader::new(root)) as Arc<dyn ContentLoader>)
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let builder = Page::builder(config, manifest).event_sender(event_tx);
    let runtime = PageRuntime::new(builder, scene_loader, content_loader)?;

    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let page_task = tokio::spawn(runtime.run(host_rx, shutdown_rx));

    let started = Instant::now();
    let json = options.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let at_ms = started.elapsed().as_millis() as u64;
            print_event(at_ms, &event, json);
        }
    });

    info!(
        steps = script.steps.len(),
        duration_ms = script.duration_ms(),
        "Playing session script"
    );

    for step in &script.steps {
        tokio::time::sleep_until(started + Duration::from_millis(step.at_ms)).await;
        debug!(at_ms = step.at_ms, event = ?step.event, "Sending host event");
        if host_tx.send(step.event.clone()).is_err() {
            warn!("Page runtime stopped before the script finished");
            break;
        }
    }
    tokio::time::sleep_until(started + Duration::from_millis(script.duration_ms())).await;

    if shutdown_tx.send(true).is_err() {
        debug!("Page runtime already stopped");
    }
    let page = page_task.await?;
    let summary = Summary::from_page(&page);

    // The page holds the event sender; dropping it lets the printer finish
    drop(page);
    printer.await?;

    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!();
        println!("intro:    {:?}", summary.intro);
        match summary.mode {
            Some(mode) => println!("mode:     {}", mode),
            None => println!("mode:     -"),
        }
        println!("scroll:   {:.0}", summary.scroll);
        println!("triggers: {}", summary.triggers);
        println!("rebuilds: {}", summary.rebuild_passes);
        println!("discarded inputs: {}", summary.discarded_inputs);
        println!("scene:    {:?}", summary.scene);
    }

    Ok(())
}

fn print_event(at_ms: u64, event: &EngineEvent, json: bool) {
    if json {
        match serde_json::to_string(&EventLine { at_ms, event }) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(error = %e, "Failed to encode event"),
        }
    } else {
        println!("{:>6}ms  {}", at_ms, describe(event));
    }
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::IntroStage { stage } => format!("intro      {:?}", stage),
        EngineEvent::TriggerFired { trigger, signal } => match signal {
            Signal::Edge { edge } => format!("trigger    {} {:?}", trigger, edge),
            Signal::Progress { progress } => format!("trigger    {} {:.3}", trigger, progress),
        },
        EngineEvent::SectionChanged { index, visual } => {
            format!("section    #{} {:?}", index, visual)
        }
        EngineEvent::DetailRevealed { index } => format!("detail     #{}", index),
        EngineEvent::RegionActivated { suspended } => {
            format!("region     pinned, {} suspended", suspended)
        }
        EngineEvent::RegionDeactivated { restored } => {
            format!("region     released, {} restored", restored)
        }
        EngineEvent::ModeChanged { from, to } => match from {
            Some(from) => format!("mode       {} -> {}", from, to),
            None => format!("mode       {}", to),
        },
        EngineEvent::RebuildCompleted {
            pass,
            triggers,
            failures,
        } => format!(
            "rebuild    pass {} ({} triggers, {} failed steps)",
            pass, triggers, failures
        ),
        EngineEvent::ScrollReset { discarded } => {
            format!("scroll     reset ({} inputs discarded)", discarded)
        }
        EngineEvent::SceneLoaded => "scene      loaded".to_string(),
        EngineEvent::SoftFailure { source, message } => {
            format!("failure    {}: {}", source, message)
        }
    }
}
