use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use serde::Serialize;

use scrollwright_core::dom::Viewport;
use scrollwright_core::responsive::ResponsiveMode;
use scrollwright_core::trigger::TriggerGroup;
use scrollwright_core::{AppConfig, Page, PageManifest};

/// Upper bound on simulated intro time before giving up
const SETTLE_LIMIT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct PlanRow {
    id: String,
    group: TriggerGroup,
    element: String,
    start: Option<f64>,
    end: Option<f64>,
    enabled: bool,
    pinned: bool,
    conflicting: bool,
    container: Option<String>,
}

#[derive(Debug, Serialize)]
struct Plan {
    viewport: Viewport,
    mode: Option<ResponsiveMode>,
    max_scroll: f64,
    region_budget: Option<f64>,
    triggers: Vec<PlanRow>,
}

pub fn run(
    config: Arc<AppConfig>,
    manifest_path: &Path,
    width: Option<f64>,
    height: Option<f64>,
    json: bool,
) -> Result<()> {
    let manifest = PageManifest::load_from(manifest_path)?;
    let viewport = Viewport::new(
        width.unwrap_or(manifest.viewport.width),
        height.unwrap_or(manifest.viewport.height),
    );
    let plan = build_plan(config, manifest, viewport)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!(
        "Viewport {}x{}  mode {}  max scroll {:.0}",
        plan.viewport.width,
        plan.viewport.height,
        plan.mode.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string()),
        plan.max_scroll
    );
    if let Some(budget) = plan.region_budget {
        println!("Region budget {:.0}", budget);
    }
    println!();
    println!(
        "{:<22} {:<12} {:<16} {:>8} {:>8}  flags",
        "ID", "GROUP", "ELEMENT", "START", "END"
    );
    println!("{}", "-".repeat(80));
    for row in &plan.triggers {
        let mut flags = Vec::new();
        if !row.enabled {
            flags.push("disabled".to_string());
        }
        if row.pinned {
            flags.push("pin".to_string());
        }
        if row.conflicting {
            flags.push("conflicting".to_string());
        }
        if let Some(container) = &row.container {
            flags.push(format!("in {}", container));
        }
        println!(
            "{:<22} {:<12} {:<16} {:>8} {:>8}  {}",
            row.id,
            format!("{:?}", row.group),
            row.element,
            fmt_offset(row.start),
            fmt_offset(row.end),
            flags.join(", ")
        );
    }
    println!("\nTotal: {} triggers", plan.triggers.len());

    Ok(())
}

fn fmt_offset(value: Option<f64>) -> String {
    value.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "-".to_string())
}

/// Play the intro on a simulated clock and capture the resulting trigger set
fn build_plan(config: Arc<AppConfig>, manifest: PageManifest, viewport: Viewport) -> Result<Plan> {
    let mut page = Page::builder(config.clone(), manifest)
        .viewport(viewport)
        .build()?;

    let frame = config.animation.frame_interval();
    let t0 = Instant::now();
    let mut elapsed = Duration::ZERO;
    page.on_ready(t0);
    while !page.is_steady() {
        if elapsed > SETTLE_LIMIT {
            bail!("intro did not settle within {}s", SETTLE_LIMIT.as_secs());
        }
        elapsed += frame;
        page.tick(t0 + elapsed);
    }

    let mut triggers: Vec<PlanRow> = page
        .registry()
        .iter()
        .map(|t| PlanRow {
            id: t.id().to_string(),
            group: t.tag(),
            element: t.element().to_string(),
            start: t.bounds().map(|(start, _)| start),
            end: t.bounds().map(|(_, end)| end),
            enabled: t.is_enabled(),
            pinned: t.is_pin(),
            conflicting: t.is_conflicting(),
            container: t.container().map(|c| c.to_string()),
        })
        .collect();
    triggers.sort_by(|a, b| {
        a.group
            .cmp(&b.group)
            .then_with(|| a.start.unwrap_or(0.0).total_cmp(&b.start.unwrap_or(0.0)))
    });

    Ok(Plan {
        viewport,
        mode: page.mode(),
        max_scroll: page.max_scroll(),
        region_budget: page.region().map(|r| r.budget()),
        triggers,
    })
}
