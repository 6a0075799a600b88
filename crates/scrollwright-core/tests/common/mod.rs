#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use scrollwright_core::dom::Viewport;
use scrollwright_core::{AppConfig, Page, PageBuilder, PageManifest};

/// A portfolio page: hero, two sections, and a horizontally scrolling region
/// between them. The footer is tall enough to scroll through the pin.
pub const PORTFOLIO: &str = r#"
    title = "Portfolio"

    [viewport]
    width = 1280
    height = 800

    [[elements]]
    id = "hero"
    width = "100vw"
    height = "100vh"

    [[elements]]
    id = "logo"
    width = "120px"
    height = "40px"

    [[elements]]
    id = "headline"
    top = "30vh"
    width = "100vw"
    height = "20vh"
    text = "Hello"

    [[elements]]
    id = "about"
    top = "100vh"
    width = "100vw"
    height = "100vh"

    [[elements]]
    id = "about-title"
    top = "100vh"
    width = "100vw"
    height = "10vh"
    text = "About"

    [[elements]]
    id = "work"
    top = "200vh"
    width = "100vw"
    height = "100vh"

    [[elements]]
    id = "work-track"
    top = "200vh"
    width = "300vw"
    height = "100vh"

    [[elements]]
    id = "card-1"
    left = "40vw"
    top = "200vh"
    width = "30vw"
    height = "60vh"

    [[elements]]
    id = "card-2"
    left = "150vw"
    top = "200vh"
    width = "30vw"
    height = "60vh"

    [[elements]]
    id = "contact"
    top = "300vh"
    width = "100vw"
    height = "100vh"

    [[elements]]
    id = "footer"
    top = "400vh"
    width = "100vw"
    height = "300vh"

    [intro]
    branding = "logo"
    headline = "headline"

    [scene]
    scroll_element = "hero"

    [[sections]]
    element = "about"
    heading = "about-title"

    [[sections]]
    element = "contact"

    [region]
    element = "work"
    track = "work-track"
    items = ["card-1", "card-2"]
"#;

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

pub fn builder() -> PageBuilder {
    let manifest = PageManifest::from_toml(PORTFOLIO).unwrap();
    Page::builder(Arc::new(AppConfig::default()), manifest)
}

/// Tick every frame from `from` to `to` milliseconds after `t0`
pub fn run_frames(page: &mut Page, t0: Instant, from: u64, to: u64) {
    let mut at = from;
    while at <= to {
        page.tick(t0 + ms(at));
        at += 16;
    }
}

/// A page without a scene whose intro has finished; returns it with the current instant
pub fn steady_page(viewport: Viewport) -> (Page, Instant) {
    let mut page = builder().viewport(viewport).build().unwrap();
    let t0 = Instant::now();
    page.on_ready(t0);
    run_frames(&mut page, t0, 0, 3000);
    assert!(page.is_steady());
    (page, t0 + ms(3000))
}
