pub mod animation;
pub mod capabilities;
pub mod config;
pub mod content;
pub mod dom;
pub mod error;
pub mod event;
pub mod gate;
pub mod intro;
pub mod manifest;
pub mod page;
pub mod region;
pub mod resize;
pub mod responsive;
pub mod reveal;
pub mod runtime;
pub mod scene;
pub mod session;
pub mod text;
pub mod trigger;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use event::EngineEvent;
pub use manifest::PageManifest;
pub use page::{Page, PageBuilder};
pub use runtime::{HostEvent, PageRuntime};
