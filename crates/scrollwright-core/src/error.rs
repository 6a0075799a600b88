use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Element not found: {0}")]
    MissingElement(String),

    #[error("Asset load error: {0}")]
    AssetLoad(String),

    #[error("Text split error on '{element}': {reason}")]
    TextSplit { element: String, reason: String },

    #[error("Boundary computation error: {0}")]
    Boundary(String),

    #[error("Invalid boundary expression: {0}")]
    InvalidBoundary(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Content load error: {0}")]
    ContentLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
