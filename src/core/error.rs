//! Error types for quadtree construction and configuration

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("world bounds must have positive area (got {area})")]
    InvalidBounds { area: f32 },

    #[error("tile size must be positive and finite (got {0})")]
    InvalidTileSize(f32),

    #[error("extent in tiles must be non-zero and fit the maximum tree depth (got {x}x{y})")]
    InvalidExtent { x: u32, y: u32 },

    #[error("surface index {0} has no registered render data")]
    UnknownSurface(u32),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
