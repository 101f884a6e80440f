//! Typed errors for asset, text and configuration handling.
//!
//! Loader entry points return `anyhow::Result` so that I/O, parser and GPU
//! failures can be chained with context. The enums below cover the cases this
//! crate detects itself and convert into `anyhow::Error` through `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unsupported model format for '{0}' (expected .obj, .glb or .gltf)")]
    UnsupportedFormat(String),

    #[error("model '{0}' contains no renderable meshes")]
    EmptyModel(String),

    #[error("invalid colour '{0}'")]
    InvalidColour(String),
}

#[derive(Debug, Error)]
pub enum TextError {
    #[error("typeface resolution must be positive, got {0}")]
    InvalidResolution(f32),

    #[error("malformed outline command '{command}' in glyph '{glyph}'")]
    MalformedOutline { glyph: char, command: String },

    #[error("triangulation failed: {0}")]
    Triangulation(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
