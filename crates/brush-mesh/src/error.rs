//! Error types for brush polygonization and map loading.

use thiserror::Error;

/// Result type for brush-mesh operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building planes or loading a map document.
///
/// Nothing inside a polygonization pass is fatal: a degenerate plane only
/// removes its own face, and an empty polygon is a valid outcome.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Degenerate plane: {0}")]
    DegeneratePlane(String),

    #[error("Failed to read map file: {0}")]
    Io(#[from] std::io::Error),
}
