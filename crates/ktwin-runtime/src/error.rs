//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while building or running a service.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A core operation failed, e.g. preloading the graph.
    #[error("Twin error: {0}")]
    Core(#[from] ktwin_core::KtwinError),

    /// Binding or serving the inbound server failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The outbound HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
