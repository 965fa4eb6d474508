//! # KTWIN Runtime
//!
//! Everything a twin service needs around its handlers:
//!
//! - Layered configuration (`KtwinConfig`, `ConfigLoader`)
//! - Logging setup (`LoggingBuilder`)
//! - Collaborators for the configured mode (`build_context`)
//! - The inbound server lifecycle (`TwinRuntime`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Twin service       │  (handlers, routes)
//! ├─────────────────────┤
//! │  ktwin-runtime      │  <- This crate (config, logging, lifecycle)
//! ├─────────────────────┤
//! │  ktwin-framework    │  (dispatchers, service context)
//! ├─────────────────────┤
//! │  ktwin-transport    │  (HTTP gateways, offline collaborators)
//! ├─────────────────────┤
//! │  ktwin-core         │  (envelopes, graph, contracts)
//! └─────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use ktwin_runtime::{TwinRuntime, config::ConfigLoader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     let runtime = TwinRuntime::from_config(config, |ctx| routes(ctx))?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, KtwinConfig, LogFormat, LogOutput, Mode,
    load_config, load_config_from_file,
};
pub use context::build_context;
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{DispatchSink, TwinRuntime};

// Re-export tracing for use by service crates
pub use tracing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
