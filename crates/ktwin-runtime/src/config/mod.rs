//! Configuration for KTWIN services.
//!
//! Settings are layered with figment (defaults, files, `KTWIN_*` variables
//! and the legacy deployment variables) and validated before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    EndpointsConfig, GraphConfig, HttpConfig, KtwinConfig, LogFormat, LogOutput, LoggingConfig,
    Mode, ServerConfig, ServiceConfig,
};
pub use validation::validate_config;
