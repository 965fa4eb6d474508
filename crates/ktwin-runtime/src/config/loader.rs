//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML files (`ktwin.toml`, `config.toml`)
//! - `yaml-config`: enables YAML files (`ktwin.yaml`, `ktwin.yml`, etc.)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic defaults ([`ConfigLoader::merge`])
//! 3. Profile-specific config file (`ktwin.{profile}.toml`)
//! 4. Main config file (`ktwin.toml`) or an explicit file
//! 5. Legacy deployment variables (`ENV`, `KTWIN_GRAPH_URL`, ...)
//! 6. Environment variables (`KTWIN_*`)
//!
//! # Environment Variable Mapping
//!
//! `KTWIN_` prefixed variables use `__` as the nesting separator:
//!
//! - `KTWIN_SERVER__PORT=9000` → `server.port = 9000`
//! - `KTWIN_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! The variables existing deployments already set are mapped explicitly:
//!
//! | Variable | Key |
//! |----------|-----|
//! | `ENV` | `service.mode` |
//! | `KTWIN_GRAPH_URL` | `endpoints.graph_url` |
//! | `KTWIN_EVENT_STORE` | `endpoints.event_store_url` |
//! | `KTWIN_BROKER` | `endpoints.broker_url` |
//! | `KTWIN_GRAPH` | `graph.static_graph` |
//!
//! # Example
//!
//! ```rust,ignore
//! use ktwin_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./config/ktwin.toml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::KtwinConfig;
use super::validation::validate_config;

/// Prefix of structured environment variables.
const ENV_PREFIX: &str = "KTWIN_";

/// Variable selecting the configuration profile.
const PROFILE_VAR: &str = "KTWIN_PROFILE";

/// Deployment variables and the keys they set.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("ENV", "service.mode"),
    ("KTWIN_GRAPH_URL", "endpoints.graph_url"),
    ("KTWIN_EVENT_STORE", "endpoints.event_store_url"),
    ("KTWIN_BROKER", "endpoints.broker_url"),
    ("KTWIN_GRAPH", "graph.static_graph"),
];

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads the profile from `KTWIN_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Base figment instance.
    figment: Figment,
    /// Configuration profile.
    profile: Profile,
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration file when one is given.
    pub fn maybe_file<P: AsRef<Path>>(self, path: Option<P>) -> Self {
        match path {
            Some(path) => self.file(path),
            None => self,
        }
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges service defaults below files and environment variables.
    pub fn merge(mut self, config: KtwinConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<KtwinConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: KtwinConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            mode = %config.service.mode,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(KtwinConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.take() {
            if path.exists() {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, &path)?;
            } else {
                return Err(ConfigError::FileNotFound(path));
            }
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            figment = Self::merge_legacy_env(figment);

            trace!("Loading environment variables with KTWIN_ prefix");
            let legacy: Vec<&str> = LEGACY_ENV
                .iter()
                .filter_map(|(var, _)| var.strip_prefix(ENV_PREFIX))
                .chain(PROFILE_VAR.strip_prefix(ENV_PREFIX))
                .collect();
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&legacy).split("__"));
        }

        Ok(figment)
    }

    /// Merges the deployment variables listed in [`LEGACY_ENV`].
    ///
    /// Values are taken verbatim; `KTWIN_GRAPH` holds raw JSON.
    fn merge_legacy_env(mut figment: Figment) -> Figment {
        for &(var, key) in LEGACY_ENV {
            let Ok(value) = std::env::var(var) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            trace!(var, key, "Mapping deployment variable");
            figment = figment.merge(Serialized::default(key, value));
        }
        figment
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("ktwin"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Searches `search_paths × base_names` for one format.
    ///
    /// A profile-specific variant is merged before its base file. Returns as
    /// soon as a base file is found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path =
                    search_path.join(format!("{}.{}.{}", stem, self.profile.as_str(), ext));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    figment = merge_fn(figment, &base_path);
                    return (figment, true);
                }
            }
        }
        (figment, false)
    }

    /// Searches for and loads configuration files from search paths.
    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["ktwin.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["ktwin.yaml", "ktwin.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(paths = ?search_paths, "No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<KtwinConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<KtwinConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use figment::Jail;

    const LOCAL_TOML: &str = r#"
        [service]
        name = "parking"
        mode = "local"
        seed_instances = ["ngsi-ld-city-offstreetparking"]

        [server]
        port = 8081
    "#;

    #[test]
    fn test_file_in_search_path() {
        Jail::expect_with(|jail| {
            jail.create_file("ktwin.toml", LOCAL_TOML)?;

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.service.name, "parking");
            assert_eq!(config.service.mode, Mode::Local);
            assert_eq!(config.server.port, 8081);
            assert_eq!(config.server.path, "/");
            assert_eq!(config.http.timeout_ms, 10_000);
            Ok(())
        });
    }

    #[test]
    fn test_profile_file_is_overridden_by_base() {
        Jail::expect_with(|jail| {
            jail.create_file("ktwin.production.toml", "[server]\nport = 7000\npath = \"/events\"")?;
            jail.create_file("ktwin.toml", LOCAL_TOML)?;

            let config = ConfigLoader::new()
                .profile("prod")
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.server.path, "/events");
            assert_eq!(config.server.port, 8081);
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("ktwin.toml", LOCAL_TOML)?;
            jail.set_env("KTWIN_SERVER__PORT", "9000");
            jail.set_env("KTWIN_HTTP__RETRY_READS", "true");

            let config = ConfigLoader::new()
                .file(jail.directory().join("ktwin.toml"))
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.server.port, 9000);
            assert!(config.http.retry_reads);
            Ok(())
        });
    }

    #[test]
    fn test_legacy_variables() {
        Jail::expect_with(|jail| {
            let graph = r#"{"twinInstances":[{"name":"a","interface":"i","relationships":[]}]}"#;
            jail.set_env("ENV", "live");
            jail.set_env("KTWIN_GRAPH_URL", "http://graph:8080");
            jail.set_env("KTWIN_EVENT_STORE", "http://store:8080");
            jail.set_env("KTWIN_BROKER", "http://broker:8080");
            jail.set_env("KTWIN_GRAPH", graph);

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.service.mode, Mode::Live);
            assert_eq!(config.endpoints.graph_url.as_deref(), Some("http://graph:8080"));
            assert_eq!(
                config.endpoints.event_store_url.as_deref(),
                Some("http://store:8080")
            );
            assert_eq!(config.endpoints.broker_url.as_deref(), Some("http://broker:8080"));
            assert_eq!(config.graph.static_graph.as_deref(), Some(graph));
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_beats_legacy() {
        Jail::expect_with(|jail| {
            jail.set_env("ENV", "local");
            jail.set_env("KTWIN_SERVICE__MODE", "test");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.service.mode, Mode::Test);
            Ok(())
        });
    }

    #[test]
    fn test_merge_is_below_files() {
        Jail::expect_with(|jail| {
            jail.create_file("ktwin.toml", LOCAL_TOML)?;

            let mut defaults = KtwinConfig::default();
            defaults.service.name = "from-code".into();
            defaults.service.preload_graph = true;

            let config = ConfigLoader::new()
                .merge(defaults)
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.service.name, "parking");
            assert!(config.service.preload_graph);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/nonexistent/ktwin.toml")
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_live_mode_without_endpoints_fails() {
        Jail::expect_with(|jail| {
            let err = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::MissingField { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert!(matches!(Profile::parse("PROD"), Profile::Production));
        assert!(matches!(Profile::parse("dev"), Profile::Development));
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }
}
