//! Configuration validation utilities.

use ktwin_core::TwinGraph;

use super::error::{ConfigError, ConfigResult};
use super::schema::{EndpointsConfig, KtwinConfig, LoggingConfig, ServerConfig, ServiceConfig};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validates the entire configuration.
pub fn validate_config(config: &KtwinConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_service_config(&config.service)?;
    validate_server_config(&config.server)?;

    if config.http.timeout_ms == 0 {
        return Err(ConfigError::validation("Timeout must be greater than 0"));
    }

    if !config.service.mode.is_offline() {
        validate_endpoints(&config.endpoints)?;
    }

    if let Some(raw) = config.graph.static_json() {
        TwinGraph::from_json(raw.as_bytes()).map_err(|e| {
            ConfigError::validation(format!("graph.static_graph is not a valid twin graph: {e}"))
        })?;
    }

    Ok(())
}

fn validate_log_level(level: &str) -> ConfigResult<()> {
    if !VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        return Err(ConfigError::validation(format!(
            "Invalid log level: {}. Valid values are: {:?}",
            level, VALID_LOG_LEVELS
        )));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    validate_log_level(&logging.level)?;
    for level in logging.filters.values() {
        validate_log_level(level)?;
    }
    Ok(())
}

fn validate_service_config(service: &ServiceConfig) -> ConfigResult<()> {
    if service.name.is_empty() {
        return Err(ConfigError::missing_field("service.name"));
    }
    if service.namespace.is_empty() {
        return Err(ConfigError::missing_field("service.namespace"));
    }
    if service.namespace.contains('.') {
        return Err(ConfigError::validation("Namespace cannot contain '.'"));
    }
    Ok(())
}

fn validate_server_config(server: &ServerConfig) -> ConfigResult<()> {
    validate_port(server.port)?;
    validate_path(&server.path)
}

fn validate_endpoints(endpoints: &EndpointsConfig) -> ConfigResult<()> {
    let required = [
        ("endpoints.graph_url", &endpoints.graph_url),
        ("endpoints.event_store_url", &endpoints.event_store_url),
        ("endpoints.broker_url", &endpoints.broker_url),
    ];

    for (field, url) in required {
        match url.as_deref() {
            Some(url) if !url.is_empty() => validate_url(url)?,
            _ => return Err(ConfigError::missing_field(field)),
        }
    }
    Ok(())
}

/// Validates an HTTP(S) URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    let valid_schemes = ["http://", "https://"];

    match valid_schemes.iter().find_map(|s| url.strip_prefix(s)) {
        None => Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {:?}", valid_schemes),
        )),
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            Err(ConfigError::invalid_url(url, "URL has no host"))
        }
        Some(_) => Ok(()),
    }
}

/// Validates a port number.
fn validate_port(port: u16) -> ConfigResult<()> {
    if port == 0 {
        return Err(ConfigError::InvalidPort(port));
    }
    Ok(())
}

/// Validates a path.
fn validate_path(path: &str) -> ConfigResult<()> {
    if !path.starts_with('/') {
        return Err(ConfigError::validation("Path must start with '/'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;

    fn live_config() -> KtwinConfig {
        let mut config = KtwinConfig::default();
        config.endpoints.graph_url = Some("http://graph:8080".into());
        config.endpoints.event_store_url = Some("http://store:8080".into());
        config.endpoints.broker_url = Some("https://broker".into());
        config
    }

    #[test]
    fn test_validate_live_config() {
        assert!(validate_config(&live_config()).is_ok());
    }

    #[test]
    fn test_offline_mode_needs_no_endpoints() {
        let mut config = KtwinConfig::default();
        config.service.mode = Mode::Local;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = live_config();
        config.logging.level = "invalid".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = live_config();
        config
            .logging
            .filters
            .insert("ktwin_transport".into(), "loud".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_values() {
        let mut config = live_config();
        config.http.timeout_ms = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        let mut config = live_config();
        config.server.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidPort(0))
        ));
    }

    #[test]
    fn test_validate_path_and_namespace() {
        let mut config = live_config();
        config.server.path = "events".into();
        assert!(validate_config(&config).is_err());

        let mut config = live_config();
        config.service.namespace = "ktwin.city".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_endpoint_urls() {
        let mut config = live_config();
        config.endpoints.broker_url = None;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "endpoints.broker_url"
        ));

        let mut config = live_config();
        config.endpoints.graph_url = Some("graph:8080".into());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));

        let mut config = live_config();
        config.endpoints.event_store_url = Some("http://".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_static_graph() {
        let mut config = live_config();
        config.graph.static_graph = Some("{not json".into());
        assert!(validate_config(&config).is_err());

        config.graph.static_graph = Some(r#"{"twinInstances": []}"#.into());
        assert!(validate_config(&config).is_ok());
    }
}
