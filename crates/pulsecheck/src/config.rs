//! Server configuration.
//!
//! Defaults suit local development. In deployment the two knobs the
//! hosting environment sets are read from the process environment:
//!
//! | Variable        | Effect                                     |
//! |-----------------|--------------------------------------------|
//! | `PORT`          | listening port on `0.0.0.0`                |
//! | `CLIENT_ORIGIN` | only browser handshakes from this origin   |

use std::time::Duration;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3001;

/// Minimum spacing between two accepted feedback events from one
/// connection.
pub const DEFAULT_FEEDBACK_INTERVAL: Duration = Duration::from_millis(500);

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `PORT` is set but isn't a valid port number.
    #[error("invalid PORT {0:?}: expected an integer between 0 and 65535")]
    InvalidPort(String),
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_addr: String,

    /// The one browser origin allowed to open a connection. `None`
    /// accepts every origin.
    pub allowed_origin: Option<String>,

    /// Feedback arriving sooner than this after the previous accepted
    /// feedback from the same connection is dropped.
    pub feedback_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            allowed_origin: None,
            feedback_interval: DEFAULT_FEEDBACK_INTERVAL,
        }
    }
}

impl ServerConfig {
    /// Reads `PORT` and `CLIENT_ORIGIN` from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidPort`] if `PORT` doesn't parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("PORT") {
            let port: u16 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        config.allowed_origin = lookup("CLIENT_ORIGIN")
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty());

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_empty_env_uses_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert!(config.allowed_origin.is_none());
        assert_eq!(config.feedback_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_from_lookup_reads_port_and_origin() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("CLIENT_ORIGIN", "http://localhost:5173"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(
            config.allowed_origin.as_deref(),
            Some("http://localhost:5173")
        );
    }

    #[test]
    fn test_from_lookup_invalid_port_returns_error() {
        let result =
            ServerConfig::from_lookup(lookup_from(&[("PORT", "eighty")]));

        assert!(matches!(result, Err(ConfigError::InvalidPort(p)) if p == "eighty"));
    }

    #[test]
    fn test_from_lookup_blank_origin_means_unrestricted() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("CLIENT_ORIGIN", "  ")]))
                .unwrap();

        assert!(config.allowed_origin.is_none());
    }
}
