//! Bridge configuration
//!
//! Loaded from TOML; every key is optional.
//!
//! ```toml
//! action_prefix = "__weft__"
//! fill_settle_delay_ms = 10
//! wait_poll_interval_ms = 50
//! wait_timeout_ms = 3000
//! react_marker_prefixes = ["__reactProps", "__reactEventHandlers"]
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Prepended to every inbound and outbound action name
    pub action_prefix: String,
    /// Pause between filling a field and blurring it
    pub fill_settle_delay_ms: u64,
    /// How often a wait-for re-checks its condition
    pub wait_poll_interval_ms: u64,
    /// Wait-for deadline when the request carries none
    pub wait_timeout_ms: u64,
    /// Own-property prefixes that mark an element as hydrated by React
    pub react_marker_prefixes: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            action_prefix: "__weft__".to_string(),
            fill_settle_delay_ms: 10,
            wait_poll_interval_ms: 50,
            wait_timeout_ms: 3000,
            react_marker_prefixes: vec![
                "__reactProps".to_string(),
                "__reactEventHandlers".to_string(),
            ],
        }
    }
}

impl BridgeConfig {
    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Parse and validate TOML text
    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wait_poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "wait_poll_interval_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.react_marker_prefixes.iter().any(String::is_empty) {
            return Err(ConfigError::InvalidValue {
                field: "react_marker_prefixes".to_string(),
                message: "prefixes must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Full action name for `name`
    pub fn action(&self, name: &str) -> String {
        format!("{}{}", self.action_prefix, name)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.fill_settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }

    /// Deadline for a wait, preferring the request's own timeout
    pub fn wait_timeout(&self, requested_ms: Option<u64>) -> Duration {
        Duration::from_millis(requested_ms.filter(|&ms| ms > 0).unwrap_or(self.wait_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = BridgeConfig::load_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.action("fillInput"), "__weft__fillInput");
    }

    #[test]
    fn test_partial_config() {
        let config = BridgeConfig::load_str(
            r#"
            action_prefix = "__acme__"
            wait_timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.action("waitFor"), "__acme__waitFor");
        assert_eq!(config.wait_timeout(None), Duration::from_millis(500));
        assert_eq!(config.wait_timeout(Some(20)), Duration::from_millis(20));
        assert_eq!(config.wait_timeout(Some(0)), Duration::from_millis(500));
        assert_eq!(config.fill_settle_delay_ms, 10);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = BridgeConfig::load_str("wait_poll_interval_ms = 0");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "fill_settle_delay_ms = 0").unwrap();
        writeln!(file, "react_marker_prefixes = [\"__reactFiber\"]").unwrap();

        let config = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(config.settle_delay(), Duration::ZERO);
        assert_eq!(config.react_marker_prefixes, ["__reactFiber"]);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = BridgeConfig::load(Path::new("/nonexistent/weft.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = BridgeConfig::load_str("action_prefix = [unclosed");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }
}
