//! Panel configuration

use crate::error::ParamsError;
use core::time::Duration;
use serde::{Deserialize, Serialize};

/// Configuration for the panel and the URL synchronizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Minimum time between two edit-driven `change` events (default: 50ms)
    pub throttle_ms: u64,
    /// Prefix for persisted lock/open keys (default: `params_`)
    pub storage_prefix: String,
    /// Largest accepted `name[i]` index in a query string (default: 64)
    pub max_array_index: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 50,
            storage_prefix: "params_".to_string(),
            max_array_index: 64,
        }
    }
}

impl PanelConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn with_throttle_ms(mut self, throttle_ms: u64) -> Self {
        self.throttle_ms = throttle_ms;
        self
    }

    /// Load from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        serde_json::from_str(json).map_err(|e| ParamsError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PanelConfig::from_json(r#"{ "throttle_ms": 10 }"#).unwrap();
        assert_eq!(config.throttle(), Duration::from_millis(10));
        assert_eq!(config.storage_prefix, "params_");
        assert_eq!(config.max_array_index, 64);
    }

    #[test]
    fn test_invalid_json() {
        let err = PanelConfig::from_json(r#"{ "throttle_ms": "fast" }"#).unwrap_err();
        assert!(matches!(err, ParamsError::InvalidConfig(_)));
        assert!(err.to_string().starts_with("invalid panel configuration"));
        assert!(PanelConfig::from_json("{ throttle_ms: }").is_err());
    }
}
