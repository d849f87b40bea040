use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MurmurError, Result};

/// Runtime limits and paths for compiled swarms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Maximum model/tool rounds inside a single agent turn.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// Maximum handoffs applied within one invocation.
    #[serde(default = "default_max_handoffs")]
    pub max_handoffs: u32,
    /// Messages of history kept when resuming a thread.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Checkpoint database path (SQLite). None = in-memory checkpointing.
    #[serde(default)]
    pub checkpoint_path: Option<String>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            max_handoffs: default_max_handoffs(),
            history_limit: default_history_limit(),
            checkpoint_path: None,
        }
    }
}

fn default_max_tool_rounds() -> usize {
    10
}

fn default_max_handoffs() -> u32 {
    25
}

fn default_history_limit() -> usize {
    200
}

impl SwarmConfig {
    /// Load configuration from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| MurmurError::Configuration(format!("Invalid config file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SwarmConfig::default();
        assert_eq!(config.max_tool_rounds, 10);
        assert_eq!(config.max_handoffs, 25);
        assert!(config.checkpoint_path.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: SwarmConfig = toml::from_str("max_handoffs = 3").unwrap();
        assert_eq!(config.max_handoffs, 3);
        assert_eq!(config.max_tool_rounds, 10);
    }
}
