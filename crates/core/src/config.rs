//! Agent tuning loaded from TOML.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Name the server uses for this agent in entity lists and events.
    pub agent_name: String,
    /// Directory for stored level maps; `None` disables persistence.
    pub maps_dir: Option<PathBuf>,
    pub seed: u64,
    /// Cells of unobserved margin kept around every observation window.
    pub view_margin: i32,
    pub match_radius: i32,
    pub matcher_steps_per_tick: u32,
    /// A sighting counts as current for this many ticks.
    pub recent_sighting_ticks: u64,
    /// A stronger entity blocks search through its cell for this many ticks.
    pub danger_memory_ticks: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: "voxelbot".to_string(),
            maps_dir: None,
            seed: 0,
            view_margin: 10,
            match_radius: 4,
            matcher_steps_per_tick: 8,
            recent_sighting_ticks: 5,
            danger_memory_ticks: 100,
        }
    }
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent_name.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "agent_name", reason: "must not be empty".into() });
        }
        if self.match_radius <= 0 {
            return Err(ConfigError::Invalid {
                field: "match_radius",
                reason: format!("must be positive, got {}", self.match_radius),
            });
        }
        if self.view_margin < 0 {
            return Err(ConfigError::Invalid {
                field: "view_margin",
                reason: format!("must not be negative, got {}", self.view_margin),
            });
        }
        if self.matcher_steps_per_tick == 0 {
            return Err(ConfigError::Invalid {
                field: "matcher_steps_per_tick",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AgentConfig::from_toml_str("seed = 42\nmaps_dir = \"maps\"\n").unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.maps_dir, Some(PathBuf::from("maps")));
        assert_eq!(config.agent_name, "voxelbot");
        assert_eq!(config.match_radius, 4);
    }

    #[test]
    fn rejects_non_positive_radius() {
        let err = AgentConfig::from_toml_str("match_radius = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "match_radius", .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        fs::write(&path, "agent_name = \"delver\"\nmatcher_steps_per_tick = 2\n").unwrap();

        let config = AgentConfig::load(&path).unwrap();
        assert_eq!(config.agent_name, "delver");
        assert_eq!(config.matcher_steps_per_tick, 2);

        let missing = AgentConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }
}
