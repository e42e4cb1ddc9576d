//! Workspace configuration loaded from TOML with environment overrides.

use std::path::Path;

use serde::Deserialize;

use crate::error::{AtlasError, AtlasResult};

/// Top-level configuration for the CodeAtlas daemon and its services.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub graph: GraphSettings,
    pub redis: RedisSettings,
    pub watch: WatchSettings,
    pub queue: QueueSettings,
}

/// Neo4j connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "atlas_dev_2026".to_string(),
        }
    }
}

/// Redis connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub url: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Live-watch settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Quiet period after a filesystem event before it is treated as stable.
    pub settle_ms: u64,
    /// How far back (minutes) movement inference looks for deleted entities.
    pub move_window_minutes: i64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            settle_ms: 300,
            move_window_minutes: 5,
        }
    }
}

/// Write-queue settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub job_timeout_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            job_timeout_ms: 30_000,
        }
    }
}

impl AtlasConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file is absent. `ATLAS_GRAPH_URI` and `ATLAS_REDIS_URL` override the
    /// endpoints regardless of what the file says.
    pub fn load(path: Option<&Path>) -> AtlasResult<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)?;
                toml::from_str(&raw)
                    .map_err(|e| AtlasError::config(format!("{}: {}", p.display(), e)))?
            }
            Some(p) => {
                return Err(AtlasError::config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            None => Self::default(),
        };

        if let Ok(uri) = std::env::var("ATLAS_GRAPH_URI") {
            config.graph.uri = uri;
        }
        if let Ok(url) = std::env::var("ATLAS_REDIS_URL") {
            config.redis.url = url;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AtlasConfig::default();
        assert_eq!(config.graph.uri, "bolt://localhost:7687");
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.watch.settle_ms, 300);
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.toml");
        std::fs::write(&path, "[queue]\nmax_attempts = 7\n").unwrap();

        let config = AtlasConfig::load(Some(&path)).unwrap();
        assert_eq!(config.queue.max_attempts, 7);
        // Untouched sections keep defaults
        assert_eq!(config.redis.url, "redis://127.0.0.1:6379");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AtlasConfig::load(Some(Path::new("/nonexistent/atlas.toml")));
        assert!(result.is_err());
    }
}
