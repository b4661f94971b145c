use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub mod duration_serde;

use duration_serde::duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// External base URL used when building download links
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

/// Tuning knobs for the chunked export pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Smallest chunk size the planner will ever choose
    #[serde(default = "default_chunk_size_floor")]
    pub chunk_size_floor: u64,
    /// Largest chunk size the planner will ever choose
    #[serde(default = "default_chunk_size_ceiling")]
    pub chunk_size_ceiling: u64,
    /// Deflate level applied when packaging chunk files into a ZIP (0-9)
    #[serde(default = "default_zip_compression_level")]
    pub zip_compression_level: u32,
}

/// Artifact retention and cleanup policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// How long a stored artifact stays downloadable
    #[serde(default = "default_retention_period", with = "duration")]
    pub retention_period: Duration,
    /// Maximum number of live artifacts before capacity eviction kicks in
    #[serde(default = "default_max_artifacts")]
    pub max_artifacts: usize,
    /// Artifacts younger than this are never evicted for capacity reasons
    #[serde(default = "default_protected_age", with = "duration")]
    pub protected_age: Duration,
    /// Minimum time between opportunistic cleanup passes
    #[serde(default = "default_cleanup_interval", with = "duration")]
    pub cleanup_interval: Duration,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8710
}

fn default_base_url() -> String {
    "http://localhost:8710".to_string()
}

fn default_chunk_size_floor() -> u64 {
    1_000
}

fn default_chunk_size_ceiling() -> u64 {
    25_000
}

fn default_zip_compression_level() -> u32 {
    6
}

fn default_retention_period() -> Duration {
    Duration::from_secs(72 * 3600)
}

fn default_max_artifacts() -> usize {
    50
}

fn default_protected_age() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(30 * 60)
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            chunk_size_floor: default_chunk_size_floor(),
            chunk_size_ceiling: default_chunk_size_ceiling(),
            zip_compression_level: default_zip_compression_level(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retention_period: default_retention_period(),
            max_artifacts: default_max_artifacts(),
            protected_age: default_protected_age(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }

    /// Reject configurations the planner or registry cannot operate under.
    pub fn validate(&self) -> Result<()> {
        if self.export.chunk_size_floor == 0 {
            anyhow::bail!("export.chunk_size_floor must be positive");
        }
        if self.export.chunk_size_ceiling < self.export.chunk_size_floor {
            anyhow::bail!(
                "export.chunk_size_ceiling ({}) must be >= chunk_size_floor ({})",
                self.export.chunk_size_ceiling,
                self.export.chunk_size_floor
            );
        }
        if self.export.zip_compression_level > 9 {
            anyhow::bail!("export.zip_compression_level must be between 0 and 9");
        }
        if self.retention.max_artifacts == 0 {
            anyhow::bail!("retention.max_artifacts must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.export.chunk_size_floor, 1_000);
        assert_eq!(config.export.chunk_size_ceiling, 25_000);
        assert_eq!(config.retention.max_artifacts, 50);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [web]
            port = 9000

            [retention]
            retention_period = "24h"
            protected_age = "5m"
            "#,
        )
        .unwrap();

        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(
            config.retention.retention_period,
            Duration::from_secs(24 * 3600)
        );
        assert_eq!(config.retention.protected_age, Duration::from_secs(300));
        // Untouched section keeps defaults
        assert_eq!(config.export.chunk_size_ceiling, 25_000);
    }

    #[test]
    fn missing_config_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        let config = Config::load_from_file(path_str).unwrap();
        assert_eq!(config.web.port, 8710);
        assert!(path.exists());

        // The written file parses back to the same defaults
        let reloaded = Config::load_from_file(path_str).unwrap();
        assert_eq!(reloaded.retention.max_artifacts, 50);
        assert_eq!(
            reloaded.retention.retention_period,
            Duration::from_secs(72 * 3600)
        );
    }

    #[test]
    fn rejects_inverted_chunk_bounds() {
        let mut config = Config::default();
        config.export.chunk_size_ceiling = 10;
        config.export.chunk_size_floor = 100;
        assert!(config.validate().is_err());
    }
}
