//! Layered TOML + environment configuration, in the shape of the teacher's
//! `infrastructure::config::loader` (embedded defaults, then an optional
//! user file, then environment overrides — each layer only raising
//! priority, never required to exist).

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, FileFormat};
use serde::Deserialize;
use validator::Validate;

/// Embedded default configuration, compiled into the binary so it works
/// from any working directory.
const DEFAULT_CONFIG_TOML: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct McbConfig {
    /// Root directory for `chunks.db` and `vectors.bin`.
    pub data_dir: PathBuf,

    #[validate(range(min = 1))]
    pub embedding_dimension: usize,

    #[validate(range(min = 0.0, max = 1.0))]
    pub semantic_weight: f32,

    pub rrf_k: f32,

    #[validate(range(min = 1))]
    pub batch_size: usize,
    pub batch_timeout_ms: u64,
    pub batch_memory_limit_bytes: usize,

    pub task_ttl_ms: u64,

    #[validate(range(min = 1))]
    pub max_chunk_size: usize,
    pub overlap_size: usize,
}

impl McbConfig {
    /// Load embedded defaults only — used by tests that want to assert on
    /// the shipped defaults without picking up the host's environment.
    pub fn load_embedded_defaults_only() -> Result<Self, config::ConfigError> {
        let built = ConfigBuilder::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG_TOML, FileFormat::Toml))
            .build()?;
        let config: Self = built.try_deserialize()?;
        config.validate().map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(config)
    }

    /// Load defaults, then `<config_dir>/mcp-context-browser/config.toml`
    /// if present, then `MCB_`-prefixed environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::File::from_str(DEFAULT_CONFIG_TOML, FileFormat::Toml));

        if let Some(dir) = dirs::config_dir() {
            let user_config = dir.join("mcp-context-browser").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config).required(false));
            }
        }

        builder = builder.add_source(Environment::with_prefix("MCB").separator("__").try_parsing(true));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate().map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_validate() {
        let config = McbConfig::load_embedded_defaults_only().unwrap();
        assert_eq!(config.embedding_dimension, 384);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.data_dir, PathBuf::from(".mcb"));
    }
}
