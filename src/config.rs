//! Engine tuning loaded from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::core::prompt::StageInstructions;
use crate::core::stage::StageTable;
use crate::providers::GenerationParams;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid stage table: {0}")]
    InvalidStages(String),
}

/// Every field is optional in the file; missing ones take the defaults.
///
/// ```ron
/// (
///     stages: (mid_at: 3, late_at: 6, reveal_at: 8, early_end_at: 3),
///     request_timeout_ms: 15000,
///     retry_delay_ms: 2000,
///     seed: Some(42),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stages: StageTable,
    /// Upper bound for a single provider call.
    pub request_timeout_ms: u64,
    /// Pause before the one retry after a failed provider call.
    pub retry_delay_ms: u64,
    /// Seed for fallback selection. `None` draws one at startup.
    pub seed: Option<u64>,
    pub params: GenerationParams,
    pub instructions: StageInstructions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stages: StageTable::default(),
            request_timeout_ms: 15_000,
            retry_delay_ms: 2_000,
            seed: None,
            params: GenerationParams::default(),
            instructions: StageInstructions::default(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stages.validate().map_err(ConfigError::InvalidStages)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_is_default() {
        let config = EngineConfig::parse_ron("()").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.retry_delay(), Duration::from_secs(2));
    }

    #[test]
    fn partial_override() {
        let config = EngineConfig::parse_ron("(retry_delay_ms: 0, seed: Some(7))").unwrap();
        assert_eq!(config.retry_delay_ms, 0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.stages, StageTable::default());
        assert_eq!(config.params.max_tokens, 150);
    }

    #[test]
    fn rejects_inverted_stages() {
        let err = EngineConfig::parse_ron(
            "(stages: (mid_at: 6, late_at: 3, reveal_at: 8, early_end_at: 3))",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidStages(_)));
    }

    #[test]
    fn bad_ron_is_reported() {
        assert!(matches!(
            EngineConfig::parse_ron("(stages: "),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(request_timeout_ms: 500)").unwrap();
        let config = EngineConfig::load_from_ron(file.path()).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_millis(500));
    }
}
