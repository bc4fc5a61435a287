//! Engine configuration

use crate::ecs::Phase;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Scheduler settings. Every field has a default, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Worker threads in the job queue. `0` means one per available core.
    pub worker_threads: usize,
    /// Reject same-phase systems whose declared component access overlaps.
    pub strict_access: bool,
    /// Fan `Early` systems out across workers during `run_frame`.
    pub parallel_early: bool,
    /// Fan `Late` systems out across workers during `run_frame`.
    pub parallel_late: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            strict_access: false,
            parallel_early: true,
            parallel_late: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid engine config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Whether `run_frame` requests fan-out for `phase`. `Lua` is never parallel.
    pub fn parallel_for(&self, phase: Phase) -> bool {
        match phase {
            Phase::Early => self.parallel_early,
            Phase::Lua => false,
            Phase::Late => self.parallel_late,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "worker_threads": 3, "parallel_late": false }"#)
                .unwrap();
        assert_eq!(config.worker_threads, 3);
        assert!(config.parallel_early);
        assert!(!config.parallel_for(Phase::Late));
        assert!(!config.parallel_for(Phase::Lua));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "worker_count": 3 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::from_path("/nonexistent/cadence.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cadence.json"));
    }
}
