// src/utils/progress_bars/progress_config.rs

use indicatif::MultiProgress;

use crate::error::DedupeResult;
use crate::utils::env::parse_env_var;

/// Configuration for progress tracking throughout the pipeline
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Whether to show progress bars at all
    pub enabled: bool,
    /// Whether to show per-stage sub-progress bars
    pub detailed: bool,
    /// Whether to log memory usage after each stage
    pub show_memory: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detailed: true,
            show_memory: true,
        }
    }
}

impl ProgressConfig {
    /// Create progress configuration from environment variables. Unset
    /// variables keep their default; values other than `true`/`false` fail.
    pub fn from_env() -> DedupeResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            enabled: parse_env_var::<bool>("PROGRESS_ENABLED")?.unwrap_or(defaults.enabled),
            detailed: parse_env_var::<bool>("PROGRESS_DETAILED")?.unwrap_or(defaults.detailed),
            show_memory: parse_env_var::<bool>("PROGRESS_SHOW_MEMORY")?.unwrap_or(defaults.show_memory),
        })
    }

    /// Quiet configuration for batch runs such as the grid search.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            detailed: false,
            show_memory: false,
        }
    }

    /// Create a MultiProgress instance if progress is enabled, None otherwise
    pub fn create_multi_progress(&self) -> Option<MultiProgress> {
        if self.should_show_detailed() {
            Some(MultiProgress::new())
        } else {
            None
        }
    }

    pub fn should_show_detailed(&self) -> bool {
        self.enabled && self.detailed
    }

    pub fn should_show_memory(&self) -> bool {
        self.enabled && self.show_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DedupeError;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = ProgressConfig::default();
        assert!(config.enabled);
        assert!(config.detailed);
        assert!(config.show_memory);
    }

    // only test touching the PROGRESS_* variables
    #[test]
    fn test_env_config() {
        env::set_var("PROGRESS_ENABLED", "false");
        env::set_var("PROGRESS_DETAILED", "false");
        env::set_var("PROGRESS_SHOW_MEMORY", "false");

        let config = ProgressConfig::from_env().unwrap();
        assert!(!config.enabled);
        assert!(!config.detailed);
        assert!(!config.show_memory);

        env::set_var("PROGRESS_SHOW_MEMORY", "nope");
        assert!(matches!(
            ProgressConfig::from_env(),
            Err(DedupeError::Configuration(_))
        ));

        env::remove_var("PROGRESS_ENABLED");
        env::remove_var("PROGRESS_DETAILED");
        env::remove_var("PROGRESS_SHOW_MEMORY");
        let config = ProgressConfig::from_env().unwrap();
        assert!(config.enabled && config.detailed && config.show_memory);
    }

    #[test]
    fn test_multi_progress_creation() {
        let mut config = ProgressConfig::default();
        assert!(config.create_multi_progress().is_some());

        config.detailed = false;
        assert!(config.create_multi_progress().is_none());

        assert!(ProgressConfig::disabled().create_multi_progress().is_none());
    }

    #[test]
    fn test_should_show_methods() {
        let mut config = ProgressConfig::default();
        assert!(config.should_show_detailed());
        assert!(config.should_show_memory());

        config.enabled = false;
        assert!(!config.should_show_detailed());
        assert!(!config.should_show_memory());
    }
}
