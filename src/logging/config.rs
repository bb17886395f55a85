//! Logging configuration
//!
//! Controls the global level, the per-component level for the alignment
//! pipeline, and where log output goes (console, rolling JSON files).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level (trace, debug, info, warn, error)
    pub global_level: String,

    /// Log level for the pipeline stages
    pub pipeline_level: String,

    /// Enable console output
    pub console_output: bool,

    /// Directory for daily rolling JSON log files (None = no file logging)
    pub log_directory: Option<PathBuf>,

    /// File name prefix for rolled log files
    pub file_prefix: String,

    /// Include file location in logs
    pub include_file_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            global_level: "info".to_string(),
            pipeline_level: "info".to_string(),
            console_output: true,
            log_directory: None,
            file_prefix: "wafer-alignment.log".to_string(),
            include_file_location: false,
        }
    }
}

impl LoggingConfig {
    /// Verbose console logging with source locations
    pub fn development() -> Self {
        Self {
            global_level: "debug".to_string(),
            pipeline_level: "trace".to_string(),
            include_file_location: true,
            ..Self::default()
        }
    }

    /// File-only logging for unattended runs
    pub fn production(log_directory: PathBuf) -> Self {
        Self {
            global_level: "warn".to_string(),
            pipeline_level: "info".to_string(),
            console_output: false,
            log_directory: Some(log_directory),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("global_level", &self.global_level),
            ("pipeline_level", &self.pipeline_level),
        ] {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(format!(
                    "Invalid {}: {}. Must be one of: {:?}",
                    name, level, VALID_LEVELS
                ));
            }
        }

        if self.file_prefix.is_empty() {
            return Err("file_prefix must not be empty".to_string());
        }

        Ok(())
    }

    /// Filter directive: global level everywhere, pipeline level for this crate's stages
    pub fn filter_directive(&self) -> String {
        format!(
            "{},{}::pipeline={}",
            self.global_level,
            env!("CARGO_PKG_NAME").replace('-', "_"),
            self.pipeline_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.global_level, "info");
        assert!(config.console_output);
        assert!(config.log_directory.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_config() {
        let config = LoggingConfig::production(PathBuf::from("/tmp/wafer-logs"));
        assert_eq!(config.global_level, "warn");
        assert!(!config.console_output);
        assert!(config.log_directory.is_some());
    }

    #[test]
    fn test_config_validation() {
        let mut config = LoggingConfig::development();
        assert!(config.validate().is_ok());

        config.pipeline_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_filter_directive() {
        let config = LoggingConfig::development();
        assert_eq!(config.filter_directive(), "debug,wafer_aligner::pipeline=trace");
    }
}
