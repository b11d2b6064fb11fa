//! # Project Configuration
//!
//! Reads `project.yml` at a project root for the two settings the external
//! interface names: `logging.level` and `logging.show_progress`. Everything
//! else about a run — the catalog, parameters, credentials — is
//! `canonada_runtime::FileCatalog`'s job; this is strictly the CLI's own
//! bootstrap-phase configuration, read once per invocation.

use std::path::{Path, PathBuf};

use canonada_core::error::{CoreError, CoreResult};
use serde::Deserialize;

const PROJECT_CONFIG_FILE: &str = "project.yml";

/// Log level configuration, mirrored onto a `tracing::Level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }

    fn parse(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(CoreError::config(format!("unknown logging.level '{other}'"))),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawLogging {
    level: Option<String>,
    show_progress: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct RawProjectConfig {
    logging: Option<RawLogging>,
}

/// Bootstrap-phase settings for one project directory. Immutable once
/// loaded; every command reads it once at startup.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    root: PathBuf,
    log_level: LogLevel,
    show_progress: bool,
}

impl ProjectConfig {
    /// Loads `project.yml` from `root`, defaulting to `info`-level logging
    /// with progress bars enabled if the file is absent.
    pub fn load(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let root = root.into();
        let path = root.join(PROJECT_CONFIG_FILE);
        let raw: RawProjectConfig = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&text)
                .map_err(|e| CoreError::config(format!("failed to parse '{}': {e}", path.display())))?
        } else {
            RawProjectConfig::default()
        };
        let logging = raw.logging.unwrap_or_default();
        let log_level = match logging.level {
            Some(level) => LogLevel::parse(&level)?,
            None => LogLevel::default(),
        };
        Ok(Self { root, log_level, show_progress: logging.show_progress.unwrap_or(true) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let config = ProjectConfig::load(dir.path()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(config.log_level(), LogLevel::Info);
        assert!(config.show_progress());
    }

    #[test]
    fn reads_logging_settings() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "logging:\n  level: debug\n  show_progress: false\n")
            .unwrap_or_else(|e| panic!("{e}"));
        let config = ProjectConfig::load(dir.path()).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(config.log_level(), LogLevel::Debug);
        assert!(!config.show_progress());
    }

    #[test]
    fn rejects_an_unknown_level() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "logging:\n  level: loud\n").unwrap_or_else(|e| panic!("{e}"));
        let err = ProjectConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
