//! Configuration module for vizpipe
//!
//! This module handles:
//! - Application settings (`vizpipe.toml`): logging and pipeline defaults
//! - Project files (`.vizproj`): a saved pipeline snapshot
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.hxyulin.vizpipe/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.vizpipe/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.vizpipe\`
//!
//! # Example
//!
//! ```ignore
//! use vizpipe::config::{AppConfig, ProjectFile};
//!
//! let config = AppConfig::load_or_default();
//! let project = ProjectFile::load("scene.vizproj")?;
//! ```

use crate::error::{Result, VizError};
use crate::pipeline::{PipelineSnapshot, MSG_CHANNEL_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.vizpipe";

/// Settings filename
pub const CONFIG_FILE: &str = "vizpipe.toml";

/// Project file extension
pub const PROJECT_FILE_EXTENSION: &str = "vizproj";

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info,vizpipe=debug";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        VizError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }

    Ok(dir)
}

/// Get the path to the settings file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,

    /// Directory for daily rolling log files; console only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}

/// Pipeline defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Start restored pipelines immediately
    pub auto_start: bool,

    /// Capacity of each observer channel
    pub message_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            message_capacity: MSG_CHANNEL_CAPACITY,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VizError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            VizError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load settings from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VizError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| VizError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            VizError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Write default settings to `path` unless a file is already there.
    /// Returns `false` when an existing file was left alone.
    pub fn write_default(path: impl AsRef<Path>) -> Result<bool> {
        use std::io::Write;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| VizError::Config(format!("Failed to serialize config: {}", e)))?;

        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        file.write_all(content.as_bytes())?;
        tracing::info!("Wrote default settings to {:?}", path);
        Ok(true)
    }

    /// Write default settings into the app data directory, creating it first.
    pub fn init_app_data() -> Result<(PathBuf, bool)> {
        let path = ensure_app_data_dir()?.join(CONFIG_FILE);
        let written = Self::write_default(&path)?;
        Ok((path, written))
    }
}

// ==================== Project File ====================

/// A saved pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Project file format version for future compatibility
    #[serde(default = "default_project_version")]
    pub version: u32,

    /// Project name
    #[serde(default)]
    pub name: String,

    /// Pipeline structure and persisted node state
    #[serde(default)]
    pub snapshot: PipelineSnapshot,
}

fn default_project_version() -> u32 {
    1
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self {
            version: 1,
            name: "Untitled Project".to_string(),
            snapshot: PipelineSnapshot::default(),
        }
    }
}

impl ProjectFile {
    /// Create an empty project
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create a project from a snapshot
    pub fn from_snapshot(name: impl Into<String>, snapshot: PipelineSnapshot) -> Self {
        Self {
            version: 1,
            name: name.into(),
            snapshot,
        }
    }

    /// Load a project file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VizError::Config(format!("Failed to read project file {:?}: {}", path, e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            VizError::Config(format!("Failed to parse project file {:?}: {}", path, e))
        })
    }

    /// Load a project file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Save project file to disk as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VizError::Config(format!("Failed to create project directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| VizError::Config(format!("Failed to serialize project: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            VizError::Config(format!("Failed to write project file {:?}: {}", path, e))
        })?;
        tracing::info!("Saved project '{}' to {:?}", self.name, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{NodeId, NodeRecord, NodeState};

    #[test]
    fn test_partial_config_loads() {
        let config: AppConfig = toml::from_str(
            r#"
            [pipeline]
            auto_start = false
            "#,
        )
        .unwrap();
        assert!(!config.pipeline.auto_start);
        assert_eq!(config.pipeline.message_capacity, MSG_CHANNEL_CAPACITY);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AppConfig::new();
        config.logging.log_dir = Some(dir.path().join("logs"));
        config.pipeline.message_capacity = 16;
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_bad_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[pipeline]\nmessage_capacity = \"lots\"").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(VizError::Config(_))));
    }

    #[test]
    fn test_write_default_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh").join(CONFIG_FILE);

        assert!(AppConfig::write_default(&path).unwrap());
        assert_eq!(AppConfig::load(&path).unwrap(), AppConfig::default());

        std::fs::write(&path, "[pipeline]\nauto_start = false\n").unwrap();
        assert!(!AppConfig::write_default(&path).unwrap());
        assert!(!AppConfig::load(&path).unwrap().pipeline.auto_start);
    }

    #[test]
    fn test_write_default_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let result = AppConfig::write_default(blocker.join(CONFIG_FILE));
        assert!(matches!(result, Err(VizError::Io(_))));
    }

    #[test]
    fn test_project_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("scene.{}", PROJECT_FILE_EXTENSION));

        let mut snapshot = PipelineSnapshot::empty();
        snapshot.nodes.push(NodeRecord {
            id: NodeId(0),
            name: "ExtractGrid".into(),
            visible: true,
            state: NodeState::ExtractGrid,
        });
        let project = ProjectFile::from_snapshot("Test Project", snapshot);
        project.save(&path).unwrap();

        let parsed = ProjectFile::load(&path).unwrap();
        assert_eq!(parsed, project);
    }

    #[test]
    fn test_missing_project_falls_back_to_default() {
        let project = ProjectFile::load_or_default("/definitely/not/here.vizproj");
        assert_eq!(project.name, "Untitled Project");
        assert!(project.snapshot.is_empty());
    }
}
