use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profiles::Profile;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// The persisted launcher settings, stored as JSON next to the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    pub repo_api: String,
    pub file_pattern: String,
    pub app_file: String,
    /// Tag of the last fully written download; empty when nothing is installed.
    pub latest_version: String,
    pub get_releases: bool,
    pub get_prereleases: bool,
    pub allow_insecure: bool,
    /// Set while a self-heal attempt for a vanished app file is in flight.
    #[serde(default, skip_serializing_if = "is_false")]
    pub missing_file: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl LauncherConfig {
    pub fn defaults(profile: &Profile, os: &str) -> Self {
        let platform = profile.defaults_for(os);
        Self {
            repo_api: profile.repo_api.to_string(),
            file_pattern: platform.file_pattern.to_string(),
            app_file: platform.app_file.to_string(),
            latest_version: String::new(),
            get_releases: true,
            get_prereleases: true,
            allow_insecure: false,
            missing_file: false,
        }
    }

    pub fn has_recorded_version(&self) -> bool {
        !self.latest_version.trim().is_empty()
    }
}

#[cfg(test)]
impl Default for LauncherConfig {
    fn default() -> Self {
        Self::defaults(&crate::profiles::PROFILES[0], std::env::consts::OS)
    }
}

pub trait ConfigStore {
    fn save(&self, config: &LauncherConfig) -> ConfigResult<()>;
}

#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the config, writing `defaults` first if no file exists yet.
    /// Fields absent from an existing file are taken from `defaults`.
    /// The boolean is `true` when the file was just created.
    pub fn load_or_init(&self, defaults: LauncherConfig) -> ConfigResult<(LauncherConfig, bool)> {
        if !self.path.exists() {
            self.save(&defaults)?;
            return Ok((defaults, true));
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        let config = parse_config(&content, &defaults).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok((config, false))
    }
}

impl ConfigStore for JsonConfigFile {
    fn save(&self, config: &LauncherConfig) -> ConfigResult<()> {
        let encoded = render_config(config)?;
        let temp = self.path.with_extension("json.tmp");
        let write_error = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        std::fs::write(&temp, encoded).map_err(write_error)?;
        std::fs::rename(&temp, &self.path).map_err(write_error)
    }
}

fn parse_config(
    content: &str,
    defaults: &LauncherConfig,
) -> Result<LauncherConfig, serde_json::Error> {
    let stored = serde_json::from_str::<serde_json::Value>(content)?;
    let serde_json::Value::Object(fields) = stored else {
        return serde_json::from_value(stored);
    };
    let mut merged = serde_json::to_value(defaults)?;
    if let Some(base) = merged.as_object_mut() {
        base.extend(fields);
    }
    serde_json::from_value(merged)
}

fn render_config(config: &LauncherConfig) -> Result<Vec<u8>, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    config.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

/// `<dir>/<stem>.json` for a launcher at `<dir>/<stem>[.ext]`.
pub fn config_path_for(launcher: &Path) -> Option<PathBuf> {
    let stem = launcher.file_stem()?;
    let dir = launcher.parent().unwrap_or_else(|| Path::new("."));
    let mut name = stem.to_os_string();
    name.push(".json");
    Some(dir.join(name))
}
