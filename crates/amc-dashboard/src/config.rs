use amc_core::endpoints::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub const DEFAULT_HEARTBEAT_SECS: u64 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROJECT_LIST_LIMIT: usize = 15;
const CONFIG_FILE: &str = "amc/dashboard.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Keys accepted in `dashboard.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub heartbeat_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub log_dir: Option<PathBuf>,
    pub project_list_limit: Option<usize>,
}

impl FileConfig {
    /// Keys set in `upper` win over keys set here.
    pub fn layered(self, upper: FileConfig) -> FileConfig {
        FileConfig {
            base_url: upper.base_url.or(self.base_url),
            heartbeat_secs: upper.heartbeat_secs.or(self.heartbeat_secs),
            request_timeout_secs: upper.request_timeout_secs.or(self.request_timeout_secs),
            log_dir: upper.log_dir.or(self.log_dir),
            project_list_limit: upper.project_list_limit.or(self.project_list_limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub base_url: String,
    pub heartbeat: Duration,
    pub request_timeout: Duration,
    pub log_dir: PathBuf,
    pub project_list_limit: usize,
    /// File the values were read from, if one existed.
    pub source: Option<PathBuf>,
}

impl DashboardConfig {
    pub fn from_layers(merged: FileConfig, source: Option<PathBuf>) -> Self {
        let base_url = merged
            .base_url
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            heartbeat: Duration::from_secs(
                merged.heartbeat_secs.unwrap_or(DEFAULT_HEARTBEAT_SECS).max(1),
            ),
            request_timeout: Duration::from_secs(
                merged
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
                    .max(1),
            ),
            log_dir: merged.log_dir.unwrap_or_else(default_log_dir),
            project_list_limit: merged
                .project_list_limit
                .unwrap_or(DEFAULT_PROJECT_LIST_LIMIT)
                .max(1),
            source,
        }
    }
}

#[derive(Debug)]
pub struct Loaded {
    pub config: DashboardConfig,
    /// Problems with the config file; defaults were used in its place.
    pub warnings: Vec<ConfigError>,
}

/// Builds the effective config: defaults, then the TOML file at `path`, then
/// `overrides` (environment and command line, already merged by clap).
pub fn load(path: Option<&Path>, overrides: FileConfig) -> Loaded {
    let mut warnings = Vec::new();
    let (file, source) = match path {
        Some(path) => match read_file(path) {
            Ok(Some(file)) => (file, Some(path.to_path_buf())),
            Ok(None) => (FileConfig::default(), None),
            Err(err) => {
                warnings.push(err);
                (FileConfig::default(), None)
            }
        },
        None => (FileConfig::default(), None),
    };
    Loaded {
        config: DashboardConfig::from_layers(file.layered(overrides), source),
        warnings,
    }
}

/// `Ok(None)` when the file does not exist.
pub fn read_file(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

pub fn config_path() -> Option<PathBuf> {
    if let Ok(value) = env::var("AMC_CONFIG_PATH") {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value));
        }
    }
    if let Ok(value) = env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value).join(CONFIG_FILE));
        }
    }
    dirs::home_dir().map(|home| home.join(".config").join(CONFIG_FILE))
}

fn default_log_dir() -> PathBuf {
    if let Ok(value) = env::var("XDG_STATE_HOME") {
        if !value.trim().is_empty() {
            return PathBuf::from(value).join("amc");
        }
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
        .unwrap_or_else(env::temp_dir)
        .join("amc")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let loaded = load(Some(&dir.path().join("absent.toml")), FileConfig::default());
        assert!(loaded.warnings.is_empty());
        let config = loaded.config;
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.heartbeat, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.project_list_limit, 15);
        assert!(config.source.is_none());
    }

    #[test]
    fn file_values_apply_and_overrides_win() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("dashboard.toml");
        fs::write(
            &path,
            "base_url = \"http://mission:8080\"\nheartbeat_secs = 2\nlog_dir = \"/var/log/amc\"\n",
        )
        .expect("write config");

        let loaded = load(
            Some(&path),
            FileConfig {
                heartbeat_secs: Some(9),
                ..FileConfig::default()
            },
        );
        assert!(loaded.warnings.is_empty());
        let config = loaded.config;
        assert_eq!(config.base_url, "http://mission:8080");
        assert_eq!(config.heartbeat, Duration::from_secs(9));
        assert_eq!(config.log_dir, PathBuf::from("/var/log/amc"));
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn malformed_file_warns_and_falls_back() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("dashboard.toml");
        fs::write(&path, "heartbeat_secs = \"often\"\n").expect("write config");

        let loaded = load(Some(&path), FileConfig::default());
        assert_eq!(loaded.warnings.len(), 1);
        assert!(matches!(loaded.warnings[0], ConfigError::Parse { .. }));
        assert_eq!(loaded.config.heartbeat, Duration::from_secs(5));

        fs::write(&path, "refresh = 3\n").expect("write config");
        let loaded = load(Some(&path), FileConfig::default());
        assert_eq!(loaded.warnings.len(), 1);
    }

    #[test]
    fn zero_values_are_raised_to_minimums() {
        let config = DashboardConfig::from_layers(
            FileConfig {
                base_url: Some("  ".to_string()),
                heartbeat_secs: Some(0),
                request_timeout_secs: Some(0),
                project_list_limit: Some(0),
                log_dir: Some(PathBuf::from("/tmp/amc")),
            },
            None,
        );
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.heartbeat, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(1));
        assert_eq!(config.project_list_limit, 1);
    }
}
