//! Configuration management.
//!
//! Configuration is read from a TOML file:
//!
//! ```toml
//! workspace_root = "~/prompts"
//! global_root = "~/.local/share/promptshelf/global"
//! export_source = "laptop"
//!
//! [watch]
//! debounce_ms = 300
//! max_depth = 5
//!
//! [logging]
//! level = "info"
//! format = "json"
//! file = "~/.local/state/promptshelf/promptshelf.log"
//! ```

use crate::io::DEFAULT_EXPORT_SOURCE;
use crate::storage::path_codec::MAX_DEPTH;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "PROMPTSHELF_CONFIG_PATH";

/// Environment variable overriding the workspace root.
pub const WORKSPACE_ENV: &str = "PROMPTSHELF_WORKSPACE";

/// Default per-file debounce window for the watcher.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Main configuration for promptshelf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfConfig {
    /// Root of the active workspace.
    pub workspace_root: PathBuf,
    /// Root of the global workspace, if one is configured.
    pub global_root: Option<PathBuf>,
    /// `source` label written into exported payloads.
    pub export_source: String,
    /// Watcher settings.
    pub watch: WatchConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Watcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Quiet period before a file's event is applied.
    pub debounce_ms: u64,
    /// Deepest folder level that is watched below a store root.
    pub max_depth: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_depth: MAX_DEPTH,
        }
    }
}

impl WatchConfig {
    /// Returns the debounce window.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Logging settings as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `promptshelf=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path; logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Workspace root.
    pub workspace_root: Option<String>,
    /// Global workspace root.
    pub global_root: Option<String>,
    /// Export source label.
    pub export_source: Option<String>,
    /// Watch section.
    pub watch: Option<ConfigFileWatch>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Watch section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileWatch {
    /// Debounce window in milliseconds.
    pub debounce_ms: Option<u64>,
    /// Maximum watched depth.
    pub max_depth: Option<usize>,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        let workspace_root = directories::BaseDirs::new().map_or_else(
            || PathBuf::from(".promptshelf"),
            |dirs| dirs.data_dir().join("promptshelf"),
        );
        Self {
            workspace_root,
            global_root: None,
            export_source: DEFAULT_EXPORT_SOURCE.to_string(),
            watch: WatchConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl ShelfConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// is out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Self::from_config_file(file)
    }

    /// Loads configuration for the CLI.
    ///
    /// Checks, in order: `explicit` (the `--config` flag), the
    /// `PROMPTSHELF_CONFIG_PATH` variable, then the default locations. Then
    /// applies `PROMPTSHELF_WORKSPACE`.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        if let Some(root) = std::env::var_os(WORKSPACE_ENV).filter(|v| !v.is_empty()) {
            config.workspace_root = expand_home(Path::new(&root));
        }
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/promptshelf/` on macOS)
    /// 2. XDG config dir (`~/.config/promptshelf/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found. A file that
    /// exists but fails to parse is logged and skipped.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("promptshelf").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("promptshelf")
                .join("config.toml"),
        ];

        for candidate in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Ignoring config file");
                },
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `ShelfConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(root) = file.workspace_root {
            config.workspace_root = expand_home(Path::new(&root));
        }
        if let Some(root) = file.global_root {
            config.global_root = Some(expand_home(Path::new(&root)));
        }
        if let Some(source) = file.export_source {
            config.export_source = source;
        }
        if let Some(watch) = file.watch {
            if let Some(ms) = watch.debounce_ms {
                config.watch.debounce_ms = ms;
            }
            if let Some(depth) = watch.max_depth {
                if depth == 0 || depth > MAX_DEPTH {
                    return Err(Error::InvalidInput(format!(
                        "watch.max_depth must be between 1 and {MAX_DEPTH}, got {depth}"
                    )));
                }
                config.watch.max_depth = depth;
            }
        }
        if let Some(mut logging) = file.logging {
            logging.file = logging.file.map(|p| expand_home(&p));
            config.logging = logging;
        }

        Ok(config)
    }

    /// Sets the workspace root.
    #[must_use]
    pub fn with_workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_root = path.into();
        self
    }

    /// Sets the global workspace root.
    #[must_use]
    pub fn with_global_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_root = Some(path.into());
        self
    }

    /// Returns the root to open, global or local.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `global` is requested but no global
    /// root is configured.
    pub fn root_for(&self, global: bool) -> Result<&Path> {
        if !global {
            return Ok(&self.workspace_root);
        }
        self.global_root.as_deref().ok_or_else(|| {
            Error::InvalidInput("no global_root configured".to_string())
        })
    }
}

/// Expands a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    directories::BaseDirs::new().map_or_else(|| path.to_path_buf(), |d| d.home_dir().join(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_full_file() {
        let (_dir, path) = write_config(
            r#"
workspace_root = "/srv/prompts"
global_root = "/srv/global"
export_source = "laptop"

[watch]
debounce_ms = 50
max_depth = 3

[logging]
level = "debug"
format = "json"
file = "/var/log/promptshelf.log"
"#,
        );

        let config = ShelfConfig::load_from_file(&path).unwrap();
        assert_eq!(config.workspace_root, PathBuf::from("/srv/prompts"));
        assert_eq!(config.global_root, Some(PathBuf::from("/srv/global")));
        assert_eq!(config.export_source, "laptop");
        assert_eq!(config.watch.debounce(), Duration::from_millis(50));
        assert_eq!(config.watch.max_depth, 3);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let (_dir, path) = write_config("export_source = \"x\"\n");
        let config = ShelfConfig::load_from_file(&path).unwrap();
        assert_eq!(config.watch, WatchConfig::default());
        assert_eq!(config.global_root, None);
        assert_eq!(config.workspace_root, ShelfConfig::default().workspace_root);
    }

    #[test]
    fn test_rejects_out_of_range_depth() {
        let (_dir, path) = write_config("[watch]\nmax_depth = 9\n");
        assert!(matches!(
            ShelfConfig::load_from_file(&path),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let (_dir, path) = write_config("workspace_root = [");
        assert!(matches!(
            ShelfConfig::load_from_file(&path),
            Err(Error::OperationFailed { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ShelfConfig::load_from_file(Path::new("/nonexistent/promptshelf.toml"));
        assert!(err.is_err());
    }

    #[test]
    fn test_root_for() {
        let config = ShelfConfig::new().with_workspace_root("/a");
        assert_eq!(config.root_for(false).unwrap(), Path::new("/a"));
        assert!(config.root_for(true).is_err());

        let config = config.with_global_root("/g");
        assert_eq!(config.root_for(true).unwrap(), Path::new("/g"));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("/abs")), PathBuf::from("/abs"));
        let expanded = expand_home(Path::new("~/prompts"));
        assert!(expanded.ends_with("prompts"));
        assert!(!expanded.starts_with("~"));
    }
}
