//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `<config dir>/config.toml` (`$HOOKBRIDGE_CONFIG_DIR` or platform default)
//! 2. `<project>/hookbridge.toml` (project-local)
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{BridgeConfig, ConfigError, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "hookbridge.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for platform directory resolution.
const APP_NAME: &str = "hookbridge";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "HOOKBRIDGE_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: BridgeConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Layers that failed to load and were skipped.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: &Path) -> LoadedConfig {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `user_dir` overrides both `HOOKBRIDGE_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(project_dir: &Path, user_dir: Option<&Path>) -> LoadedConfig {
    let mut config = BridgeConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_path = match user_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir.join(PROJECT_CONFIG_FILE);
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    LoadedConfig {
        config,
        sources,
        warnings,
    }
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<BridgeConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    BridgeConfig::from_toml(&contents)
}

/// Path of the user-level config file.
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user-level config directory for hookbridge.
///
/// Checks `HOOKBRIDGE_CONFIG_DIR` first, then falls back to the platform default.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(config: &mut BridgeConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            tracing::debug!(path = %path.display(), "loaded config layer");
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping config layer");
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[hooks]\ndefault_timeout_secs = 12\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.default_timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config_file(Path::new("/nonexistent/hookbridge.toml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_project_overrides_user() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            "[hooks]\nenabled = false\ndefault_timeout_secs = 9\n",
        )
        .unwrap();
        fs::write(
            project.path().join("hookbridge.toml"),
            "[hooks]\nenabled = true\n",
        )
        .unwrap();

        let loaded = load_config_with_options(project.path(), Some(user.path()));
        assert!(loaded.config.enabled());
        assert_eq!(loaded.config.default_timeout(), Duration::from_secs(9));
        assert_eq!(loaded.loaded_from().len(), 2);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_missing_layers_yield_defaults() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        let loaded = load_config_with_options(project.path(), Some(user.path()));
        assert_eq!(loaded.config, BridgeConfig::default());
        assert_eq!(loaded.sources.len(), 2);
        assert!(loaded.loaded_from().is_empty());
    }

    #[test]
    fn test_broken_layer_is_skipped_with_warning() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), "[hooks]\nwatch = true\n").unwrap();
        fs::write(project.path().join("hookbridge.toml"), "[hooks\nbroken").unwrap();

        let loaded = load_config_with_options(project.path(), Some(user.path()));
        assert!(loaded.config.watch());
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("hookbridge.toml"));
    }
}
