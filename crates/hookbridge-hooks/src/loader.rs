//! Hook configuration sources and the append merge.
//!
//! Discovery order under a hooks directory:
//!
//! ```text
//! hooks/hooks.json                 1st (root)
//! hooks/alpha/hooks.json           2nd (subdirectories alphabetically)
//! hooks/beta/hooks.json            3rd
//! hooks/alpha/nested/hooks.json    4th (next level, alphabetically)
//! ```
//!
//! Each source parses and validates on its own. A broken source yields a
//! [`ConfigError`] naming it; the others still load.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use hookbridge_types::{HookType, HooksConfig};

use crate::error::ConfigError;
use crate::registry::{DIRECTORY_OWNER, EventRegistry, HookOrigin};

/// File name of a hook registry document.
pub const HOOKS_FILE: &str = "hooks.json";

/// A parsed, validated hooks document.
#[derive(Debug, Clone)]
pub struct HookSource {
    /// File the document came from.
    pub path: PathBuf,
    /// Scope owner for the groups it contributes.
    pub owner: String,
    /// Directory that contributed it (the file's parent).
    pub base_dir: PathBuf,
    pub config: HooksConfig,
}

impl HookSource {
    fn registry(&self) -> EventRegistry {
        EventRegistry::from_config(
            &self.config,
            HookOrigin::new(self.owner.clone(), self.base_dir.clone()),
        )
    }
}

/// Parse and validate one JSON hooks document.
pub fn parse_source(path: &Path, content: &str) -> Result<HooksConfig, ConfigError> {
    let config: HooksConfig = serde_json::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_config(path, &config)?;
    Ok(config)
}

/// Check required fields and value ranges of every hook.
pub fn validate_config(path: &Path, config: &HooksConfig) -> Result<(), ConfigError> {
    for (event, groups) in &config.hooks {
        for (g, group) in groups.iter().enumerate() {
            for (h, hook) in group.hooks.iter().enumerate() {
                let invalid = |message: String| ConfigError::Invalid {
                    path: path.to_path_buf(),
                    location: format!("{}[{}].hooks[{}]", event, g, h),
                    message,
                };
                let (field, body) = match hook.hook_type {
                    HookType::Command => ("command", hook.command.as_deref()),
                    HookType::Prompt => ("prompt", hook.prompt.as_deref()),
                };
                if body.is_none_or(|b| b.trim().is_empty()) {
                    return Err(invalid(format!(
                        "{} hook requires a non-empty '{}'",
                        hook.hook_type, field
                    )));
                }
                if let Some(timeout) = hook.timeout
                    && !(timeout.is_finite() && timeout > 0.0)
                {
                    return Err(invalid(format!(
                        "timeout must be a positive number of seconds, got {}",
                        timeout
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Append-merge sources in order into a new registry.
pub fn merge(sources: &[HookSource]) -> EventRegistry {
    sources
        .iter()
        .fold(EventRegistry::new(), |acc, s| acc.merged_with(&s.registry()))
}

/// Outcome of loading a hooks directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// The merged registry of every source that loaded.
    pub registry: EventRegistry,
    /// Sources that loaded, in merge order.
    pub sources: Vec<PathBuf>,
    /// Sources that failed, in discovery order.
    pub errors: Vec<ConfigError>,
}

/// Discovers and loads `hooks.json` files under a hooks directory.
#[derive(Debug, Clone)]
pub struct HookConfigLoader {
    hooks_dir: PathBuf,
}

impl HookConfigLoader {
    pub fn new(hooks_dir: impl Into<PathBuf>) -> Self {
        Self {
            hooks_dir: hooks_dir.into(),
        }
    }

    pub fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    /// `hooks.json` paths in merge order.
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        if !self.hooks_dir.is_dir() {
            return found;
        }

        let mut queue = VecDeque::from([self.hooks_dir.clone()]);
        while let Some(dir) = queue.pop_front() {
            let file = dir.join(HOOKS_FILE);
            if file.is_file() {
                found.push(file);
            }
            queue.extend(sorted_subdirs(&dir));
        }
        found
    }

    /// Load a single source file.
    pub fn load_source(&self, path: &Path) -> Result<HookSource, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = parse_source(path, &content)?;
        Ok(HookSource {
            path: path.to_path_buf(),
            owner: DIRECTORY_OWNER.to_string(),
            base_dir: path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.hooks_dir.clone()),
            config,
        })
    }

    /// Load every discovered source, skipping broken ones.
    pub fn load(&self) -> LoadReport {
        let mut loaded = Vec::new();
        let mut report = LoadReport::default();

        for path in self.discover() {
            match self.load_source(&path) {
                Ok(source) => {
                    tracing::debug!(
                        path = %path.display(),
                        hooks = source.config.hook_count(),
                        "loaded hook config"
                    );
                    report.sources.push(path);
                    loaded.push(source);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping hook config");
                    report.errors.push(e);
                }
            }
        }

        report.registry = merge(&loaded);
        tracing::info!(
            dir = %self.hooks_dir.display(),
            sources = report.sources.len(),
            failed = report.errors.len(),
            hooks = report.registry.len(),
            "hook configs loaded"
        );
        report
    }
}

fn sorted_subdirs(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to read hooks directory");
            return Vec::new();
        }
    };
    // Symlinked directories are not followed; a link back up the tree would
    // otherwise be walked again at every level.
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'))
        })
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbridge_types::HookEvent;
    use std::fs;
    use tempfile::TempDir;

    fn write_hooks(dir: &Path, command: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(HOOKS_FILE),
            format!(
                r#"{{"hooks": {{"PreToolUse": [{{"matcher": "*", "hooks": [{{"type": "command", "command": "{}"}}]}}]}}}}"#,
                command
            ),
        )
        .unwrap();
    }

    fn commands(registry: &EventRegistry) -> Vec<String> {
        registry
            .groups(HookEvent::PreToolUse)
            .iter()
            .flat_map(|g| g.hooks.iter())
            .filter_map(|h| h.command.clone())
            .collect()
    }

    #[test]
    fn test_discovery_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_hooks(&root.join("beta"), "beta");
        write_hooks(&root.join("alpha/nested"), "alpha-nested");
        write_hooks(&root.join("alpha"), "alpha");
        write_hooks(root, "root");
        write_hooks(&root.join(".hidden"), "hidden");

        let report = HookConfigLoader::new(root).load();
        assert!(report.errors.is_empty());
        assert_eq!(
            commands(&report.registry),
            vec!["root", "alpha", "beta", "alpha-nested"]
        );
    }

    #[test]
    fn test_groups_carry_source_dir() {
        let tmp = TempDir::new().unwrap();
        write_hooks(&tmp.path().join("plugin"), "x");
        let report = HookConfigLoader::new(tmp.path()).load();
        let group = &report.registry.groups(HookEvent::PreToolUse)[0];
        assert_eq!(group.origin.base_dir, tmp.path().join("plugin"));
        assert_eq!(group.origin.owner, DIRECTORY_OWNER);
    }

    #[test]
    fn test_broken_source_skipped() {
        let tmp = TempDir::new().unwrap();
        write_hooks(tmp.path(), "root");
        let bad = tmp.path().join("bad");
        fs::create_dir(&bad).unwrap();
        fs::write(bad.join(HOOKS_FILE), "{ not json").unwrap();
        write_hooks(&tmp.path().join("good"), "good");

        let report = HookConfigLoader::new(tmp.path()).load();
        assert_eq!(commands(&report.registry), vec!["root", "good"]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path(), bad.join(HOOKS_FILE));
        assert_eq!(report.sources.len(), 2);
    }

    #[test]
    fn test_symlinked_dirs_not_followed() {
        let tmp = TempDir::new().unwrap();
        write_hooks(tmp.path(), "root");
        write_hooks(&tmp.path().join("plugin"), "plugin");
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("plugin"), tmp.path().join("alias")).unwrap();

        let loader = HookConfigLoader::new(tmp.path());
        assert_eq!(
            loader.discover(),
            vec![tmp.path().join(HOOKS_FILE), tmp.path().join("plugin").join(HOOKS_FILE)]
        );
        assert_eq!(commands(&loader.load().registry), vec!["root", "plugin"]);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let report = HookConfigLoader::new("/nonexistent/hooks").load();
        assert!(report.registry.is_empty());
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_missing_command_rejected() {
        let err = parse_source(
            Path::new("hooks.json"),
            r#"{"hooks": {"Stop": [{"hooks": [{"type": "command"}]}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("Stop[0].hooks[0]"));
    }

    #[test]
    fn test_missing_prompt_rejected() {
        let err = parse_source(
            Path::new("hooks.json"),
            r#"{"hooks": {"Stop": [{"hooks": [{"type": "prompt", "command": "x"}]}]}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'prompt'"));
    }

    #[test]
    fn test_non_positive_timeout_rejected() {
        let err = parse_source(
            Path::new("hooks.json"),
            r#"{"hooks": {"Stop": [{"hooks": [{"type": "command", "command": "x", "timeout": 0}]}]}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_unknown_event_rejected() {
        let err = parse_source(
            Path::new("hooks.json"),
            r#"{"hooks": {"BeforeLunch": [{"hooks": [{"type": "command", "command": "x"}]}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_merge_sources_in_order() {
        let make = |name: &str| HookSource {
            path: PathBuf::from(format!("/{}/hooks.json", name)),
            owner: DIRECTORY_OWNER.into(),
            base_dir: PathBuf::from(format!("/{}", name)),
            config: parse_source(
                Path::new("x"),
                &format!(
                    r#"{{"hooks": {{"PreToolUse": [{{"hooks": [{{"type": "command", "command": "{}"}}]}}]}}}}"#,
                    name
                ),
            )
            .unwrap(),
        };
        let (a, b) = (make("a"), make("b"));
        let together = merge(&[a.clone(), b.clone()]);
        let stepwise = merge(&[a]).merged_with(&merge(&[b]));
        assert_eq!(commands(&together), commands(&stepwise));
        assert_eq!(commands(&together), vec!["a", "b"]);
    }
}
