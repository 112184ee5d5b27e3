//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [hooks]                  # hook discovery and execution
//! [prompt]                 # prompt-hook evaluation
//! [logging]                # log output
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default hooks directory, relative to the project root.
pub const DEFAULT_HOOKS_DIR: &str = ".hookbridge/hooks";

/// Default per-hook timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;

/// Upper bound applied to any per-hook timeout, in seconds.
pub const DEFAULT_MAX_TIMEOUT_SECS: f64 = 600.0;

/// Default token budget for prompt-hook answers.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 256;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections and fields are optional so partial configs (e.g.
/// project-local overrides) can be layered on top of each other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Hook discovery and execution settings.
    pub hooks: Option<HooksSection>,
    /// Prompt-hook evaluation settings.
    pub prompt: Option<PromptSection>,
    /// Logging settings.
    pub logging: Option<LoggingSection>,
}

impl BridgeConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority, field by field).
    pub fn merge(&mut self, other: BridgeConfig) {
        merge_section(&mut self.hooks, other.hooks, HooksSection::merge);
        merge_section(&mut self.prompt, other.prompt, PromptSection::merge);
        merge_section(&mut self.logging, other.logging, LoggingSection::merge);
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref hooks) = self.hooks {
            for (field, value) in [
                ("hooks.default_timeout_secs", hooks.default_timeout_secs),
                ("hooks.max_timeout_secs", hooks.max_timeout_secs),
            ] {
                if let Some(v) = value
                    && !(v.is_finite() && v > 0.0)
                {
                    return Err(ConfigError::InvalidValue {
                        field: field.to_string(),
                        message: format!("must be a positive number of seconds, got {}", v),
                    });
                }
            }
        }
        Ok(())
    }

    // ── Resolved accessors ──────────────────────────────────────────────────

    /// Whether the bridge runs hooks at all.
    pub fn enabled(&self) -> bool {
        self.hooks.as_ref().and_then(|h| h.enabled).unwrap_or(true)
    }

    /// Hooks directory, resolved against the project root when relative.
    pub fn hooks_dir(&self, project_dir: &Path) -> PathBuf {
        let dir = self
            .hooks
            .as_ref()
            .and_then(|h| h.dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOOKS_DIR));
        if dir.is_absolute() {
            dir
        } else {
            project_dir.join(dir)
        }
    }

    /// Timeout applied to hooks that do not set their own.
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs_f64(
            self.hooks
                .as_ref()
                .and_then(|h| h.default_timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Upper bound for any hook timeout.
    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs_f64(
            self.hooks
                .as_ref()
                .and_then(|h| h.max_timeout_secs)
                .unwrap_or(DEFAULT_MAX_TIMEOUT_SECS),
        )
    }

    /// Whether to hot-reload the hooks directory.
    pub fn watch(&self) -> bool {
        self.hooks.as_ref().and_then(|h| h.watch).unwrap_or(false)
    }

    /// Token budget for prompt-hook answers.
    pub fn max_output_tokens(&self) -> u32 {
        self.prompt
            .as_ref()
            .and_then(|p| p.max_output_tokens)
            .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS)
    }

    /// Whether to write the rolling JSON log file.
    pub fn log_to_file(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.file).unwrap_or(true)
    }
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
    match (base.as_mut(), other) {
        (Some(b), Some(o)) => merge(b, o),
        (None, Some(o)) => *base = Some(o),
        (_, None) => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[hooks]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksSection {
    /// Master switch.
    pub enabled: Option<bool>,
    /// Hooks directory (relative paths resolve against the project root).
    pub dir: Option<PathBuf>,
    /// Default per-hook timeout in seconds.
    pub default_timeout_secs: Option<f64>,
    /// Maximum per-hook timeout in seconds.
    pub max_timeout_secs: Option<f64>,
    /// Rebuild the registry when the hooks directory changes.
    pub watch: Option<bool>,
}

impl HooksSection {
    fn merge(&mut self, other: HooksSection) {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.dir.is_some() {
            self.dir = other.dir;
        }
        if other.default_timeout_secs.is_some() {
            self.default_timeout_secs = other.default_timeout_secs;
        }
        if other.max_timeout_secs.is_some() {
            self.max_timeout_secs = other.max_timeout_secs;
        }
        if other.watch.is_some() {
            self.watch = other.watch;
        }
    }
}

/// `[prompt]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSection {
    /// Maximum tokens the evaluator may produce per answer.
    pub max_output_tokens: Option<u32>,
}

impl PromptSection {
    fn merge(&mut self, other: PromptSection) {
        if other.max_output_tokens.is_some() {
            self.max_output_tokens = other.max_output_tokens;
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Write a daily-rolling JSON log under the config directory.
    pub file: Option<bool>,
}

impl LoggingSection {
    fn merge(&mut self, other: LoggingSection) {
        if other.file.is_some() {
            self.file = other.file;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::new();
        assert!(config.enabled());
        assert_eq!(config.default_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_timeout(), Duration::from_secs(600));
        assert!(!config.watch());
        assert_eq!(config.max_output_tokens(), 256);
        assert_eq!(
            config.hooks_dir(Path::new("/work")),
            PathBuf::from("/work/.hookbridge/hooks")
        );
    }

    #[test]
    fn test_parse_full() {
        let config = BridgeConfig::from_toml(
            r#"
[hooks]
enabled = false
dir = "/etc/hooks"
default_timeout_secs = 2.5
max_timeout_secs = 60
watch = true

[prompt]
max_output_tokens = 128

[logging]
file = false
"#,
        )
        .unwrap();
        assert!(!config.enabled());
        assert_eq!(
            config.hooks_dir(Path::new("/work")),
            PathBuf::from("/etc/hooks")
        );
        assert_eq!(config.default_timeout(), Duration::from_millis(2500));
        assert_eq!(config.max_timeout(), Duration::from_secs(60));
        assert!(config.watch());
        assert_eq!(config.max_output_tokens(), 128);
        assert!(!config.log_to_file());
    }

    #[test]
    fn test_rejects_non_positive_timeout() {
        let err = BridgeConfig::from_toml("[hooks]\ndefault_timeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("hooks.default_timeout_secs"));
    }

    #[test]
    fn test_merge_field_by_field() {
        let mut base = BridgeConfig::from_toml(
            "[hooks]\nenabled = true\ndefault_timeout_secs = 10\n[prompt]\nmax_output_tokens = 64\n",
        )
        .unwrap();
        let overlay = BridgeConfig::from_toml("[hooks]\ndefault_timeout_secs = 5\n").unwrap();
        base.merge(overlay);

        assert!(base.enabled());
        assert_eq!(base.default_timeout(), Duration::from_secs(5));
        assert_eq!(base.max_output_tokens(), 64);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = BridgeConfig::from_toml("[hooks]\nwatch = true\n").unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(BridgeConfig::from_toml(&text).unwrap(), config);
    }
}
