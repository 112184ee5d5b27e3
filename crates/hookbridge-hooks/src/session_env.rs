//! Environment assignments persisted by SessionStart hooks.
//!
//! SessionStart hooks receive a writable file path in `HOOKBRIDGE_ENV_FILE`
//! (and `CLAUDE_ENV_FILE`). Lines they write there (`export KEY=value` or
//! `KEY=value`) are exported to every later hook of the same session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

/// Per-session env file and the assignments read back from it.
#[derive(Debug)]
pub struct SessionEnv {
    session_id: String,
    file: Mutex<Option<PathBuf>>,
    vars: RwLock<BTreeMap<String, String>>,
}

impl SessionEnv {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            file: Mutex::new(None),
            vars: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Path of the env file, creating an empty one on first use.
    pub fn env_file(&self) -> std::io::Result<PathBuf> {
        let mut file = self.file.lock();
        if let Some(path) = file.as_ref() {
            return Ok(path.clone());
        }
        let prefix: String = self
            .session_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect();
        let path = std::env::temp_dir().join(format!(
            "hookbridge-env-{}-{}.env",
            prefix,
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::write(&path, "")?;
        tracing::debug!(session_id = %self.session_id, path = %path.display(), "created session env file");
        *file = Some(path.clone());
        Ok(path)
    }

    /// Re-read the env file, replacing the persisted assignments.
    pub fn refresh(&self) {
        let Some(path) = self.file.lock().clone() else {
            return;
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let parsed = parse_env_assignments(&content);
                if !parsed.is_empty() {
                    tracing::debug!(
                        session_id = %self.session_id,
                        count = parsed.len(),
                        "loaded persisted session env"
                    );
                }
                *self.vars.write() = parsed;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read session env file");
            }
        }
    }

    /// Persisted assignments, in key order.
    pub fn vars(&self) -> BTreeMap<String, String> {
        self.vars.read().clone()
    }

    /// Delete the env file and forget all assignments.
    pub fn cleanup(&self) {
        if let Some(path) = self.file.lock().take() {
            remove_quietly(&path);
        }
        self.vars.write().clear();
    }
}

impl Drop for SessionEnv {
    fn drop(&mut self) {
        if let Some(path) = self.file.get_mut().take() {
            remove_quietly(&path);
        }
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::debug!(path = %path.display(), error = %e, "failed to remove session env file");
    }
}

/// Parse `export KEY=value` / `KEY=value` lines.
///
/// Blank lines and `#` comments are skipped, surrounding quotes are removed,
/// and later assignments win.
pub fn parse_env_assignments(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
