//! Hooks declared in skill frontmatter.
//!
//! A skill's `SKILL.md` may carry a `hooks:` mapping in the same schema as
//! `hooks.json` (event name to matcher groups). Those hooks are scoped: they
//! are active only while the skill is loaded.
//!
//! ```markdown
//! ---
//! name: careful-edit
//! description: Edit with lint checks
//! hooks:
//!   PostToolUse:
//!     - matcher: "Edit|Write"
//!       hooks:
//!         - type: command
//!           command: ./scripts/lint.sh
//! ---
//!
//! # Careful edit
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hookbridge_types::{HookEvent, HookMatcherGroup, HooksConfig};

use crate::error::ConfigError;
use crate::loader::validate_config;

/// Hooks extracted from one skill file.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillHooks {
    /// Skill name; the scope owner id.
    pub name: String,
    pub description: String,
    /// Directory containing the skill file; relative commands resolve here.
    pub base_dir: PathBuf,
    pub hooks: HooksConfig,
}

#[derive(Debug, serde::Deserialize)]
struct SkillFrontmatter {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    hooks: BTreeMap<HookEvent, Vec<HookMatcherGroup>>,
}

/// Parse skill markdown. `path` names the source in errors and provides the
/// base directory and fallback name.
pub fn parse_skill_hooks(path: &Path, content: &str) -> Result<SkillHooks, ConfigError> {
    let frontmatter = split_frontmatter(content).ok_or_else(|| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: "skill file must start with a --- frontmatter block".to_string(),
    })?;

    let parsed: SkillFrontmatter =
        serde_yaml::from_str(frontmatter).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: format!("skill frontmatter: {}", e),
        })?;

    let hooks = HooksConfig {
        hooks: parsed.hooks,
    };
    validate_config(path, &hooks)?;

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let name = if parsed.name.trim().is_empty() {
        base_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string()
    } else {
        parsed.name.trim().to_string()
    };
    if name.is_empty() {
        return Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            location: "name".to_string(),
            message: "skill name must not be empty".to_string(),
        });
    }

    Ok(SkillHooks {
        name,
        description: parsed.description,
        base_dir,
        hooks,
    })
}

/// Read and parse a skill file.
pub fn load_skill_hooks(path: &Path) -> Result<SkillHooks, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_skill_hooks(path, &content)
}

/// The YAML between the leading `---` and the next `---` line.
fn split_frontmatter(content: &str) -> Option<&str> {
    let trimmed = content.trim_start();
    let after_first = trimmed.strip_prefix("---")?;
    let close = after_first.find("\n---")?;
    Some(&after_first[..close])
}
