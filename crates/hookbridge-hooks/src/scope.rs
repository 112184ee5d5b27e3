//! Hooks active only while their owning component is in scope.
//!
//! Each owner moves `unregistered -> registered -> unregistered`. Entering
//! scope again while registered replaces the previous fragment. Fragments
//! are kept in registration order and appended after the directory sources
//! when the active registry is rebuilt.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use hookbridge_types::{HookType, HooksConfig};

use crate::registry::{EventRegistry, HookOrigin};

/// One owner's active hooks.
#[derive(Debug, Clone)]
pub struct ScopedRegistration {
    pub owner_id: String,
    pub fragment: EventRegistry,
    pub registered_at: DateTime<Utc>,
}

/// Registered scopes, in registration order.
#[derive(Debug, Default)]
pub struct ScopeManager {
    registrations: Vec<ScopedRegistration>,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `owner_id`'s hooks. Relative commands resolve against
    /// `base_dir`. Returns `true` if a previous registration was replaced.
    pub fn enter_scope(&mut self, owner_id: &str, hooks: &HooksConfig, base_dir: &Path) -> bool {
        let replaced = self.remove(owner_id).is_some();
        let resolved = resolve_relative_commands(hooks, base_dir);
        let fragment = EventRegistry::from_config(&resolved, HookOrigin::new(owner_id, base_dir));

        tracing::info!(
            owner = %owner_id,
            hooks = fragment.len(),
            replaced,
            "scoped hooks registered"
        );
        self.registrations.push(ScopedRegistration {
            owner_id: owner_id.to_string(),
            fragment,
            registered_at: Utc::now(),
        });
        replaced
    }

    /// Remove `owner_id`'s hooks. Returns `false` if it was not registered.
    pub fn exit_scope(&mut self, owner_id: &str) -> bool {
        match self.remove(owner_id) {
            Some(reg) => {
                tracing::info!(owner = %owner_id, hooks = reg.fragment.len(), "scoped hooks removed");
                true
            }
            None => {
                tracing::debug!(owner = %owner_id, "exit for unregistered scope");
                false
            }
        }
    }

    /// Remove every registration. Returns how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.registrations.len();
        self.registrations.clear();
        count
    }

    /// Owner ids in registration order.
    pub fn owners(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.owner_id.as_str()).collect()
    }

    /// Fragments in registration order.
    pub fn fragments(&self) -> impl Iterator<Item = &EventRegistry> {
        self.registrations.iter().map(|r| &r.fragment)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// `base` followed by every fragment.
    pub fn compose(&self, base: &EventRegistry) -> EventRegistry {
        self.fragments()
            .fold(base.clone(), |acc, fragment| acc.merged_with(fragment))
    }

    fn remove(&mut self, owner_id: &str) -> Option<ScopedRegistration> {
        let index = self
            .registrations
            .iter()
            .position(|r| r.owner_id == owner_id)?;
        Some(self.registrations.remove(index))
    }
}

/// Copy of `hooks` with `./` and `../` command paths made absolute.
///
/// Only the first word of a command is treated as the path; arguments are
/// left alone.
pub fn resolve_relative_commands(hooks: &HooksConfig, base_dir: &Path) -> HooksConfig {
    let mut resolved = hooks.clone();
    for hook in resolved
        .hooks
        .values_mut()
        .flat_map(|groups| groups.iter_mut())
        .flat_map(|group| group.hooks.iter_mut())
        .filter(|h| h.hook_type == HookType::Command)
    {
        if let Some(command) = &hook.command {
            hook.command = Some(resolve_command(command, base_dir));
        }
    }
    resolved
}

fn resolve_command(command: &str, base_dir: &Path) -> String {
    let trimmed = command.trim_start();
    if !(trimmed.starts_with("./") || trimmed.starts_with("../")) {
        return command.to_string();
    }
    let (program, rest) = match trimmed.find(char::is_whitespace) {
        Some(i) => trimmed.split_at(i),
        None => (trimmed, ""),
    };
    let absolute = normalize(&base_dir.join(program));
    format!("{}{}", absolute.display(), rest)
}

/// Lexically collapse `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbridge_types::{HookDefinition, HookEvent, HookMatcherGroup};

    fn hooks(commands: &[&str]) -> HooksConfig {
        let mut config = HooksConfig::default();
        config.hooks.insert(
            HookEvent::PreToolUse,
            vec![HookMatcherGroup {
                matcher: Some("Bash".into()),
                parallel: false,
                hooks: commands.iter().map(|c| HookDefinition::command(*c)).collect(),
            }],
        );
        config
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
    fn test_resolve_relative_commands() {
        let config = hooks(&["./check.sh --strict", "../shared/lint.sh", "echo hi", "/abs/x.sh"]);
        let resolved = resolve_relative_commands(&config, Path::new("/skills/careful"));
        let commands: Vec<_> = resolved.hooks[&HookEvent::PreToolUse][0]
            .hooks
            .iter()
            .map(|h| h.command.clone().unwrap())
            .collect();
        assert_eq!(
            commands,
            vec![
                "/skills/careful/check.sh --strict",
                "/skills/shared/lint.sh",
                "echo hi",
                "/abs/x.sh",
            ]
        );
        // input untouched
        assert_eq!(
            config.hooks[&HookEvent::PreToolUse][0].hooks[0].command.as_deref(),
            Some("./check.sh --strict")
        );
    }

    #[test]
    fn test_enter_and_exit() {
        let mut scopes = ScopeManager::new();
        assert!(!scopes.enter_scope("skill-a", &hooks(&["a"]), Path::new("/a")));
        assert_eq!(scopes.owners(), vec!["skill-a"]);
        assert_eq!(commands(&scopes.compose(&EventRegistry::new())), vec!["a"]);

        assert!(scopes.exit_scope("skill-a"));
        assert!(scopes.owners().is_empty());
        assert!(scopes.compose(&EventRegistry::new()).is_empty());
        assert!(!scopes.exit_scope("skill-a"));
    }

    #[test]
    fn test_duplicate_enter_replaces() {
        let mut scopes = ScopeManager::new();
        scopes.enter_scope("k", &hooks(&["first"]), Path::new("/k"));
        assert!(scopes.enter_scope("k", &hooks(&["second"]), Path::new("/k")));
        assert_eq!(scopes.len(), 1);
        assert_eq!(commands(&scopes.compose(&EventRegistry::new())), vec!["second"]);
    }

    #[test]
    fn test_compose_appends_after_base_in_registration_order() {
        let base = EventRegistry::from_config(&hooks(&["dir"]), HookOrigin::new("directory", "/h"));
        let mut scopes = ScopeManager::new();
        scopes.enter_scope("one", &hooks(&["one"]), Path::new("/1"));
        scopes.enter_scope("two", &hooks(&["two"]), Path::new("/2"));
        assert_eq!(commands(&scopes.compose(&base)), vec!["dir", "one", "two"]);
        assert_eq!(scopes.owners(), vec!["one", "two"]);
        assert_eq!(commands(&base), vec!["dir"]);
    }

    #[test]
    fn test_fragment_origin() {
        let mut scopes = ScopeManager::new();
        scopes.enter_scope("k", &hooks(&["x"]), Path::new("/skills/k"));
        let fragment = scopes.fragments().next().unwrap();
        let group = &fragment.groups(HookEvent::PreToolUse)[0];
        assert_eq!(group.origin.owner, "k");
        assert_eq!(group.origin.base_dir, PathBuf::from("/skills/k"));
    }

    #[test]
    fn test_clear() {
        let mut scopes = ScopeManager::new();
        scopes.enter_scope("a", &hooks(&["a"]), Path::new("/a"));
        scopes.enter_scope("b", &hooks(&["b"]), Path::new("/b"));
        assert_eq!(scopes.clear(), 2);
        assert!(scopes.is_empty());
    }
}
