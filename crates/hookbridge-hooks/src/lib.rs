//! Lifecycle-hook bridge engine.
//!
//! Runs externally defined hooks (shell commands or prompt evaluations) at
//! agent lifecycle events and turns their responses into a single
//! [`Decision`](hookbridge_types::Decision) per event.
//!
//! ```text
//! event ──► EventRegistry snapshot ──► matching groups ──► FanOutScheduler
//!                ▲                                              │
//!   loader + ScopeManager                          executor ──► translator
//!                                                               │
//!                                                           Decision
//! ```
//!
//! Hook registries use the Claude Code `hooks.json` format and the same
//! output protocol: exit code 0 allows, 2 blocks, and JSON on stdout may
//! block, rewrite the payload, or inject context.

pub mod bridge;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod loader;
pub mod matcher;
pub mod payload;
pub mod prompt;
pub mod registry;
pub mod scheduler;
pub mod scope;
pub mod session_env;
pub mod skill;
pub mod translator;
pub mod watcher;

pub use bridge::{BridgeOptions, HookBridge};
pub use error::{ConfigError, EvaluatorError, MatchError, ProtocolError};
pub use executor::{ExecutionContext, HookExecutor, StandardExecutor, TimeoutPolicy};
pub use ledger::{OnceClaim, RunOnceLedger};
pub use loader::{HookConfigLoader, HookSource, LoadReport, merge, parse_source};
pub use matcher::{HookMatcher, matches};
pub use prompt::{PromptEvaluator, PromptVerdict};
pub use registry::{EventRegistry, HookOrigin, MatcherGroup, RegistryHandle};
pub use scheduler::FanOutScheduler;
pub use scope::{ScopeManager, ScopedRegistration};
pub use session_env::SessionEnv;
pub use skill::{SkillHooks, load_skill_hooks, parse_skill_hooks};
pub use translator::translate;
pub use watcher::{HookWatcher, ReloadEvent, WatcherHandle};

/// Environment variable (and command placeholder) naming the directory that
/// contributed a hook.
pub const CLAUDE_PLUGIN_ROOT_VAR: &str = "CLAUDE_PLUGIN_ROOT";

/// Expand `${CLAUDE_PLUGIN_ROOT}` in a string to the given directory.
///
/// ```
/// use std::path::Path;
/// use hookbridge_hooks::expand_plugin_root;
///
/// let dir = Path::new("/project/.hookbridge/hooks/formatter");
/// let cmd = "${CLAUDE_PLUGIN_ROOT}/scripts/format.sh --check";
/// assert_eq!(
///     expand_plugin_root(cmd, dir),
///     "/project/.hookbridge/hooks/formatter/scripts/format.sh --check"
/// );
/// ```
pub fn expand_plugin_root(s: &str, plugin_dir: &std::path::Path) -> String {
    s.replace("${CLAUDE_PLUGIN_ROOT}", &plugin_dir.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_expand_plugin_root_multiple() {
        let expanded = expand_plugin_root(
            "${CLAUDE_PLUGIN_ROOT}/bin:${CLAUDE_PLUGIN_ROOT}/lib",
            Path::new("/hooks/fmt"),
        );
        assert_eq!(expanded, "/hooks/fmt/bin:/hooks/fmt/lib");
    }

    #[test]
    fn test_expand_plugin_root_no_variable() {
        assert_eq!(
            expand_plugin_root("./relative/path.sh", Path::new("/hooks")),
            "./relative/path.sh"
        );
    }
}
