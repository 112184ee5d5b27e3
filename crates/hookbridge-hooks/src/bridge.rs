//! The dispatch façade a host runtime talks to.
//!
//! [`HookBridge`] owns the directory registry, scoped registrations, the
//! run-once ledger and the session environment. Every change to the
//! directory sources or scopes rebuilds the active registry and swaps it in
//! whole; each dispatch works from the snapshot it took at the start.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use hookbridge_config::{BridgeConfig, DEFAULT_HOOKS_DIR, DEFAULT_MAX_OUTPUT_TOKENS};
use hookbridge_types::{Decision, HookDispatch, HookEvent, HooksConfig};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::ConfigError;
use crate::executor::{ExecutionContext, HookExecutor, StandardExecutor, TimeoutPolicy};
use crate::ledger::RunOnceLedger;
use crate::loader::{HookConfigLoader, LoadReport};
use crate::payload;
use crate::prompt::{self, PromptEvaluator};
use crate::registry::{EventRegistry, RegistryHandle};
use crate::scheduler::FanOutScheduler;
use crate::scope::ScopeManager;
use crate::session_env::SessionEnv;
use crate::skill::{SkillHooks, load_skill_hooks};

/// Resolved bridge settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeOptions {
    /// Working directory for hooks.
    pub project_dir: PathBuf,
    /// Root of the `hooks.json` tree.
    pub hooks_dir: PathBuf,
    /// When false, every dispatch continues without running anything.
    pub enabled: bool,
    pub timeouts: TimeoutPolicy,
    pub max_output_tokens: u32,
}

impl BridgeOptions {
    /// Defaults for a project directory.
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            hooks_dir: project_dir.join(DEFAULT_HOOKS_DIR),
            project_dir,
            enabled: true,
            timeouts: TimeoutPolicy::default(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    /// Settings from a loaded config.
    pub fn from_config(config: &BridgeConfig, project_dir: &Path) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            hooks_dir: config.hooks_dir(project_dir),
            enabled: config.enabled(),
            timeouts: TimeoutPolicy::from_config(config),
            max_output_tokens: config.max_output_tokens(),
        }
    }

    pub fn with_hooks_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.hooks_dir = dir.into();
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[derive(Debug, Default)]
struct Sources {
    base: EventRegistry,
    scopes: ScopeManager,
}

/// Lifecycle-hook bridge.
pub struct HookBridge {
    options: BridgeOptions,
    loader: HookConfigLoader,
    registry: RegistryHandle,
    sources: Mutex<Sources>,
    scheduler: FanOutScheduler,
    ledger: Arc<RunOnceLedger>,
    session: Mutex<Option<Arc<SessionEnv>>>,
}

impl HookBridge {
    /// Bridge with the subprocess executor and no prompt evaluator.
    pub fn new(options: BridgeOptions) -> Self {
        let executor =
            StandardExecutor::new().with_max_output_tokens(options.max_output_tokens);
        Self::with_executor(options, Arc::new(executor))
    }

    /// Bridge whose prompt hooks are answered by `evaluator`.
    pub fn with_evaluator(options: BridgeOptions, evaluator: Arc<dyn PromptEvaluator>) -> Self {
        let executor = StandardExecutor::new()
            .with_max_output_tokens(options.max_output_tokens)
            .with_evaluator(evaluator);
        Self::with_executor(options, Arc::new(executor))
    }

    /// Bridge with a custom executor. Loads the hooks directory immediately.
    pub fn with_executor(options: BridgeOptions, executor: Arc<dyn HookExecutor>) -> Self {
        let ledger = Arc::new(RunOnceLedger::new());
        let bridge = Self {
            loader: HookConfigLoader::new(&options.hooks_dir),
            scheduler: FanOutScheduler::new(executor, Arc::clone(&ledger), options.timeouts),
            registry: RegistryHandle::default(),
            sources: Mutex::new(Sources::default()),
            ledger,
            session: Mutex::new(None),
            options,
        };
        bridge.reload();
        bridge
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    pub fn hooks_dir(&self) -> &Path {
        &self.options.hooks_dir
    }

    /// Re-read the hooks directory and swap in a new registry.
    pub fn reload(&self) -> LoadReport {
        let report = self.loader.load();
        let mut sources = self.sources.lock();
        sources.base = report.registry.clone();
        self.rebuild(&sources);
        report
    }

    /// The active registry snapshot.
    pub fn snapshot(&self) -> Arc<EventRegistry> {
        self.registry.snapshot()
    }

    /// Register hooks for a scoped owner. Returns `true` if it replaced an
    /// existing registration.
    pub fn enter_scope(&self, owner_id: &str, hooks: &HooksConfig, base_dir: &Path) -> bool {
        let mut sources = self.sources.lock();
        let replaced = sources.scopes.enter_scope(owner_id, hooks, base_dir);
        self.rebuild(&sources);
        replaced
    }

    /// Remove a scoped owner's hooks. Returns `false` if it was not registered.
    pub fn exit_scope(&self, owner_id: &str) -> bool {
        let mut sources = self.sources.lock();
        let removed = sources.scopes.exit_scope(owner_id);
        if removed {
            self.rebuild(&sources);
        }
        removed
    }

    /// Parse a skill file and register its hooks under the skill's name.
    pub fn load_skill(&self, path: &Path) -> Result<SkillHooks, ConfigError> {
        let skill = load_skill_hooks(path)?;
        self.enter_scope(&skill.name, &skill.hooks, &skill.base_dir);
        Ok(skill)
    }

    /// Owners currently in scope, in registration order.
    pub fn scoped_owners(&self) -> Vec<String> {
        self.sources
            .lock()
            .scopes
            .owners()
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn ledger(&self) -> &RunOnceLedger {
        &self.ledger
    }

    /// Drop scoped hooks, run-once records and the session env file.
    pub fn end_session(&self) {
        let cleared = {
            let mut sources = self.sources.lock();
            let cleared = sources.scopes.clear();
            self.rebuild(&sources);
            cleared
        };
        self.ledger.clear();
        if let Some(env) = self.session.lock().take() {
            env.cleanup();
        }
        tracing::info!(scopes = cleared, "session ended");
    }

    /// Dispatch one event and return the decision the host must obey.
    pub async fn dispatch(&self, event: HookEvent, mut data: Value) -> Decision {
        if !self.options.enabled {
            return Decision::allow();
        }

        let snapshot = self.registry.snapshot();
        let subject = payload::match_subject(event, &data);
        let groups = snapshot.matching_groups(event, &subject);
        if groups.is_empty() {
            tracing::trace!(event = %event, subject = %subject, "no matching hooks");
            if event == HookEvent::SessionEnd {
                self.end_session();
            }
            return Decision::allow();
        }

        let session = self.session_for(&data);
        if let Value::Object(map) = &mut data
            && !map.contains_key("session_id")
        {
            map.insert("session_id".into(), Value::String(session.session_id().to_string()));
        }

        let payload = payload::build_payload(event, &data);
        let env_file = if event == HookEvent::SessionStart {
            match session.env_file() {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to create session env file");
                    None
                }
            }
        } else {
            None
        };

        let ctx = ExecutionContext {
            project_dir: self.options.project_dir.clone(),
            hooks_dir: self.options.hooks_dir.clone(),
            plugin_root: self.options.hooks_dir.clone(),
            session_id: session.session_id().to_string(),
            env_file,
            session_env: session.vars(),
            arguments: Some(prompt::build_arguments(&payload)),
            timeout: self.options.timeouts.default,
        };

        tracing::debug!(event = %event, subject = %subject, groups = groups.len(), "dispatching hooks");
        let decision = self.scheduler.run_groups(&groups, &payload, &ctx).await;

        match &decision {
            Decision::Deny { reason, .. } => {
                tracing::info!(event = %event, subject = %subject, reason = %reason, "hook denied event");
                if !event.can_block() {
                    tracing::warn!(event = %event, "deny returned for an event the host cannot block");
                }
            }
            other => {
                tracing::debug!(event = %event, action = other.action(), "dispatch complete");
            }
        }

        match event {
            HookEvent::SessionStart => session.refresh(),
            HookEvent::SessionEnd => self.end_session(),
            _ => {}
        }
        decision
    }

    fn rebuild(&self, sources: &Sources) {
        let active = sources.scopes.compose(&sources.base);
        tracing::debug!(hooks = active.len(), scopes = sources.scopes.len(), "registry rebuilt");
        self.registry.replace(active);
    }

    /// The env state for the event's session, starting a new one when the
    /// session id changes.
    fn session_for(&self, data: &Value) -> Arc<SessionEnv> {
        let requested = data.get("session_id").and_then(Value::as_str);
        let mut current = self.session.lock();
        match (current.as_ref(), requested) {
            (Some(env), None) => return Arc::clone(env),
            (Some(env), Some(id)) if env.session_id() == id => return Arc::clone(env),
            _ => {}
        }
        if let Some(old) = current.take() {
            old.cleanup();
        }
        let env = Arc::new(SessionEnv::new(
            requested.unwrap_or(payload::UNKNOWN_SESSION),
        ));
        *current = Some(Arc::clone(&env));
        env
    }
}

#[async_trait]
impl HookDispatch for HookBridge {
    async fn dispatch(&self, event: HookEvent, data: Value) -> Decision {
        HookBridge::dispatch(self, event, data).await
    }

    async fn enter_scope(&self, owner_id: &str, hooks: HooksConfig, base_dir: &Path) {
        HookBridge::enter_scope(self, owner_id, &hooks, base_dir);
    }

    async fn exit_scope(&self, owner_id: &str) {
        HookBridge::exit_scope(self, owner_id);
    }

    async fn end_session(&self) {
        HookBridge::end_session(self);
    }

    fn len(&self) -> usize {
        self.registry.snapshot().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_hooks(dir: &Path, json: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("hooks.json"), json).unwrap();
    }

    #[test]
    fn test_options_from_config() {
        let config = BridgeConfig::from_toml(
            "[hooks]\nenabled = false\ndir = \"hooks\"\ndefault_timeout_secs = 5\n",
        )
        .unwrap();
        let options = BridgeOptions::from_config(&config, Path::new("/proj"));
        assert!(!options.enabled);
        assert_eq!(options.hooks_dir, PathBuf::from("/proj/hooks"));
        assert_eq!(options.timeouts.default, std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_loads_on_construction() {
        let tmp = TempDir::new().unwrap();
        let hooks = tmp.path().join("hooks");
        write_hooks(
            &hooks,
            r#"{"hooks": {"Stop": [{"hooks": [{"type": "command", "command": "true"}]}]}}"#,
        );
        let bridge = HookBridge::new(BridgeOptions::new(tmp.path()).with_hooks_dir(&hooks));
        assert_eq!(bridge.snapshot().len(), 1);
        assert_eq!(HookDispatch::len(&bridge), 1);
    }

    #[test]
    fn test_scope_changes_swap_snapshot() {
        let tmp = TempDir::new().unwrap();
        let bridge = HookBridge::new(BridgeOptions::new(tmp.path()));
        let before = bridge.snapshot();

        let hooks: HooksConfig = serde_json::from_str(
            r#"{"hooks": {"PreToolUse": [{"hooks": [{"type": "command", "command": "true"}]}]}}"#,
        )
        .unwrap();
        assert!(!bridge.enter_scope("skill", &hooks, tmp.path()));
        assert!(before.is_empty());
        assert_eq!(bridge.snapshot().len(), 1);
        assert_eq!(bridge.scoped_owners(), vec!["skill"]);

        bridge.end_session();
        assert!(bridge.snapshot().is_empty());
        assert!(bridge.scoped_owners().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_bridge_allows() {
        let tmp = TempDir::new().unwrap();
        let hooks = tmp.path().join("hooks");
        write_hooks(
            &hooks,
            r#"{"hooks": {"PreToolUse": [{"hooks": [{"type": "command", "command": "exit 2"}]}]}}"#,
        );
        let mut options = BridgeOptions::new(tmp.path()).with_hooks_dir(&hooks);
        options.enabled = false;
        let bridge = HookBridge::new(options);
        let decision = bridge
            .dispatch(HookEvent::PreToolUse, serde_json::json!({"tool_name": "Bash"}))
            .await;
        assert_eq!(decision, Decision::allow());
    }
}
