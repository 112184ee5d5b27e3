//! Run a single hook and capture its raw result.
//!
//! Command hooks run as `sh -c <command>` in the project directory with the
//! event payload on stdin. Prompt hooks go to a [`PromptEvaluator`]. Either
//! way the caller always gets a [`HookInvocationResult`]: spawn failures and
//! timeouts are recorded on the result, never returned as errors.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hookbridge_config::BridgeConfig;
use parking_lot::Mutex;
use hookbridge_types::{ExecutionFault, HookDefinition, HookInvocationResult, HookType};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::prompt::{self, PromptEvaluator};

/// Project root, exported to every hook.
pub const PROJECT_DIR_VAR: &str = "HOOKBRIDGE_PROJECT_DIR";
/// Hooks directory, exported to every hook.
pub const HOOKS_DIR_VAR: &str = "HOOKBRIDGE_HOOKS_DIR";
/// Session id, exported to every hook.
pub const SESSION_ID_VAR: &str = "HOOKBRIDGE_SESSION_ID";
/// Writable env file, exported to SessionStart hooks only.
pub const ENV_FILE_VAR: &str = "HOOKBRIDGE_ENV_FILE";
/// Claude-compatible alias of [`PROJECT_DIR_VAR`].
pub const CLAUDE_PROJECT_DIR_VAR: &str = "CLAUDE_PROJECT_DIR";
/// Claude-compatible alias of [`ENV_FILE_VAR`].
pub const CLAUDE_ENV_FILE_VAR: &str = "CLAUDE_ENV_FILE";

// ─────────────────────────────────────────────────────────────────────────────
// Timeouts
// ─────────────────────────────────────────────────────────────────────────────

/// Default and maximum per-hook timeouts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutPolicy {
    pub default: Duration,
    pub max: Duration,
}

impl TimeoutPolicy {
    pub fn new(default: Duration, max: Duration) -> Self {
        Self { default, max }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.default_timeout(), config.max_timeout())
    }

    /// Effective timeout for a hook: its own value if positive, else the
    /// default, clamped to the maximum.
    pub fn resolve(&self, hook: &HookDefinition) -> Duration {
        let requested = hook
            .timeout
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(|t| Duration::from_secs_f64(t.min(self.max.as_secs_f64())))
            .unwrap_or(self.default);
        requested.min(self.max)
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(600))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// Everything an execution needs besides the hook and payload.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Working directory for command hooks.
    pub project_dir: PathBuf,
    /// Root hooks directory.
    pub hooks_dir: PathBuf,
    /// Directory that contributed the hook; substituted for `${CLAUDE_PLUGIN_ROOT}`.
    pub plugin_root: PathBuf,
    pub session_id: String,
    /// Writable env file (SessionStart only).
    pub env_file: Option<PathBuf>,
    /// Assignments persisted by earlier SessionStart hooks.
    pub session_env: BTreeMap<String, String>,
    /// Replacement for `$ARGUMENTS`; built from the payload when absent.
    pub arguments: Option<String>,
    /// Wall-clock deadline for this execution.
    pub timeout: Duration,
}

impl ExecutionContext {
    /// Environment variables exported to a command hook.
    pub fn env_vars(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            (PROJECT_DIR_VAR.to_string(), self.project_dir.display().to_string()),
            (HOOKS_DIR_VAR.to_string(), self.hooks_dir.display().to_string()),
            (SESSION_ID_VAR.to_string(), self.session_id.clone()),
            (CLAUDE_PROJECT_DIR_VAR.to_string(), self.project_dir.display().to_string()),
            (
                crate::CLAUDE_PLUGIN_ROOT_VAR.to_string(),
                self.plugin_root.display().to_string(),
            ),
        ];
        if let Some(env_file) = &self.env_file {
            let path = env_file.display().to_string();
            vars.push((ENV_FILE_VAR.to_string(), path.clone()));
            vars.push((CLAUDE_ENV_FILE_VAR.to_string(), path));
        }
        vars.extend(self.session_env.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────────────────────────────────────

/// Runs one hook. Implementations must never panic on hook failure.
#[async_trait]
pub trait HookExecutor: Send + Sync {
    async fn execute(
        &self,
        hook: &HookDefinition,
        payload: &Value,
        ctx: &ExecutionContext,
    ) -> HookInvocationResult;
}

/// Executor for real subprocesses and an optional prompt evaluator.
pub struct StandardExecutor {
    evaluator: Option<Arc<dyn PromptEvaluator>>,
    max_output_tokens: u32,
}

impl StandardExecutor {
    pub fn new() -> Self {
        Self {
            evaluator: None,
            max_output_tokens: hookbridge_config::DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    /// Answer prompt hooks with `evaluator`.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn PromptEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    async fn run_prompt(
        &self,
        prompt_text: &str,
        payload: &Value,
        ctx: &ExecutionContext,
    ) -> HookInvocationResult {
        let Some(evaluator) = &self.evaluator else {
            return HookInvocationResult::fault(ExecutionFault::NoEvaluator);
        };

        let arguments = ctx
            .arguments
            .clone()
            .unwrap_or_else(|| prompt::build_arguments(payload));
        let expanded = prompt::expand_arguments(prompt_text, &arguments);

        let started = Instant::now();
        let answer = tokio::time::timeout(
            ctx.timeout,
            evaluator.evaluate(&expanded, self.max_output_tokens),
        )
        .await;

        match answer {
            Ok(Ok(text)) => {
                let verdict = prompt::parse_answer(&text);
                tracing::debug!(
                    ok = verdict.ok,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "prompt hook answered"
                );
                HookInvocationResult::completed(0, verdict.to_hook_output().to_string(), "")
            }
            Ok(Err(e)) => HookInvocationResult::fault(ExecutionFault::Evaluator(e.to_string())),
            Err(_) => {
                tracing::warn!(timeout_ms = ctx.timeout.as_millis() as u64, "prompt hook timed out");
                HookInvocationResult::timed_out()
            }
        }
    }
}

impl Default for StandardExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HookExecutor for StandardExecutor {
    async fn execute(
        &self,
        hook: &HookDefinition,
        payload: &Value,
        ctx: &ExecutionContext,
    ) -> HookInvocationResult {
        let Some(body) = hook.body().filter(|b| !b.trim().is_empty()) else {
            return HookInvocationResult::fault(ExecutionFault::MissingBody {
                hook_type: hook.hook_type.to_string(),
            });
        };
        match hook.hook_type {
            HookType::Command => run_command(body, payload, ctx).await,
            HookType::Prompt => self.run_prompt(body, payload, ctx).await,
        }
    }
}

/// Shortest time spent draining output after the child exits, so a hook
/// that finishes right at its deadline still reports what it wrote. Kept
/// well below the scheduler's grace period.
const MIN_DRAIN: Duration = Duration::from_millis(50);

/// Spawn `sh -c command`, feed it the payload, and wait up to `ctx.timeout`.
///
/// The shell leads its own process group so a timeout kills everything the
/// hook started, not just the shell.
pub async fn run_command(
    command: &str,
    payload: &Value,
    ctx: &ExecutionContext,
) -> HookInvocationResult {
    let expanded = crate::expand_plugin_root(command, &ctx.plugin_root);
    let input = payload.to_string().into_bytes();
    let started = Instant::now();

    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c")
        .arg(&expanded)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .envs(ctx.env_vars())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    if ctx.project_dir.is_dir() {
        cmd.current_dir(&ctx.project_dir);
    }

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            return HookInvocationResult::fault(ExecutionFault::Spawn {
                command: expanded,
                message: e.to_string(),
            });
        }
    };
    let pid = child.id();

    // Writer and readers run as tasks so a hook that ignores stdin, or
    // fills its output pipes before exiting, cannot stall the wait. Readers
    // append to shared buffers so output survives an abandoned read.
    let stdin = child.stdin.take();
    let writer = tokio::spawn(async move {
        if let Some(mut stdin) = stdin {
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        }
    });
    let stdout_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let mut stdout_task = tokio::spawn(read_pipe(child.stdout.take(), Arc::clone(&stdout_buf)));
    let mut stderr_task = tokio::spawn(read_pipe(child.stderr.take(), Arc::clone(&stderr_buf)));

    let status = match tokio::time::timeout(ctx.timeout, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            writer.abort();
            stdout_task.abort();
            stderr_task.abort();
            return HookInvocationResult::fault(ExecutionFault::Io(e.to_string()));
        }
        Err(_) => {
            if let Some(pid) = pid {
                kill_process_group(pid).await;
            }
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "failed to kill timed out hook");
            }
            writer.abort();
            stdout_task.abort();
            stderr_task.abort();
            tracing::warn!(
                command = %expanded,
                timeout_ms = ctx.timeout.as_millis() as u64,
                "hook timed out"
            );
            return HookInvocationResult::timed_out();
        }
    };
    writer.abort();

    // Background processes the hook left behind may still hold the pipes.
    // Drain both together and stop at the original deadline; the exit status
    // already observed stands either way.
    let remaining = ctx
        .timeout
        .saturating_sub(started.elapsed())
        .max(MIN_DRAIN);
    let drained = tokio::time::timeout(remaining, async {
        let _ = tokio::join!(&mut stdout_task, &mut stderr_task);
    })
    .await;
    if drained.is_err() {
        stdout_task.abort();
        stderr_task.abort();
        tracing::debug!(command = %expanded, "hook output still open after exit, keeping what was read");
    }
    let stdout = String::from_utf8_lossy(&stdout_buf.lock()).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_buf.lock()).into_owned();

    if !stderr.trim().is_empty() {
        tracing::debug!(stderr = %stderr.trim(), "hook stderr");
    }
    tracing::debug!(
        command = %expanded,
        exit_code = ?status.code(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "hook finished"
    );

    HookInvocationResult {
        exit_code: status.code(),
        stdout,
        stderr,
        timed_out: false,
        exception: None,
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>, sink: Arc<Mutex<Vec<u8>>>) {
    let Some(mut pipe) = pipe else {
        return;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read hook output");
                break;
            }
        }
    }
}

/// SIGKILL every process in the group led by `pgid`.
async fn kill_process_group(pgid: u32) {
    let result = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(format!("kill -9 -{}", pgid))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match result {
        Ok(status) if !status.success() => {
            tracing::debug!(pgid, "process group already gone");
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(pgid, error = %e, "failed to kill hook process group"),
    }
}
