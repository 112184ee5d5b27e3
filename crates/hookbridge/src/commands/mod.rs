//! CLI command handlers.

pub mod dispatch;
pub mod list;
pub mod validate;
pub mod watch;

use std::path::PathBuf;

use hookbridge_config::BridgeConfig;
use hookbridge_hooks::{BridgeOptions, HookBridge};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Project root hooks run in.
    pub project_dir: PathBuf,
    /// Merged settings.
    pub config: BridgeConfig,
    /// Config files that contributed to `config`.
    pub config_sources: Vec<PathBuf>,
    /// Config layers that failed to load and were skipped.
    pub config_warnings: Vec<String>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions::from_config(&self.config, &self.project_dir)
    }

    /// A bridge with the hooks directory already loaded.
    pub fn bridge(&self) -> HookBridge {
        HookBridge::new(self.bridge_options())
    }
}
