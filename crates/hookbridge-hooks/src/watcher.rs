//! Hot reload of the hooks directory.
//!
//! Watches the hooks directory recursively and rebuilds the bridge's base
//! registry when a `hooks.json` changes. Debouncing coalesces editor save
//! bursts into one reload.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::{DebouncedEventKind, Debouncer, new_debouncer};
use tokio::sync::mpsc;

use crate::bridge::HookBridge;
use crate::loader::HOOKS_FILE;

/// Emitted after each reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    /// Sources that loaded.
    pub sources: usize,
    /// Hooks in the new base registry.
    pub hooks: usize,
    /// Sources that failed, as messages.
    pub errors: Vec<String>,
}

/// Keeps a watch alive. Dropping it stops the watcher and its thread.
pub struct WatcherHandle {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    _thread: std::thread::JoinHandle<()>,
}

/// Watches a bridge's hooks directory.
pub struct HookWatcher {
    bridge: Arc<HookBridge>,
    debounce: Duration,
}

impl HookWatcher {
    pub fn new(bridge: Arc<HookBridge>) -> Self {
        Self {
            bridge,
            debounce: Duration::from_millis(500),
        }
    }

    /// Set the debounce duration.
    pub fn with_debounce(mut self, duration: Duration) -> Self {
        self.debounce = duration;
        self
    }

    /// Start watching.
    ///
    /// Returns a channel of reload events and a handle that keeps the
    /// watcher alive.
    pub fn watch(&self) -> std::io::Result<(mpsc::Receiver<ReloadEvent>, WatcherHandle)> {
        let hooks_dir = self.bridge.hooks_dir().to_path_buf();
        let (event_tx, event_rx) = mpsc::channel(16);
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer(self.debounce, notify_tx)
            .map_err(|e| std::io::Error::other(format!("watcher init: {}", e)))?;

        if hooks_dir.exists() {
            debouncer
                .watcher()
                .watch(&hooks_dir, notify::RecursiveMode::Recursive)
                .map_err(|e| std::io::Error::other(format!("watch {}: {}", hooks_dir.display(), e)))?;
        } else {
            tracing::warn!(dir = %hooks_dir.display(), "hooks directory does not exist, not watching");
        }

        let bridge = Arc::clone(&self.bridge);
        let thread = std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!(error = %e, "hooks watcher error");
                        continue;
                    }
                };

                let relevant = events
                    .iter()
                    .filter(|e| e.kind == DebouncedEventKind::Any)
                    .any(|e| affects_registry(&e.path));
                if !relevant {
                    continue;
                }

                let report = bridge.reload();
                let event = ReloadEvent {
                    sources: report.sources.len(),
                    hooks: report.registry.len(),
                    errors: report.errors.iter().map(|e| e.to_string()).collect(),
                };
                if event_tx.blocking_send(event).is_err() {
                    tracing::debug!("reload receiver dropped");
                }
            }
            tracing::debug!(dir = %hooks_dir.display(), "hooks watcher stopped");
        });

        Ok((
            event_rx,
            WatcherHandle {
                _debouncer: debouncer,
                _thread: thread,
            },
        ))
    }
}

/// A change matters if it touches a `hooks.json` or removes a directory
/// that may have held one.
fn affects_registry(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == HOOKS_FILE) || path.is_dir() || !path.exists()
}
