//! `hookbridge watch` - follow the hooks directory and report each reload.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use hookbridge_hooks::{HookWatcher, ReloadEvent};

use super::Context;

/// Arguments for `hookbridge watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Debounce window in milliseconds
    #[arg(long, default_value_t = 500)]
    pub debounce_ms: u64,
}

/// Run `hookbridge watch` until interrupted.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let bridge = Arc::new(ctx.bridge());
    let watcher = HookWatcher::new(Arc::clone(&bridge))
        .with_debounce(Duration::from_millis(args.debounce_ms));
    let (mut reloads, _handle) = watcher.watch().context("failed to start watcher")?;

    if !ctx.json_output {
        println!(
            "Watching {} ({} hook(s) loaded). Press Ctrl-C to stop.",
            bridge.hooks_dir().display(),
            bridge.snapshot().len()
        );
    }

    loop {
        tokio::select! {
            event = reloads.recv() => match event {
                Some(event) => report(&event, ctx.json_output),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn report(event: &ReloadEvent, json: bool) {
    if json {
        let line = serde_json::json!({
            "sources": event.sources,
            "hooks": event.hooks,
            "errors": event.errors,
        });
        println!("{}", line);
        return;
    }

    println!(
        "reloaded: {} source(s), {} hook(s)",
        event.sources, event.hooks
    );
    for err in &event.errors {
        println!("  FAIL {}", err);
    }
}
