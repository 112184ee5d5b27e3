//! `hookbridge dispatch` - run the hooks for one event.
//!
//! Reads the event data as a JSON object from `--payload` or stdin and prints
//! the resulting decision. With `--exit-code`, a deny also exits with status
//! 2 and writes the reason to stderr, which lets hookbridge itself sit in a
//! Claude-format `hooks.json`.

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use hookbridge_types::{Decision, HookEvent};
use serde_json::Value;
use tokio::io::AsyncReadExt;

use super::Context;

/// Exit status for a denied event under `--exit-code`.
const DENY_EXIT_CODE: i32 = 2;

/// Arguments for `hookbridge dispatch`.
#[derive(Args, Debug)]
pub struct DispatchArgs {
    /// Lifecycle event (e.g. PreToolUse, SessionStart)
    #[arg(long, short)]
    pub event: HookEvent,

    /// Session id (overrides any session_id in the event data)
    #[arg(long)]
    pub session_id: Option<String>,

    /// Read event data from FILE instead of stdin
    #[arg(long, value_name = "FILE")]
    pub payload: Option<PathBuf>,

    /// Exit with status 2 when the decision is deny
    #[arg(long)]
    pub exit_code: bool,
}

/// Run `hookbridge dispatch`.
pub async fn run(args: DispatchArgs, ctx: &Context) -> Result<()> {
    let raw = match &args.payload {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read event data from stdin")?;
            buf
        }
    };

    let mut data = parse_event_data(&raw)?;
    if let (Some(id), Value::Object(map)) = (args.session_id, &mut data) {
        map.insert("session_id".into(), Value::String(id));
    }

    if ctx.verbose {
        eprintln!(
            "Dispatching {} (hooks dir: {})",
            args.event,
            ctx.bridge_options().hooks_dir.display()
        );
    }

    let bridge = ctx.bridge();
    let decision = bridge.dispatch(args.event, data).await;
    drop(bridge);

    let rendered = if ctx.json_output {
        serde_json::to_string(&decision)?
    } else {
        serde_json::to_string_pretty(&decision)?
    };
    println!("{}", rendered);

    if args.exit_code
        && let Decision::Deny { reason, .. } = &decision
    {
        eprintln!("{}", reason);
        std::process::exit(DENY_EXIT_CODE);
    }
    Ok(())
}

/// Empty input is an event with no data.
fn parse_event_data(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value = serde_json::from_str(raw).context("event data is not valid JSON")?;
    if !value.is_object() {
        bail!("event data must be a JSON object");
    }
    Ok(value)
}
