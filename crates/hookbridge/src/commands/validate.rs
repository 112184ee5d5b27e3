//! `hookbridge validate` - check settings and every hook source.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use hookbridge_hooks::HookConfigLoader;
use serde_json::json;

use super::Context;

/// Arguments for `hookbridge validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Validate this hooks directory instead of the configured one
    #[arg(long, value_name = "DIR")]
    pub hooks_dir: Option<PathBuf>,
}

/// Run `hookbridge validate`. Fails if the settings or any source are invalid.
pub async fn run(args: ValidateArgs, ctx: &Context) -> Result<()> {
    let mut settings_errors = ctx.config_warnings.clone();
    if let Err(e) = ctx.config.validate() {
        settings_errors.push(e.to_string());
    }
    let hooks_dir = args
        .hooks_dir
        .unwrap_or_else(|| ctx.bridge_options().hooks_dir);

    let report = HookConfigLoader::new(&hooks_dir).load();
    let errors: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();

    if ctx.json_output {
        let out = json!({
            "hooks_dir": hooks_dir,
            "config_sources": ctx.config_sources,
            "settings_errors": settings_errors,
            "sources": report.sources,
            "errors": errors,
            "hooks": report.registry.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        if ctx.verbose {
            for path in &ctx.config_sources {
                println!("config  {}", path.display());
            }
        }
        for err in &settings_errors {
            println!("FAIL    settings: {}", err);
        }
        for path in &report.sources {
            println!("ok      {}", path.display());
        }
        for err in &errors {
            println!("FAIL    {}", err);
        }
        println!();
        println!(
            "{} source(s) loaded, {} failed, {} hook(s) in {}",
            report.sources.len(),
            errors.len(),
            report.registry.len(),
            hooks_dir.display()
        );
    }

    let failed = errors.len() + settings_errors.len();
    if failed > 0 {
        bail!("{} validation error(s)", failed);
    }
    Ok(())
}
