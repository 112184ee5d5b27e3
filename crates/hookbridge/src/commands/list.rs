//! `hookbridge list` - show the merged hook registry.

use anyhow::Result;
use clap::Args;
use hookbridge_hooks::MatcherGroup;
use hookbridge_types::{HookDefinition, HookEvent};

use super::Context;

/// Arguments for `hookbridge list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show hooks for this event
    #[arg(long, short)]
    pub event: Option<HookEvent>,
}

/// Run `hookbridge list`.
pub async fn run(args: ListArgs, ctx: &Context) -> Result<()> {
    let bridge = ctx.bridge();
    let registry = bridge.snapshot();

    let events: Vec<HookEvent> = registry
        .events()
        .filter(|e| args.event.is_none_or(|wanted| wanted == *e))
        .collect();

    if ctx.json_output {
        let mut config = registry.to_config();
        config.hooks.retain(|e, _| events.contains(e));
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No hooks registered in {}", bridge.hooks_dir().display());
        return Ok(());
    }

    let mut shown = 0;
    for event in events {
        println!("{}", event);
        for group in registry.groups(event) {
            let mut header = group_header(group);
            if ctx.verbose {
                header.push_str(&format!(" from {}", group.origin.base_dir.display()));
            }
            println!("  {}", header);
            for hook in &group.hooks {
                println!("    {}", describe(hook));
                shown += 1;
            }
        }
    }

    println!();
    println!("{} hook(s)", shown);
    Ok(())
}

fn group_header(group: &MatcherGroup) -> String {
    let matcher = group.matcher();
    let pattern = matcher.pattern();
    let mut line = format!(
        "[{}] {}",
        if pattern.is_empty() { "*" } else { pattern },
        if group.parallel { "parallel" } else { "sequential" }
    );
    if matcher.is_fallback() {
        line.push_str("  (invalid regex, exact match)");
    }
    line
}

fn describe(hook: &HookDefinition) -> String {
    let kind = hook.hook_type.to_string();
    let mut line = format!("{:<8} {}", kind, hook.body().unwrap_or_default());
    if let Some(timeout) = hook.timeout {
        line.push_str(&format!("  (timeout {}s)", timeout));
    }
    if hook.once {
        line.push_str("  (once)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbridge_hooks::HookOrigin;
    use hookbridge_types::HookMatcherGroup;
    use std::sync::Arc;

    fn group(matcher: Option<&str>, parallel: bool) -> MatcherGroup {
        MatcherGroup::new(
            &HookMatcherGroup {
                matcher: matcher.map(String::from),
                parallel,
                hooks: vec![HookDefinition::command("true")],
            },
            Arc::new(HookOrigin::new("directory", "/hooks")),
        )
    }

    #[test]
    fn test_group_header() {
        assert_eq!(group_header(&group(None, false)), "[*] sequential");
        assert_eq!(group_header(&group(Some("Edit|Write"), true)), "[Edit|Write] parallel");
    }

    #[test]
    fn test_group_header_marks_fallback_matcher() {
        let header = group_header(&group(Some("Bash("), false));
        assert!(header.starts_with("[Bash(] sequential"));
        assert!(header.ends_with("(invalid regex, exact match)"));
    }

    #[test]
    fn test_describe_command_hook() {
        let hook = HookDefinition::command("./fmt.sh").with_timeout(5.0).run_once();
        let line = describe(&hook);
        assert!(line.starts_with("command"));
        assert!(line.contains("./fmt.sh"));
        assert!(line.contains("(timeout 5s)"));
        assert!(line.ends_with("(once)"));
    }

    #[test]
    fn test_describe_prompt_hook() {
        let line = describe(&HookDefinition::prompt("Is $ARGUMENTS safe?"));
        assert!(line.starts_with("prompt"));
        assert!(!line.contains("timeout"));
    }
}
