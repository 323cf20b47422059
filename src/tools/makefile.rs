// Template-provided Makefile targets

use anyhow::Result;
use std::fs;

use super::process::{self, Tool};
use crate::project::ProjectContext;

/// True when the project's Makefile defines `target` (e.g. `"status"`)
pub fn has_target(ctx: &ProjectContext, target: &str) -> Result<bool> {
    let path = ctx.makefile_path();
    if !path.is_file() {
        return Ok(false);
    }
    let content = fs::read_to_string(&path)?;
    Ok(defines_target(&content, target))
}

/// Whether Makefile text has a rule line starting with `<target>:`
pub fn defines_target(makefile: &str, target: &str) -> bool {
    let rule = format!("{}:", target);
    makefile.lines().any(|line| line.starts_with(&rule))
}

/// Run `make <target>` in the project root with extra environment variables.
///
/// Returns make's stdout. Failures echo the output and surface as `CommandFailed`.
pub fn run_target(ctx: &ProjectContext, target: &str, env: &[(String, String)]) -> Result<String> {
    let mut cmd = process::tool_command(Tool::Make, [target], Some(ctx.root()));
    for (key, value) in env {
        cmd.env(key, value);
    }
    process::run_checked(Tool::Make, &mut cmd)
}
