// Subprocess plumbing shared by every external tool wrapper

use anyhow::Result;
use log::debug;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::cli::error::KshipError;
use crate::cli::output::echo_failure_output;

/// External programs kship drives.
///
/// Each one can be pointed at a different binary through a `KSHIP_<TOOL>` variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Docker,
    Kubectl,
    Git,
    Gcloud,
    Make,
    Kubetail,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Docker => "docker",
            Tool::Kubectl => "kubectl",
            Tool::Git => "git",
            Tool::Gcloud => "gcloud",
            Tool::Make => "make",
            Tool::Kubetail => "kubetail",
        }
    }

    fn override_var(&self) -> &'static str {
        match self {
            Tool::Docker => "KSHIP_DOCKER",
            Tool::Kubectl => "KSHIP_KUBECTL",
            Tool::Git => "KSHIP_GIT",
            Tool::Gcloud => "KSHIP_GCLOUD",
            Tool::Make => "KSHIP_MAKE",
            Tool::Kubetail => "KSHIP_KUBETAIL",
        }
    }

    /// Binary to execute, honoring the environment override
    pub fn program(&self) -> String {
        match std::env::var(self.override_var()) {
            Ok(path) if !path.trim().is_empty() => path,
            _ => self.name().to_string(),
        }
    }

    pub fn command(&self) -> Command {
        Command::new(self.program())
    }
}

/// Output of a finished subprocess
#[derive(Debug, Clone)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// stdout followed by stderr, for text matching
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Render a command line for messages and logs
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn spawn_error(tool: Tool, err: io::Error) -> anyhow::Error {
    if err.kind() == io::ErrorKind::NotFound {
        KshipError::ToolMissing { tool: tool.name().to_string() }.into()
    } else {
        anyhow::Error::new(err).context(format!("Failed to start {}", tool.name()))
    }
}

/// Find the tool a shell complained about, e.g. `/bin/sh: 1: kubetail: not found`
/// or `make: docker: command not found`.
pub fn missing_tool_in_output(output: &str) -> Option<String> {
    for line in output.lines() {
        let line = line.trim();
        let rest = match line
            .strip_suffix(": command not found")
            .or_else(|| line.strip_suffix(": not found"))
        {
            Some(rest) => rest,
            None => continue,
        };
        let tool = rest.rsplit(':').next().unwrap_or(rest).trim();
        let tool = tool.rsplit('/').next().unwrap_or(tool);
        if !tool.is_empty() {
            return Some(tool.to_string());
        }
    }
    None
}

/// Run a command to completion with stdout and stderr captured.
///
/// A non-zero exit is not an error here; callers inspect the result.
pub fn run_captured(tool: Tool, cmd: &mut Command) -> Result<Captured> {
    debug!("Running: {}", describe(cmd));
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(tool, e))?;
    let captured = Captured {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!("{} exited with {}", tool.name(), captured.code());
    Ok(captured)
}

/// Run a command and require success.
///
/// On failure the captured stdout is echoed, stderr is highlighted, and a
/// `CommandFailed` (or `ToolMissing` when the output says so) is returned.
pub fn run_checked(tool: Tool, cmd: &mut Command) -> Result<String> {
    let captured = run_captured(tool, cmd)?;
    if captured.success() {
        return Ok(captured.stdout);
    }
    echo_failure_output(&captured.stdout, &captured.stderr);
    if let Some(missing) = missing_tool_in_output(&captured.combined()) {
        return Err(KshipError::ToolMissing { tool: missing }.into());
    }
    Err(KshipError::CommandFailed {
        command: describe(cmd),
        code: captured.code(),
    }
    .into())
}

/// Run a command attached to the user's terminal
pub fn run_interactive(tool: Tool, cmd: &mut Command) -> Result<ExitStatus> {
    debug!("Running interactively: {}", describe(cmd));
    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(tool, e))?;
    debug!("{} exited with {:?}", tool.name(), status.code());
    Ok(status)
}

/// Like `run_interactive` but a non-zero exit is a `CommandFailed`
pub fn run_interactive_checked(tool: Tool, cmd: &mut Command) -> Result<()> {
    let status = run_interactive(tool, cmd)?;
    if status.success() {
        Ok(())
    } else {
        Err(KshipError::CommandFailed {
            command: describe(cmd),
            code: status.code().unwrap_or(-1),
        }
        .into())
    }
}

/// Run a command and hand each stdout line to `on_line` as it arrives.
///
/// stderr is passed through to the terminal.
pub fn run_streaming<F>(tool: Tool, cmd: &mut Command, mut on_line: F) -> Result<ExitStatus>
where
    F: FnMut(&str),
{
    debug!("Streaming: {}", describe(cmd));
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| spawn_error(tool, e))?;

    if let Some(stdout) = child.stdout.take() {
        for line in BufReader::new(stdout).lines() {
            on_line(&line?);
        }
    }
    let status = child.wait()?;
    debug!("{} exited with {:?}", tool.name(), status.code());
    Ok(status)
}

/// Build a command for `tool` with arguments and an optional working directory
pub fn tool_command<I, S>(tool: Tool, args: I, cwd: Option<&Path>) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = tool.command();
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd
}
