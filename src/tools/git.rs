// git operations: template clones, template revisions, ignore checks

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::Path;
use tempfile::TempDir;

use super::process::{self, Tool};
use crate::cli::error::KshipError;
use crate::utils::fs::{copy_all, copy_tree};

/// True when `repo` names a remote repository rather than a local directory
pub fn is_remote_repo(repo: &str) -> bool {
    repo.starts_with("git@") || repo.starts_with("https://")
}

/// Clone `repo` into a fresh temporary directory.
///
/// A local template directory is copied over the clone so uncommitted template edits
/// are visible. The directory is removed when the returned `TempDir` drops.
pub fn clone_repo(repo: &str) -> Result<TempDir> {
    let destination = TempDir::new().context("Failed to create a directory for the template clone")?;
    let mut cmd = process::tool_command(Tool::Git, ["clone", repo], None);
    cmd.arg(destination.path());
    let captured = process::run_captured(Tool::Git, &mut cmd)?;

    if is_remote_repo(repo) {
        if !captured.success() {
            crate::cli::output::echo_failure_output(&captured.stdout, &captured.stderr);
            return Err(KshipError::CommandFailed {
                command: process::describe(&cmd),
                code: captured.code(),
            }
            .into());
        }
    } else {
        if !captured.success() {
            debug!("git clone of local path {} failed, copying the directory instead", repo);
        }
        let source = Path::new(repo);
        if !source.is_dir() {
            return Err(KshipError::Precondition(format!("Template repository {} does not exist", repo)).into());
        }
        copy_tree(source, destination.path(), &copy_all)?;
    }
    Ok(destination)
}

/// Latest commit touching `dir`
pub fn latest_sha(dir: &Path) -> Result<String> {
    let mut cmd = process::tool_command(Tool::Git, ["rev-list", "-1", "HEAD", "--", "."], Some(dir));
    let captured = process::run_captured(Tool::Git, &mut cmd)?;
    if !captured.success() {
        warn!("Unable to read the template revision in {}: {}", dir.display(), captured.stderr.trim());
        return Ok(String::new());
    }
    Ok(captured.stdout.trim().to_string())
}

/// Whether git ignores `path` in the repository at `root`.
///
/// Outside a repository (or without git) nothing is ignored.
pub fn is_ignored(root: &Path, path: &Path) -> bool {
    let mut cmd = process::tool_command(Tool::Git, ["check-ignore", "-q"], Some(root));
    cmd.arg(path);
    match process::run_captured(Tool::Git, &mut cmd) {
        Ok(captured) => captured.success(),
        Err(e) => {
            debug!("git check-ignore unavailable: {:#}", e);
            false
        }
    }
}

/// `git init` a new application directory and commit its initial state
pub fn init_and_commit(dir: &Path) -> Result<String> {
    let mut init = process::tool_command(Tool::Git, ["init"], None);
    init.arg(dir);
    process::run_checked(Tool::Git, &mut init)?;

    let mut add = process::tool_command(Tool::Git, ["add", "."], Some(dir));
    process::run_checked(Tool::Git, &mut add)?;

    let mut commit = process::tool_command(Tool::Git, ["commit", "-m", "Initial commit."], Some(dir));
    process::run_checked(Tool::Git, &mut commit)
}

/// Check out `sha` on a throwaway branch and drop untracked files
pub fn checkout_temp_branch(repo: &Path, sha: &str) -> Result<()> {
    let mut checkout = process::tool_command(Tool::Git, ["checkout", "-f", sha, "-b", "temp-branch"], Some(repo));
    process::run_checked(Tool::Git, &mut checkout)?;
    let mut clean = process::tool_command(Tool::Git, ["clean", "-f", "."], Some(repo));
    process::run_checked(Tool::Git, &mut clean)?;
    Ok(())
}

/// Commit everything in the working tree if anything changed
pub fn commit_all(repo: &Path, message: &str) -> Result<()> {
    let mut status = process::tool_command(Tool::Git, ["status", "--porcelain"], Some(repo));
    let changes = process::run_checked(Tool::Git, &mut status)?;
    if changes.trim().is_empty() {
        return Ok(());
    }
    let mut add = process::tool_command(Tool::Git, ["add", "--all"], Some(repo));
    process::run_checked(Tool::Git, &mut add)?;
    let mut commit = process::tool_command(Tool::Git, ["commit", "--message", message], Some(repo));
    process::run_checked(Tool::Git, &mut commit)?;
    Ok(())
}

/// Merge the upstream default branch into the current branch
pub fn pull(repo: &Path) -> Result<String> {
    let mut cmd = process::tool_command(Tool::Git, ["pull", "origin", "master"], Some(repo));
    process::run_checked(Tool::Git, &mut cmd)
}
