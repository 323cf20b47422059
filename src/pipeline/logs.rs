// Log tailing for a deployed job

use anyhow::Result;

use super::readiness::{PollSettings, ReadinessPoller};
use crate::cli::error::KshipError;
use crate::models::{pod_prefix, AppConfig};
use crate::project::{ConfigStore, ProjectContext};
use crate::repo::JobRepo;
use crate::tools::process::{self, Tool};
use crate::tools::Kubectl;

/// kubetail prints this while pods are still being scheduled
const NO_MATCHING_PODS: &str = "No pods exists that matches";

/// Lines of kubetail output worth showing
pub fn is_log_line(line: &str) -> bool {
    !line.contains(NO_MATCHING_PODS)
}

/// Run `kship logs`
pub fn logs(ctx: &ProjectContext, job_name: Option<&str>, poll: PollSettings, since: &str) -> Result<()> {
    let config = ConfigStore::load(ctx)?;
    let job = JobRepo::resolve(ctx, job_name)?;
    let kubectl = Kubectl::new(&config.namespace);
    tail_job(&kubectl, &config, &job, poll, since)
}

/// Wait for the job's pods, then stream their logs through kubetail
pub fn tail_job(kubectl: &Kubectl, config: &AppConfig, job_name: &str, poll: PollSettings, since: &str) -> Result<()> {
    let prefix = pod_prefix(job_name, &config.name).ok_or_else(|| {
        KshipError::Precondition(format!("Please re-deploy app again, job {} has no run id.", job_name))
    })?;

    let readiness = ReadinessPoller::new(kubectl, poll).wait_for(&prefix)?;
    if !readiness.is_ready() {
        println!("No logs found for this job.");
        return Ok(());
    }

    let mut cmd = process::tool_command(
        Tool::Kubetail,
        [prefix.as_str(), "--since", since, "--namespace", kubectl.namespace()],
        None,
    );
    let status = process::run_streaming(Tool::Kubetail, &mut cmd, |line| {
        if is_log_line(line) {
            println!("{}", line.trim_end());
        }
    })?;
    if !status.success() {
        return Err(KshipError::CommandFailed {
            command: process::describe(&cmd),
            code: status.code().unwrap_or(-1),
        }
        .into());
    }
    Ok(())
}
