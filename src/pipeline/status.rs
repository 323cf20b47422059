// Job status queries

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::thread;

use super::custom_target_env;
use super::readiness::PollSettings;
use crate::manifest::document_kinds;
use crate::models::{keys, Stage, WorkloadKind};
use crate::project::{ConfigStore, ProjectContext};
use crate::repo::{JobRepo, StageRepo};
use crate::tools::kubectl::is_not_found;
use crate::tools::{makefile, Kubectl};

/// Cluster lookups the status command needs
pub trait ResourceLookup {
    /// Output of `kubectl get <resource> <name>`; `None` while the cluster reports nothing
    fn resource(&self, resource: &str, name: &str) -> Result<Option<String>>;
    /// Output of `kubectl get pods -l <label>=<value>`; `None` while there are no pods
    fn pods(&self, label: &str, value: &str) -> Result<Option<String>>;
}

fn found(captured: crate::tools::Captured) -> Option<String> {
    if !captured.success() || captured.stdout.trim().is_empty() || is_not_found(&captured.combined()) {
        debug!("lookup returned nothing: {}", captured.stderr.trim());
        return None;
    }
    Some(captured.stdout)
}

impl ResourceLookup for Kubectl {
    fn resource(&self, resource: &str, name: &str) -> Result<Option<String>> {
        Ok(found(self.get_resource(resource, name)?))
    }

    fn pods(&self, label: &str, value: &str) -> Result<Option<String>> {
        Ok(found(self.get_pods_with_label(label, value)?))
    }
}

/// Call `query` until it yields something, at most `retries` times
pub fn with_retries<F>(poll: PollSettings, mut query: F) -> Result<Option<String>>
where
    F: FnMut() -> Result<Option<String>>,
{
    for attempt in 1..=poll.retries {
        if let Some(output) = query()? {
            return Ok(Some(output));
        }
        if attempt < poll.retries && !poll.interval.is_zero() {
            thread::sleep(poll.interval);
        }
    }
    Ok(None)
}

/// What the cluster says about one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub resource: Option<String>,
    pub pods: Option<String>,
}

impl StatusReport {
    pub fn render(&self, kind: &str, job_name: &str) -> String {
        let mut out = String::new();
        match &self.resource {
            Some(text) => out.push_str(text.trim_end()),
            None => out.push_str(&format!("{} {} not found.", kind, job_name)),
        }
        out.push_str("\n\n");
        match &self.pods {
            Some(text) => out.push_str(text.trim_end()),
            None => out.push_str(&format!("No pods found for {}.", job_name)),
        }
        out.push('\n');
        out
    }
}

/// Query a job of a known workload kind
pub fn query_status<L: ResourceLookup>(lookup: &L, kind: WorkloadKind, job_name: &str, poll: PollSettings) -> Result<Option<StatusReport>> {
    let Some((resource, label)) = kind.query() else {
        return Ok(None);
    };
    let resource_out = with_retries(poll, || lookup.resource(resource, job_name))?;
    let pods_out = with_retries(poll, || lookup.pods(label, job_name))?;
    Ok(Some(StatusReport { resource: resource_out, pods: pods_out }))
}

/// Classify a deployed job from the manifests in its directory
pub fn classify_job(ctx: &ProjectContext, job_name: &str) -> Result<WorkloadKind> {
    let has_custom_status = makefile::has_target(ctx, "status")?;
    let dir = ctx.job_dir(job_name);
    let mut kinds = Vec::new();
    let mut entries: Vec<_> = fs::read_dir(&dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let text = fs::read_to_string(&path)?;
        match document_kinds(&text, &entry.file_name().to_string_lossy()) {
            Ok(found) => kinds.extend(found),
            Err(e) => {
                warn!("Unable to read kinds from {}: {:#}", path.display(), e);
                return Ok(WorkloadKind::Custom);
            }
        }
    }
    Ok(WorkloadKind::classify(kinds.iter().map(String::as_str), has_custom_status))
}

/// Run `kship status`
pub fn status(ctx: &ProjectContext, job_name: Option<&str>, poll: PollSettings) -> Result<()> {
    let config = ConfigStore::load(ctx)?;
    let job = JobRepo::resolve(ctx, job_name)?;
    let kind = classify_job(ctx, &job)?;
    let kubectl = Kubectl::new(&config.namespace);

    match query_status(&kubectl, kind, &job, poll)? {
        Some(report) => {
            let (resource, _) = kind.query().unwrap_or(("job", ""));
            print!("{}", report.render(resource, &job));
        }
        None => {
            if makefile::has_target(ctx, "status")? {
                let env = custom_target_env(&config, &[("JOB_NAME", job.as_str())]);
                let output = makefile::run_target(ctx, "status", &env)?;
                println!("{}", output.trim());
            } else {
                println!("This app does not support the `kship status` command. No `status` target was found in the Makefile.");
            }
        }
    }

    if StageRepo::read(ctx, Stage::Sync, keys::SYNC_SPEC)?.is_some() {
        println!("\nSYNC STATUS\nThis app is being watched by sync");
    }
    Ok(())
}
