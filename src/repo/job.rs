use std::fs;
use std::time::SystemTime;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crate::cli::error::KshipError;
use crate::models::DeployedJob;
use crate::project::ProjectContext;

/// Job tracker.
///
/// Every deploy gets its own subdirectory of `k8s/` holding the manifests that
/// were applied. Those directories are the durable record status, logs,
/// events and undeploy work from.
pub struct JobRepo;

impl JobRepo {
    /// Deployed jobs, oldest first (directory modification time, then name)
    pub fn list(ctx: &ProjectContext) -> Result<Vec<DeployedJob>> {
        let dir = ctx.jobs_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut jobs = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            jobs.push(DeployedJob {
                job_name: entry.file_name().to_string_lossy().into_owned(),
                directory: entry.path(),
                creation_time: DateTime::<Local>::from(modified),
            });
        }
        jobs.sort_by(|a, b| {
            a.creation_time
                .cmp(&b.creation_time)
                .then_with(|| a.job_name.cmp(&b.job_name))
        });
        Ok(jobs)
    }

    /// Job names, oldest first
    pub fn list_jobs(ctx: &ProjectContext) -> Result<Vec<String>> {
        Ok(Self::list(ctx)?.into_iter().map(|j| j.job_name).collect())
    }

    /// Pick the job a command should act on.
    ///
    /// An explicit name must be tracked. Without one there must be exactly one
    /// tracked job.
    pub fn resolve(ctx: &ProjectContext, explicit: Option<&str>) -> Result<String> {
        let jobs = Self::list_jobs(ctx)?;
        match explicit {
            Some(name) => {
                if jobs.iter().any(|j| j == name) {
                    Ok(name.to_string())
                } else {
                    Err(KshipError::JobNotFound { name: name.to_string(), available: jobs }.into())
                }
            }
            None => match jobs.len() {
                0 => Err(KshipError::NoJobs.into()),
                1 => Ok(jobs.into_iter().next().unwrap_or_default()),
                _ => Err(KshipError::AmbiguousJob { available: jobs }.into()),
            },
        }
    }

    /// Create the directory for a new job. Job directories are never reused.
    pub fn create(ctx: &ProjectContext, job_name: &str) -> Result<DeployedJob> {
        let dir = ctx.job_dir(job_name);
        if dir.exists() {
            return Err(KshipError::JobExists(job_name.to_string()).into());
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        log::debug!("tracking job {} in {}", job_name, dir.display());
        Ok(DeployedJob {
            job_name: job_name.to_string(),
            directory: dir,
            creation_time: Local::now(),
        })
    }

    /// Stop tracking a job. Only call this after the cluster objects were deleted.
    pub fn remove(ctx: &ProjectContext, job_name: &str) -> Result<()> {
        let dir = ctx.job_dir(job_name);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to remove directory: {}", dir.display()))?;
            log::debug!("removed job directory {}", dir.display());
        }
        Ok(())
    }
}
