// Image push stage

use anyhow::Result;
use log::info;
use std::time::Instant;

use crate::cli::error::KshipError;
use crate::cli::output::format_duration;
use crate::models::{keys, AppConfig, Registry, Stage, StageRecord};
use crate::project::ProjectContext;
use crate::repo::StageRepo;
use crate::tools::process::{self, Tool};

/// Tag the last built image for the configured registry, push it and record
/// the remote name in `.push.json`. Returns the remote image name.
pub fn push(ctx: &ProjectContext, config: &AppConfig) -> Result<String> {
    let registry = config.registry().ok_or(KshipError::NoRegistry)?;
    let container = StageRepo::read_str(ctx, Stage::Build, keys::LAST_CONTAINER)?
        .ok_or(KshipError::NotBuilt)?;
    let remote = registry.remote_name(&container);

    if let Some(secs) = StageRepo::read_f64(ctx, Stage::Push, keys::LAST_PUSH_DURATION)? {
        println!("Pushing {} (last push took {})", config.name, format_duration(secs));
    }
    let started = Instant::now();

    let mut tag = process::tool_command(Tool::Docker, ["tag", container.as_str(), remote.as_str()], None);
    process::run_checked(Tool::Docker, &mut tag)?;

    info!("pushing {}", remote);
    match registry {
        Registry::Docker(_) => {
            let mut cmd = process::tool_command(Tool::Docker, ["push", remote.as_str()], None);
            process::run_checked(Tool::Docker, &mut cmd)?;
        }
        Registry::Gcr(_) => {
            let mut cmd = process::tool_command(Tool::Gcloud, ["docker", "--", "push", remote.as_str()], None);
            process::run_checked(Tool::Gcloud, &mut cmd)?;
        }
    }

    let record = StageRecord::new(Stage::Push)
        .with(keys::LAST_REMOTE_CONTAINER, remote.clone())
        .with(keys::LAST_PUSH_DURATION, started.elapsed().as_secs_f64());
    StageRepo::write(ctx, &record)?;
    println!("Pushed {} to {}", config.name, remote);
    Ok(remote)
}
