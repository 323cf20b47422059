// Image build stage

use anyhow::Result;
use log::info;
use std::time::Instant;
use uuid::Uuid;

use crate::cli::output::format_duration;
use crate::models::{keys, AppConfig, Stage, StageRecord};
use crate::project::ProjectContext;
use crate::repo::StageRepo;
use crate::tools::makefile;
use crate::tools::process::{self, Tool};

/// Image tag for a fresh build: `<app>:<uuid>`
pub fn container_name(app_name: &str) -> String {
    format!("{}:{}", app_name, Uuid::new_v4())
}

/// Build the app image and record it in `.build.json`.
///
/// A Makefile `build` target is used when present (with `CONTAINER_NAME` set),
/// otherwise `docker build -t <name> .` in the project root.
pub fn build(ctx: &ProjectContext, config: &AppConfig) -> Result<StageRecord> {
    let last_duration = StageRepo::read_f64(ctx, Stage::Build, keys::LAST_BUILD_DURATION)?;
    let container = container_name(&config.name);
    println!("Starting build {}", container);
    if let Some(secs) = last_duration {
        println!("Building (last build took {})", format_duration(secs));
    }

    let started = Instant::now();
    if makefile::has_target(ctx, "build")? {
        info!("building {} with make", container);
        makefile::run_target(ctx, "build", &[("CONTAINER_NAME".to_string(), container.clone())])?;
    } else {
        info!("building {} with docker", container);
        let mut cmd = process::tool_command(Tool::Docker, ["build", "-t", container.as_str(), "."], Some(ctx.root()));
        process::run_checked(Tool::Docker, &mut cmd)?;
    }
    let elapsed = started.elapsed().as_secs_f64();

    let record = StageRecord::new(Stage::Build)
        .with(keys::LAST_CONTAINER, container.clone())
        .with(keys::LAST_BUILD_DURATION, elapsed);
    StageRepo::write(ctx, &record)?;
    println!("Built {}", container);
    Ok(record)
}
