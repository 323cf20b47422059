// Tear down deployed jobs

use anyhow::Result;
use log::info;

use super::custom_target_env;
use crate::cli::error::KshipError;
use crate::models::{keys, Stage};
use crate::project::{ConfigStore, ProjectContext};
use crate::repo::{JobRepo, StageRepo};
use crate::tools::{makefile, DeleteOutcome, Kubectl};

/// Which jobs `kship undeploy` removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndeployTarget {
    All,
    Job(String),
    /// The only tracked job; ambiguous when there are several
    Sole,
}

/// Jobs to undeploy, oldest first. Empty when nothing is deployed.
pub fn select_jobs(ctx: &ProjectContext, target: &UndeployTarget) -> Result<Vec<String>> {
    let jobs = JobRepo::list_jobs(ctx)?;
    if jobs.is_empty() {
        if let UndeployTarget::Job(name) = target {
            return Err(KshipError::JobNotFound { name: name.clone(), available: jobs }.into());
        }
        return Ok(Vec::new());
    }
    match target {
        UndeployTarget::All => Ok(jobs),
        UndeployTarget::Job(name) => Ok(vec![JobRepo::resolve(ctx, Some(name))?]),
        UndeployTarget::Sole => Ok(vec![JobRepo::resolve(ctx, None)?]),
    }
}

/// Run `kship undeploy`
pub fn undeploy(ctx: &ProjectContext, target: &UndeployTarget) -> Result<()> {
    let config = ConfigStore::load(ctx)?;
    if StageRepo::read(ctx, Stage::Sync, keys::SYNC_SPEC)?.is_some() {
        return Err(KshipError::Synced.into());
    }

    let jobs = select_jobs(ctx, target)?;
    if jobs.is_empty() {
        println!("nothing deployed");
        return Ok(());
    }

    let kubectl = Kubectl::new(&config.namespace);
    let custom = makefile::has_target(ctx, "undeploy")?;
    for job in jobs {
        if custom {
            let env = custom_target_env(&config, &[("JOB_NAME", job.as_str()), ("USER", "root")]);
            let output = makefile::run_target(ctx, "undeploy", &env)?;
            println!("{}", output.trim());
        } else {
            match kubectl.delete(&ctx.job_dir(&job))? {
                DeleteOutcome::Deleted => info!("deleted resources of {}", job),
                DeleteOutcome::AlreadyGone => info!("resources of {} were already gone", job),
            }
        }
        JobRepo::remove(ctx, &job)?;
        println!("Undeployed {}", job);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppConfig, StageRecord};
    use tempfile::TempDir;

    fn setup() -> (TempDir, ProjectContext) {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp.path());
        ConfigStore::save(&ctx, &AppConfig::new("demo", "default")).unwrap();
        (temp, ctx)
    }

    #[test]
    fn test_select_with_nothing_deployed() {
        let (_temp, ctx) = setup();
        assert!(select_jobs(&ctx, &UndeployTarget::Sole).unwrap().is_empty());
        assert!(select_jobs(&ctx, &UndeployTarget::All).unwrap().is_empty());
        let err = select_jobs(&ctx, &UndeployTarget::Job("demo-1".into())).unwrap_err();
        assert!(matches!(err.downcast_ref::<KshipError>(), Some(KshipError::JobNotFound { .. })));
    }

    #[test]
    fn test_select_sole_is_ambiguous_with_two_jobs() {
        let (_temp, ctx) = setup();
        JobRepo::create(&ctx, "demo-1").unwrap();
        JobRepo::create(&ctx, "demo-2").unwrap();
        let err = select_jobs(&ctx, &UndeployTarget::Sole).unwrap_err();
        assert!(err.to_string().contains("--job-name"));
        assert_eq!(select_jobs(&ctx, &UndeployTarget::All).unwrap().len(), 2);
        assert_eq!(select_jobs(&ctx, &UndeployTarget::Job("demo-2".into())).unwrap(), vec!["demo-2"]);
    }

    #[test]
    fn test_undeploy_nothing_deployed_succeeds() {
        let (_temp, ctx) = setup();
        undeploy(&ctx, &UndeployTarget::Sole).unwrap();
    }

    #[test]
    fn test_undeploy_refused_while_synced() {
        let (_temp, ctx) = setup();
        JobRepo::create(&ctx, "demo-1").unwrap();
        StageRepo::write(&ctx, &StageRecord::new(Stage::Sync).with(keys::SYNC_SPEC, "demo-1")).unwrap();
        let err = undeploy(&ctx, &UndeployTarget::Sole).unwrap_err();
        assert!(matches!(err.downcast_ref::<KshipError>(), Some(KshipError::Synced)));
        assert_eq!(JobRepo::list_jobs(&ctx).unwrap(), vec!["demo-1"]);
    }
}
