// Live code sync through template-provided `sync-*` Makefile targets

use anyhow::Result;

use super::custom_target_env;
use crate::cli::error::KshipError;
use crate::models::{job_name_for, keys, Stage};
use crate::project::{ConfigStore, ProjectContext};
use crate::repo::StageRepo;
use crate::tools::makefile;

/// Sync ignore list written by `init --enable-sync`
pub const SYNC_IGNORE_FILE: &str = ".stignore";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Create,
    Reload,
    Delete,
}

impl SyncAction {
    pub fn target(&self) -> &'static str {
        match self {
            SyncAction::Create => "sync-create",
            SyncAction::Reload => "sync-reload",
            SyncAction::Delete => "sync-delete",
        }
    }

    fn command(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Reload => "reload",
            SyncAction::Delete => "delete",
        }
    }
}

/// Run `kship sync <action>`
pub fn sync(ctx: &ProjectContext, action: SyncAction) -> Result<()> {
    let config = ConfigStore::load(ctx)?;
    if !ctx.root().join(SYNC_IGNORE_FILE).is_file() {
        return Err(KshipError::Precondition("This app is not initialized with '--enable-sync' option".into()).into());
    }
    let Some(run_id) = StageRepo::read_str(ctx, Stage::Push, keys::APP_RUN_ID)? else {
        return Err(KshipError::Precondition("This app has not been deployed yet".into()).into());
    };
    if !makefile::has_target(ctx, action.target())? {
        println!(
            "This app does not support the `kship sync {}` command. No `{}` target was found in the Makefile.",
            action.command(),
            action.target()
        );
        return Ok(());
    }

    let existing = StageRepo::read_str(ctx, Stage::Sync, keys::SYNC_SPEC)?;
    match action {
        SyncAction::Create => {
            if existing.is_some() {
                return Err(KshipError::Precondition("Syncing spec has been already created for this app".into()).into());
            }
            let job_name = job_name_for(&config.name, &run_id);
            let env = custom_target_env(&config, &[("SYNC_SPEC", job_name.as_str()), ("JOB_NAME", job_name.as_str())]);
            makefile::run_target(ctx, action.target(), &env)?;
            StageRepo::set(ctx, Stage::Sync, keys::SYNC_SPEC, job_name)?;
            println!("Syncing spec is created successfully");
        }
        SyncAction::Reload | SyncAction::Delete => {
            let Some(spec) = existing else {
                return Err(KshipError::Precondition("No syncing spec has been created for this app yet".into()).into());
            };
            let env = custom_target_env(&config, &[("SYNC_SPEC", spec.as_str())]);
            makefile::run_target(ctx, action.target(), &env)?;
            if action == SyncAction::Delete {
                remove_sync_spec(ctx)?;
                println!("Syncing spec is successfully deleted");
            } else {
                println!("Sync agent is restarted");
            }
        }
    }
    Ok(())
}

fn remove_sync_spec(ctx: &ProjectContext) -> Result<()> {
    if let Some(mut record) = StageRepo::load(ctx, Stage::Sync)? {
        record.fields.remove(keys::SYNC_SPEC);
        StageRepo::write(ctx, &record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppConfig, StageRecord};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ProjectContext) {
        let temp = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp.path());
        ConfigStore::save(&ctx, &AppConfig::new("demo", "default")).unwrap();
        (temp, ctx)
    }

    #[test]
    fn test_sync_requires_enable_sync() {
        let (_temp, ctx) = setup();
        let err = sync(&ctx, SyncAction::Create).unwrap_err();
        assert!(err.to_string().contains("--enable-sync"));
    }

    #[test]
    fn test_sync_requires_deploy() {
        let (_temp, ctx) = setup();
        fs::write(ctx.root().join(SYNC_IGNORE_FILE), ".git/**\n").unwrap();
        let err = sync(&ctx, SyncAction::Create).unwrap_err();
        assert!(err.to_string().contains("not been deployed"));
    }

    #[test]
    fn test_sync_without_target_is_unsupported() {
        let (_temp, ctx) = setup();
        fs::write(ctx.root().join(SYNC_IGNORE_FILE), ".git/**\n").unwrap();
        StageRepo::write(&ctx, &StageRecord::new(Stage::Push).with(keys::APP_RUN_ID, "1234-5678")).unwrap();
        sync(&ctx, SyncAction::Reload).unwrap();
        assert!(StageRepo::load(&ctx, Stage::Sync).unwrap().is_none());
    }

    #[test]
    fn test_remove_sync_spec_keeps_other_fields() {
        let (_temp, ctx) = setup();
        let record = StageRecord::new(Stage::Sync)
            .with(keys::SYNC_SPEC, "demo-1")
            .with("agent", "ksync");
        StageRepo::write(&ctx, &record).unwrap();
        remove_sync_spec(&ctx).unwrap();
        assert!(StageRepo::read(&ctx, Stage::Sync, keys::SYNC_SPEC).unwrap().is_none());
        assert_eq!(StageRepo::read_str(&ctx, Stage::Sync, "agent").unwrap().as_deref(), Some("ksync"));
    }
}
