// Bring an application up to date with the latest revision of its template

use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::templates::{TEMPLATE_PARAMETERS_FILE, TEMPLATE_REPO_DIR};
use crate::cli::error::KshipError;
use crate::project::{ConfigStore, ProjectContext};
use crate::tools::git;
use crate::utils::fs::{copy_all, copy_tree};

/// Sibling directory the application is backed up to: `<app>_<suffix>.orig`
pub fn backup_dir(app_root: &Path, app_name: &str) -> PathBuf {
    let suffix: String = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    let parent = app_root.parent().unwrap_or(app_root);
    parent.join(format!("{}_{}.orig", app_name, suffix))
}

/// Run `kship update-template`
pub fn update_template(ctx: &ProjectContext, template_repo: &str) -> Result<()> {
    let mut config = ConfigStore::load(ctx)?;
    let (Some(template_name), Some(current_sha)) = (config.template_name.clone(), config.template_git_sha.clone()) else {
        return Err(KshipError::Precondition(
            "kship.json does not have either template_name or template_git_sha. Template update is not possible.".into(),
        )
        .into());
    };

    let clone = git::clone_repo(template_repo)?;
    let clone_template_dir = clone.path().join(TEMPLATE_REPO_DIR).join(&template_name);
    if !clone_template_dir.is_dir() {
        println!("Unable to update, template {} does not exist in {}.", template_name, template_repo);
        return Ok(());
    }

    let latest_sha = git::latest_sha(&clone_template_dir)?;
    if latest_sha == current_sha {
        println!("Template is up to date, no need for update.");
        return Ok(());
    }

    println!("Template is not up to date, updating template...");
    let backup = backup_dir(ctx.root(), &config.name);
    copy_tree(ctx.root(), &backup, &copy_all)?;
    info!("backed up {} to {}", ctx.root().display(), backup.display());

    // Replay the app on top of the revision it was created from, then let git merge upstream
    git::checkout_temp_branch(clone.path(), &current_sha)?;
    copy_tree(ctx.root(), &clone_template_dir, &|p: &Path| ctx.is_generated_path(p))?;
    git::commit_all(clone.path(), "temp-commit")?;
    git::pull(clone.path())?;
    copy_tree(&clone_template_dir, ctx.root(), &|p: &Path| p == Path::new(TEMPLATE_PARAMETERS_FILE))?;

    config.template_git_sha = Some(latest_sha);
    ConfigStore::save(ctx, &config)?;

    println!("Latest template changes have merged using git, please review changes for conflicts.");
    println!("Backup directory path: {}", backup.display());
    Ok(())
}
