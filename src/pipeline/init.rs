// Creating a new application from a template

use anyhow::{Context, Result};
use log::warn;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::crd::{check_crds, CrdPolicy};
use super::sync::SYNC_IGNORE_FILE;
use super::templates::{TEMPLATE_PARAMETERS_FILE, TEMPLATE_REPO_DIR};
use crate::cli::error::KshipError;
use crate::cli::output::{bold_if_tty, is_tty, print_warning};
use crate::models::{AppConfig, TEMPLATE_PARAMETERS};
use crate::project::{ConfigStore, ProjectContext, TEMPLATES_DIR};
use crate::tools::process::{self, Tool};
use crate::tools::{git, Kubectl};
use crate::utils::fs::copy_tree;

const SYNC_BEGIN: &str = "### BEGIN KSYNC SECTION";
const SYNC_END: &str = "### END KSYNC SECTION";

/// Flags of `kship init`, with user defaults already applied
#[derive(Debug, Clone)]
pub struct InitOptions {
    pub name: String,
    pub template: String,
    pub template_repo: String,
    pub registry: Option<String>,
    pub namespace: Option<String>,
    pub skip_crd_check: bool,
    pub enable_sync: bool,
}

/// Template parameters from a template's `parameters.json`.
///
/// Accepts `{"template_parameters": [{"name": .., "value": ..}]}` as well as a
/// plain object of name to value.
pub fn parse_template_parameters(raw: &str) -> Result<Map<String, Value>> {
    let doc: Value = serde_json::from_str(raw).context("Failed to parse template parameters")?;
    let params = doc.get(TEMPLATE_PARAMETERS).cloned().unwrap_or(Value::Null);
    let mut out = Map::new();
    match params {
        Value::Array(entries) => {
            for entry in entries {
                if let Some(name) = entry.get("name").and_then(Value::as_str) {
                    out.insert(name.to_string(), entry.get("value").cloned().unwrap_or(Value::Null));
                }
            }
        }
        Value::Object(map) => out = map,
        _ => {}
    }
    Ok(out)
}

/// Uncomment the sync-only sections of a template.
///
/// Lines between the begin and end markers lose their `#  ` prefix. Returns
/// `None` when the text has no sync section; unbalanced markers are an error.
pub fn enable_sync_sections(text: &str, file: &str) -> Result<Option<String>> {
    let begins = text.lines().filter(|l| l.contains(SYNC_BEGIN)).count();
    let ends = text.lines().filter(|l| l.contains(SYNC_END)).count();
    if begins != ends {
        return Err(KshipError::Precondition(format!("KSYNC comment section in file {} is malformed", file)).into());
    }
    if begins == 0 {
        return Ok(None);
    }

    let mut inside = false;
    let mut changed = false;
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let opens = line.contains(SYNC_BEGIN);
        if opens {
            inside = true;
        }
        if inside {
            let replaced = line.replacen("#  ", "   ", 1);
            changed |= replaced != line;
            out.push_str(&replaced);
        } else {
            out.push_str(line);
        }
        if line.contains(SYNC_END) {
            inside = false;
        }
    }
    Ok(changed.then_some(out))
}

/// Default namespace: the current user's name
fn user_namespace(fallback: &str) -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .map(|u| u.trim().to_lowercase())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// GCP project configured in gcloud, if gcloud is installed and has one
fn gcloud_project() -> Result<Option<String>> {
    let mut cmd = process::tool_command(Tool::Gcloud, ["config", "list", "--format", "value(core.project)"], None);
    match process::run_captured(Tool::Gcloud, &mut cmd) {
        Ok(captured) if captured.success() => {
            let project = captured.stdout.trim().to_string();
            Ok((!project.is_empty()).then_some(project))
        }
        Ok(captured) => {
            warn!("gcloud config list failed: {}", captured.stderr.trim());
            Ok(None)
        }
        Err(e) => match e.downcast_ref::<KshipError>() {
            Some(KshipError::ToolMissing { .. }) => {
                print_warning(
                    "No registry name was provided and gcloud was not found. Please set your container \
                     registry name in your kship project using one of the following commands.\n\n\
                     For Google Container Registry:\n\tkship config set gceProject <google_project_name>\n\n\
                     For a Docker Registry:\n\tkship config set registry <registry_name>\n",
                );
                Ok(None)
            }
            _ => Err(e),
        },
    }
}

/// Turn on sync support: uncomment sync sections and write `.stignore`
fn setup_sync(app_dir: &Path) -> Result<()> {
    let templates_dir = app_dir.join(TEMPLATES_DIR);
    let mut supported = false;
    if templates_dir.is_dir() {
        for entry in fs::read_dir(&templates_dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |ext| ext != "yaml") {
                continue;
            }
            let text = fs::read_to_string(&path)?;
            let file = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
            if let Some(updated) = enable_sync_sections(&text, &file)? {
                fs::write(&path, updated)?;
                supported = true;
            }
        }
    }
    if !supported {
        print_warning("This app doesn't support syncing");
        return Ok(());
    }

    let gitignore = app_dir.join(".gitignore");
    let mut ignore = if gitignore.is_file() { fs::read_to_string(&gitignore)? } else { String::new() };
    ignore.push_str("\n.git/**");
    fs::write(app_dir.join(SYNC_IGNORE_FILE), ignore)?;
    Ok(())
}

/// Run `kship init`; returns the new application directory
pub fn init(parent: &Path, opts: &InitOptions) -> Result<PathBuf> {
    let app_dir = parent.join(&opts.name);
    if app_dir.exists() {
        return Err(KshipError::AppDirExists(opts.name.clone()).into());
    }

    let clone = git::clone_repo(&opts.template_repo)?;
    let template_dir = clone.path().join(TEMPLATE_REPO_DIR).join(&opts.template);
    if !template_dir.is_dir() {
        return Err(KshipError::Precondition(format!(
            "Template {} not found in {}. Run `kship templates list` to see the available templates.",
            opts.template, opts.template_repo
        ))
        .into());
    }

    copy_tree(&template_dir, &app_dir, &|p: &Path| p == Path::new(TEMPLATE_PARAMETERS_FILE))?;

    let params_file = template_dir.join(TEMPLATE_PARAMETERS_FILE);
    let template_parameters = if params_file.is_file() {
        parse_template_parameters(&fs::read_to_string(&params_file)?)?
    } else {
        Map::new()
    };
    let template_git_sha = git::latest_sha(&template_dir)?;

    let namespace = opts.namespace.clone().unwrap_or_else(|| user_namespace(&opts.name));
    if !opts.skip_crd_check {
        if let Err(e) = check_crds(&app_dir, &Kubectl::new(&namespace), CrdPolicy::Warn) {
            warn!("Skipping CRD check: {:#}", e);
        }
    }
    if opts.enable_sync {
        setup_sync(&app_dir)?;
    }

    let mut config = AppConfig::new(&opts.name, &namespace);
    config.template_name = Some(opts.template.clone());
    config.template_git_sha = Some(template_git_sha).filter(|s| !s.is_empty());
    config.template_parameters = template_parameters;
    match &opts.registry {
        Some(registry) => config.registry = Some(registry.clone()),
        None => config.gce_project = gcloud_project()?,
    }
    ConfigStore::save(&ProjectContext::new(&app_dir), &config)?;

    let output = git::init_and_commit(&app_dir)?;
    if !output.trim().is_empty() {
        println!("{}", output.trim_end());
    }

    if app_dir.join(SYNC_IGNORE_FILE).is_file() {
        let tty = is_tty();
        println!(
            "Once your application is built and deployed try the following kship commands:\n\
             {} - to setup syncing local changes to the running pods. This command only needs to run once.\n\
             {} - to wake up the sync agent after a reboot or long inactivity.\n\
             {} - to teardown syncing and stop syncing local changes with remote pods.\n\n\
             To ignore files and folders from syncing, add them to {} file.",
            bold_if_tty("kship sync create", tty),
            bold_if_tty("kship sync reload", tty),
            bold_if_tty("kship sync delete", tty),
            bold_if_tty(SYNC_IGNORE_FILE, tty)
        );
    }
    Ok(app_dir)
}
