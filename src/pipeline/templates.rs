// Listing the templates a template repository offers

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::output::{format_two_column_table, get_terminal_width, is_tty};
use crate::tools::git;

/// Directory of a template repository holding one subdirectory per template
pub const TEMPLATE_REPO_DIR: &str = "templates";

/// Template parameter file inside each template; its values land in `kship.json`
pub const TEMPLATE_PARAMETERS_FILE: &str = "parameters.json";

const NO_DESCRIPTION: &str = "<none>";

/// First line of a README that is neither blank nor a heading
pub fn readme_description(readme: &str) -> Option<String> {
    readme
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
}

/// `(template, description)` for every template directory, sorted by name
pub fn list_templates(templates_dir: &Path) -> Result<Vec<(String, String)>> {
    if !templates_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut templates = Vec::new();
    for entry in fs::read_dir(templates_dir)
        .with_context(|| format!("Failed to read directory: {}", templates_dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let readme = entry.path().join("README.md");
        let description = if readme.is_file() {
            readme_description(&fs::read_to_string(&readme)?)
        } else {
            None
        };
        templates.push((
            entry.file_name().to_string_lossy().into_owned(),
            description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        ));
    }
    templates.sort();
    Ok(templates)
}

/// Run `kship templates list`
pub fn templates(template_repo: &str) -> Result<()> {
    let clone = git::clone_repo(template_repo)?;
    let templates = list_templates(&clone.path().join(TEMPLATE_REPO_DIR))?;
    if templates.is_empty() {
        if git::is_remote_repo(template_repo) {
            println!("Please verify git is installed and setup properly and you have read access to the repo.");
        } else {
            println!("Please make sure template repo directory exists and you have read access to the directory.");
        }
        return Ok(());
    }
    print!(
        "{}",
        format_two_column_table(("Template", "Description"), &templates, get_terminal_width(), is_tty())
    );
    Ok(())
}
