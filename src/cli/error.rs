// Error handling utilities for consistent error messages and exit codes

use std::process;
use thiserror::Error;

/// Failures the user can act on.
///
/// Everything here exits with code 1. Anything that reaches `main` without being
/// one of these (I/O errors, corrupted state files) is reported as an internal error.
#[derive(Debug, Error)]
pub enum KshipError {
    #[error("This command requires you to be in a `kship init` built directory.")]
    NotInitialized,

    #[error("No image found to deploy with. Run a plain `kship deploy` to fix this. \
             Most common reason for this is a --no-push was used before any image was available to use.")]
    NoImage,

    #[error("Need to run build before pushing")]
    NotBuilt,

    #[error("No container registry is configured. Set one with `kship config set registry <registry_name>` \
             or `kship config set gceProject <google_project_name>`.")]
    NoRegistry,

    #[error("Unable to find 'containers' in {file}. Unable to deploy interactively without these.")]
    NoContainers { file: String },

    #[error("Template {file} is invalid: {detail}")]
    InvalidTemplate { file: String, detail: String },

    #[error("Template {0} not found in k8s-templates")]
    KubeSpecNotFound(String),

    #[error("Job {name} not found.\nJobs to choose from are:\n{}", .available.join("\n"))]
    JobNotFound { name: String, available: Vec<String> },

    #[error("Multiple jobs are found under this application. Please specify one with `--job-name <job-name>`.\nJobs to choose from are:\n{}", .available.join("\n"))]
    AmbiguousJob { available: Vec<String> },

    #[error("No jobs are deployed.")]
    NoJobs,

    #[error("Job directory for {0} already exists")]
    JobExists(String),

    #[error("Unresolved placeholder ${placeholder} in {file}")]
    UnresolvedPlaceholder { placeholder: String, file: String },

    #[error("Malformed placeholder in {file}: {detail}")]
    MalformedPlaceholder { file: String, detail: String },

    #[error("`{command}` failed with exit code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("Please install `{tool}`. It is a prerequisite for this command to work")]
    ToolMissing { tool: String },

    #[error("Unable to find config '{0}'. To see list of configs, use `kship config list`.")]
    ConfigKeyNotFound(String),

    #[error("Template will not work on your current cluster. Please contact your administrator to install the following operator(s):\n{}", .missing.join("\n"))]
    MissingCrds { missing: Vec<String> },

    #[error("Directory '{0}' already exists: delete before trying to initialize new application")]
    AppDirExists(String),

    #[error("This app is currently being synced, please run `kship sync delete` to unsync first")]
    Synced,

    #[error("{0}")]
    Precondition(String),
}

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate an application name.
///
/// The name ends up in Kubernetes object names, so it follows the DNS-1123 label rules:
/// lowercase alphanumerics and hyphens, starting with a letter.
pub fn validate_app_name(name: &str) -> Result<(), String> {
    validate_non_empty(name, "Application name")?;

    let starts_with_letter = name.chars().next().map_or(false, |c| c.is_ascii_lowercase());
    let valid_chars = name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if starts_with_letter && valid_chars && !name.ends_with('-') {
        Ok(())
    } else {
        Err(format!(
            "Invalid application name: '{}'. Names must start with a lowercase letter and contain only lowercase letters, numbers, and hyphens.",
            name
        ))
    }
}

/// Validate a dotted config path such as `template_parameters.num_ps`
pub fn validate_config_path(path: &str) -> Result<Vec<String>, String> {
    validate_non_empty(path, "Config name")?;
    let keys: Vec<String> = path.split('.').map(|s| s.to_string()).collect();
    if keys.iter().any(|k| k.is_empty()) {
        return Err(format!("Invalid config name: '{}'. Empty path segments are not allowed.", path));
    }
    Ok(keys)
}
