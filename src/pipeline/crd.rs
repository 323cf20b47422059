// Cluster prerequisite check driven by `crd-requirements.txt`

use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::cli::error::KshipError;
use crate::cli::output::print_warning;
use crate::project::CRD_REQUIREMENTS;
use crate::tools::Kubectl;

/// What to do when the cluster lacks a required CRD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrdPolicy {
    /// Print a warning and carry on (init)
    Warn,
    /// Refuse to continue (deploy)
    Fail,
}

/// Parse the requirements file: one CRD name per line
pub fn parse_requirements(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Required CRDs that are not installed
pub fn missing_crds(required: &BTreeSet<String>, installed: &BTreeSet<String>) -> Vec<String> {
    required.difference(installed).cloned().collect()
}

/// Check the CRDs listed in `<app_dir>/crd-requirements.txt` against the cluster.
///
/// No requirements file, or a cluster that cannot be queried, passes.
pub fn check_crds(app_dir: &Path, kubectl: &Kubectl, policy: CrdPolicy) -> Result<()> {
    let path = app_dir.join(CRD_REQUIREMENTS);
    if !path.is_file() {
        debug!("no {} in {}", CRD_REQUIREMENTS, app_dir.display());
        return Ok(());
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let required = parse_requirements(&content);
    if required.is_empty() {
        return Ok(());
    }

    let Some(installed) = kubectl.installed_crds()? else {
        return Ok(());
    };
    let missing = missing_crds(&required, &installed);
    if missing.is_empty() {
        return Ok(());
    }

    let err = KshipError::MissingCrds { missing };
    match policy {
        CrdPolicy::Fail => Err(err.into()),
        CrdPolicy::Warn => {
            print_warning(&format!("Warning: {}", err));
            Ok(())
        }
    }
}
