use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::models::Stage;

pub const CONFIG_FILE: &str = "kship.json";
pub const TEMPLATES_DIR: &str = "k8s-templates";
pub const JOBS_DIR: &str = "k8s";
pub const MAKEFILE: &str = "Makefile";
pub const CRD_REQUIREMENTS: &str = "crd-requirements.txt";

/// Resolved paths of one project directory.
///
/// Built once per process and handed to every component, so nothing else
/// needs to look at the current working directory.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    root: PathBuf,
}

impl ProjectContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Context rooted at the current working directory
    pub fn from_cwd() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Ok(Self::new(cwd))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn stage_path(&self, stage: Stage) -> PathBuf {
        self.root.join(stage.file_name())
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(TEMPLATES_DIR)
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join(JOBS_DIR)
    }

    pub fn job_dir(&self, job_name: &str) -> PathBuf {
        self.jobs_dir().join(job_name)
    }

    pub fn makefile_path(&self) -> PathBuf {
        self.root.join(MAKEFILE)
    }

    pub fn crd_requirements_path(&self) -> PathBuf {
        self.root.join(CRD_REQUIREMENTS)
    }

    pub fn is_initialized(&self) -> bool {
        self.config_path().is_file()
    }

    /// Files the pipeline itself writes. File watchers must ignore these
    /// or every build would trigger the next one.
    pub fn is_generated_path(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut components = relative.components();
        let Some(first) = components.next() else {
            return true;
        };
        let first = first.as_os_str().to_string_lossy();
        first == ".git"
            || first == JOBS_DIR
            || Stage::all().iter().any(|s| first == s.file_name())
    }

    /// Names of the manifest templates, sorted
    pub fn template_files(&self) -> Result<Vec<String>> {
        let dir = self.templates_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
