use std::collections::HashMap;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Default template repository used when neither `--template-repo` nor the rc file names one
pub const DEFAULT_TEMPLATE_REPO: &str = "https://github.com/IntelAI/mlt.git";

/// User-level defaults read from `~/.kship/rc`.
///
/// The file holds `key=value` lines; `#` starts a comment. Recognised keys:
/// `template.repo`, `registry`, `namespace`. Unknown keys are ignored.
#[derive(Debug, Clone, Default)]
pub struct UserRc {
    values: HashMap<String, String>,
}

impl UserRc {
    /// Get the rc file path
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".kship").join("rc"))
    }

    /// Load the rc file, or empty defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rc file: {}", path.display()))?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self { values }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn template_repo(&self) -> &str {
        self.get("template.repo").unwrap_or(DEFAULT_TEMPLATE_REPO)
    }

    pub fn registry(&self) -> Option<&str> {
        self.get("registry")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get("namespace")
    }
}
