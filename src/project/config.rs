use std::fs;
use anyhow::{Context, Result};
use serde_json::Value;
use crate::cli::error::KshipError;
use crate::models::{AppConfig, set_path, remove_path};
use crate::project::ProjectContext;

/// Reads and writes `kship.json`
pub struct ConfigStore;

impl ConfigStore {
    /// Load the project config. A missing file means the command was not run
    /// inside an initialized project.
    pub fn load(ctx: &ProjectContext) -> Result<AppConfig> {
        let path = ctx.config_path();
        if !path.is_file() {
            return Err(KshipError::NotInitialized.into());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(ctx: &ProjectContext, config: &AppConfig) -> Result<()> {
        let path = ctx.config_path();
        let raw = serde_json::to_string_pretty(config)?;
        fs::write(&path, raw + "\n")
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Set a dotted config path to a string value and persist it
    pub fn set(ctx: &ProjectContext, keys: &[String], value: &str) -> Result<AppConfig> {
        let mut doc = Self::load(ctx)?.to_value();
        set_path(&mut doc, keys, Value::String(value.to_string()));
        let config = Self::from_edited(doc)?;
        Self::save(ctx, &config)?;
        Ok(config)
    }

    /// Remove a dotted config path and persist the result
    pub fn remove(ctx: &ProjectContext, keys: &[String]) -> Result<AppConfig> {
        let mut doc = Self::load(ctx)?.to_value();
        if remove_path(&mut doc, keys).is_none() {
            return Err(KshipError::ConfigKeyNotFound(keys.join(".")).into());
        }
        let config = Self::from_edited(doc)?;
        Self::save(ctx, &config)?;
        Ok(config)
    }

    fn from_edited(doc: Value) -> Result<AppConfig> {
        serde_json::from_value(doc).map_err(|e| {
            KshipError::Precondition(format!("Config edit would leave kship.json invalid: {}", e)).into()
        })
    }
}
