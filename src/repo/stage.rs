use std::fs;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use crate::models::{Stage, StageRecord};
use crate::project::ProjectContext;

/// Stage-state store.
///
/// One flat JSON object per stage in the project root. Writes replace the
/// whole file; there is no locking and the last writer wins.
pub struct StageRepo;

impl StageRepo {
    /// Overwrite the stage's record
    pub fn write(ctx: &ProjectContext, record: &StageRecord) -> Result<()> {
        let path = ctx.stage_path(record.stage);
        let raw = serde_json::to_string_pretty(&record.fields)?;
        fs::write(&path, raw)
            .with_context(|| format!("Failed to write {} state: {}", record.stage.as_str(), path.display()))?;
        log::debug!("wrote {} state to {}", record.stage.as_str(), path.display());
        Ok(())
    }

    /// Load a stage's record. `None` when the stage never ran.
    pub fn load(ctx: &ProjectContext, stage: Stage) -> Result<Option<StageRecord>> {
        let path = ctx.stage_path(stage);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {} state: {}", stage.as_str(), path.display()))?;
        let fields: Map<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {} state: {}", stage.as_str(), path.display()))?;
        Ok(Some(StageRecord { stage, fields }))
    }

    /// Read one field. A missing file and a missing key are both `None`.
    pub fn read(ctx: &ProjectContext, stage: Stage, key: &str) -> Result<Option<Value>> {
        Ok(Self::load(ctx, stage)?.and_then(|record| record.fields.get(key).cloned()))
    }

    /// Read one field as a string
    pub fn read_str(ctx: &ProjectContext, stage: Stage, key: &str) -> Result<Option<String>> {
        Ok(Self::read(ctx, stage, key)?.and_then(|v| v.as_str().map(String::from)))
    }

    /// Read one field as seconds
    pub fn read_f64(ctx: &ProjectContext, stage: Stage, key: &str) -> Result<Option<f64>> {
        Ok(Self::read(ctx, stage, key)?.and_then(|v| v.as_f64()))
    }

    /// Set a single field, keeping the rest of the record
    pub fn set(ctx: &ProjectContext, stage: Stage, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut record = Self::load(ctx, stage)?.unwrap_or_else(|| StageRecord::new(stage));
        record.fields.insert(key.to_string(), value.into());
        Self::write(ctx, &record)
    }

    /// Remove the stage file. Missing files are fine.
    pub fn clear(ctx: &ProjectContext, stage: Stage) -> Result<()> {
        let path = ctx.stage_path(stage);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::keys;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_read_before_write_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp_dir.path());
        assert_eq!(StageRepo::read(&ctx, Stage::Build, keys::LAST_CONTAINER).unwrap(), None);
        assert!(StageRepo::load(&ctx, Stage::Push).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp_dir.path());
        let record = StageRecord::new(Stage::Build)
            .with(keys::LAST_CONTAINER, "demo:1234")
            .with(keys::LAST_BUILD_DURATION, 12.5);
        StageRepo::write(&ctx, &record).unwrap();

        assert_eq!(
            StageRepo::read_str(&ctx, Stage::Build, keys::LAST_CONTAINER).unwrap().as_deref(),
            Some("demo:1234")
        );
        assert_eq!(StageRepo::read_f64(&ctx, Stage::Build, keys::LAST_BUILD_DURATION).unwrap(), Some(12.5));
        assert_eq!(StageRepo::read(&ctx, Stage::Build, "missing").unwrap(), None);
    }

    #[test]
    fn test_write_overwrites_wholesale() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp_dir.path());
        StageRepo::write(&ctx, &StageRecord::new(Stage::Push).with("a", 1)).unwrap();
        StageRepo::write(&ctx, &StageRecord::new(Stage::Push).with("b", 2)).unwrap();
        assert_eq!(StageRepo::read(&ctx, Stage::Push, "a").unwrap(), None);
        assert_eq!(StageRepo::read(&ctx, Stage::Push, "b").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_set_keeps_other_fields() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp_dir.path());
        StageRepo::write(&ctx, &StageRecord::new(Stage::Push).with(keys::LAST_REMOTE_CONTAINER, "reg/demo:1")).unwrap();
        StageRepo::set(&ctx, Stage::Push, keys::APP_RUN_ID, "run-1").unwrap();
        let record = StageRepo::load(&ctx, Stage::Push).unwrap().unwrap();
        assert_eq!(record.get_str(keys::LAST_REMOTE_CONTAINER), Some("reg/demo:1"));
        assert_eq!(record.get_str(keys::APP_RUN_ID), Some("run-1"));
    }

    #[test]
    fn test_corrupted_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = ProjectContext::new(temp_dir.path());
        fs::write(ctx.stage_path(Stage::Build), "{not json").unwrap();
        assert!(StageRepo::read(&ctx, Stage::Build, keys::LAST_CONTAINER).is_err());
    }
}
