use serde_json::{Map, Value};

/// Pipeline stage with its own checkpoint file in the project root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Build,
    Push,
    Sync,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Build => "build",
            Stage::Push => "push",
            Stage::Sync => "sync",
        }
    }

    /// Fixed file name of the stage record, relative to the project root
    pub fn file_name(&self) -> &'static str {
        match self {
            Stage::Build => ".build.json",
            Stage::Push => ".push.json",
            Stage::Sync => ".sync.json",
        }
    }

    pub fn all() -> [Stage; 3] {
        [Stage::Build, Stage::Push, Stage::Sync]
    }
}

/// Flat record persisted for one stage.
///
/// Field names used by the pipeline live in the `keys` module so producers and
/// consumers agree on spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
    pub stage: Stage,
    pub fields: Map<String, Value>,
}

impl StageRecord {
    pub fn new(stage: Stage) -> Self {
        Self { stage, fields: Map::new() }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Field names stored in stage records
pub mod keys {
    pub const LAST_CONTAINER: &str = "last_container";
    pub const LAST_BUILD_DURATION: &str = "last_build_duration";
    pub const LAST_REMOTE_CONTAINER: &str = "last_remote_container";
    pub const LAST_PUSH_DURATION: &str = "last_push_duration";
    pub const APP_RUN_ID: &str = "app_run_id";
    pub const SYNC_SPEC: &str = "sync_spec";
}
