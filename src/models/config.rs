use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TEMPLATE_PARAMETERS: &str = "template_parameters";

/// Project configuration persisted as `kship.json`.
///
/// Keys this struct doesn't know about are kept in `extra` so a `config set`
/// followed by a save never drops user data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(rename = "gceProject", default, skip_serializing_if = "Option::is_none")]
    pub gce_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_git_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub template_parameters: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Where pushed images go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registry {
    /// Plain docker registry, pushed with `docker push`
    Docker(String),
    /// Google Container Registry project, pushed with `gcloud docker -- push`
    Gcr(String),
}

impl Registry {
    pub fn remote_name(&self, container: &str) -> String {
        match self {
            Registry::Docker(registry) => format!("{}/{}", registry, container),
            Registry::Gcr(project) => format!("gcr.io/{}/{}", project, container),
        }
    }
}

impl AppConfig {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            registry: None,
            gce_project: None,
            template_name: None,
            template_git_sha: None,
            template_parameters: Map::new(),
            extra: Map::new(),
        }
    }

    /// Registry to push to. An explicit `registry` wins over `gceProject`.
    pub fn registry(&self) -> Option<Registry> {
        if let Some(registry) = self.registry.as_deref().filter(|r| !r.is_empty()) {
            return Some(Registry::Docker(registry.to_string()));
        }
        self.gce_project
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| Registry::Gcr(p.to_string()))
    }

    pub fn to_value(&self) -> Value {
        // Serializing a struct of strings and maps cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Flatten into `(dotted name, value)` rows for display.
    /// Template parameters are listed one per row.
    pub fn list_entries(&self) -> Vec<(String, String)> {
        let mut rows = Vec::new();
        if let Value::Object(map) = self.to_value() {
            for (key, value) in map {
                if key == TEMPLATE_PARAMETERS {
                    if let Value::Object(params) = value {
                        for (param, param_value) in params {
                            rows.push((format!("{}.{}", TEMPLATE_PARAMETERS, param), display_value(&param_value)));
                        }
                    }
                } else {
                    rows.push((key, display_value(&value)));
                }
            }
        }
        rows
    }
}

/// Render a JSON value the way it is substituted into templates
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        other => other.to_string(),
    }
}

/// Set `value` at a dotted path, creating intermediate mappings as needed.
/// A non-mapping value in the middle of the path is replaced by a mapping.
pub fn set_path(doc: &mut Value, keys: &[String], value: Value) {
    match keys {
        [] => {}
        [last] => {
            as_object(doc).insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let child = as_object(doc)
                .entry(first.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            set_path(child, rest, value);
        }
    }
}

fn as_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

/// Remove the value at a dotted path. Returns the removed value, or `None`
/// when any segment of the path does not exist.
pub fn remove_path(doc: &mut Value, keys: &[String]) -> Option<Value> {
    let (last, parents) = keys.split_last()?;
    let mut current = doc;
    for key in parents {
        current = current.as_object_mut()?.get_mut(key)?;
    }
    current.as_object_mut()?.remove(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(path: &str) -> Vec<String> {
        path.split('.').map(String::from).collect()
    }

    #[test]
    fn test_roundtrip_preserves_unknown_keys() {
        let raw = json!({
            "name": "demo",
            "namespace": "alice",
            "gceProject": "my-proj",
            "custom_flag": true
        });
        let config: AppConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.gce_project.as_deref(), Some("my-proj"));
        assert_eq!(config.extra.get("custom_flag"), Some(&json!(true)));
        let back = config.to_value();
        assert_eq!(back["custom_flag"], json!(true));
        assert_eq!(back["gceProject"], json!("my-proj"));
    }

    #[test]
    fn test_registry_precedence() {
        let mut config = AppConfig::new("demo", "ns");
        assert_eq!(config.registry(), None);
        config.gce_project = Some("proj".into());
        assert_eq!(config.registry(), Some(Registry::Gcr("proj".into())));
        config.registry = Some("registry.local:5000".into());
        assert_eq!(
            config.registry().unwrap().remote_name("demo:abc"),
            "registry.local:5000/demo:abc"
        );
    }

    #[test]
    fn test_set_path_creates_intermediate_maps() {
        let mut doc = json!({"name": "demo"});
        set_path(&mut doc, &keys("template_parameters.num_ps"), json!("2"));
        assert_eq!(doc["template_parameters"]["num_ps"], json!("2"));
        set_path(&mut doc, &keys("name"), json!("other"));
        assert_eq!(doc["name"], json!("other"));
    }

    #[test]
    fn test_remove_path() {
        let mut doc = json!({"template_parameters": {"num_ps": 1, "num_workers": 2}});
        assert_eq!(remove_path(&mut doc, &keys("template_parameters.num_ps")), Some(json!(1)));
        assert!(doc["template_parameters"].get("num_ps").is_none());
        assert_eq!(remove_path(&mut doc, &keys("template_parameters.missing")), None);
        assert_eq!(remove_path(&mut doc, &keys("nothing.here")), None);
    }

    #[test]
    fn test_list_entries_flattens_parameters() {
        let mut config = AppConfig::new("demo", "ns");
        config.template_parameters.insert("epochs".into(), json!(10));
        let rows = config.list_entries();
        assert!(rows.contains(&("name".to_string(), "demo".to_string())));
        assert!(rows.contains(&("template_parameters.epochs".to_string(), "10".to_string())));
    }
}
