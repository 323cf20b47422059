use std::collections::HashMap;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use crate::cli::error::KshipError;
use crate::models::{AppConfig, display_value};

/// Values substituted into manifest templates
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    values: HashMap<String, String>,
}

impl Substitutions {
    /// Standard substitutions for a deploy: `image`, `app`, `run`, `namespace`
    /// plus every template parameter from the config.
    pub fn for_deploy(config: &AppConfig, image: &str, run_id: &str) -> Self {
        let mut subs = Self::default();
        for (key, value) in &config.template_parameters {
            subs.insert(key, &display_value(value));
        }
        subs.insert("image", image);
        subs.insert("app", &config.name);
        subs.insert("run", run_id);
        subs.insert("namespace", &config.namespace);
        subs
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Result of rendering one template file
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedManifest {
    /// Parsed as JSON and normalized
    Structured(Value),
    /// Left as YAML text
    Raw(String),
}

impl RenderedManifest {
    pub fn to_text(&self) -> Result<String> {
        match self {
            RenderedManifest::Structured(value) => Ok(serde_json::to_string_pretty(value)?),
            RenderedManifest::Raw(text) => Ok(text.clone()),
        }
    }
}

/// Substitute `$name` and `${name}` placeholders. `$$` is a literal `$`.
///
/// Every placeholder must resolve; a `$` that does not start a placeholder is
/// kept as is.
pub fn substitute(template: &str, subs: &Substitutions, file: &str) -> std::result::Result<String, KshipError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek().map(|&(_, next)| next) {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == '}' {
                        closed = true;
                        break;
                    }
                    name.push(ch);
                }
                if !closed {
                    return Err(KshipError::MalformedPlaceholder {
                        file: file.to_string(),
                        detail: format!("unterminated '${{{}'", name),
                    });
                }
                if !is_identifier(&name) {
                    return Err(KshipError::MalformedPlaceholder {
                        file: file.to_string(),
                        detail: format!("invalid placeholder name '${{{}}}'", name),
                    });
                }
                out.push_str(lookup(subs, &name, file)?);
            }
            Some(next) if next == '_' || next.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch == '_' || ch.is_ascii_alphanumeric() {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(lookup(subs, &name, file)?);
            }
            _ => out.push('$'),
        }
    }
    Ok(out)
}

fn lookup<'a>(subs: &'a Substitutions, name: &str, file: &str) -> std::result::Result<&'a str, KshipError> {
    subs.get(name).ok_or_else(|| KshipError::UnresolvedPlaceholder {
        placeholder: name.to_string(),
        file: file.to_string(),
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Render a template: substitute, then try JSON and normalize field types.
/// Text that is not JSON stays raw YAML.
pub fn render(template: &str, subs: &Substitutions, file: &str) -> Result<RenderedManifest> {
    let text = substitute(template, subs, file)?;
    match serde_json::from_str::<Value>(&text) {
        Ok(mut value) => {
            normalize_replicas(&mut value);
            Ok(RenderedManifest::Structured(value))
        }
        Err(e) => {
            log::debug!("{} is not JSON ({}), keeping it as YAML text", file, e);
            Ok(RenderedManifest::Raw(text))
        }
    }
}

/// Coerce every field named `replicas` to an integer, at any depth.
///
/// Template substitution produces replica counts as strings. Values that do
/// not hold an integer are left untouched.
pub fn normalize_replicas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(replicas) = map.get_mut("replicas") {
                if let Some(n) = as_integer(replicas) {
                    *replicas = Value::from(n);
                }
            }
            for child in map.values_mut() {
                normalize_replicas(child);
            }
        }
        Value::Array(items) => {
            for item in items {
                normalize_replicas(item);
            }
        }
        _ => {}
    }
}

/// Integer held by a number or a numeric string
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Parse rendered text into one tree per document.
///
/// JSON is tried first, then (multi-document) YAML. Empty documents are dropped.
pub fn parse_documents(text: &str, file: &str) -> Result<Vec<Value>> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(vec![value]);
    }
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)
            .with_context(|| format!("Failed to parse {} as YAML", file))?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

/// Serialize documents back to text `kubectl apply` accepts.
/// Several documents are wrapped in a `v1/List`.
pub fn documents_to_text(mut docs: Vec<Value>) -> Result<String> {
    let value = if docs.len() == 1 {
        docs.remove(0)
    } else {
        let mut list = Map::new();
        list.insert("apiVersion".into(), Value::from("v1"));
        list.insert("kind".into(), Value::from("List"));
        list.insert("items".into(), Value::Array(docs));
        Value::Object(list)
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

/// `kind` of every document in a manifest file
pub fn document_kinds(text: &str, file: &str) -> Result<Vec<String>> {
    let mut kinds = Vec::new();
    for doc in parse_documents(text, file)? {
        collect_kinds(&doc, &mut kinds);
    }
    Ok(kinds)
}

fn collect_kinds(doc: &Value, kinds: &mut Vec<String>) {
    match doc.get("kind").and_then(Value::as_str) {
        Some("List") => {
            if let Some(items) = doc.get("items").and_then(Value::as_array) {
                for item in items {
                    collect_kinds(item, kinds);
                }
            }
        }
        Some(kind) => kinds.push(kind.to_string()),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subs() -> Substitutions {
        let mut subs = Substitutions::default();
        subs.insert("app", "demo");
        subs.insert("run", "1234");
        subs.insert("image", "reg/demo:abc");
        subs.insert("num_ps", "2");
        subs
    }

    #[test]
    fn test_substitute_forms() {
        let out = substitute("name: $app-$run\nimage: ${image}\ncost: $$5\n", &subs(), "job.yaml").unwrap();
        assert_eq!(out, "name: demo-1234\nimage: reg/demo:abc\ncost: $5\n");
    }

    #[test]
    fn test_substitute_keeps_lone_dollar() {
        let out = substitute("echo $ and $(date) $1", &subs(), "job.yaml").unwrap();
        assert_eq!(out, "echo $ and $(date) $1");
    }

    #[test]
    fn test_unresolved_placeholder_is_error() {
        let err = substitute("image: $missing", &subs(), "job.yaml").unwrap_err();
        match err {
            KshipError::UnresolvedPlaceholder { placeholder, file } => {
                assert_eq!(placeholder, "missing");
                assert_eq!(file, "job.yaml");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_brace_is_error() {
        assert!(matches!(
            substitute("image: ${image", &subs(), "job.yaml"),
            Err(KshipError::MalformedPlaceholder { .. })
        ));
    }

    #[test]
    fn test_for_deploy_includes_parameters() {
        let mut config = AppConfig::new("demo", "team");
        config.template_parameters.insert("num_workers".into(), json!(3));
        config.template_parameters.insert("gpu".into(), json!(true));
        let subs = Substitutions::for_deploy(&config, "reg/demo:1", "run-1");
        assert_eq!(subs.get("num_workers"), Some("3"));
        assert_eq!(subs.get("gpu"), Some("true"));
        assert_eq!(subs.get("namespace"), Some("team"));
        assert_eq!(subs.get("image"), Some("reg/demo:1"));
    }

    #[test]
    fn test_render_json_coerces_replicas_at_any_depth() {
        let template = r#"{
            "kind": "TFJob",
            "spec": {
                "replicas": "$num_ps",
                "replicaSpecs": [
                    {"replicas": "$num_ps", "tfReplicaType": "PS"},
                    {"replicas": "4", "tfReplicaType": "WORKER"}
                ]
            }
        }"#;
        match render(template, &subs(), "tf.json").unwrap() {
            RenderedManifest::Structured(value) => {
                assert_eq!(value["spec"]["replicas"], json!(2));
                assert_eq!(value["spec"]["replicaSpecs"][0]["replicas"], json!(2));
                assert_eq!(value["spec"]["replicaSpecs"][1]["replicas"], json!(4));
                assert_eq!(value["spec"]["replicaSpecs"][1]["tfReplicaType"], json!("WORKER"));
            }
            other => panic!("expected JSON manifest, got {:?}", other),
        }
    }

    #[test]
    fn test_render_yaml_stays_raw() {
        let template = "kind: Job\nmetadata:\n  name: $app-$run\n";
        assert_eq!(
            render(template, &subs(), "job.yaml").unwrap(),
            RenderedManifest::Raw("kind: Job\nmetadata:\n  name: demo-1234\n".to_string())
        );
    }

    #[test]
    fn test_normalize_leaves_non_numeric_replicas() {
        let mut value = json!({"replicas": "many", "other": {"replicas": 3.0}});
        normalize_replicas(&mut value);
        assert_eq!(value["replicas"], json!("many"));
        assert_eq!(value["other"]["replicas"], json!(3));
    }

    #[test]
    fn test_parse_multi_document_yaml() {
        let docs = parse_documents("kind: Service\n---\nkind: Job\n---\n", "all.yaml").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["kind"], json!("Job"));
    }

    #[test]
    fn test_document_kinds_unwraps_lists() {
        let text = documents_to_text(vec![json!({"kind": "Service"}), json!({"kind": "Job"})]).unwrap();
        assert_eq!(document_kinds(&text, "list.json").unwrap(), vec!["Service", "Job"]);
    }
}
