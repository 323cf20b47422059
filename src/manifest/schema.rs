// Structural checks on k8s templates before anything is rendered or applied

use serde_json::Value;

use super::render::parse_documents;
use crate::cli::error::KshipError;

const SCOPES: [&str; 2] = ["Namespaced", "Cluster"];
const CRD_NAME_FIELDS: [&str; 3] = ["plural", "singular", "kind"];

fn invalid(file: &str, detail: impl Into<String>) -> KshipError {
    KshipError::InvalidTemplate {
        file: file.to_string(),
        detail: detail.into(),
    }
}

fn require_string(map: &serde_json::Map<String, Value>, key: &str, at: &str, file: &str) -> Result<(), KshipError> {
    match map.get(key) {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(invalid(file, format!("{}{} must be a string", at, key))),
        None => Err(invalid(file, format!("{}{} is required", at, key))),
    }
}

fn optional_string(map: &serde_json::Map<String, Value>, key: &str, at: &str, file: &str) -> Result<(), KshipError> {
    match map.get(key) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(invalid(file, format!("{}{} must be a string", at, key))),
    }
}

/// Check one manifest document.
///
/// Every document needs `apiVersion`, `kind`, `metadata.name` and a `spec`
/// mapping. CRD-style fields under `spec` (`group`, `version`, `scope`,
/// `names`) are checked when present.
pub fn validate_document(doc: &Value, file: &str) -> Result<(), KshipError> {
    let Value::Object(root) = doc else {
        return Err(invalid(file, "document must be a mapping"));
    };
    require_string(root, "apiVersion", "", file)?;
    require_string(root, "kind", "", file)?;

    match root.get("metadata") {
        Some(Value::Object(metadata)) => require_string(metadata, "name", "metadata.", file)?,
        Some(_) => return Err(invalid(file, "metadata must be a mapping")),
        None => return Err(invalid(file, "metadata is required")),
    }

    let spec = match root.get("spec") {
        Some(Value::Object(spec)) => spec,
        Some(_) => return Err(invalid(file, "spec must be a mapping")),
        None => return Err(invalid(file, "spec is required")),
    };
    optional_string(spec, "group", "spec.", file)?;
    optional_string(spec, "version", "spec.", file)?;
    match spec.get("scope") {
        None => {}
        Some(Value::String(scope)) if SCOPES.contains(&scope.as_str()) => {}
        Some(other) => {
            return Err(invalid(
                file,
                format!("spec.scope must be one of {}, got {}", SCOPES.join(", "), other),
            ))
        }
    }
    match spec.get("names") {
        None => {}
        Some(Value::Object(names)) => {
            for field in CRD_NAME_FIELDS {
                require_string(names, field, "spec.names.", file)?;
            }
            match names.get("shortNames") {
                Some(Value::Array(items)) if items.iter().all(Value::is_string) => {}
                Some(_) => return Err(invalid(file, "spec.names.shortNames must be a list of strings")),
                None => return Err(invalid(file, "spec.names.shortNames is required")),
            }
        }
        Some(_) => return Err(invalid(file, "spec.names must be a mapping")),
    }
    Ok(())
}

/// Parse a YAML template and check each of its documents
pub fn validate_template(text: &str, file: &str) -> Result<(), KshipError> {
    let docs = parse_documents(text, file).map_err(|e| invalid(file, format!("{:#}", e)))?;
    for doc in &docs {
        validate_document(doc, file)?;
    }
    Ok(())
}

/// Templates that go through validation. JSON templates may hold unquoted
/// placeholders and only parse once rendered.
pub fn is_validated_template(file_name: &str) -> bool {
    file_name.ends_with(".yaml") || file_name.ends_with(".yml")
}
