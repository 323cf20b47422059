use serde_json::{json, Map, Value};
use crate::cli::error::KshipError;
use crate::manifest::render::as_integer;

/// Entrypoint every container gets in an interactive deploy.
/// The container idles until it is sent TERM or INT.
pub const DEBUG_COMMAND: &[&str] = &["/bin/sh"];
pub const DEBUG_ARGS: &[&str] = &["-c", "trap : TERM INT; sleep infinity & wait"];
pub const DEBUG_LABEL: (&str, &str) = ("debug", "true");

/// What a patching pass found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Pod-template locations tagged with the debug label
    pub template_locations: usize,
    /// Container lists rewritten
    pub container_locations: usize,
    /// Containers rewritten across all lists
    pub total_containers: usize,
    /// A pod template sits next to a `replicas` other than 1
    pub multiple_replicas: bool,
}

impl PatchReport {
    /// Fold another manifest's report into a running tally
    pub fn merge(&mut self, other: &PatchReport) {
        self.template_locations += other.template_locations;
        self.container_locations += other.container_locations;
        self.total_containers += other.total_containers;
        self.multiple_replicas |= other.multiple_replicas;
    }

    /// Attaching a shell is only unambiguous with a single container in a single pod
    pub fn can_attach(&self) -> bool {
        self.total_containers == 1 && !self.multiple_replicas
    }
}

/// Make a manifest interactively debuggable.
///
/// Walks the whole tree once. Every `template` mapping gets the debug label as
/// its metadata, every entry of every `containers` list gets the idle
/// entrypoint. Fails when no `containers` list exists anywhere.
pub fn patch_for_debug(doc: &mut Value, file: &str) -> Result<PatchReport, KshipError> {
    let mut report = PatchReport::default();
    visit(doc, &mut report);
    if report.container_locations == 0 {
        return Err(KshipError::NoContainers { file: file.to_string() });
    }
    Ok(report)
}

/// Patch every document of a file; the container tally spans all of them
pub fn patch_documents(docs: &mut [Value], file: &str) -> Result<PatchReport, KshipError> {
    let mut report = PatchReport::default();
    for doc in docs.iter_mut() {
        visit(doc, &mut report);
    }
    if report.container_locations == 0 {
        return Err(KshipError::NoContainers { file: file.to_string() });
    }
    Ok(report)
}

fn visit(node: &mut Value, report: &mut PatchReport) {
    match node {
        Value::Object(map) => {
            if map.contains_key("template") {
                report.template_locations += 1;
                if let Some(replicas) = map.get("replicas") {
                    if as_integer(replicas) != Some(1) {
                        report.multiple_replicas = true;
                    }
                }
                if let Some(template) = map.get_mut("template") {
                    tag_template(template);
                }
            }
            if let Some(Value::Array(containers)) = map.get_mut("containers") {
                report.container_locations += 1;
                for container in containers.iter_mut() {
                    if let Value::Object(container) = container {
                        idle_container(container);
                        report.total_containers += 1;
                    }
                }
            }
            for child in map.values_mut() {
                visit(child, report);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                visit(item, report);
            }
        }
        _ => {}
    }
}

fn tag_template(template: &mut Value) {
    if let Value::Object(template) = template {
        let (key, value) = DEBUG_LABEL;
        let mut labels = Map::new();
        labels.insert(key.to_string(), Value::from(value));
        template.insert("metadata".to_string(), json!({ "labels": labels }));
    }
}

fn idle_container(container: &mut Map<String, Value>) {
    container.insert("command".to_string(), json!(DEBUG_COMMAND));
    container.insert("args".to_string(), json!(DEBUG_ARGS));
}
