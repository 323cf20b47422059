// Thin wrapper over the kubectl binary

use anyhow::{Context, Result};
use log::{debug, warn};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

use super::process::{self, Captured, Tool};
use crate::cli::error::KshipError;
use crate::cli::output::echo_failure_output;

/// Result of deleting a job's resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The cluster no longer had (some of) the resources
    AlreadyGone,
}

/// True when kubectl's output says the object does not exist
pub fn is_not_found(output: &str) -> bool {
    output.contains("NotFound") || output.contains("not found")
}

/// Names of the CRDs in a `kubectl get crd -o json` document
pub fn crd_names(json: &str) -> Result<BTreeSet<String>> {
    let doc: Value = serde_json::from_str(json).context("Failed to parse CRD list")?;
    let names = doc
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.pointer("/metadata/name").and_then(Value::as_str))
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();
    Ok(names)
}

/// kubectl bound to one namespace
#[derive(Debug, Clone)]
pub struct Kubectl {
    namespace: String,
}

impl Kubectl {
    pub fn new(namespace: &str) -> Self {
        Kubectl { namespace: namespace.to_string() }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn run<I, S>(&self, args: I) -> Result<Captured>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = process::tool_command(Tool::Kubectl, args, None);
        process::run_captured(Tool::Kubectl, &mut cmd)
    }

    /// Create the namespace unless `kubectl get namespace` already finds it
    pub fn ensure_namespace(&self) -> Result<()> {
        let existing = self.run(["get", "namespace", self.namespace.as_str()])?;
        if existing.success() {
            return Ok(());
        }
        debug!("Creating namespace {}", self.namespace);
        let mut cmd = process::tool_command(Tool::Kubectl, ["create", "namespace", self.namespace.as_str()], None);
        process::run_checked(Tool::Kubectl, &mut cmd)?;
        Ok(())
    }

    /// `kubectl --namespace <ns> apply -f <file>`; returns kubectl's stdout
    pub fn apply(&self, file: &Path) -> Result<String> {
        let mut cmd = process::tool_command(Tool::Kubectl, ["--namespace", self.namespace.as_str(), "apply", "-f"], None);
        cmd.arg(file);
        process::run_checked(Tool::Kubectl, &mut cmd)
    }

    /// `kubectl --namespace <ns> delete -f <path>`.
    ///
    /// Objects that are already gone count as deleted; any other failure is an error.
    pub fn delete(&self, path: &Path) -> Result<DeleteOutcome> {
        let mut cmd = process::tool_command(Tool::Kubectl, ["--namespace", self.namespace.as_str(), "delete", "-f"], None);
        cmd.arg(path);
        let captured = process::run_captured(Tool::Kubectl, &mut cmd)?;
        if captured.success() {
            if !captured.stdout.trim().is_empty() {
                print!("{}", captured.stdout);
            }
            return Ok(DeleteOutcome::Deleted);
        }
        if is_not_found(&captured.combined()) {
            warn!("Resources in {} were already gone: {}", path.display(), captured.stderr.trim());
            return Ok(DeleteOutcome::AlreadyGone);
        }
        echo_failure_output(&captured.stdout, &captured.stderr);
        Err(KshipError::CommandFailed {
            command: process::describe(&cmd),
            code: captured.code(),
        }
        .into())
    }

    /// Pod table for the namespace. A failed query reads as no pods.
    pub fn get_pods(&self) -> Result<String> {
        let captured = self.run(["get", "pods", "--namespace", self.namespace.as_str()])?;
        if !captured.success() {
            debug!("kubectl get pods failed: {}", captured.stderr.trim());
            return Ok(String::new());
        }
        Ok(captured.stdout)
    }

    /// Pod table sorted oldest first
    pub fn get_pods_by_start_time(&self) -> Result<String> {
        let mut cmd = process::tool_command(
            Tool::Kubectl,
            ["get", "pods", "--namespace", self.namespace.as_str(), "--sort-by=.status.startTime"],
            None,
        );
        process::run_checked(Tool::Kubectl, &mut cmd)
    }

    /// `kubectl get <resource> <name> --namespace <ns>`
    pub fn get_resource(&self, resource: &str, name: &str) -> Result<Captured> {
        self.run(["get", resource, name, "--namespace", self.namespace.as_str()])
    }

    /// `kubectl get pods -l <label>=<value> --namespace <ns>`
    pub fn get_pods_with_label(&self, label: &str, value: &str) -> Result<Captured> {
        let selector = format!("{}={}", label, value);
        self.run(["get", "pods", "-l", selector.as_str(), "--namespace", self.namespace.as_str()])
    }

    pub fn get_events(&self) -> Result<String> {
        let mut cmd = process::tool_command(Tool::Kubectl, ["get", "events", "--namespace", self.namespace.as_str()], None);
        process::run_checked(Tool::Kubectl, &mut cmd)
    }

    /// CRDs installed on the cluster. `None` when the cluster could not be queried.
    pub fn installed_crds(&self) -> Result<Option<BTreeSet<String>>> {
        let captured = self.run(["get", "crd", "-o", "json"])?;
        if !captured.success() {
            warn!("Unable to list CRDs: {}", captured.stderr.trim());
            return Ok(None);
        }
        match crd_names(&captured.stdout) {
            Ok(names) => Ok(Some(names)),
            Err(e) => {
                warn!("{:#}", e);
                Ok(None)
            }
        }
    }

    /// Open an interactive shell in the app directory of `pod`
    pub fn exec_shell(&self, pod: &str) -> Result<()> {
        let mut cmd = process::tool_command(
            Tool::Kubectl,
            ["exec", "-it", pod, "--namespace", self.namespace.as_str(), "--", "/bin/bash", "-c", "cd /src/app; bash"],
            None,
        );
        process::run_interactive_checked(Tool::Kubectl, &mut cmd)
    }
}
