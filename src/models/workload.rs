use std::collections::BTreeSet;

/// How a job's status is queried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    /// Plain `batch/v1` Job
    GenericJob,
    /// Kubeflow TFJob custom resource
    TfJob,
    /// Kubeflow PyTorchJob custom resource
    PyTorchJob,
    /// Mixed kinds, unknown kinds, or a template-provided `make status`
    Custom,
}

impl WorkloadKind {
    fn from_kind(kind: &str) -> Option<Self> {
        match kind.to_lowercase().as_str() {
            "job" => Some(WorkloadKind::GenericJob),
            "tfjob" => Some(WorkloadKind::TfJob),
            "pytorchjob" => Some(WorkloadKind::PyTorchJob),
            _ => None,
        }
    }

    /// Classify a job from the `kind` of every manifest it was deployed with.
    ///
    /// A single distinct known kind selects its own query; anything else
    /// (several kinds, an unknown kind, no kinds, or a custom status target)
    /// falls back to `Custom`.
    pub fn classify<'a>(kinds: impl IntoIterator<Item = &'a str>, has_custom_status: bool) -> Self {
        if has_custom_status {
            return WorkloadKind::Custom;
        }
        let distinct: BTreeSet<String> = kinds.into_iter().map(|k| k.to_lowercase()).collect();
        if distinct.len() != 1 {
            return WorkloadKind::Custom;
        }
        distinct
            .iter()
            .next()
            .and_then(|k| Self::from_kind(k))
            .unwrap_or(WorkloadKind::Custom)
    }

    /// Resource name for `kubectl get`, and the label the operator puts on pods
    pub fn query(&self) -> Option<(&'static str, &'static str)> {
        match self {
            WorkloadKind::GenericJob => Some(("job", "job-name")),
            WorkloadKind::TfJob => Some(("tfjob", "tf_job_name")),
            WorkloadKind::PyTorchJob => Some(("pytorchjob", "pytorch_job_name")),
            WorkloadKind::Custom => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_kind() {
        assert_eq!(WorkloadKind::classify(["Job"], false), WorkloadKind::GenericJob);
        assert_eq!(WorkloadKind::classify(["TFJob", "TFJob"], false), WorkloadKind::TfJob);
        assert_eq!(WorkloadKind::classify(["PyTorchJob"], false), WorkloadKind::PyTorchJob);
    }

    #[test]
    fn test_mixed_kinds_fall_back_to_custom() {
        assert_eq!(WorkloadKind::classify(["Job", "TFJob"], false), WorkloadKind::Custom);
        assert_eq!(WorkloadKind::classify(["Service", "Deployment"], false), WorkloadKind::Custom);
    }

    #[test]
    fn test_unknown_or_missing_kind() {
        assert_eq!(WorkloadKind::classify(["Deployment"], false), WorkloadKind::Custom);
        assert_eq!(WorkloadKind::classify(Vec::<&str>::new(), false), WorkloadKind::Custom);
    }

    #[test]
    fn test_custom_status_target_wins() {
        assert_eq!(WorkloadKind::classify(["Job"], true), WorkloadKind::Custom);
    }
}
