use chrono::{DateTime, Local};

/// Pod phase as printed in the STATUS column of `kubectl get pods`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    ContainerCreating,
    Running,
    Completed,
    Failed,
    Other(String),
}

impl PodPhase {
    pub fn parse(s: &str) -> Self {
        match s {
            "Pending" => PodPhase::Pending,
            "ContainerCreating" => PodPhase::ContainerCreating,
            "Running" => PodPhase::Running,
            "Completed" | "Succeeded" => PodPhase::Completed,
            "Failed" | "Error" => PodPhase::Failed,
            other => PodPhase::Other(other.to_string()),
        }
    }

    /// Ready for log tailing
    pub fn is_ready(&self) -> bool {
        matches!(self, PodPhase::Running | PodPhase::Completed)
    }
}

/// One pod observation from a single polling iteration. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PodReadinessSample {
    pub pod_name: String,
    pub status_phase: PodPhase,
    pub seen_at: DateTime<Local>,
}

impl PodReadinessSample {
    pub fn new(pod_name: &str, phase: &str) -> Self {
        Self {
            pod_name: pod_name.to_string(),
            status_phase: PodPhase::parse(phase),
            seen_at: Local::now(),
        }
    }

    /// Parse the table output of `kubectl get pods`.
    ///
    /// The first line is the header; name is column 0 and status column 2.
    /// Lines that do not have a status column are skipped, as is the
    /// "No resources found" notice.
    pub fn parse_table(output: &str) -> Vec<Self> {
        output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| !line.starts_with("NAME") && !line.starts_with("No resources"))
            .filter_map(|line| {
                let cols: Vec<&str> = line.split_whitespace().collect();
                if cols.len() < 3 {
                    return None;
                }
                Some(Self::new(cols[0], cols[2]))
            })
            .collect()
    }
}
