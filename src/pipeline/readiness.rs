// Pod readiness polling against eventually-consistent cluster state

use anyhow::Result;
use log::debug;
use std::thread;
use std::time::Duration;

use crate::models::PodReadinessSample;
use crate::tools::Kubectl;

/// Source of `kubectl get pods` style tables
pub trait PodLister {
    fn list_pods(&self) -> Result<String>;
}

impl PodLister for Kubectl {
    fn list_pods(&self) -> Result<String> {
        self.get_pods()
    }
}

/// Retry budget shared by the polling commands
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub retries: u32,
    pub interval: Duration,
}

impl PollSettings {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(retries: u32) -> Self {
        PollSettings { retries, interval: Self::DEFAULT_INTERVAL }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Outcome of waiting for a job's pods
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// Every matching pod is Running or Completed
    Ready(Vec<PodReadinessSample>),
    /// The budget ran out; counts are from the last query
    NotReady { found: usize, ready: usize },
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }
}

/// Waits until every pod whose name contains a prefix is ready.
pub struct ReadinessPoller<'a, L: PodLister> {
    lister: &'a L,
    settings: PollSettings,
}

impl<'a, L: PodLister> ReadinessPoller<'a, L> {
    pub fn new(lister: &'a L, settings: PollSettings) -> Self {
        ReadinessPoller { lister, settings }
    }

    /// Query up to `retries` times. Success needs at least one matching pod and
    /// all matching pods ready. There is no sleep after the final attempt.
    pub fn wait_for(&self, prefix: &str) -> Result<Readiness> {
        eprintln!("Checking for pod(s) readiness");
        let retries = self.settings.retries;
        let mut last = (0, 0);

        for attempt in 1..=retries {
            let table = self.lister.list_pods()?;
            let matching: Vec<PodReadinessSample> = PodReadinessSample::parse_table(&table)
                .into_iter()
                .filter(|s| s.pod_name.contains(prefix))
                .collect();
            let ready = matching.iter().filter(|s| s.status_phase.is_ready()).count();
            debug!("attempt {}/{}: {} of {} pods ready", attempt, retries, ready, matching.len());

            if !matching.is_empty() && ready == matching.len() {
                return Ok(Readiness::Ready(matching));
            }
            last = (matching.len(), ready);

            eprint!("Retrying {}/{} \r", attempt, retries);
            if attempt < retries && !self.settings.interval.is_zero() {
                thread::sleep(self.settings.interval);
            }
        }

        eprintln!("Max retries Reached.");
        Ok(Readiness::NotReady { found: last.0, ready: last.1 })
    }
}
