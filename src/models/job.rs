use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Kubernetes object names derived from a job must stay well under the
/// 63 character label limit once controllers append their own suffixes.
pub const MAX_JOB_NAME_LEN: usize = 53;

/// One deployed run of the app's manifests
#[derive(Debug, Clone)]
pub struct DeployedJob {
    pub job_name: String,
    pub directory: PathBuf,
    pub creation_time: DateTime<Local>,
}

/// Build the job name for a run.
///
/// The name is `<app>-<run id>`. When that is too long the app part is
/// shortened, never the run id, so job names stay unique.
pub fn job_name_for(app_name: &str, run_id: &str) -> String {
    let budget = MAX_JOB_NAME_LEN.saturating_sub(run_id.len() + 1);
    let app: String = app_name.chars().take(budget).collect();
    let app = app.trim_end_matches('-');
    if app.is_empty() {
        run_id.chars().take(MAX_JOB_NAME_LEN).collect()
    } else {
        format!("{}-{}", app, run_id)
    }
}

/// Pod name prefix shared by every pod of a job: the app part plus the first
/// two groups of the run id.
///
/// Returns `None` when the job name does not carry a run id with at least two groups.
pub fn pod_prefix(job_name: &str, app_name: &str) -> Option<String> {
    let app = job_name_app_part(job_name, app_name)?;
    let run_id = &job_name[app.len() + 1..];
    let groups: Vec<&str> = run_id.split('-').collect();
    if groups.len() < 2 || groups[0].is_empty() || groups[1].is_empty() {
        return None;
    }
    Some(format!("{}-{}-{}", app, groups[0], groups[1]))
}

fn job_name_app_part<'a>(job_name: &'a str, app_name: &str) -> Option<&'a str> {
    // The app part may have been shortened by job_name_for
    let mut end = app_name.len().min(job_name.len());
    while end > 0 {
        if app_name.starts_with(&job_name[..end]) && job_name[end..].starts_with('-') {
            return Some(&job_name[..end]);
        }
        end -= 1;
    }
    None
}
