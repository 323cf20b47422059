// Cluster events for a deployed job

use anyhow::Result;

use crate::project::{ConfigStore, ProjectContext};
use crate::repo::JobRepo;
use crate::tools::Kubectl;

/// Keep the header and the event lines that mention `job_name`.
///
/// `None` when no event matches.
pub fn filter_events(table: &str, job_name: &str) -> Option<String> {
    let mut lines = table.lines();
    let header = lines.next()?;
    let matching: Vec<&str> = lines.filter(|line| line.contains(job_name)).collect();
    if matching.is_empty() {
        return None;
    }
    let mut output = String::from(header);
    output.push('\n');
    for line in matching {
        output.push_str(line);
        output.push('\n');
    }
    Some(output)
}

/// Run `kship events`
pub fn events(ctx: &ProjectContext, job_name: Option<&str>) -> Result<()> {
    let config = ConfigStore::load(ctx)?;
    let job = JobRepo::resolve(ctx, job_name)?;
    let table = Kubectl::new(&config.namespace).get_events()?;
    match filter_events(&table, &job) {
        Some(output) => print!("{}", output),
        None => println!("No events to display for this job"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = "LAST SEEN   TYPE     REASON      OBJECT                  MESSAGE\n\
                          10s         Normal   Scheduled   pod/demo-1234-abcd-0    Successfully assigned\n\
                          8s          Normal   Pulled      pod/other-9999-0        Container image pulled\n\
                          5s          Normal   Started     pod/demo-1234-abcd-0    Started container\n";

    #[test]
    fn test_filter_events_keeps_header_and_matches() {
        let output = filter_events(EVENTS, "demo-1234-abcd").unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("LAST SEEN"));
        assert!(lines.iter().all(|l| !l.contains("other-9999")));
    }

    #[test]
    fn test_filter_events_no_match() {
        assert_eq!(filter_events(EVENTS, "missing-job"), None);
        assert_eq!(filter_events("", "demo"), None);
    }
}
