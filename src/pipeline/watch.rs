// `build --watch`: rebuild once a burst of file changes settles

use anyhow::{Context, Result};
use log::{debug, warn};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::project::ProjectContext;
use crate::tools::git;

/// Quiet period after the last change before a build starts
pub const DEBOUNCE_DELAY: Duration = Duration::from_secs(3);

/// Single-slot debounce: every event replaces the pending deadline.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer { delay, deadline: None }
    }

    /// Record a change seen at `now`
    pub fn event(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// How long to wait for the next event. `None` when nothing is pending.
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// True exactly once per burst, when its deadline has passed
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Whether a change to `path` should trigger a rebuild
fn is_relevant(ctx: &ProjectContext, path: &Path) -> bool {
    if ctx.is_generated_path(path) {
        return false;
    }
    !git::is_ignored(ctx.root(), path)
}

/// Watch the project tree and call `on_change` after each settled burst of changes.
///
/// Runs until the watcher goes away or the process is interrupted. A failed
/// rebuild is reported and watching continues.
pub fn watch<F>(ctx: &ProjectContext, mut on_change: F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })
    .context("Failed to create file watcher")?;
    watcher
        .watch(ctx.root(), RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", ctx.root().display()))?;
    println!("Watching {} for changes (Ctrl-C to stop)", ctx.root().display());

    let mut debouncer = Debouncer::new(DEBOUNCE_DELAY);
    loop {
        let received = match debouncer.timeout(Instant::now()) {
            Some(wait) => rx.recv_timeout(wait),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Ok(event)) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    continue;
                }
                if let Some(path) = event.paths.iter().find(|p| is_relevant(ctx, p)) {
                    debug!("change detected: {}", path.display());
                    debouncer.event(Instant::now());
                }
            }
            Ok(Err(e)) => warn!("File watcher error: {}", e),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if debouncer.fire(Instant::now()) {
            if let Err(e) = on_change() {
                eprintln!("Error: {:#}", e);
            }
        }
    }
    Ok(())
}
