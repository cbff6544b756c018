use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::generation::GenerationService;

/// What a trigger attempt resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

/// Guards the generation engine against overlapping executions.
///
/// Holds the only shared mutable flag in the system; everything else is
/// owned by the single background worker. The runner has no terminal state
/// and can be triggered again after every run.
pub struct JobRunner {
    engine: Arc<GenerationService>,
    running: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new(engine: Arc<GenerationService>) -> Self {
        Self {
            engine,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a detached background run unless one is already active.
    ///
    /// Read-and-set of the flag is a single atomic exchange, so two
    /// near-simultaneous triggers cannot both start a worker. The caller
    /// gets an answer immediately; it never waits for the run.
    pub fn trigger(&self) -> TriggerOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return TriggerOutcome::AlreadyRunning;
        }

        let engine = self.engine.clone();
        let guard = RunningGuard(self.running.clone());
        tokio::spawn(async move {
            // The guard lives inside the task so the flag is released on
            // every exit path, including a panic in the run.
            let _guard = guard;
            match engine.run().await {
                Ok(summary) => tracing::info!(
                    generated = summary.generated,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "generation run completed"
                ),
                Err(e) => tracing::error!(error = %e, "generation run aborted"),
            }
        });

        TriggerOutcome::Started
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
