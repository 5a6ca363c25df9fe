//! One prioritized indicator and the lifecycle of its pattern task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::color::Color;
use crate::output::IndicatorOutput;
use crate::pattern::{Pattern, PatternKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    /// Cancel has been sent but the task has not exited yet.
    Stopping,
}

/// A single spawned run of the pattern. Each run gets its own cancel channel,
/// so a new run always starts with the flag cleared.
struct Execution {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Execution {
    fn cancelled(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// Drive one run of `pattern` on behalf of indicator `id`.
///
/// Every indicator goes through here, so start/exit logging is uniform no
/// matter which pattern kind it is bound to.
async fn drive(
    id: Arc<str>,
    pattern: Arc<Pattern>,
    cancel: watch::Receiver<bool>,
    output: Arc<dyn IndicatorOutput>,
) {
    debug!(indicator = %id, "pattern loop entered");
    pattern.run(cancel, output.as_ref()).await;
    debug!(indicator = %id, "pattern loop exited");
}

pub struct IndicatorState {
    rank: usize,
    id: Arc<str>,
    kind: PatternKind,
    pattern: Arc<Pattern>,
    output: Arc<dyn IndicatorOutput>,
    runtime: Handle,
    execution: Mutex<Option<Execution>>,
    starts: AtomicU64,
    stops: AtomicU64,
}

impl IndicatorState {
    pub fn new(
        rank: usize,
        id: impl Into<Arc<str>>,
        kind: PatternKind,
        output: Arc<dyn IndicatorOutput>,
        runtime: Handle,
    ) -> Self {
        let pattern = Arc::new(kind.pattern());
        Self {
            rank,
            id: id.into(),
            kind,
            pattern,
            output,
            runtime,
            execution: Mutex::new(None),
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of executions spawned so far.
    pub fn start_count(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    pub fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Execution>> {
        self.execution
            .lock()
            .expect("indicator state mutex poisoned")
    }

    /// Current lifecycle status. Task exit is authoritative for `Idle`.
    ///
    /// A one-shot pattern that has already emitted keeps reporting `Running`
    /// until `stop()`: its color is still being held on the device.
    pub fn status(&self) -> RunStatus {
        match self.lock().as_ref() {
            None => RunStatus::Idle,
            Some(exec) if !exec.cancelled() => RunStatus::Running,
            Some(exec) if exec.task.is_finished() => RunStatus::Idle,
            Some(_) => RunStatus::Stopping,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == RunStatus::Running
    }

    /// Spawn the pattern task. No-op while an uncancelled run exists.
    ///
    /// A run that is still `Stopping` is not waited for: the new run starts
    /// immediately and the old one may still make one last output call while
    /// it unwinds.
    pub fn start(&self) {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|exec| !exec.cancelled()) {
            return;
        }

        info!(indicator = %self.id, rank = self.rank, "start");
        let (cancel, cancel_rx) = watch::channel(false);
        let task = self.runtime.spawn(drive(
            Arc::clone(&self.id),
            Arc::clone(&self.pattern),
            cancel_rx,
            Arc::clone(&self.output),
        ));
        self.starts.fetch_add(1, Ordering::Relaxed);
        *slot = Some(Execution { cancel, task });
    }

    /// Cancel the current run (if any) and clear the device.
    ///
    /// Returns without waiting for the task to exit. The `Off` cleanup is
    /// issued even when the indicator was already idle.
    pub fn stop(&self) {
        if let Some(exec) = self.lock().as_ref() {
            exec.cancel.send_replace(true);
        }
        info!(indicator = %self.id, "stop");
        self.stops.fetch_add(1, Ordering::Relaxed);
        self.output.set_color(Color::Off);
    }
}

impl std::fmt::Debug for IndicatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorState")
            .field("rank", &self.rank)
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("status", &self.status())
            .finish()
    }
}
