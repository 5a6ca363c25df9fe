//! Supervisor: owns the engine and resolves requests against it one at a time.

use std::sync::Arc;

use led_arbiter_core::{ArbitrationEngine, Transition};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::adapter::{Action, Request, Target};
use crate::error::Result;

/// Counters returned when a request stream ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub applied: usize,
    pub rejected: usize,
}

#[derive(Debug)]
pub struct IndicatorSupervisor {
    engine: Arc<ArbitrationEngine>,
}

impl IndicatorSupervisor {
    pub fn new(engine: Arc<ArbitrationEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &ArbitrationEngine {
        &self.engine
    }

    /// Apply one request. Rejected requests leave the engine untouched.
    pub fn dispatch(&self, req: &Request) -> Result<Transition> {
        let id = match &req.target {
            Target::Id(id) => id.as_str(),
            Target::Index(index) => self.engine.id_at(*index)?,
        };
        let transition = match req.action {
            Action::Activate => self.engine.activate(id)?,
            Action::Deactivate => self.engine.deactivate(id)?,
            Action::Toggle => self.engine.toggle(id)?,
        };
        Ok(transition)
    }

    /// Apply a batch in order. One result per request.
    pub fn ingest(&self, reqs: &[Request]) -> Vec<Result<Transition>> {
        reqs.iter().map(|r| self.dispatch(r)).collect()
    }

    /// Consume requests until the channel closes. Each request is fully
    /// resolved before the next one is received.
    pub async fn run(&self, mut rx: mpsc::Receiver<Request>) -> RunStats {
        let mut stats = RunStats::default();
        while let Some(req) = rx.recv().await {
            match self.dispatch(&req) {
                Ok(t) => {
                    stats.applied += 1;
                    if t.changed() {
                        info!(
                            from = t.previous.as_deref().unwrap_or("none"),
                            to = t.visible.as_deref().unwrap_or("none"),
                            active = ?self.engine.active(),
                            "visible indicator"
                        );
                    }
                }
                Err(e) => {
                    stats.rejected += 1;
                    warn!(request = ?req, "rejected: {e}");
                }
            }
        }
        stats
    }

    /// Release every request and clear the device.
    pub fn shutdown(&self) -> Result<()> {
        self.engine.release_all()?;
        Ok(())
    }
}
