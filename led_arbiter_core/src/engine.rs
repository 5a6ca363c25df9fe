//! The arbitration engine: fixed-priority scheduler over the indicator catalog.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::cfg::CatalogCfg;
use crate::decide::{check_invariants, decide_visible};
use crate::error::{Error, Result};
use crate::output::IndicatorOutput;
use crate::state::{IndicatorState, RunStatus};

/// What a single activate/deactivate did to the visible indicator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    pub previous: Option<String>,
    pub visible: Option<String>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.previous != self.visible
    }
}

/// Active set and visible rank, guarded together. The engine only starts or
/// stops indicators while holding this lock.
#[derive(Debug, Default)]
struct Arbitration {
    active: BTreeSet<usize>,
    visible: Option<usize>,
}

/// Owns the catalog and decides which indicator drives the output.
///
/// Only one activate/deactivate is resolved at a time. The engine never owns
/// the runtime; pattern tasks are spawned on the handle given at construction.
#[derive(Debug)]
pub struct ArbitrationEngine {
    catalog: Vec<IndicatorState>,
    ranks: HashMap<String, usize>,
    arbitration: Mutex<Arbitration>,
}

impl ArbitrationEngine {
    pub fn new(cfg: &CatalogCfg, output: Arc<dyn IndicatorOutput>, runtime: Handle) -> Result<Self> {
        cfg.validate()?;

        let catalog: Vec<IndicatorState> = cfg
            .indicators
            .iter()
            .enumerate()
            .map(|(rank, ind)| {
                IndicatorState::new(
                    rank,
                    ind.id.as_str(),
                    ind.pattern.clone(),
                    Arc::clone(&output),
                    runtime.clone(),
                )
            })
            .collect();
        let ranks = catalog
            .iter()
            .map(|s| (s.id().to_string(), s.rank()))
            .collect();

        Ok(Self {
            catalog,
            ranks,
            arbitration: Mutex::new(Arbitration::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Arbitration> {
        self.arbitration
            .lock()
            .expect("arbitration engine mutex poisoned")
    }

    pub fn catalog(&self) -> &[IndicatorState] {
        &self.catalog
    }

    pub fn state(&self, id: &str) -> Option<&IndicatorState> {
        self.ranks.get(id).map(|&rank| &self.catalog[rank])
    }

    pub fn rank_of(&self, id: &str) -> Result<usize> {
        self.ranks
            .get(id)
            .copied()
            .ok_or_else(|| Error::invalid_argument(id))
    }

    /// Identifier at catalog position `index`.
    pub fn id_at(&self, index: usize) -> Result<&str> {
        self.catalog
            .get(index)
            .map(IndicatorState::id)
            .ok_or_else(|| Error::invalid_argument(format!("#{}", index.saturating_add(1))))
    }

    pub fn is_active(&self, id: &str) -> Result<bool> {
        let rank = self.rank_of(id)?;
        Ok(self.lock().active.contains(&rank))
    }

    /// Active identifiers in priority order.
    pub fn active(&self) -> Vec<String> {
        let arb = self.lock();
        self.names(&arb.active)
    }

    pub fn visible(&self) -> Option<String> {
        self.lock().visible.map(|rank| self.catalog[rank].id().to_string())
    }

    /// Request `id`. Idempotent.
    pub fn activate(&self, id: &str) -> Result<Transition> {
        let rank = self.rank_of(id)?;
        let mut arb = self.lock();
        if arb.active.insert(rank) {
            debug!(indicator = id, "activated");
        }
        self.settle(&mut arb)
    }

    /// Release `id`. Idempotent; releasing an inactive indicator is not an error.
    pub fn deactivate(&self, id: &str) -> Result<Transition> {
        let rank = self.rank_of(id)?;
        let mut arb = self.lock();
        if arb.active.remove(&rank) {
            debug!(indicator = id, "deactivated");
        }
        self.settle(&mut arb)
    }

    /// Flip `id` between requested and released, as one step.
    pub fn toggle(&self, id: &str) -> Result<Transition> {
        let rank = self.rank_of(id)?;
        let mut arb = self.lock();
        if !arb.active.remove(&rank) {
            arb.active.insert(rank);
        }
        self.settle(&mut arb)
    }

    /// Release everything. Leaves the device cleared.
    pub fn release_all(&self) -> Result<Transition> {
        let mut arb = self.lock();
        arb.active.clear();
        self.settle(&mut arb)
    }

    /// Check that the visible indicator is the highest-priority active one and
    /// that nothing else is running.
    pub fn check_invariants(&self) -> Result<()> {
        let arb = self.lock();
        self.verify(&arb)
    }

    fn settle(&self, arb: &mut Arbitration) -> Result<Transition> {
        let previous = arb.visible;
        self.recompute_visibility(arb);
        self.verify(arb)?;
        Ok(Transition {
            previous: previous.map(|rank| self.catalog[rank].id().to_string()),
            visible: arb.visible.map(|rank| self.catalog[rank].id().to_string()),
        })
    }

    fn recompute_visibility(&self, arb: &mut Arbitration) {
        debug!(active = ?self.names(&arb.active), "recomputing visibility");

        let candidate = decide_visible(&arb.active);
        if candidate != arb.visible {
            if let Some(old) = arb.visible.take() {
                self.catalog[old].stop();
            }
            arb.visible = candidate;
            info!(
                visible = candidate.map(|rank| self.catalog[rank].id()).unwrap_or("none"),
                "visibility changed"
            );
        }

        // Sweep anything else still running.
        for state in &self.catalog {
            if Some(state.rank()) != arb.visible && state.is_running() {
                state.stop();
            }
        }

        if let Some(rank) = arb.visible {
            let state = &self.catalog[rank];
            if state.status() != RunStatus::Running {
                state.start();
            }
        }
    }

    fn verify(&self, arb: &Arbitration) -> Result<()> {
        let running: Vec<bool> = self.catalog.iter().map(IndicatorState::is_running).collect();
        check_invariants(&arb.active, arb.visible, &running)
    }

    fn names(&self, ranks: &BTreeSet<usize>) -> Vec<String> {
        ranks
            .iter()
            .map(|&rank| self.catalog[rank].id().to_string())
            .collect()
    }
}
