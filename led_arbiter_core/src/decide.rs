//! Pure visibility decision and the invariants that must hold after it.

use std::collections::BTreeSet;

use crate::error::{Error, Result};

/// The visible indicator is the active one with the lowest rank.
#[inline]
pub fn decide_visible(active: &BTreeSet<usize>) -> Option<usize> {
    active.first().copied()
}

/// Check the arbitration invariants against a snapshot of engine state.
///
/// `running[rank]` is whether that catalog entry currently reports `Running`.
pub fn check_invariants(
    active: &BTreeSet<usize>,
    visible: Option<usize>,
    running: &[bool],
) -> Result<()> {
    if visible.is_none() != active.is_empty() {
        return Err(Error::invariant(format!(
            "visible={visible:?} but {} active",
            active.len()
        )));
    }
    if visible != decide_visible(active) {
        return Err(Error::invariant(format!(
            "visible={visible:?} is not the highest-priority active entry {:?}",
            decide_visible(active)
        )));
    }
    if let Some(rank) = running
        .iter()
        .enumerate()
        .position(|(rank, &r)| r && Some(rank) != visible)
    {
        return Err(Error::invariant(format!(
            "rank {rank} is running while visible={visible:?}"
        )));
    }
    Ok(())
}
