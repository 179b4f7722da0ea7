//! Per-session editing state of a lattice.
//!
//! A session remembers which comb sits on each axis and, per axis and comb
//! id, which notches are engaged. Selections are created lazily with every
//! notch disengaged the first time a comb is looked at on an axis. The
//! optimizer never touches a session; a host applies a `Solution` explicitly.

use std::collections::HashMap;

use crate::geometry::LatticeLayout;
use crate::model::{Comb, CombId, NotchSelection, ValidationError};
use crate::optimizer::Solution;
use crate::types::Axis;

#[derive(Clone, Debug, Default)]
pub struct Session {
    selected: HashMap<Axis, CombId>,
    notches: HashMap<Axis, HashMap<CombId, NotchSelection>>,
}

impl Session {
    /// Creates a session with the first comb on axis 1 and the second one,
    /// if any, on axis 2.
    pub fn new(combs: &[Comb]) -> Self {
        let mut session = Self::default();
        for (axis, comb) in Axis::ALL.into_iter().zip(combs) {
            session.selected.insert(axis, comb.id.clone());
        }
        session
    }

    /// Comb currently placed on `axis`.
    pub fn selected_comb(&self, axis: Axis) -> Option<&CombId> {
        self.selected.get(&axis)
    }

    /// Places `comb` on `axis`, keeping any earlier selection for it.
    pub fn select_comb(&mut self, axis: Axis, comb: &Comb) {
        self.selected.insert(axis, comb.id.clone());
        self.selection_mut(axis, comb);
    }

    /// Notch selection of `comb` on `axis`, created on first access.
    pub fn selection(&mut self, axis: Axis, comb: &Comb) -> &NotchSelection {
        self.selection_mut(axis, comb)
    }

    fn selection_mut(&mut self, axis: Axis, comb: &Comb) -> &mut NotchSelection {
        let selection = self
            .notches
            .entry(axis)
            .or_default()
            .entry(comb.id.clone())
            .or_insert_with(|| NotchSelection::none(comb.notch_count()));

        // a catalog reload may have changed the tooth count
        if selection.len() != comb.notch_count() {
            log::debug!(
                "🔄 Resetting notch selection of '{}' on {}: {} notches now",
                comb.id,
                axis,
                comb.notch_count()
            );
            *selection = NotchSelection::none(comb.notch_count());
        }
        selection
    }

    /// Replaces the whole selection of `comb` on `axis`.
    pub fn set_selection(
        &mut self,
        axis: Axis,
        comb: &Comb,
        selection: NotchSelection,
    ) -> Result<(), ValidationError> {
        selection.check_len(comb)?;
        *self.selection_mut(axis, comb) = selection;
        Ok(())
    }

    /// Flips one notch and returns its new state, `None` if out of range.
    pub fn toggle_notch(&mut self, axis: Axis, comb: &Comb, notch: usize) -> Option<bool> {
        self.selection_mut(axis, comb).toggle(notch)
    }

    /// Takes over the combs and notch selections chosen by the optimizer.
    pub fn apply_solution(&mut self, solution: &Solution) {
        let assignments = [
            (Axis::Axis1, &solution.comb1, &solution.config1),
            (Axis::Axis2, &solution.comb2, &solution.config2),
        ];
        for (axis, comb, config) in assignments {
            self.selected.insert(axis, comb.clone());
            self.notches
                .entry(axis)
                .or_default()
                .insert(comb.clone(), config.clone());
        }
    }

    /// Layout of the two combs with their current selections.
    pub fn layout(
        &mut self,
        comb1: &Comb,
        comb2: &Comb,
        thickness: f64,
    ) -> Result<LatticeLayout, ValidationError> {
        let selection1 = self.selection(Axis::Axis1, comb1).clone();
        let selection2 = self.selection(Axis::Axis2, comb2).clone();
        LatticeLayout::build(comb1, &selection1, comb2, &selection2, thickness)
    }
}
