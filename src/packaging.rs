//! Outer box selection for bulk shipping of finished lattices.
//!
//! Lattices are laid flat on the floor of a corrugated box in a simple grid,
//! in whichever of the two orientations fits more of them.

use std::cmp::Ordering;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::Cardboard;
use crate::types::compare_with_epsilon;

/// How a single outer box type would serve a shipment.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct CardboardChoice {
    pub cardboard: Cardboard,
    /// Position of the box in the catalog.
    pub index: usize,
    pub lattices_per_box: u64,
    /// Lattices are turned by 90° relative to the box floor.
    pub rotated: bool,
    pub items_per_box: u64,
    pub boxes_needed: u64,
    pub total_capacity: u64,
    pub total_cost: f64,
    pub cost_per_slot: f64,
}

/// Counts whole lattices on the box floor in both orientations.
///
/// Counts beyond `u64::MAX` saturate.
///
/// # Returns
/// The better count and whether it needs the rotated orientation.
pub fn lattices_per_box(
    cardboard: &Cardboard,
    lattice_width: f64,
    lattice_depth: f64,
) -> (u64, bool) {
    let fit = |span: f64, size: f64| (span / size).floor().max(0.0) as u64;

    let straight =
        fit(cardboard.width, lattice_width).saturating_mul(fit(cardboard.length, lattice_depth));
    let rotated =
        fit(cardboard.width, lattice_depth).saturating_mul(fit(cardboard.length, lattice_width));

    if rotated > straight {
        (rotated, true)
    } else {
        (straight, false)
    }
}

/// Evaluates one box type for the given shipment.
///
/// Returns `None` if the box cannot take a single lattice, the lattice
/// holds no items or the slot count overflows.
pub fn evaluate_box(
    index: usize,
    cardboard: &Cardboard,
    lattice_width: f64,
    lattice_depth: f64,
    items_per_lattice: u64,
    required_qty: u64,
) -> Option<CardboardChoice> {
    if items_per_lattice == 0 || lattice_width <= 0.0 || lattice_depth <= 0.0 {
        return None;
    }

    let (lattices, rotated) = lattices_per_box(cardboard, lattice_width, lattice_depth);
    if lattices == 0 {
        return None;
    }

    let items_per_box = lattices.checked_mul(items_per_lattice)?;
    let boxes_needed = required_qty.div_ceil(items_per_box);
    let total_capacity = boxes_needed.checked_mul(items_per_box)?;
    let total_cost = boxes_needed as f64 * cardboard.price;
    let cost_per_slot = if total_capacity == 0 {
        f64::INFINITY
    } else {
        total_cost / total_capacity as f64
    };

    Some(CardboardChoice {
        cardboard: cardboard.clone(),
        index,
        lattices_per_box: lattices,
        rotated,
        items_per_box,
        boxes_needed,
        total_capacity,
        total_cost,
        cost_per_slot,
    })
}

/// Picks the outer box with the lowest cost per item slot.
///
/// Equal cost per slot is decided in favour of the larger total capacity;
/// remaining ties keep the box listed first.
///
/// # Returns
/// `None` if no box in the catalog holds at least one lattice.
pub fn select_box(
    lattice_width: f64,
    lattice_depth: f64,
    items_per_lattice: u64,
    required_qty: u64,
    catalog: &[Cardboard],
    epsilon: f64,
) -> Option<CardboardChoice> {
    let mut best: Option<CardboardChoice> = None;

    for (index, cardboard) in catalog.iter().enumerate() {
        let Some(candidate) = evaluate_box(
            index,
            cardboard,
            lattice_width,
            lattice_depth,
            items_per_lattice,
            required_qty,
        ) else {
            continue;
        };

        let better = match &best {
            None => true,
            Some(current) => match compare_with_epsilon(
                candidate.cost_per_slot,
                current.cost_per_slot,
                epsilon,
            ) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => candidate.total_capacity > current.total_capacity,
            },
        };

        if better {
            best = Some(candidate);
        }
    }

    best
}
