//! Notch geometry of combs and the lattice layout handed to renderers.
//!
//! Notch positions are measured along the comb's width axis with the comb
//! centered on the origin, so a 390 wide comb spans `[-195, 195]`.

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{Comb, CombId, NotchSelection, ValidationError};

/// Computes the notch offsets of a comb.
///
/// The first notch sits `margin` in from the left edge. Every following
/// notch is one `gap` plus one tooth further along. The result always has
/// `tooths.len() + 1` entries and is never cached, so it follows every change
/// of the comb's dimensions.
///
/// # Examples
/// ```
/// use lattice_pack::geometry::notch_positions;
/// use lattice_pack::model::Comb;
///
/// let comb = Comb::new("3NAC", 390.0, 205.0, 3.0, 10.0, vec![185.0, 185.0]).unwrap();
/// assert_eq!(notch_positions(&comb), vec![-185.0, 3.0, 191.0]);
/// ```
pub fn notch_positions(comb: &Comb) -> Vec<f64> {
    let mut positions = Vec::with_capacity(comb.notch_count());
    let mut current = -comb.width / 2.0 + comb.margin;
    positions.push(current);
    current += comb.gap;

    for &tooth in &comb.tooths {
        current += tooth;
        positions.push(current);
        current += comb.gap;
    }

    positions
}

/// Width at which the notch layout is symmetric about the comb center.
///
/// The last notch then sits `margin + gap` before the right edge, mirroring
/// the left side.
pub fn expected_width(comb: &Comb) -> f64 {
    let teeth: f64 = comb.tooths.iter().sum();
    2.0 * comb.margin + teeth + comb.gap * comb.notch_count() as f64
}

/// Keeps the positions whose notch is engaged.
pub fn active_positions(positions: &[f64], selection: &NotchSelection) -> Vec<f64> {
    positions
        .iter()
        .enumerate()
        .filter(|(idx, _)| selection.is_active(*idx))
        .map(|(_, &pos)| pos)
        .collect()
}

/// Usable span between each pair of adjacent active notches.
pub fn cell_spans(active: &[f64], thickness: f64) -> Vec<f64> {
    active
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs() - thickness)
        .collect()
}

/// Geometry of one lattice axis.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct AxisLayout {
    #[schema(value_type = String)]
    pub comb: CombId,
    pub width: f64,
    pub depth: f64,
    pub notches: Vec<f64>,
    pub selection: NotchSelection,
    pub active: Vec<f64>,
    /// Free span of every cell along this axis.
    pub spans: Vec<f64>,
}

impl AxisLayout {
    fn build(
        comb: &Comb,
        selection: &NotchSelection,
        thickness: f64,
    ) -> Result<Self, ValidationError> {
        selection.check_len(comb)?;
        let notches = notch_positions(comb);
        let active = active_positions(&notches, selection);
        let spans = cell_spans(&active, thickness);
        Ok(Self {
            comb: comb.id.clone(),
            width: comb.width,
            depth: comb.depth,
            notches,
            selection: selection.clone(),
            active,
            spans,
        })
    }
}

/// Everything a renderer needs to draw a lattice and annotate its cells.
///
/// Axis 1 combs run along X and are stacked at every active notch of the
/// axis 2 comb, and vice versa.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct LatticeLayout {
    pub axis1: AxisLayout,
    pub axis2: AxisLayout,
    /// Outer footprint (axis 1 comb width, axis 2 comb width).
    #[schema(value_type = [f64; 2])]
    pub footprint: (f64, f64),
    /// Height of the lattice, limited by the shallower comb.
    pub height: f64,
    /// Number of closed cells.
    pub cells: usize,
}

impl LatticeLayout {
    /// Builds the layout of two crossed combs with their notch selections.
    pub fn build(
        comb1: &Comb,
        selection1: &NotchSelection,
        comb2: &Comb,
        selection2: &NotchSelection,
        thickness: f64,
    ) -> Result<Self, ValidationError> {
        let axis1 = AxisLayout::build(comb1, selection1, thickness)?;
        let axis2 = AxisLayout::build(comb2, selection2, thickness)?;
        let cells = axis1.spans.len() * axis2.spans.len();
        Ok(Self {
            footprint: (comb1.width, comb2.width),
            height: comb1.depth.min(comb2.depth),
            cells,
            axis1,
            axis2,
        })
    }
}
