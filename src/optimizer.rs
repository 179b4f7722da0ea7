//! Lattice packing optimization.
//!
//! Two perpendicular combs crossed at their engaged notches form a grid of
//! cells, each of which should hold exactly one item. The optimizer:
//! - derives a notch selection per comb with a greedy left-to-right heuristic
//! - counts the cells that hold the item within the allowed slack
//! - picks the outer shipping box for the resulting lattice
//! - keeps the comb pair with the lowest total cost per stored item

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::geometry::{active_positions, notch_positions};
use crate::model::{Cardboard, Comb, CombId, ItemSpec, NotchSelection, ValidationError};
use crate::packaging::{CardboardChoice, select_box};
use crate::types::{EPSILON_GENERAL, THICKNESS};

/// Tunables of the lattice optimizer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LatticeConfig {
    /// Comb material thickness, subtracted from every notch distance.
    pub thickness: f64,
    /// Tolerance for the band and slack comparisons.
    pub epsilon: f64,
}

impl LatticeConfig {
    pub const DEFAULT_THICKNESS: f64 = THICKNESS;
    pub const DEFAULT_EPSILON: f64 = EPSILON_GENERAL;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> LatticeConfigBuilder {
        LatticeConfigBuilder::default()
    }
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            thickness: Self::DEFAULT_THICKNESS,
            epsilon: Self::DEFAULT_EPSILON,
        }
    }
}

/// Builder for `LatticeConfig`.
#[derive(Clone, Debug, Default)]
pub struct LatticeConfigBuilder {
    config: LatticeConfig,
}

impl LatticeConfigBuilder {
    pub fn thickness(mut self, thickness: f64) -> Self {
        self.config.thickness = thickness;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    pub fn build(self) -> LatticeConfig {
        self.config
    }
}

/// No usable configuration exists for the given catalogs and item.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Infeasible {
    #[error("No comb is deep enough for an item of height {required_height}")]
    NoCombDeepEnough { required_height: f64 },
    #[error("No comb pair and outer box combination can hold the item")]
    NoViableCombination,
}

impl Infeasible {
    pub fn code(&self) -> &'static str {
        match self {
            Infeasible::NoCombDeepEnough { .. } => "no_comb_deep_enough",
            Infeasible::NoViableCombination => "no_viable_combination",
        }
    }
}

/// Everything that can stop an optimization run.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Infeasible(#[from] Infeasible),
}

/// Why a comb pair was not considered further.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// One of the combs is bound to a different partner.
    Binding,
    /// The derived notch selections form no cell that fits the item.
    NoFittingCell,
    /// No outer box takes a single lattice.
    NoOuterBox,
}

impl SkipReason {
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::Binding => "binding",
            SkipReason::NoFittingCell => "no_fitting_cell",
            SkipReason::NoOuterBox => "no_outer_box",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Binding => write!(f, "comb is bound to a different partner"),
            SkipReason::NoFittingCell => write!(f, "no cell fits the item"),
            SkipReason::NoOuterBox => write!(f, "no outer box holds the lattice"),
        }
    }
}

/// Best lattice configuration for an item.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Solution {
    /// Comb along axis 1 (item width).
    #[schema(value_type = String)]
    pub comb1: CombId,
    /// Comb along axis 2 (item depth).
    #[schema(value_type = String)]
    pub comb2: CombId,
    pub config1: NotchSelection,
    pub config2: NotchSelection,
    /// Items stored per lattice.
    pub item_count: usize,
    /// Comb material cost of one lattice.
    pub combs_cost: f64,
    pub cardboard_info: CardboardChoice,
    pub total_cost: f64,
    /// Total cost per stored item, lower is better.
    pub score: f64,
}

/// Events emitted while the search runs, for live progress reporting.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum OptimizeEvent {
    /// The search begins; `eligible` combs passed the depth filter.
    Started {
        combs: usize,
        eligible: usize,
        cardboards: usize,
    },
    PairSkipped {
        comb1: CombId,
        comb2: CombId,
        reason: SkipReason,
    },
    PairEvaluated {
        comb1: CombId,
        comb2: CombId,
        item_count: usize,
        score: f64,
    },
    /// A pair beat every previous one.
    ImprovedBest {
        comb1: CombId,
        comb2: CombId,
        score: f64,
    },
    Finished { evaluated: usize, found: bool },
}

/// Counts the cells of a lattice that hold one item within the slack.
///
/// A cell is bounded by two adjacent engaged notches on each axis. It counts
/// when the free span minus the item extent lies in `[0, 2 * item.m]` on both
/// axes. Lattices shallower than the item hold nothing.
pub fn cell_score(
    config1: &NotchSelection,
    config2: &NotchSelection,
    comb1: &Comb,
    comb2: &Comb,
    item: &ItemSpec,
    config: &LatticeConfig,
) -> usize {
    if comb1.depth.min(comb2.depth) < item.h {
        return 0;
    }

    let active1 = active_positions(&notch_positions(comb1), config1);
    let active2 = active_positions(&notch_positions(comb2), config2);
    if active1.len() < 2 || active2.len() < 2 {
        return 0;
    }

    let max_slack = 2.0 * item.m + config.epsilon;
    let fits = |free: f64, extent: f64| {
        let slack = free - extent;
        slack >= -config.epsilon && slack <= max_slack
    };

    let mut count = 0;
    for w in active1.windows(2) {
        let free_w = (w[1] - w[0]).abs() - config.thickness;
        if !fits(free_w, item.w) {
            continue;
        }
        for d in active2.windows(2) {
            let free_d = (d[1] - d[0]).abs() - config.thickness;
            if fits(free_d, item.d) {
                count += 1;
            }
        }
    }
    count
}

/// Derives the notch selection of a comb for an item extent.
///
/// Strict combs engage every notch. Otherwise notch 0 is engaged and each
/// following notch is engaged when its distance to the previously engaged
/// one lies in `[span + thickness, span + 2 * margin + thickness]`; the
/// first match wins. The last notch is always engaged.
pub fn choose_selection(
    comb: &Comb,
    span: f64,
    margin: f64,
    config: &LatticeConfig,
) -> NotchSelection {
    if comb.strict {
        return NotchSelection::all(comb.notch_count());
    }

    let positions = notch_positions(comb);
    let mut selection = NotchSelection::none(positions.len());
    selection.set(0, true);

    let min_distance = span + config.thickness - config.epsilon;
    let max_distance = span + 2.0 * margin + config.thickness + config.epsilon;
    let mut last_active = positions[0];

    for (idx, &pos) in positions.iter().enumerate().skip(1) {
        let distance = pos - last_active;
        if distance >= min_distance && distance <= max_distance {
            selection.set(idx, true);
            last_active = pos;
        }
    }

    selection.set(positions.len() - 1, true);
    selection
}

/// Material cost of a lattice: every engaged notch uses one comb.
pub fn combs_cost(
    comb1: &Comb,
    config1: &NotchSelection,
    comb2: &Comb,
    config2: &NotchSelection,
) -> f64 {
    comb1.price * config1.active_count() as f64 + comb2.price * config2.active_count() as f64
}

/// Ensures both combs accept each other as partners.
#[inline]
pub fn is_pair_allowed(comb1: &Comb, comb2: &Comb) -> bool {
    comb1.accepts_partner(comb2) && comb2.accepts_partner(comb1)
}

fn evaluate_pair(
    comb1: &Comb,
    comb2: &Comb,
    cardboards: &[Cardboard],
    item: &ItemSpec,
    config: &LatticeConfig,
) -> Result<Solution, SkipReason> {
    if !is_pair_allowed(comb1, comb2) {
        return Err(SkipReason::Binding);
    }

    let config1 = choose_selection(comb1, item.w, item.m, config);
    let config2 = choose_selection(comb2, item.d, item.m, config);

    let item_count = cell_score(&config1, &config2, comb1, comb2, item, config);
    if item_count == 0 {
        return Err(SkipReason::NoFittingCell);
    }

    let combs_cost = combs_cost(comb1, &config1, comb2, &config2);

    let cardboard_info = select_box(
        comb1.width,
        comb2.width,
        item_count as u64,
        u64::from(item.q),
        cardboards,
        config.epsilon,
    )
    .ok_or(SkipReason::NoOuterBox)?;

    let total_cost = combs_cost * cardboard_info.boxes_needed as f64 + cardboard_info.total_cost;
    let score = total_cost / cardboard_info.total_capacity as f64;

    Ok(Solution {
        comb1: comb1.id.clone(),
        comb2: comb2.id.clone(),
        config1,
        config2,
        item_count,
        combs_cost,
        cardboard_info,
        total_cost,
        score,
    })
}

/// Searches the comb catalog for the cheapest lattice per stored item.
///
/// # Parameters
/// * `combs` - Comb catalog; its order decides ties
/// * `cardboards` - Outer box catalog
/// * `item` - Item to store
///
/// # Returns
/// The best `Solution`, or why none exists
pub fn optimize(
    combs: &[Comb],
    cardboards: &[Cardboard],
    item: &ItemSpec,
) -> Result<Solution, OptimizeError> {
    optimize_with_config(combs, cardboards, item, &LatticeConfig::default())
}

/// Like `optimize`, with custom tunables.
pub fn optimize_with_config(
    combs: &[Comb],
    cardboards: &[Cardboard],
    item: &ItemSpec,
    config: &LatticeConfig,
) -> Result<Solution, OptimizeError> {
    optimize_with_progress(combs, cardboards, item, config, |_| {})
}

/// Runs the search and reports every step to `on_event`.
///
/// Every ordered pair of sufficiently deep combs is tried, the same comb
/// on both axes included. Only a strictly lower score replaces the current
/// best, so the first pair in catalog order wins ties.
pub fn optimize_with_progress(
    combs: &[Comb],
    cardboards: &[Cardboard],
    item: &ItemSpec,
    config: &LatticeConfig,
    mut on_event: impl FnMut(&OptimizeEvent),
) -> Result<Solution, OptimizeError> {
    item.validate()?;
    if combs.is_empty() {
        return Err(ValidationError::EmptyCatalog("combs").into());
    }
    if cardboards.is_empty() {
        return Err(ValidationError::EmptyCatalog("cardboards").into());
    }
    for comb in combs {
        comb.validate()?;
    }
    for cardboard in cardboards {
        cardboard.validate()?;
    }

    let eligible: Vec<&Comb> = combs.iter().filter(|c| c.depth >= item.h).collect();
    on_event(&OptimizeEvent::Started {
        combs: combs.len(),
        eligible: eligible.len(),
        cardboards: cardboards.len(),
    });

    if eligible.is_empty() {
        log::info!("📏 No comb reaches the item height of {}", item.h);
        on_event(&OptimizeEvent::Finished {
            evaluated: 0,
            found: false,
        });
        return Err(Infeasible::NoCombDeepEnough {
            required_height: item.h,
        }
        .into());
    }

    let mut best: Option<Solution> = None;
    let mut evaluated = 0;

    for &comb1 in &eligible {
        for &comb2 in &eligible {
            let candidate = match evaluate_pair(comb1, comb2, cardboards, item, config) {
                Ok(candidate) => candidate,
                Err(reason) => {
                    log::debug!("⏭️ {} x {} skipped: {}", comb1.id, comb2.id, reason);
                    on_event(&OptimizeEvent::PairSkipped {
                        comb1: comb1.id.clone(),
                        comb2: comb2.id.clone(),
                        reason,
                    });
                    continue;
                }
            };

            evaluated += 1;
            log::debug!(
                "🧮 {} x {}: {} items per lattice, score {:.4}",
                comb1.id,
                comb2.id,
                candidate.item_count,
                candidate.score
            );
            on_event(&OptimizeEvent::PairEvaluated {
                comb1: candidate.comb1.clone(),
                comb2: candidate.comb2.clone(),
                item_count: candidate.item_count,
                score: candidate.score,
            });

            let improves = best
                .as_ref()
                .is_none_or(|current| candidate.score < current.score);
            if improves {
                on_event(&OptimizeEvent::ImprovedBest {
                    comb1: candidate.comb1.clone(),
                    comb2: candidate.comb2.clone(),
                    score: candidate.score,
                });
                best = Some(candidate);
            }
        }
    }

    on_event(&OptimizeEvent::Finished {
        evaluated,
        found: best.is_some(),
    });

    match best {
        Some(solution) => {
            log::info!(
                "✅ Best lattice: {} x {} with {} items, {} box(es), {:.4} per item",
                solution.comb1,
                solution.comb2,
                solution.item_count,
                solution.cardboard_info.boxes_needed,
                solution.score
            );
            Ok(solution)
        }
        None => {
            log::info!(
                "❌ No comb pair yields a usable lattice ({} evaluated)",
                evaluated
            );
            Err(Infeasible::NoViableCombination.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::approx_eq;

    /// Comb whose notches sit exactly 53 apart, one 50 item per cell.
    fn fifty_comb(id: &str, depth: f64) -> Comb {
        Comb::new(id, 341.0, depth, 3.0, 10.0, vec![50.0; 6]).unwrap()
    }

    fn item(w: f64, d: f64, h: f64, m: f64, q: u32) -> ItemSpec {
        ItemSpec::new(w, d, h, m, q).unwrap()
    }

    fn boxes() -> Vec<Cardboard> {
        vec![Cardboard::new(Some("K-700".to_string()), 700.0, 700.0, 220.0, 5.0).unwrap()]
    }

    fn collect_events(
        combs: &[Comb],
        cardboards: &[Cardboard],
        item: &ItemSpec,
    ) -> (Result<Solution, OptimizeError>, Vec<OptimizeEvent>) {
        let mut events = Vec::new();
        let result = optimize_with_progress(
            combs,
            cardboards,
            item,
            &LatticeConfig::default(),
            |evt| events.push(evt.clone()),
        );
        (result, events)
    }

    #[test]
    fn selection_is_greedy_within_band() {
        let tooths = vec![20.0, 30.0, 50.0, 20.0];
        let comb = Comb::new("g", 200.0, 60.0, 3.0, 10.0, tooths).unwrap();
        // distances from notch 0: 23, 56, 109, 132
        let selection = choose_selection(&comb, 50.0, 2.0, &LatticeConfig::default());
        assert_eq!(
            selection.as_slice(),
            &[true, false, true, true, true],
            "notch 2 opens the band, notch 3 follows 53 later, the last is forced"
        );
    }

    #[test]
    fn selection_forces_first_and_last_notch() {
        let comb = Comb::new("wide", 390.0, 205.0, 3.0, 5.5, vec![185.0, 185.0]).unwrap();
        let selection = choose_selection(&comb, 20.0, 1.0, &LatticeConfig::default());
        assert_eq!(selection.as_slice(), &[true, false, true]);

        let single = Comb::new("single", 20.0, 20.0, 0.0, 10.0, vec![]).unwrap();
        let selection = choose_selection(&single, 20.0, 1.0, &LatticeConfig::default());
        assert_eq!(selection.as_slice(), &[true]);
    }

    #[test]
    fn strict_comb_engages_every_notch() {
        let comb = Comb::new("s", 390.0, 205.0, 3.0, 9.5, vec![20.0; 16])
            .unwrap()
            .with_strict(true);
        for span in [1.0, 50.0, 400.0] {
            let selection = choose_selection(&comb, span, 2.0, &LatticeConfig::default());
            assert_eq!(selection.len(), 17);
            assert_eq!(selection.active_count(), 17);
        }
    }

    #[test]
    fn score_counts_fitting_cells() {
        let comb = fifty_comb("a", 60.0);
        let all = NotchSelection::all(comb.notch_count());
        let score = cell_score(
            &all,
            &all,
            &comb,
            &comb,
            &item(50.0, 50.0, 50.0, 2.0, 1),
            &LatticeConfig::default(),
        );
        assert_eq!(score, 36);
    }

    #[test]
    fn score_rejects_loose_and_tight_cells() {
        let comb = fifty_comb("a", 60.0);
        let all = NotchSelection::all(comb.notch_count());
        let config = LatticeConfig::default();
        let score_for = |w: f64| {
            cell_score(&all, &all, &comb, &comb, &item(w, 50.0, 50.0, 2.0, 1), &config)
        };

        // 50 free, item 45 with margin 2: slack 5 > 4
        assert_eq!(score_for(45.0), 0);
        // item larger than the cell
        assert_eq!(score_for(51.0), 0);
        // slack exactly 2 * m
        assert_eq!(score_for(46.0), 36);
    }

    #[test]
    fn score_needs_two_active_notches_per_axis() {
        let comb = fifty_comb("a", 60.0);
        let all = NotchSelection::all(comb.notch_count());
        let mut one = NotchSelection::none(comb.notch_count());
        one.set(3, true);
        let spec = item(50.0, 50.0, 50.0, 2.0, 1);
        let config = LatticeConfig::default();

        assert_eq!(cell_score(&one, &all, &comb, &comb, &spec, &config), 0);
        assert_eq!(cell_score(&all, &one, &comb, &comb, &spec, &config), 0);
    }

    #[test]
    fn score_is_zero_for_shallow_lattice() {
        let deep = fifty_comb("deep", 60.0);
        let shallow = fifty_comb("shallow", 40.0);
        let all = NotchSelection::all(deep.notch_count());
        let spec = item(50.0, 50.0, 50.0, 2.0, 1);
        let config = LatticeConfig::default();
        assert_eq!(cell_score(&all, &all, &deep, &shallow, &spec, &config), 0);
    }

    fn mask_selection(mask: u32, len: usize) -> NotchSelection {
        NotchSelection::from((0..len).map(|i| mask & (1 << i) != 0).collect::<Vec<_>>())
    }

    #[test]
    fn score_is_bounded_by_cell_grid() {
        let tooths = vec![50.0, 20.0, 30.0, 50.0, 47.0, 52.0];
        let comb = Comb::new("mixed", 400.0, 60.0, 3.0, 5.0, tooths).unwrap();
        let spec = item(50.0, 50.0, 50.0, 3.0, 1);
        let config = LatticeConfig::default();
        let n = comb.notch_count();
        let full = (1u32 << n) - 1;

        for mask1 in 0..=full {
            let sel1 = mask_selection(mask1, n);
            let sel2 = mask_selection(mask1.rotate_left(3) & full, n);
            let score = cell_score(&sel1, &sel2, &comb, &comb, &spec, &config);
            let bound =
                sel1.active_count().saturating_sub(1) * sel2.active_count().saturating_sub(1);
            assert!(score <= bound, "score {} exceeds bound {}", score, bound);
        }
    }

    #[test]
    fn finds_solution_for_matching_combs() {
        let combs = vec![fifty_comb("A", 60.0), fifty_comb("B", 60.0)];
        let solution = optimize(&combs, &boxes(), &item(50.0, 50.0, 50.0, 2.0, 100)).unwrap();

        assert!(solution.item_count > 0);
        assert!(solution.score.is_finite());
        assert_eq!(solution.item_count, 36);
        assert_eq!(solution.comb1, "A");
        assert_eq!(solution.comb2, "A");
        assert_eq!(solution.cardboard_info.lattices_per_box, 4);
        assert_eq!(solution.cardboard_info.boxes_needed, 1);
        assert!(approx_eq(solution.score, 5.0 / 144.0, 1e-12));
    }

    #[test]
    fn total_cost_includes_comb_material() {
        let combs = vec![fifty_comb("A", 60.0).with_price(0.5)];
        let solution = optimize(&combs, &boxes(), &item(50.0, 50.0, 50.0, 2.0, 200)).unwrap();

        // 7 engaged notches per comb
        assert!(approx_eq(solution.combs_cost, 7.0, 1e-12));
        assert_eq!(solution.cardboard_info.boxes_needed, 2);
        assert!(approx_eq(solution.total_cost, 7.0 * 2.0 + 10.0, 1e-12));
        assert!(approx_eq(solution.score, 24.0 / 288.0, 1e-12));
    }

    #[test]
    fn reports_no_comb_deep_enough() {
        let combs = vec![fifty_comb("A", 40.0), fifty_comb("B", 49.9)];
        let result = optimize(&combs, &boxes(), &item(50.0, 50.0, 50.0, 2.0, 10));
        match result {
            Err(OptimizeError::Infeasible(reason)) => {
                assert_eq!(reason.code(), "no_comb_deep_enough");
            }
            other => panic!("expected infeasible result, got {:?}", other),
        }
    }

    #[test]
    fn reports_no_viable_combination() {
        let combs = vec![fifty_comb("A", 60.0)];
        let result = optimize(&combs, &boxes(), &item(20.0, 20.0, 50.0, 1.0, 10));
        assert_eq!(
            result,
            Err(OptimizeError::Infeasible(Infeasible::NoViableCombination))
        );

        let tiny_box = vec![Cardboard::new(None, 100.0, 100.0, 100.0, 1.0).unwrap()];
        let result = optimize(&combs, &tiny_box, &item(50.0, 50.0, 50.0, 2.0, 10));
        assert_eq!(
            result,
            Err(OptimizeError::Infeasible(Infeasible::NoViableCombination))
        );
    }

    #[test]
    fn bound_comb_only_pairs_with_its_partner() {
        let combs = vec![
            fifty_comb("A", 60.0).with_bind("B"),
            fifty_comb("B", 60.0).with_price(1.0),
            fifty_comb("C", 60.0).with_price(1.0),
        ];
        let spec = item(50.0, 50.0, 50.0, 2.0, 100);
        let (result, events) = collect_events(&combs, &boxes(), &spec);
        let solution = result.unwrap();

        assert_eq!((solution.comb1.as_str(), solution.comb2.as_str()), ("A", "B"));

        let binding_skips: Vec<(String, String)> = events
            .iter()
            .filter_map(|evt| match evt {
                OptimizeEvent::PairSkipped {
                    comb1,
                    comb2,
                    reason: SkipReason::Binding,
                } => Some((comb1.clone(), comb2.clone())),
                _ => None,
            })
            .collect();
        for pair in [("A", "A"), ("A", "C"), ("C", "A")] {
            assert!(
                binding_skips.contains(&(pair.0.to_string(), pair.1.to_string())),
                "pair {:?} should be skipped",
                pair
            );
        }
        for evt in &events {
            if let OptimizeEvent::PairEvaluated { comb1, comb2, .. } = evt {
                if comb1 == "A" {
                    assert_eq!(comb2, "B");
                }
                if comb2 == "A" {
                    assert_eq!(comb1, "B");
                }
            }
        }
    }

    #[test]
    fn bound_pair_skipped_even_when_cheapest() {
        // A is free but bound to a comb that cannot form cells with it
        let combs = vec![
            fifty_comb("A", 60.0).with_bind("Z"),
            fifty_comb("C", 60.0).with_price(2.0),
            Comb::new("Z", 390.0, 60.0, 3.0, 5.5, vec![185.0, 185.0]).unwrap(),
        ];
        let solution = optimize(&combs, &boxes(), &item(50.0, 50.0, 50.0, 2.0, 100)).unwrap();
        assert_eq!((solution.comb1.as_str(), solution.comb2.as_str()), ("C", "C"));
    }

    #[test]
    fn ties_keep_first_pair_in_catalog_order() {
        let combs = vec![fifty_comb("B", 60.0), fifty_comb("A", 60.0)];
        let solution = optimize(&combs, &boxes(), &item(50.0, 50.0, 50.0, 2.0, 100)).unwrap();
        assert_eq!((solution.comb1.as_str(), solution.comb2.as_str()), ("B", "B"));
    }

    #[test]
    fn progress_events_frame_the_search() {
        let combs = vec![fifty_comb("A", 60.0), fifty_comb("B", 40.0)];
        let spec = item(50.0, 50.0, 50.0, 2.0, 10);
        let (result, events) = collect_events(&combs, &boxes(), &spec);
        assert!(result.is_ok());

        assert!(matches!(
            events.first(),
            Some(OptimizeEvent::Started {
                combs: 2,
                eligible: 1,
                cardboards: 1
            })
        ));
        assert!(matches!(
            events.last(),
            Some(OptimizeEvent::Finished {
                evaluated: 1,
                found: true
            })
        ));
        assert_eq!(
            events
                .iter()
                .filter(|evt| matches!(evt, OptimizeEvent::ImprovedBest { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn rejects_invalid_input() {
        let combs = vec![fifty_comb("A", 60.0)];
        let bad_item = ItemSpec {
            w: -1.0,
            d: 50.0,
            h: 50.0,
            m: 2.0,
            q: 1,
        };
        assert!(matches!(
            optimize(&combs, &boxes(), &bad_item),
            Err(OptimizeError::Invalid(ValidationError::InvalidDimension(_)))
        ));
        assert_eq!(
            optimize(&[], &boxes(), &item(50.0, 50.0, 50.0, 2.0, 1)),
            Err(OptimizeError::Invalid(ValidationError::EmptyCatalog("combs")))
        );
        assert_eq!(
            optimize(&combs, &[], &item(50.0, 50.0, 50.0, 2.0, 1)),
            Err(OptimizeError::Invalid(ValidationError::EmptyCatalog("cardboards")))
        );
    }

    #[test]
    fn rejects_unvalidated_catalog_records() {
        let flat = Comb {
            width: 0.0,
            ..fifty_comb("A", 60.0)
        };
        let spec = item(50.0, 50.0, 50.0, 2.0, 10);
        assert!(matches!(
            optimize(&[flat], &boxes(), &spec),
            Err(OptimizeError::Invalid(ValidationError::InvalidDimension(_)))
        ));

        let free_box = Cardboard {
            name: None,
            width: 700.0,
            length: 700.0,
            depth: 220.0,
            price: -1.0,
        };
        assert!(matches!(
            optimize(&[fifty_comb("A", 60.0)], &[free_box], &spec),
            Err(OptimizeError::Invalid(ValidationError::InvalidPrice(_)))
        ));
    }

    #[test]
    fn huge_outer_box_does_not_overflow() {
        let combs = vec![fifty_comb("A", 60.0)];
        let huge = vec![Cardboard::new(None, 1e12, 1e12, 220.0, 5.0).unwrap()];
        let spec = item(50.0, 50.0, 50.0, 2.0, 100);

        assert_eq!(
            optimize(&combs, &huge, &spec),
            Err(OptimizeError::Infeasible(Infeasible::NoViableCombination))
        );

        let mut mixed = huge;
        mixed.extend(boxes());
        let solution = optimize(&combs, &mixed, &spec).unwrap();
        assert_eq!(solution.cardboard_info.index, 1);
    }

    #[test]
    fn custom_thickness_shifts_the_band() {
        // notches 55 apart only fit a 50 item with 5 mm thick material
        let comb = Comb::new("thick", 350.0, 60.0, 5.0, 10.0, vec![50.0; 6]).unwrap();
        let spec = item(50.0, 50.0, 50.0, 0.5, 10);
        let thick = LatticeConfig::builder().thickness(5.0).build();

        assert!(optimize(&[comb.clone()], &boxes(), &spec).is_err());
        let solution = optimize_with_config(&[comb], &boxes(), &spec, &thick).unwrap();
        assert_eq!(solution.item_count, 36);
    }
}
