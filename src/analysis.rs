//! Minimal cut sets and quantities for every gate of a fault tree.

use crate::cutsets::CutSets;
use crate::mask::EventMask;
use crate::quantity::{product_descending, rare_event_sum, QuantityKind};
use crate::tree::{Event, FaultTree, GateType, NodeRef};
use tracing::debug;

/// The computed results for a whole fault tree: one [GateResult] per gate,
/// in gate declaration order.
///
/// Obtained through [FaultTree::analysis], which computes it once and
/// memoises. Walking the gates leaves-first guarantees each gate's cut sets
/// are combined from already-minimal input lists, and each list is computed
/// exactly once however often the gate is reused.
#[derive(Clone, Debug)]
pub struct TreeAnalysis {
    results: Vec<GateResult>,
}

/// Minimal cut sets, quantities, contributions, and importances of one gate.
#[derive(Clone, Debug)]
pub struct GateResult {
    cut_sets: CutSets,
    cut_set_quantities: Vec<f64>,
    kind: QuantityKind,
    quantity: f64,
    contributions: Vec<f64>,
    importances: Vec<f64>,
}

impl TreeAnalysis {
    pub(crate) fn compute(tree: &FaultTree) -> Self {
        let gates = tree.gates();
        let mut lists: Vec<Option<CutSets>> = (0..gates.len()).map(|_| None).collect();
        for &g in tree.eval_order() {
            let gate = &gates[g];
            let mut combined = match gate.gate_type() {
                GateType::And => CutSets::certain(),
                GateType::Or => CutSets::new(),
            };
            for input in gate.inputs() {
                let input_sets = match *input {
                    NodeRef::Event(event) => CutSets::of_event(event),
                    // present by evaluation order
                    NodeRef::Gate(child) => lists[child].clone().unwrap(),
                };
                combined = match gate.gate_type() {
                    GateType::And => combined.and_combine(&input_sets),
                    GateType::Or => combined.or_combine(&input_sets),
                };
            }
            combined.sort_canonical();
            debug!(
                gate = gate.id(),
                cut_sets = combined.len(),
                "computed minimal cut sets"
            );
            lists[g] = Some(combined);
        }

        let results = lists
            .into_iter()
            .map(|sets| GateResult::quantify(sets.unwrap(), tree.events()))
            .collect();
        Self { results }
    }

    /// The result for the gate with the given declaration index.
    pub fn gate_result(&self, index: usize) -> &GateResult {
        &self.results[index]
    }

    /// All per-gate results, in gate declaration order.
    pub fn gate_results(&self) -> &[GateResult] {
        &self.results
    }
}

impl GateResult {
    fn quantify(cut_sets: CutSets, events: &[Event]) -> Self {
        let mut cut_set_quantities = Vec::with_capacity(cut_sets.len());
        let mut kind = QuantityKind::Probability;
        for mask in &cut_sets {
            let (value, mask_kind) = cut_set_quantity(mask, events);
            if mask_kind == QuantityKind::Rate {
                kind = QuantityKind::Rate;
            }
            cut_set_quantities.push(value);
        }
        let quantity = rare_event_sum(&cut_set_quantities);

        let importance_defined = quantity.is_finite() && quantity > 0.0;
        let mut contributions = Vec::with_capacity(events.len());
        let mut importances = Vec::with_capacity(events.len());
        for event in events {
            let terms: Vec<f64> = cut_sets
                .iter()
                .zip(&cut_set_quantities)
                .filter(|(mask, _)| mask.contains(event.index()))
                .map(|(_, &value)| value)
                .collect();
            let contribution = rare_event_sum(&terms);
            contributions.push(contribution);
            importances.push(match importance_defined {
                true => contribution / quantity,
                false => f64::NAN,
            });
        }

        Self {
            cut_sets,
            cut_set_quantities,
            kind,
            quantity,
            contributions,
            importances,
        }
    }

    /// The minimal cut sets in canonical order: order ascending, then mask
    /// value ascending.
    pub fn cut_sets(&self) -> &CutSets {
        &self.cut_sets
    }

    /// Per-cut-set quantities, parallel to [cut_sets](Self::cut_sets).
    pub fn cut_set_quantities(&self) -> &[f64] {
        &self.cut_set_quantities
    }

    /// The rare-event upper bound: the sum of all cut set quantities.
    pub fn quantity_value(&self) -> f64 {
        self.quantity
    }

    /// Rate if any cut set has dimension rate, else probability.
    pub fn quantity_kind(&self) -> QuantityKind {
        self.kind
    }

    /// Total quantity of the cut sets containing the given event.
    pub fn contribution(&self, event_index: usize) -> f64 {
        self.contributions[event_index]
    }

    /// Contribution divided by the gate quantity; NaN when the gate
    /// quantity is zero, NaN, or infinite.
    pub fn importance(&self, event_index: usize) -> f64 {
        self.importances[event_index]
    }

    pub fn contributions(&self) -> &[f64] {
        &self.contributions
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }
}

/// The product of the event quantities of one cut set.
///
/// An all-probability cut set is a probability; exactly one rate factor
/// makes it a rate; two or more rate factors have no physical meaning here,
/// so the quantity is NaN with dimension rate.
fn cut_set_quantity(mask: &EventMask, events: &[Event]) -> (f64, QuantityKind) {
    let mut factors = Vec::with_capacity(mask.order());
    let mut rates = 0;
    for index in mask {
        let event = &events[index];
        if event.quantity_kind() == QuantityKind::Rate {
            rates += 1;
        }
        factors.push(event.quantity_value());
    }
    if rates >= 2 {
        return (f64::NAN, QuantityKind::Rate);
    }
    let kind = match rates {
        0 => QuantityKind::Probability,
        _ => QuantityKind::Rate,
    };
    (product_descending(factors), kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Gate;

    fn tree(text: &str) -> FaultTree {
        FaultTree::parse(text).unwrap()
    }

    fn mcs_ids(tree: &FaultTree, gate: &str) -> Vec<Vec<String>> {
        tree.gate_result(gate)
            .unwrap()
            .cut_sets()
            .iter()
            .map(|mask| {
                tree.cut_set_ids(mask)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .collect()
    }

    const TOAST: &str = "\
- time_unit: h

Event: BF
- rate: 0.1

Event: TF
- rate: 0.2

Event: TB
- probability: 0.75

Event: BSD
- probability: 0.9

Gate: TFBSD
- type: AND
- inputs: TF, TB, BSD

Gate: FB
- type: OR
- inputs: BF, TFBSD
";

    #[test]
    fn toast() {
        let tree = tree(TOAST);

        assert_eq!(mcs_ids(&tree, "TFBSD"), [["TF", "TB", "BSD"]]);
        let tfbsd = tree.gate_result("TFBSD").unwrap();
        assert!((tfbsd.quantity_value() - 0.135).abs() < 1e-12);
        assert_eq!(tfbsd.quantity_kind(), QuantityKind::Rate);

        assert_eq!(
            mcs_ids(&tree, "FB"),
            [vec!["BF"], vec!["TF", "TB", "BSD"]]
        );
        let fb = tree.gate_result("FB").unwrap();
        assert!((fb.quantity_value() - 0.235).abs() < 1e-12);
        assert_eq!(fb.quantity_kind(), QuantityKind::Rate);
    }

    #[test]
    fn and_absorbs_or() {
        // A . (A | B) = A
        let tree = tree(
            "Event: A\n- probability: 0.5\n\
             Event: B\n- probability: 0.5\n\
             Gate: G1\n- type: OR\n- inputs: A, B\n\
             Gate: G2\n- type: AND\n- inputs: G1, A\n",
        );
        assert_eq!(mcs_ids(&tree, "G2"), [["A"]]);
        let g2 = tree.gate_result("G2").unwrap();
        assert_eq!(g2.quantity_value(), 0.5);
        // a single-cut-set gate pins the importance of its event to one
        assert_eq!(g2.importance(0), 1.0);
    }

    #[test]
    fn rare_event_sum_not_inclusion_exclusion() {
        let tree = tree(
            "Event: A\n- probability: 0.1\n\
             Event: B\n- probability: 0.2\n\
             Gate: G\n- type: OR\n- inputs: A, B\n",
        );
        let g = tree.gate_result("G").unwrap();
        assert_eq!(g.quantity_value(), 0.1 + 0.2);
        assert_eq!(g.quantity_kind(), QuantityKind::Probability);
    }

    #[test]
    fn zero_absorbs_nan() {
        let tree = tree(
            "Event: A\n- probability: nan\n\
             Event: B\n- probability: 0\n\
             Gate: G\n- type: AND\n- inputs: A, B\n",
        );
        assert_eq!(tree.gate_result("G").unwrap().quantity_value(), 0.0);
    }

    #[test]
    fn infinite_rate_dominates() {
        let tree = tree(
            "Event: A\n- rate: inf\n\
             Event: B\n- probability: 0.5\n\
             Event: X\n- rate: 1\n\
             Gate: G\n- type: AND\n- inputs: A, B\n\
             Gate: H\n- type: OR\n- inputs: G, X\n",
        );
        let g = tree.gate_result("G").unwrap();
        assert_eq!(g.quantity_value(), f64::INFINITY);
        assert_eq!(g.quantity_kind(), QuantityKind::Rate);
        assert_eq!(
            tree.gate_result("H").unwrap().quantity_value(),
            f64::INFINITY
        );
        // an infinite gate quantity leaves importances undefined
        assert!(g.importance(0).is_nan());
    }

    #[test]
    fn contribution_and_importance() {
        let tree = tree(
            "Event: A\n- probability: 0.1\n\
             Event: B\n- probability: 0.2\n\
             Gate: G\n- type: OR\n- inputs: A, B\n",
        );
        let g = tree.gate_result("G").unwrap();
        assert_eq!(g.contribution(0), 0.1);
        assert_eq!(g.contribution(1), 0.2);
        assert_eq!(g.importance(0), 0.1 / (0.1 + 0.2));
        assert_eq!(g.importance(1), 0.2 / (0.1 + 0.2));
    }

    #[test]
    fn contribution_sum_identity() {
        // sum of contributions equals sum of order-weighted cut set
        // quantities; importances then sum to at least one
        let tree = tree(TOAST);
        let fb = tree.gate_result("FB").unwrap();
        let weighted: f64 = fb
            .cut_sets()
            .iter()
            .zip(fb.cut_set_quantities())
            .map(|(mask, value)| mask.order() as f64 * value)
            .sum();
        let total: f64 = fb.contributions().iter().sum();
        assert!((total - weighted).abs() < 1e-12);

        let importance_sum: f64 = fb.importances().iter().sum();
        assert!(importance_sum >= 1.0);
    }

    #[test]
    fn unused_event_contributes_zero() {
        let tree = tree(
            "Event: A\n- probability: 0.1\n\
             Event: B\n- probability: 0.2\n\
             Gate: G\n- type: OR\n- inputs: A\n",
        );
        let g = tree.gate_result("G").unwrap();
        assert_eq!(g.contribution(1), 0.0);
    }

    #[test]
    fn double_rate_cut_set_is_nan() {
        let tree = tree(
            "Event: A\n- rate: 1\n\
             Event: B\n- rate: 2\n\
             Gate: G\n- type: AND\n- inputs: A, B\n",
        );
        let g = tree.gate_result("G").unwrap();
        assert!(g.quantity_value().is_nan());
        assert_eq!(g.quantity_kind(), QuantityKind::Rate);
    }

    #[test]
    fn gate_level_dimension_mixing() {
        let tree = tree(
            "Event: P\n- probability: 0.5\n\
             Event: R\n- rate: 2\n\
             Gate: G\n- type: OR\n- inputs: P, R\n",
        );
        let g = tree.gate_result("G").unwrap();
        assert_eq!(g.quantity_kind(), QuantityKind::Rate);
        assert_eq!(g.quantity_value(), 2.5);
    }

    #[test]
    fn zero_quantity_importance_is_nan() {
        let tree = tree(
            "Event: A\n- probability: 0\n\
             Gate: G\n- type: OR\n- inputs: A\n",
        );
        assert!(tree.gate_result("G").unwrap().importance(0).is_nan());
    }

    #[test]
    fn idempotence() {
        let tree = tree(
            "Event: A\n- probability: 0.1\n\
             Event: B\n- probability: 0.2\n\
             Gate: Mid\n- type: OR\n- inputs: A, B\n\
             Gate: OrTwice\n- type: OR\n- inputs: Mid, Mid\n\
             Gate: AndTwice\n- type: AND\n- inputs: Mid, Mid\n",
        );
        assert_eq!(mcs_ids(&tree, "OrTwice"), mcs_ids(&tree, "Mid"));
        assert_eq!(mcs_ids(&tree, "AndTwice"), mcs_ids(&tree, "Mid"));
    }

    #[test]
    fn deterministic_under_gate_reordering() {
        let forward = tree(TOAST);
        let reordered = tree(
            "\
- time_unit: h

Event: BF
- rate: 0.1

Event: TF
- rate: 0.2

Event: TB
- probability: 0.75

Event: BSD
- probability: 0.9

Gate: FB
- type: OR
- inputs: BF, TFBSD

Gate: TFBSD
- type: AND
- inputs: TF, TB, BSD
",
        );
        for gate in ["TFBSD", "FB"] {
            assert_eq!(mcs_ids(&forward, gate), mcs_ids(&reordered, gate));
            let a = forward.gate_result(gate).unwrap();
            let b = reordered.gate_result(gate).unwrap();
            assert_eq!(
                a.quantity_value().to_bits(),
                b.quantity_value().to_bits()
            );
            for index in 0..forward.events().len() {
                assert_eq!(
                    a.contribution(index).to_bits(),
                    b.contribution(index).to_bits()
                );
            }
        }
    }

    #[test]
    fn soundness_over_all_assignments() {
        // the cut sets cover an assignment exactly when the gate formula is
        // true under it
        let tree = tree(
            "Event: A\n- probability: 0.5\n\
             Event: B\n- probability: 0.5\n\
             Event: C\n- probability: 0.5\n\
             Gate: AB\n- type: AND\n- inputs: A, B\n\
             Gate: G\n- type: OR\n- inputs: AB, C\n",
        );

        fn eval(tree: &FaultTree, gate: &Gate, active: &EventMask) -> bool {
            let truth = |input: &NodeRef| match *input {
                NodeRef::Event(event) => active.contains(event),
                NodeRef::Gate(child) => eval(tree, &tree.gates()[child], active),
            };
            match gate.gate_type() {
                GateType::And => gate.inputs().iter().all(truth),
                GateType::Or => gate.inputs().iter().any(truth),
            }
        }

        for gate in tree.gates() {
            let result = tree.analysis().gate_result(gate.index());
            for bits in 0u32..8 {
                let active: EventMask =
                    (0..3).filter(|&i| bits & (1 << i) != 0).collect();
                let covered = result
                    .cut_sets()
                    .iter()
                    .any(|mask| mask.is_subset_of(&active));
                assert_eq!(covered, eval(&tree, gate, &active));
            }
        }
    }

    #[test]
    fn minimality() {
        let tree = tree(TOAST);
        for gate in tree.gates() {
            let sets = tree.analysis().gate_result(gate.index()).cut_sets();
            for i in 0..sets.len() {
                for j in 0..sets.len() {
                    if i != j {
                        assert!(!sets[i].is_subset_of(&sets[j]));
                    }
                }
            }
        }
    }
}
