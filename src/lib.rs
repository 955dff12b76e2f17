//! Analyse coherent fault trees: exact minimal cut sets and quantities.
//!
//! A fault tree is a directed acyclic graph of basic [events](Event) and
//! Boolean [gates](Gate) (AND/OR only). For every gate this crate computes
//! the gate's [minimal cut sets](GateResult::cut_sets) — the irredundant
//! disjunctive normal form of its formula — together with each cut set's
//! quantity, the gate's rare-event upper bound, and each event's
//! contribution and importance. The analysis is "slow" by design: cut sets
//! come from exact Boolean-algebra simplification over bit-indexed sets,
//! not from heuristics.
//!
//! # Fault tree text
//!
//! A tree is declared in a line-oriented text format: `Event:`/`Gate:`
//! headers open objects, `- key: value` lines set their properties, and `#`
//! starts a comment. Every event carries exactly one of a `probability` in
//! [0, 1] or a `rate` in [0, ∞] (NaN is tolerated in both as "unknown").
//!
//! ```
//! use sfta::{FaultTree, QuantityKind};
//!
//! let tree = FaultTree::parse(
//!     "- time_unit: h\n\
//!      \n\
//!      ## burnt toast\n\
//!      Event: BF\n\
//!      - rate: 0.1\n\
//!      \n\
//!      Event: TF\n\
//!      - rate: 0.2\n\
//!      \n\
//!      Event: TB\n\
//!      - probability: 0.75\n\
//!      \n\
//!      Gate: TFTB\n\
//!      - type: AND\n\
//!      - inputs: TF, TB\n\
//!      \n\
//!      Gate: FB\n\
//!      - type: OR\n\
//!      - inputs: BF, TFTB\n",
//! )?;
//!
//! let result = tree.gate_result("FB").unwrap();
//! assert_eq!(result.cut_sets().len(), 2);
//! assert_eq!(result.quantity_kind(), QuantityKind::Rate);
//! assert_eq!(result.quantity_value(), 0.1 + 0.2 * 0.75);
//! # Ok::<(), sfta::FaultTreeError>(())
//! ```
//!
//! # Minimal cut sets
//!
//! Each event gets a bit index equal to its position in declaration order,
//! and a cut set is an [EventMask] over those indices. Gate formulae are
//! folded leaves-first: AND combines cut set lists by pairwise union, OR by
//! pooling, and both drop any cut set with a strict subset elsewhere in the
//! list (the absorption law). Listings are sorted by cut set order and then
//! by mask value, so results are deterministic for a given input — gates
//! may be declared in any order.
//!
//! # Quantities
//!
//! A cut set's quantity is the product of its event quantities; a gate's is
//! the sum over its cut sets (the rare-event approximation — deliberately
//! an upper bound, with no inclusion-exclusion correction). Products and
//! sums follow explicit IEEE-754 rules: a zero factor forces a zero
//! product, an infinite rate dominates any sum, and NaN propagates
//! otherwise. A cut set multiplying two rates together is meaningless and
//! yields NaN.
//!
//! The whole analysis is memoised on the [FaultTree] at the first request;
//! the tree itself is single-threaded by contract and holds no OS
//! resources.

mod analysis;
mod cutsets;
mod error;
mod mask;
mod parse;
mod quantity;
pub mod report;
mod tree;

pub use analysis::{GateResult, TreeAnalysis};
pub use cutsets::CutSets;
pub use error::{ErrorKind, FaultTreeError};
pub use mask::EventMask;
pub use quantity::QuantityKind;
pub use tree::{Event, FaultTree, Gate, GateType, NodeRef};
