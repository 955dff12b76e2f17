//! The validated fault tree: events, gates, and their wiring.

use crate::analysis::{GateResult, TreeAnalysis};
use crate::error::FaultTreeError;
use crate::mask::EventMask;
use crate::parse;
use crate::quantity::QuantityKind;
use bit_set::BitSet;
use once_cell::unsync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// The Boolean operation of a gate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GateType {
    /// All inputs must occur
    And,
    /// At least one input must occur
    Or,
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GateType::And => write!(f, "AND"),
            GateType::Or => write!(f, "OR"),
        }
    }
}

/// A resolved gate input: either a leaf event or another gate, by table
/// index.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeRef {
    Event(usize),
    Gate(usize),
}

/// A basic event: a leaf of the fault tree carrying a probability or a
/// failure rate.
#[derive(Clone, Debug)]
pub struct Event {
    id: String,
    index: usize,
    label: Option<String>,
    comment: Option<String>,
    kind: QuantityKind,
    value: f64,
}

impl Event {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The bit index: the event's ordinal position in declaration order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The display label, falling back to the id when none was declared.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn quantity_kind(&self) -> QuantityKind {
        self.kind
    }

    pub fn quantity_value(&self) -> f64 {
        self.value
    }
}

/// A gate: an internal node combining events and other gates.
#[derive(Clone, Debug)]
pub struct Gate {
    id: String,
    index: usize,
    label: Option<String>,
    comment: Option<String>,
    gate_type: GateType,
    is_paged: bool,
    input_ids: Vec<String>,
    inputs: Vec<NodeRef>,
}

impl Gate {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The gate's ordinal position in declaration order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The display label, falling back to the id when none was declared.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn gate_type(&self) -> GateType {
        self.gate_type
    }

    /// Renderer hint: draw this gate on its own page. Semantically inert.
    pub fn is_paged(&self) -> bool {
        self.is_paged
    }

    /// Input identifiers in declared order.
    pub fn input_ids(&self) -> &[String] {
        &self.input_ids
    }

    /// Resolved inputs in declared order.
    pub fn inputs(&self) -> &[NodeRef] {
        &self.inputs
    }
}

/// A validated coherent fault tree.
///
/// Built once from text and immutable thereafter; all computed results
/// (minimal cut sets, quantities, contributions) are memoised on the first
/// call to [analysis](Self::analysis). Construction and every query are pure
/// functions of the input text.
///
/// ```
/// use sfta::FaultTree;
///
/// let tree = FaultTree::parse(
///     "Event: A\n\
///      - probability: 0.1\n\
///      Event: B\n\
///      - probability: 0.2\n\
///      Gate: G\n\
///      - type: OR\n\
///      - inputs: A, B\n",
/// )?;
///
/// let result = tree.gate_result("G").unwrap();
/// assert_eq!(result.cut_sets().len(), 2);
/// assert_eq!(result.quantity_value(), 0.1 + 0.2);
/// # Ok::<(), sfta::FaultTreeError>(())
/// ```
#[derive(Debug)]
pub struct FaultTree {
    time_unit: Option<String>,
    events: Vec<Event>,
    gates: Vec<Gate>,
    event_index: HashMap<String, usize>,
    gate_index: HashMap<String, usize>,
    used_events: EventMask,
    top_gates: Vec<usize>,
    eval_order: Vec<usize>,
    analysis: OnceCell<TreeAnalysis>,
}

impl FaultTree {
    /// Parse and validate fault tree text.
    pub fn parse(text: &str) -> Result<Self, FaultTreeError> {
        Self::build(parse::parse(text)?)
    }

    fn build(parsed: parse::Parsed) -> Result<Self, FaultTreeError> {
        let events: Vec<Event> = parsed
            .events
            .into_iter()
            .enumerate()
            .map(|(index, decl)| Event {
                id: decl.id,
                index,
                label: decl.label,
                comment: decl.comment,
                kind: decl.kind,
                value: decl.value,
            })
            .collect();

        let event_index: HashMap<String, usize> = events
            .iter()
            .map(|event| (event.id.clone(), event.index))
            .collect();
        let gate_index: HashMap<String, usize> = parsed
            .gates
            .iter()
            .enumerate()
            .map(|(index, decl)| (decl.id.clone(), index))
            .collect();

        // Resolve every gate input to an event or gate table index
        let mut gates = Vec::with_capacity(parsed.gates.len());
        let mut inputs_lines = Vec::with_capacity(parsed.gates.len());
        let mut used_events = EventMask::new();
        let mut used_gates = BitSet::new();
        for (index, decl) in parsed.gates.into_iter().enumerate() {
            let mut inputs = Vec::with_capacity(decl.inputs.len());
            for input_id in &decl.inputs {
                if let Some(&event) = event_index.get(input_id) {
                    used_events.insert(event);
                    inputs.push(NodeRef::Event(event));
                } else if let Some(&gate) = gate_index.get(input_id) {
                    used_gates.insert(gate);
                    inputs.push(NodeRef::Gate(gate));
                } else {
                    return Err(FaultTreeError::UnknownInput {
                        line: decl.inputs_line,
                        id: input_id.clone(),
                        gate: decl.id,
                    });
                }
            }
            gates.push(Gate {
                id: decl.id,
                index,
                label: decl.label,
                comment: decl.comment,
                gate_type: decl.gate_type,
                is_paged: decl.is_paged,
                input_ids: decl.inputs,
                inputs,
            });
            inputs_lines.push(decl.inputs_line);
        }

        if let Some(cycle) = find_cycle(&gates) {
            let mut names: Vec<&str> = cycle.iter().map(|&g| gates[g].id()).collect();
            names.push(gates[cycle[0]].id());
            return Err(FaultTreeError::CircularInputs {
                line: inputs_lines[cycle[0]],
                cycle: format!("`{}`", names.join("` -> `")),
            });
        }

        let top_gates: Vec<usize> = (0..gates.len())
            .filter(|&g| !used_gates.contains(g))
            .collect();
        let eval_order = evaluation_order(&gates);

        debug!(
            events = events.len(),
            gates = gates.len(),
            top_gates = top_gates.len(),
            "built fault tree"
        );
        Ok(Self {
            time_unit: parsed.time_unit,
            events,
            gates,
            event_index,
            gate_index,
            used_events,
            top_gates,
            eval_order,
            analysis: OnceCell::new(),
        })
    }

    /// The declared time unit, if any.
    pub fn time_unit(&self) -> Option<&str> {
        self.time_unit.as_deref()
    }

    /// Events in declaration order (the order defining bit indices).
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Gates in declaration order.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn event_by_id(&self, id: &str) -> Option<&Event> {
        self.event_index.get(id).map(|&index| &self.events[index])
    }

    pub fn gate_by_id(&self, id: &str) -> Option<&Gate> {
        self.gate_index.get(id).map(|&index| &self.gates[index])
    }

    /// Gates that are not an input of any other gate, in declaration order.
    pub fn top_gates(&self) -> impl Iterator<Item = &Gate> + '_ {
        self.top_gates.iter().map(move |&index| &self.gates[index])
    }

    pub fn is_top_gate(&self, gate: &Gate) -> bool {
        self.top_gates.binary_search(&gate.index).is_ok()
    }

    /// The mask of events referenced by at least one gate.
    pub fn used_events(&self) -> &EventMask {
        &self.used_events
    }

    /// Gate indices in evaluation order, leaves first.
    pub(crate) fn eval_order(&self) -> &[usize] {
        &self.eval_order
    }

    /// The computed analysis: minimal cut sets, quantities, contributions.
    ///
    /// Computed on first call and memoised; deterministic for a given input
    /// text regardless of gate declaration order.
    pub fn analysis(&self) -> &TreeAnalysis {
        self.analysis.get_or_init(|| TreeAnalysis::compute(self))
    }

    /// The analysis result for the gate with the given id.
    pub fn gate_result(&self, id: &str) -> Option<&GateResult> {
        let index = *self.gate_index.get(id)?;
        Some(self.analysis().gate_result(index))
    }

    /// Spell a cut set as event ids, ordered by bit index.
    pub fn cut_set_ids(&self, mask: &EventMask) -> Vec<&str> {
        mask.iter().map(|index| self.events[index].id()).collect()
    }
}

impl FromStr for FaultTree {
    type Err = FaultTreeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

/// Find a cycle among the gate-to-gate edges via three-state depth-first
/// search: a clean node is infected, an infected node reaching an infected
/// child has found a cycle, an exhausted node is dead. Gates are visited in
/// declaration order and children in declared input order, so the reported
/// cycle is deterministic.
fn find_cycle(gates: &[Gate]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, Eq, PartialEq)]
    enum Mark {
        Clean,
        Infected,
        Dead,
    }

    fn infect(
        gate: usize,
        gates: &[Gate],
        marks: &mut [Mark],
        chain: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        marks[gate] = Mark::Infected;
        chain.push(gate);
        for input in gates[gate].inputs() {
            if let NodeRef::Gate(child) = *input {
                match marks[child] {
                    Mark::Infected => {
                        let start = chain.iter().position(|&g| g == child).unwrap();
                        return Some(chain[start..].to_vec());
                    }
                    Mark::Clean => {
                        if let Some(cycle) = infect(child, gates, marks, chain) {
                            return Some(cycle);
                        }
                    }
                    Mark::Dead => (),
                }
            }
        }
        marks[gate] = Mark::Dead;
        chain.pop();
        None
    }

    let mut marks = vec![Mark::Clean; gates.len()];
    let mut chain = Vec::new();
    for gate in 0..gates.len() {
        if marks[gate] == Mark::Clean {
            if let Some(cycle) = infect(gate, gates, &mut marks, &mut chain) {
                return Some(cycle);
            }
        }
    }
    None
}

/// Topological order of the gates, inputs before the gates that use them.
/// Only called on an acyclic tree.
fn evaluation_order(gates: &[Gate]) -> Vec<usize> {
    fn visit(gate: usize, gates: &[Gate], seen: &mut [bool], order: &mut Vec<usize>) {
        if seen[gate] {
            return;
        }
        seen[gate] = true;
        for input in gates[gate].inputs() {
            if let NodeRef::Gate(child) = *input {
                visit(child, gates, seen, order);
            }
        }
        order.push(gate);
    }

    let mut seen = vec![false; gates.len()];
    let mut order = Vec::with_capacity(gates.len());
    for gate in 0..gates.len() {
        visit(gate, gates, &mut seen, &mut order);
    }
    order
}
