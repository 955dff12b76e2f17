//! Line-oriented parsing of fault tree text into draft declarations.

use crate::error::FaultTreeError;
use crate::quantity::QuantityKind;
use crate::tree::GateType;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

static RE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<class>Event|Gate):\s+(?P<id>.+?)\s*$").unwrap());
static RE_PROPERTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-\s+(?P<key>\S+?):\s+(?P<value>.+?)\s*$").unwrap());

/// A property value together with the line that set it.
#[derive(Clone, Debug)]
pub(crate) struct Prop<T> {
    pub value: T,
    pub line: usize,
}

impl<T> Prop<T> {
    fn new(value: T, line: usize) -> Self {
        Self { value, line }
    }
}

/// An `Event: <id>` declaration while its properties accumulate.
#[derive(Debug)]
struct EventDraft {
    id: String,
    line: usize,
    label: Option<Prop<String>>,
    comment: Option<Prop<String>>,
    quantity: Option<Prop<(QuantityKind, f64)>>,
}

/// A `Gate: <id>` declaration while its properties accumulate.
#[derive(Debug)]
struct GateDraft {
    id: String,
    line: usize,
    label: Option<Prop<String>>,
    comment: Option<Prop<String>>,
    gate_type: Option<Prop<GateType>>,
    inputs: Option<Prop<Vec<String>>>,
    is_paged: Option<Prop<bool>>,
}

/// A finalised event declaration: required properties are present.
#[derive(Debug)]
pub(crate) struct EventDecl {
    pub id: String,
    pub label: Option<String>,
    pub comment: Option<String>,
    pub kind: QuantityKind,
    pub value: f64,
}

/// A finalised gate declaration: required properties are present.
#[derive(Debug)]
pub(crate) struct GateDecl {
    pub id: String,
    pub label: Option<String>,
    pub comment: Option<String>,
    pub gate_type: GateType,
    pub inputs: Vec<String>,
    /// Line of the `inputs` property, for input resolution diagnostics
    pub inputs_line: usize,
    pub is_paged: bool,
}

/// The outcome of a parse: declarations in document order.
#[derive(Debug, Default)]
pub(crate) struct Parsed {
    pub time_unit: Option<String>,
    pub events: Vec<EventDecl>,
    pub gates: Vec<GateDecl>,
}

enum Current {
    Tree,
    Event(EventDraft),
    Gate(GateDraft),
}

/// Parse fault tree text into draft declarations, fail-fast.
///
/// Lines are classified as object headers, property settings, comments
/// (first non-blank character `#`), or blanks; anything else is a bad line.
/// An object stays open until the next header or the end of input; property
/// lines before the first header set fault-tree globals (only `time_unit`).
pub(crate) fn parse(text: &str) -> Result<Parsed, FaultTreeError> {
    let mut parsed = Parsed::default();
    let mut ids: HashSet<String> = HashSet::new();
    let mut time_unit: Option<Prop<String>> = None;
    let mut current = Current::Tree;

    for (offset, raw) in text.lines().enumerate() {
        let line = offset + 1;

        if let Some(caps) = RE_HEADER.captures(raw) {
            close(&mut parsed, std::mem::replace(&mut current, Current::Tree))?;

            let class = &caps["class"];
            let id = caps["id"].to_string();
            check_id(&id, line, &format!("in declaration of {}", class))?;
            if !ids.insert(id.clone()) {
                return Err(FaultTreeError::DuplicateId { line, id });
            }

            current = match class {
                "Event" => Current::Event(EventDraft {
                    id,
                    line,
                    label: None,
                    comment: None,
                    quantity: None,
                }),
                _ => Current::Gate(GateDraft {
                    id,
                    line,
                    label: None,
                    comment: None,
                    gate_type: None,
                    inputs: None,
                    is_paged: None,
                }),
            };
            continue;
        }

        if let Some(caps) = RE_PROPERTY.captures(raw) {
            apply_property(&mut time_unit, &mut current, &caps["key"], &caps["value"], line)?;
            continue;
        }

        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        return Err(FaultTreeError::BadLine {
            line,
            content: raw.to_string(),
        });
    }
    close(&mut parsed, current)?;
    parsed.time_unit = time_unit.map(|prop| prop.value);

    debug!(
        events = parsed.events.len(),
        gates = parsed.gates.len(),
        "parsed fault tree text"
    );
    Ok(parsed)
}

/// Finalise the open object: required properties must be present by the time
/// the next header (or the end of input) is reached. Missing-property errors
/// point at the object's declaration line.
fn close(parsed: &mut Parsed, current: Current) -> Result<(), FaultTreeError> {
    match current {
        Current::Tree => Ok(()),
        Current::Event(draft) => {
            let (kind, value) = match draft.quantity {
                Some(prop) => prop.value,
                None => {
                    return Err(FaultTreeError::QuantityNotSet {
                        line: draft.line,
                        id: draft.id,
                    })
                }
            };
            parsed.events.push(EventDecl {
                id: draft.id,
                label: draft.label.map(|prop| prop.value),
                comment: draft.comment.map(|prop| prop.value),
                kind,
                value,
            });
            Ok(())
        }
        Current::Gate(draft) => {
            let gate_type = match draft.gate_type {
                Some(prop) => prop.value,
                None => {
                    return Err(FaultTreeError::TypeNotSet {
                        line: draft.line,
                        id: draft.id,
                    })
                }
            };
            let inputs = match draft.inputs {
                Some(prop) => prop,
                None => {
                    return Err(FaultTreeError::InputsNotSet {
                        line: draft.line,
                        id: draft.id,
                    })
                }
            };
            parsed.gates.push(GateDecl {
                id: draft.id,
                label: draft.label.map(|prop| prop.value),
                comment: draft.comment.map(|prop| prop.value),
                gate_type,
                inputs: inputs.value,
                inputs_line: inputs.line,
                is_paged: draft.is_paged.map(|prop| prop.value).unwrap_or(false),
            });
            Ok(())
        }
    }
}

fn apply_property(
    time_unit: &mut Option<Prop<String>>,
    current: &mut Current,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), FaultTreeError> {
    match current {
        Current::Tree => match key {
            "time_unit" => {
                if let Some(first) = time_unit {
                    return Err(FaultTreeError::TimeUnitAlreadySet {
                        line,
                        first_line: first.line,
                    });
                }
                *time_unit = Some(Prop::new(value.to_string(), line));
                Ok(())
            }
            _ => Err(unrecognised(key, "the fault tree", line)),
        },
        Current::Event(draft) => match key {
            "label" => set_text(&mut draft.label, &draft.id, key, value, line),
            "comment" => set_text(&mut draft.comment, &draft.id, key, value, line),
            "probability" => set_quantity(draft, QuantityKind::Probability, value, line),
            "rate" => set_quantity(draft, QuantityKind::Rate, value, line),
            _ => Err(unrecognised(key, &format!("Event `{}`", draft.id), line)),
        },
        Current::Gate(draft) => match key {
            "label" => set_text(&mut draft.label, &draft.id, key, value, line),
            "comment" => set_text(&mut draft.comment, &draft.id, key, value, line),
            "type" => set_gate_type(draft, value, line),
            "inputs" => set_inputs(draft, value, line),
            "is_paged" => set_is_paged(draft, value, line),
            _ => Err(unrecognised(key, &format!("Gate `{}`", draft.id), line)),
        },
    }
}

fn unrecognised(key: &str, scope: &str, line: usize) -> FaultTreeError {
    FaultTreeError::UnrecognisedKey {
        line,
        key: key.to_string(),
        scope: scope.to_string(),
    }
}

fn set_text(
    slot: &mut Option<Prop<String>>,
    id: &str,
    key: &str,
    value: &str,
    line: usize,
) -> Result<(), FaultTreeError> {
    if let Some(first) = slot {
        return Err(FaultTreeError::PropertyAlreadySet {
            line,
            key: key.to_string(),
            id: id.to_string(),
            first_line: first.line,
        });
    }
    *slot = Some(Prop::new(value.to_string(), line));
    Ok(())
}

fn set_quantity(
    draft: &mut EventDraft,
    kind: QuantityKind,
    value: &str,
    line: usize,
) -> Result<(), FaultTreeError> {
    if let Some(first) = &draft.quantity {
        return Err(FaultTreeError::QuantityAlreadySet {
            line,
            id: draft.id.clone(),
            first_line: first.line,
        });
    }

    let number: f64 = value.parse().map_err(|_| FaultTreeError::BadFloat {
        line,
        value: value.to_string(),
        id: draft.id.clone(),
    })?;
    match kind {
        QuantityKind::Probability => {
            // NaN is tolerated as "unknown"
            if !number.is_nan() && !(0.0..=1.0).contains(&number) {
                return Err(FaultTreeError::BadProbability {
                    line,
                    value: value.to_string(),
                    id: draft.id.clone(),
                });
            }
        }
        QuantityKind::Rate => {
            // NaN and +inf are tolerated as "unknown" and "certain"
            if !number.is_nan() && number < 0.0 {
                return Err(FaultTreeError::BadRate {
                    line,
                    value: value.to_string(),
                    id: draft.id.clone(),
                });
            }
        }
    }

    draft.quantity = Some(Prop::new((kind, number), line));
    Ok(())
}

fn set_gate_type(draft: &mut GateDraft, value: &str, line: usize) -> Result<(), FaultTreeError> {
    if let Some(first) = &draft.gate_type {
        return Err(FaultTreeError::PropertyAlreadySet {
            line,
            key: "type".to_string(),
            id: draft.id.clone(),
            first_line: first.line,
        });
    }
    let gate_type = match value {
        "AND" => GateType::And,
        "OR" => GateType::Or,
        _ => {
            return Err(FaultTreeError::BadGateType {
                line,
                value: value.to_string(),
                id: draft.id.clone(),
            })
        }
    };
    draft.gate_type = Some(Prop::new(gate_type, line));
    Ok(())
}

fn set_inputs(draft: &mut GateDraft, value: &str, line: usize) -> Result<(), FaultTreeError> {
    if let Some(first) = &draft.inputs {
        return Err(FaultTreeError::PropertyAlreadySet {
            line,
            key: "inputs".to_string(),
            id: draft.id.clone(),
            first_line: first.line,
        });
    }
    let ids: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return Err(FaultTreeError::ZeroInputs {
            line,
            value: value.to_string(),
            id: draft.id.clone(),
        });
    }
    for id in &ids {
        check_id(id, line, &format!("among inputs for Gate `{}`", draft.id))?;
    }
    draft.inputs = Some(Prop::new(ids, line));
    Ok(())
}

fn set_is_paged(draft: &mut GateDraft, value: &str, line: usize) -> Result<(), FaultTreeError> {
    if let Some(first) = &draft.is_paged {
        return Err(FaultTreeError::PropertyAlreadySet {
            line,
            key: "is_paged".to_string(),
            id: draft.id.clone(),
            first_line: first.line,
        });
    }
    let is_paged = match value {
        "True" => true,
        "False" => false,
        _ => {
            return Err(FaultTreeError::BadIsPaged {
                line,
                value: value.to_string(),
                id: draft.id.clone(),
            })
        }
    };
    draft.is_paged = Some(Prop::new(is_paged, line));
    Ok(())
}

/// Identifiers are non-empty runs of printable characters with no comma and
/// no whitespace.
fn check_id(id: &str, line: usize, context: &str) -> Result<(), FaultTreeError> {
    let bad = id.is_empty()
        || id
            .chars()
            .any(|c| c.is_whitespace() || c == ',' || c.is_control());
    if bad {
        return Err(FaultTreeError::BadId {
            line,
            id: id.to_string(),
            context: context.to_string(),
        });
    }
    Ok(())
}
