//! Tabular summaries of a fault tree and its analysis.

use crate::tree::FaultTree;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Significant figures used by the summary tables.
pub const MAX_SIGNIFICANT_FIGURES: usize = 4;

/// Magnitudes below `10^-(this-1)` are forced into scientific notation.
const COERCE_SCIENTIFIC_EXPONENT: i32 = 3;

/// A rectangular table of strings with named fields.
#[derive(Clone, Debug)]
pub struct Table {
    pub field_names: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Write the table as tab-separated values with one header line.
    pub fn write_tsv(&self, path: &Path) -> io::Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        writeln!(file, "{}", self.field_names.join("\t"))?;
        for row in &self.rows {
            writeln!(file, "{}", row.join("\t"))?;
        }
        file.flush()
    }
}

/// One row per event, sorted by id.
pub fn events_table(tree: &FaultTree) -> Table {
    let mut rows: Vec<Vec<String>> = tree
        .events()
        .iter()
        .map(|event| {
            vec![
                event.id().to_string(),
                bool_str(tree.used_events().contains(event.index())).to_string(),
                event.quantity_kind().to_string(),
                dull(event.quantity_value(), MAX_SIGNIFICANT_FIGURES),
                event.quantity_kind().unit_str(tree.time_unit()),
                event.label().to_string(),
            ]
        })
        .collect();
    rows.sort_by(|a, b| a[0].cmp(&b[0]));
    Table {
        field_names: vec![
            "id",
            "is_used",
            "quantity_type",
            "quantity_value",
            "quantity_unit",
            "label",
        ],
        rows,
    }
}

/// One row per gate, top gates first, then by id.
pub fn gates_table(tree: &FaultTree) -> Table {
    let mut keyed: Vec<(bool, Vec<String>)> = tree
        .gates()
        .iter()
        .map(|gate| {
            let result = tree.analysis().gate_result(gate.index());
            let is_top = tree.is_top_gate(gate);
            let row = vec![
                gate.id().to_string(),
                bool_str(is_top).to_string(),
                bool_str(gate.is_paged()).to_string(),
                result.quantity_kind().to_string(),
                dull(result.quantity_value(), MAX_SIGNIFICANT_FIGURES),
                result.quantity_kind().unit_str(tree.time_unit()),
                gate.gate_type().to_string(),
                gate.input_ids().join(","),
                gate.label().to_string(),
            ];
            (is_top, row)
        })
        .collect();
    keyed.sort_by(|(top_a, row_a), (top_b, row_b)| {
        top_b.cmp(top_a).then_with(|| row_a[0].cmp(&row_b[0]))
    });
    Table {
        field_names: vec![
            "id",
            "is_top_gate",
            "is_paged",
            "quantity_type",
            "quantity_value",
            "quantity_unit",
            "type",
            "inputs",
            "label",
        ],
        rows: keyed.into_iter().map(|(_, row)| row).collect(),
    }
}

/// Per gate, one row per minimal cut set, sorted by quantity descending,
/// then cut set order, then the cut set itself. Tables come back in gate
/// declaration order.
pub fn cut_set_tables(tree: &FaultTree) -> Vec<(String, Table)> {
    tree.gates()
        .iter()
        .map(|gate| {
            let result = tree.analysis().gate_result(gate.index());
            let kind = result.quantity_kind();
            let mut keyed: Vec<(f64, usize, Vec<String>)> = result
                .cut_sets()
                .iter()
                .zip(result.cut_set_quantities())
                .map(|(mask, &value)| {
                    let cut_set = tree.cut_set_ids(mask).join(".");
                    let row = vec![
                        kind.to_string(),
                        dull(value, MAX_SIGNIFICANT_FIGURES),
                        kind.unit_str(tree.time_unit()),
                        cut_set,
                        mask.order().to_string(),
                    ];
                    (value, mask.order(), row)
                })
                .collect();
            keyed.sort_by(|(value_a, order_a, row_a), (value_b, order_b, row_b)| {
                value_b
                    .total_cmp(value_a)
                    .then_with(|| order_a.cmp(order_b))
                    .then_with(|| row_a[3].cmp(&row_b[3]))
            });
            let table = Table {
                field_names: vec![
                    "quantity_type",
                    "quantity_value",
                    "quantity_unit",
                    "cut_set",
                    "cut_set_order",
                ],
                rows: keyed.into_iter().map(|(_, _, row)| row).collect(),
            };
            (gate.id().to_string(), table)
        })
        .collect()
}

/// Per gate, one row per event, sorted by contribution descending, then
/// event id. Tables come back in gate declaration order.
pub fn contribution_tables(tree: &FaultTree) -> Vec<(String, Table)> {
    tree.gates()
        .iter()
        .map(|gate| {
            let result = tree.analysis().gate_result(gate.index());
            let kind = result.quantity_kind();
            let mut keyed: Vec<(f64, Vec<String>)> = tree
                .events()
                .iter()
                .map(|event| {
                    let contribution = result.contribution(event.index());
                    let row = vec![
                        event.id().to_string(),
                        kind.to_string(),
                        dull(contribution, MAX_SIGNIFICANT_FIGURES),
                        kind.unit_str(tree.time_unit()),
                        dull(result.importance(event.index()), MAX_SIGNIFICANT_FIGURES),
                    ];
                    (contribution, row)
                })
                .collect();
            keyed.sort_by(|(value_a, row_a), (value_b, row_b)| {
                value_b
                    .total_cmp(value_a)
                    .then_with(|| row_a[0].cmp(&row_b[0]))
            });
            let table = Table {
                field_names: vec![
                    "event",
                    "contribution_type",
                    "contribution_value",
                    "contribution_unit",
                    "importance",
                ],
                rows: keyed.into_iter().map(|(_, row)| row).collect(),
            };
            (gate.id().to_string(), table)
        })
        .collect()
}

fn bool_str(value: bool) -> &'static str {
    match value {
        true => "True",
        false => "False",
    }
}

/// Blunt a number to at most the given decimal places, as a string.
pub fn blunt(number: f64, max_decimal_places: usize) -> String {
    if number.is_nan() {
        return "nan".to_owned();
    }
    if number == 0.0 {
        return "0".to_owned();
    }
    if number.is_infinite() {
        return signed_infinity(number);
    }
    trim_fraction(format!("{:.*}", max_decimal_places, number))
}

/// Dull a number to at most the given significant figures, as a string.
///
/// Small magnitudes are coerced into scientific notation, and a value that
/// rounds to an integer is written as one.
pub fn dull(number: f64, max_significant_figures: usize) -> String {
    if number.is_nan() {
        return "nan".to_owned();
    }
    if number == 0.0 {
        return "0".to_owned();
    }
    if number.is_infinite() {
        return signed_infinity(number);
    }

    let digits = max_significant_figures.max(1);
    let magnitude = number.abs().log10();
    let string = if magnitude < -((COERCE_SCIENTIFIC_EXPONENT - 1) as f64)
        || magnitude >= digits as f64
    {
        trim_mantissa(format!("{:.*E}", digits - 1, number))
    } else {
        let exponent = magnitude.floor() as i32;
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(format!("{:.*}", decimals, number))
    };

    // coerce a round result to its integer spelling
    if let Ok(value) = string.parse::<f64>() {
        if value == value.round() && value.abs() < 1e15 {
            return format!("{}", value.round() as i64);
        }
    }
    string
}

fn signed_infinity(number: f64) -> String {
    match number > 0.0 {
        true => "inf".to_owned(),
        false => "-inf".to_owned(),
    }
}

fn trim_fraction(string: String) -> String {
    match string.contains('.') {
        true => string
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_owned(),
        false => string,
    }
}

fn trim_mantissa(string: String) -> String {
    match string.split_once('E') {
        Some((mantissa, exponent)) => {
            let mantissa = match mantissa.contains('.') {
                true => mantissa.trim_end_matches('0').trim_end_matches('.'),
                false => mantissa,
            };
            format!("{}E{}", mantissa, exponent)
        }
        None => string,
    }
}
