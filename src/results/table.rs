//! Sortable, filterable table view over result records.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::{display_value, value_text};

use super::types::ResultRecord;

// =============================================================================
// Stats
// =============================================================================

/// Headline counts for a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    /// Number of runs
    pub runs: usize,
    /// Distinct parameter column names
    pub parameters: usize,
    /// Distinct output column names
    pub outputs: usize,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

// =============================================================================
// Table
// =============================================================================

/// Table of result records with a filtered, ordered view.
///
/// Columns are the parameter names followed by the output names, each in
/// first-seen order across the visible rows. A name present in both maps is
/// shown twice.
#[derive(Debug, Clone)]
pub struct ResultTable {
    records: Vec<ResultRecord>,
    visible: Vec<usize>,
}

impl ResultTable {
    /// Build a table showing every record in input order.
    pub fn new(records: Vec<ResultRecord>) -> Self {
        let visible = (0..records.len()).collect();
        Self { records, visible }
    }

    /// All records, regardless of filtering.
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Visible records in display order.
    pub fn rows(&self) -> impl Iterator<Item = &ResultRecord> {
        self.visible.iter().map(|&i| &self.records[i])
    }

    /// Number of visible records.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    /// Whether no record is visible.
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Counts over the whole result set.
    pub fn stats(&self) -> TableStats {
        let (parameters, outputs) = collect_columns(self.records.iter());
        TableStats {
            runs: self.records.len(),
            parameters: parameters.len(),
            outputs: outputs.len(),
        }
    }

    /// Parameter and output column names of the visible rows.
    pub fn columns(&self) -> (Vec<String>, Vec<String>) {
        collect_columns(self.rows())
    }

    /// Header row: `#`, parameter columns, output columns.
    pub fn header(&self) -> Vec<String> {
        let (parameters, outputs) = self.columns();
        std::iter::once("#".to_string())
            .chain(parameters)
            .chain(outputs)
            .collect()
    }

    /// Display cells of the visible rows, aligned with [`header`](Self::header).
    pub fn cells(&self) -> Vec<Vec<String>> {
        let (parameters, outputs) = self.columns();
        self.rows()
            .enumerate()
            .map(|(i, record)| {
                let mut cells = Vec::with_capacity(1 + parameters.len() + outputs.len());
                cells.push((i + 1).to_string());
                cells.extend(
                    parameters
                        .iter()
                        .map(|col| display_value(record.parameters.get(col).unwrap_or(&Value::Null))),
                );
                cells.extend(
                    outputs
                        .iter()
                        .map(|col| display_value(record.outputs.get(col).unwrap_or(&Value::Null))),
                );
                cells
            })
            .collect()
    }

    /// Keep only records where some value contains `text`, ignoring case.
    ///
    /// An empty filter shows every record. Filtering resets any ordering.
    pub fn filter(&mut self, text: &str) {
        let needle = text.to_lowercase();
        self.visible = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| needle.is_empty() || record_matches(record, &needle))
            .map(|(i, _)| i)
            .collect();
    }

    /// Order visible records by a column.
    ///
    /// Numbers compare numerically and sort before other values; nulls and
    /// missing cells always sort last; everything else compares by text. The
    /// sort is stable.
    pub fn sort_by(&mut self, column: &str, order: SortOrder) {
        let records = &self.records;
        self.visible.sort_by(|&a, &b| {
            let left = records[a].get(column).unwrap_or(&Value::Null);
            let right = records[b].get(column).unwrap_or(&Value::Null);
            compare_cells(left, right, order)
        });
    }
}

fn collect_columns<'a>(records: impl Iterator<Item = &'a ResultRecord>) -> (Vec<String>, Vec<String>) {
    let mut parameters: Vec<String> = Vec::new();
    let mut outputs: Vec<String> = Vec::new();
    for record in records {
        for key in record.parameters.keys() {
            if !parameters.contains(key) {
                parameters.push(key.clone());
            }
        }
        for key in record.outputs.keys() {
            if !outputs.contains(key) {
                outputs.push(key.clone());
            }
        }
    }
    (parameters, outputs)
}

fn record_matches(record: &ResultRecord, needle: &str) -> bool {
    record
        .parameters
        .values()
        .chain(record.outputs.values())
        .any(|v| value_text(v).to_lowercase().contains(needle))
}

fn compare_cells(left: &Value, right: &Value, order: SortOrder) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let ordering = match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => value_text(left).cmp(&value_text(right)),
    };

    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}
