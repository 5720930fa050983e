//! Normalization of raw `parse` output into [`ResultRecord`]s.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::Result;
use crate::value::coerce_optional_cell;

use super::types::{OutputFormat, ResultRecord, Row};

/// Whether a column name is treated as an input parameter.
///
/// Names containing `.` or starting with `_` are outputs only.
pub fn is_parameter_key(key: &str) -> bool {
    !key.contains('.') && !key.starts_with('_')
}

/// Split a row into `(parameters, outputs)`.
///
/// `outputs` receives every column; `parameters` receives the columns that
/// pass [`is_parameter_key`]. A plain column therefore appears in both.
pub fn classify_row(row: &Row) -> (Row, Row) {
    let parameters = row
        .iter()
        .filter(|(key, _)| is_parameter_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    (parameters, row.clone())
}

fn record_from_row(row: &Row, path: PathBuf) -> ResultRecord {
    let (parameters, outputs) = classify_row(row);
    ResultRecord {
        parameters,
        outputs,
        path,
    }
}

/// View a JSON row as columns. Arrays are indexed by position; scalars and
/// null have no columns.
fn row_of(value: &Value) -> Row {
    match value {
        Value::Object(map) => map.clone(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        _ => Row::new(),
    }
}

fn run_path(results_dir: &Path, index: usize) -> PathBuf {
    results_dir.join(format!("run_{index}"))
}

fn keyed_path(results_dir: &Path, key: &str) -> PathBuf {
    // A leading separator would make `join` discard the results directory.
    results_dir.join(key.trim_start_matches(['/', '\\']))
}

/// Strip surrounding whitespace, counting a byte order mark as whitespace.
fn trim_text(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Normalize an already-parsed JSON document.
///
/// An array yields one record per element with paths `run_0..run_{n-1}`; an
/// object yields one record per entry with the entry key as path suffix; any
/// other value yields nothing.
///
/// Object entries keep the document's key order. Integer-like keys such as
/// `"10"` and `"2"` are not moved ahead of the others or sorted numerically.
pub fn normalize_json_value(data: &Value, results_dir: &Path) -> Vec<ResultRecord> {
    match data {
        Value::Array(rows) => rows
            .iter()
            .enumerate()
            .map(|(i, row)| record_from_row(&row_of(row), run_path(results_dir, i)))
            .collect(),
        Value::Object(rows) => rows
            .iter()
            .map(|(key, row)| record_from_row(&row_of(row), keyed_path(results_dir, key)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse and normalize JSON text. Malformed JSON is an error.
pub fn normalize_json(text: &str, results_dir: &Path) -> Result<Vec<ResultRecord>> {
    let data: Value = serde_json::from_str(text)?;
    Ok(normalize_json_value(&data, results_dir))
}

/// Normalize CSV text.
///
/// The first line is the header. Fewer than two lines (a bare header
/// included) yields nothing. Fields are split on `,` without quoting support
/// and trimmed; missing trailing fields become null. Never fails.
pub fn normalize_csv(text: &str, results_dir: &Path) -> Vec<ResultRecord> {
    let lines: Vec<&str> = trim_text(text).split('\n').collect();
    if lines.len() < 2 {
        return Vec::new();
    }

    let headers: Vec<&str> = lines[0].split(',').map(trim_text).collect();

    lines[1..]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let fields: Vec<&str> = line.split(',').map(trim_text).collect();
            let mut row = Row::new();
            for (index, header) in headers.iter().enumerate() {
                row.insert(
                    (*header).to_string(),
                    coerce_optional_cell(fields.get(index).copied()),
                );
            }
            record_from_row(&row, run_path(results_dir, i))
        })
        .collect()
}

/// Normalize `parse` output in the given format.
///
/// The table format is not machine readable and yields no records.
pub fn normalize(stdout: &str, format: OutputFormat, results_dir: &Path) -> Result<Vec<ResultRecord>> {
    let records = match format {
        OutputFormat::Json => normalize_json(stdout, results_dir)?,
        OutputFormat::Csv => normalize_csv(stdout, results_dir),
        OutputFormat::Table => Vec::new(),
    };
    tracing::debug!(
        format = %format,
        records = records.len(),
        dir = %results_dir.display(),
        "normalized results"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_is_parameter_key() {
        assert!(is_parameter_key("x"));
        assert!(is_parameter_key("T_celsius"));
        assert!(!is_parameter_key("y.err"));
        assert!(!is_parameter_key("_internal"));
        assert!(is_parameter_key("mid_underscore"));
    }

    #[test]
    fn test_json_array_scenario() {
        let records = normalize_json(
            r#"[{"x":1,"y.err":0.02},{"x":2,"y.err":0.05}]"#,
            Path::new("/r"),
        )
        .unwrap();

        let expected = vec![
            ResultRecord {
                parameters: row(json!({"x": 1})),
                outputs: row(json!({"x": 1, "y.err": 0.02})),
                path: PathBuf::from("/r/run_0"),
            },
            ResultRecord {
                parameters: row(json!({"x": 2})),
                outputs: row(json!({"x": 2, "y.err": 0.05})),
                path: PathBuf::from("/r/run_1"),
            },
        ];
        assert_eq!(records, expected);
    }

    #[test]
    fn test_json_object_uses_keys_as_paths() {
        let records = normalize_json(
            r#"{"case_b": {"T": 300, "_id": 7}, "case_a": {"T": 400}}"#,
            Path::new("/results/gas"),
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, PathBuf::from("/results/gas/case_b"));
        assert_eq!(records[1].path, PathBuf::from("/results/gas/case_a"));
        assert_eq!(records[0].parameters, row(json!({"T": 300})));
        assert_eq!(records[0].outputs, row(json!({"T": 300, "_id": 7})));
    }

    #[test]
    fn test_json_object_key_with_leading_separator_stays_inside_dir() {
        let records = normalize_json(r#"{"/abs": {}}"#, Path::new("/r")).unwrap();
        assert_eq!(records[0].path, PathBuf::from("/r/abs"));
    }

    #[test]
    fn test_json_scalar_roots_yield_nothing() {
        for text in ["42", "null", "\"text\"", "true"] {
            assert!(normalize_json(text, Path::new("/r")).unwrap().is_empty());
        }
    }

    #[test]
    fn test_json_malformed_is_error() {
        assert!(normalize_json("[{\"x\": 1}", Path::new("/r")).is_err());
    }

    #[test]
    fn test_json_non_object_rows_have_no_columns() {
        let records = normalize_json("[null, 3]", Path::new("/r")).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].outputs.is_empty());
        assert!(records[1].parameters.is_empty());
        assert_eq!(records[1].path, PathBuf::from("/r/run_1"));
    }

    #[test]
    fn test_csv_scenario() {
        let records = normalize_csv("x,status\n1,true\n2,\n", Path::new("/r"));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].parameters, row(json!({"x": 1, "status": true})));
        assert_eq!(records[1].parameters, row(json!({"x": 2, "status": null})));
        assert_eq!(records[1].path, PathBuf::from("/r/run_1"));
    }

    #[test]
    fn test_csv_header_only_and_empty() {
        assert!(normalize_csv("x,y\n", Path::new("/r")).is_empty());
        assert!(normalize_csv("x,y", Path::new("/r")).is_empty());
        assert!(normalize_csv("", Path::new("/r")).is_empty());
        assert!(normalize_csv("  \n ", Path::new("/r")).is_empty());
    }

    #[test]
    fn test_csv_short_rows_fill_with_null() {
        let records = normalize_csv("a, b.out , _c\n 5 \n", Path::new("/r"));
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].outputs,
            row(json!({"a": 5, "b.out": null, "_c": null}))
        );
        assert_eq!(records[0].parameters, row(json!({"a": 5})));
    }

    #[test]
    fn test_csv_extra_fields_are_ignored() {
        let records = normalize_csv("a\n1,2,3\n", Path::new("/r"));
        assert_eq!(records[0].outputs, row(json!({"a": 1})));
    }

    #[test]
    fn test_csv_handles_crlf() {
        let records = normalize_csv("x,label\r\n1,abc\r\n", Path::new("/r"));
        assert_eq!(records[0].outputs, row(json!({"x": 1, "label": "abc"})));
    }

    #[test]
    fn test_csv_strips_byte_order_mark() {
        let records = normalize_csv("\u{feff}x,y\n1,2\n", Path::new("/r"));
        let keys: Vec<&str> = records[0].outputs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(records[0].parameters, row(json!({"x": 1, "y": 2})));
    }

    #[test]
    fn test_json_object_rows_keep_document_order() {
        let records = normalize_json(
            r#"{"10": {"x": 1}, "2": {"x": 2}, "a": {"x": 3}}"#,
            Path::new("/r"),
        )
        .unwrap();
        let paths: Vec<PathBuf> = records.into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/r/10"),
                PathBuf::from("/r/2"),
                PathBuf::from("/r/a"),
            ]
        );
    }

    #[test]
    fn test_normalize_dispatch() {
        let dir = Path::new("/r");
        assert_eq!(normalize("[{}]", OutputFormat::Json, dir).unwrap().len(), 1);
        assert_eq!(normalize("a\n1", OutputFormat::Csv, dir).unwrap().len(), 1);
        assert!(normalize("| a |\n| 1 |", OutputFormat::Table, dir)
            .unwrap()
            .is_empty());
    }
}
