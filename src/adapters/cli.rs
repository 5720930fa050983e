//! Terminal rendering for the `funz` command.
//!
//! Rendering is kept apart from the binary so the output can be tested
//! without spawning anything.

use chrono::Local;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::models::{ModelOutput, ModelSummary};
use crate::results::{ResultDirEntry, ResultTable, TableStats};

#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    name: String,
    #[tabled(rename = "Var prefix")]
    varprefix: String,
    #[tabled(rename = "Formula prefix")]
    formulaprefix: String,
    #[tabled(rename = "Interpreter")]
    interpreter: String,
    #[tabled(rename = "Outputs")]
    outputs: String,
}

#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Output")]
    name: String,
    #[tabled(rename = "Command")]
    command: String,
}

#[derive(Tabled)]
struct ResultDirRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Path")]
    path: String,
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

/// Table of models with their summaries.
///
/// Models whose definition is missing or unreadable render with dashes.
pub fn render_models(models: &[(String, Option<ModelSummary>)]) -> String {
    let rows = models.iter().map(|(name, summary)| {
        let summary = summary.clone().unwrap_or_default();
        ModelRow {
            name: name.clone(),
            varprefix: or_dash(&summary.varprefix),
            formulaprefix: or_dash(&summary.formulaprefix),
            interpreter: or_dash(&summary.interpreter),
            outputs: summary
                .output_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Table of a model's declared outputs.
pub fn render_outputs(outputs: &[ModelOutput]) -> String {
    let rows = outputs.iter().map(|o| OutputRow {
        name: o.name.clone(),
        command: o.command.clone(),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Table of result directories.
pub fn render_result_dirs(entries: &[ResultDirEntry]) -> String {
    let rows = entries.iter().map(|e| ResultDirRow {
        name: e.name.clone(),
        modified: e
            .modified
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string()),
        path: e.path.display().to_string(),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Visible rows of a result table, with `#`, parameter and output columns.
pub fn render_results(table: &ResultTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.header());
    for row in table.cells() {
        builder.push_record(row);
    }
    builder.build().with(Style::rounded()).to_string()
}

/// One-line summary of a result set.
pub fn render_stats(stats: &TableStats) -> String {
    format!(
        "{} runs, {} parameters, {} outputs",
        stats.runs, stats.parameters, stats.outputs
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::normalize_json;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_render_models_with_missing_summary() {
        let out = render_models(&[
            (
                "perfectgas".to_string(),
                Some(ModelSummary {
                    varprefix: Some("$".to_string()),
                    formulaprefix: Some("@".to_string()),
                    interpreter: Some("python".to_string()),
                    output_count: Some(2),
                }),
            ),
            ("broken".to_string(), None),
        ]);
        assert!(out.contains("Model"));
        assert!(out.contains("perfectgas"));
        assert!(out.contains("python"));
        assert!(out.contains("broken"));
    }

    #[test]
    fn test_render_outputs() {
        let out = render_outputs(&[ModelOutput {
            name: "pressure".to_string(),
            command: "grep 'pressure = ' output.txt | cut -d= -f2".to_string(),
        }]);
        assert!(out.contains("pressure"));
        assert!(out.contains("cut -d= -f2"));
    }

    #[test]
    fn test_render_results_includes_all_columns() {
        let records = normalize_json(
            r#"[{"x": 1, "y.err": 0.02}, {"x": 2, "y.err": null}]"#,
            Path::new("/r"),
        )
        .unwrap();
        let table = ResultTable::new(records);
        let out = render_results(&table);
        assert!(out.contains("y.err"));
        assert!(out.contains("0.02"));
        assert!(out.contains('-'));
        assert_eq!(render_stats(&table.stats()), "2 runs, 1 parameters, 2 outputs");
    }

    #[test]
    fn test_render_result_dirs() {
        let out = render_result_dirs(&[ResultDirEntry {
            name: "run1".to_string(),
            path: PathBuf::from("/w/results/run1"),
            modified: None,
        }]);
        assert!(out.contains("run1"));
        assert!(out.contains("/w/results/run1"));
    }
}
