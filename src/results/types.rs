//! Result record types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// One flat row of tool output: column name to value, in column order.
pub type Row = Map<String, Value>;

/// Normalized result of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Columns that look like input parameters
    pub parameters: Row,
    /// Every column of the row
    pub outputs: Row,
    /// Synthesized location of the run: `<dir>/run_<i>` or `<dir>/<key>`
    pub path: PathBuf,
}

impl ResultRecord {
    /// Look up a column, preferring the parameter value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.parameters
            .get(column)
            .or_else(|| self.outputs.get(column))
    }
}

/// Output encodings understood by the `parse` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Array-of-rows or object-of-rows JSON
    #[default]
    Json,
    /// Header line plus comma-delimited rows
    Csv,
    /// Human-oriented table, passed through unparsed
    Table,
}

impl OutputFormat {
    /// Value passed to the tool's `--format` option.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "table" => Ok(Self::Table),
            other => Err(Error::Config(format!(
                "unknown output format '{other}' (expected json, csv or table)"
            ))),
        }
    }
}

/// A results directory found under the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDirEntry {
    pub name: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}
