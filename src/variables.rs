//! Template variables.
//!
//! Variables are discovered by the tool's `detect` subcommand, given values
//! in the front end, and sent back to `compile`/`run` as a JSON object.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::value::{number_value, parse_number, value_text};

/// How a variable's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// One value per run set
    #[default]
    Single,
    /// A list of values, one run per element
    Array,
    /// A range expression expanded by the tool
    Range,
}

impl std::str::FromStr for VariableKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "array" => Ok(Self::Array),
            "range" => Ok(Self::Range),
            other => Err(Error::Config(format!("unknown variable kind '{other}'"))),
        }
    }
}

/// A template variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, rename = "type")]
    pub kind: VariableKind,
}

impl Variable {
    /// A freshly detected variable with no value.
    pub fn detected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            kind: VariableKind::Single,
        }
    }

    /// A variable with a value.
    pub fn new(name: impl Into<String>, kind: VariableKind, value: Value) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            kind,
        }
    }

    /// Build a variable from text typed into a front end.
    ///
    /// Returns a variable without value when the text is empty.
    pub fn from_input(name: impl Into<String>, kind: VariableKind, text: &str) -> Self {
        Self {
            name: name.into(),
            value: parse_variable_input(kind, text),
            kind,
        }
    }
}

/// Interpret front-end text for a variable of the given kind.
///
/// - empty text: no value
/// - `Single`: a number when the text is numeric, else the text
/// - `Array`: the JSON value when the text is valid JSON, else the
///   comma-separated, trimmed items as strings
/// - `Range`: a number when the text is numeric, else the trimmed text,
///   expanded later by the tool
pub fn parse_variable_input(kind: VariableKind, text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }

    let value = match kind {
        VariableKind::Single => parse_number(text)
            .and_then(number_value)
            .unwrap_or_else(|| Value::String(text.to_string())),
        VariableKind::Array => serde_json::from_str::<Value>(text).unwrap_or_else(|_| {
            Value::Array(
                text.split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .collect(),
            )
        }),
        VariableKind::Range => parse_number(text)
            .and_then(number_value)
            .unwrap_or_else(|| Value::String(text.trim().to_string())),
    };

    Some(value)
}

/// Split a `name=value` assignment.
pub fn parse_assignment(assignment: &str) -> Result<(String, String)> {
    match assignment.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::Config(format!(
            "expected NAME=VALUE, got '{assignment}'"
        ))),
    }
}

/// Variable values keyed by name, in insertion order.
///
/// Inserting an existing name replaces its value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableSet(Map<String, Value>);

impl VariableSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Collect the variables that carry a value.
    pub fn from_variables<'a>(variables: impl IntoIterator<Item = &'a Variable>) -> Self {
        let mut set = Self::new();
        for variable in variables {
            if let Some(value) = &variable.value {
                set.insert(variable.name.clone(), value.clone());
            }
        }
        set
    }

    /// Look up a value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Number of variables with values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no variable has a value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON text passed to the tool's `--variables` option.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

/// Parse the stdout of the `detect` subcommand into variable names.
///
/// An array is taken as the list of names; an object contributes its keys;
/// any other JSON value means no variables.
pub fn parse_detection_output(stdout: &str) -> Result<Vec<String>> {
    let parsed: Value = serde_json::from_str(stdout)?;

    let names = match parsed {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => value_text(other),
            })
            .collect(),
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };

    Ok(names)
}

static TEMPLATE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\w+|@\{.*?\}").expect("invalid regex"));

/// Whether document text looks like a template worth auto-detecting.
pub fn has_template_markers(text: &str) -> bool {
    TEMPLATE_MARKER.is_match(text)
}

/// The most recently detected variables.
///
/// Each detection replaces the previous list wholesale.
#[derive(Debug, Clone, Default)]
pub struct DetectedVariables {
    variables: Vec<Variable>,
}

impl DetectedVariables {
    /// Create an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held variables.
    pub fn replace(&mut self, variables: Vec<Variable>) {
        self.variables = variables;
    }

    /// Replace the held variables from detected names.
    pub fn replace_names(&mut self, names: &[String]) {
        self.replace(names.iter().map(Variable::detected).collect());
    }

    /// Current variables.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Whether nothing has been detected.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
