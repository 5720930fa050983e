//! Model definitions stored under `<workspace>/.fz/models`.
//!
//! A model is looked up by name, probing `<name>.json`, `<name>.yaml` and
//! `<name>.yml` in that order. JSON definitions are parsed; YAML definitions
//! are handed back as raw text, so field lookups on them find nothing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FunzConfig;
use crate::error::{Error, Result};
use crate::value::value_text;

/// Extensions probed when resolving a model, in priority order.
pub const MODEL_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Contents of a model definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelConfig {
    /// Unparsed YAML text.
    RawText(String),
    /// A parsed JSON definition.
    Structured(Value),
}

impl ModelConfig {
    /// Look up a top-level field. Raw text has no fields.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Structured(value) => value.get(name),
            Self::RawText(_) => None,
        }
    }

    /// The parsed definition, if this config is structured.
    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::RawText(_) => None,
        }
    }
}

/// A named post-processing command declared in a model's `output` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub name: String,
    pub command: String,
}

/// Extract the declared outputs of a model.
///
/// Absent configs, configs without an `output` object and raw YAML text all
/// yield an empty list.
pub fn model_outputs(config: Option<&ModelConfig>) -> Vec<ModelOutput> {
    let Some(Value::Object(outputs)) = config.and_then(|c| c.field("output")) else {
        return Vec::new();
    };

    outputs
        .iter()
        .map(|(name, command)| ModelOutput {
            name: name.clone(),
            command: match command {
                Value::String(s) => s.clone(),
                other => value_text(other),
            },
        })
        .collect()
}

/// Headline properties of a model, for list/detail views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub varprefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formulaprefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_count: Option<usize>,
}

impl ModelSummary {
    /// Summarize a model config. Empty strings and missing fields are skipped.
    pub fn from_config(config: &ModelConfig) -> Self {
        let text_field = |name: &str| {
            config
                .field(name)
                .filter(|v| is_truthy(v))
                .map(value_text)
        };

        Self {
            varprefix: text_field("varprefix"),
            formulaprefix: text_field("formulaprefix"),
            interpreter: text_field("interpreter"),
            output_count: match config.field("output") {
                Some(Value::Object(map)) => Some(map.len()),
                _ => None,
            },
        }
    }

    /// Whether the summary carries no property at all.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Model definitions in one directory.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    dir: PathBuf,
}

impl ModelCatalog {
    /// Create a catalog over a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Catalog of the workspace's `.fz/models` directory.
    pub fn from_config(config: &FunzConfig) -> Self {
        Self::new(config.models_dir())
    }

    /// Directory being probed.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of all model files, sorted and without duplicates.
    ///
    /// A missing directory yields an empty list.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let mut names = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.dir, e))?;
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let has_model_ext = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| MODEL_EXTENSIONS.contains(&ext));
            if !has_model_ext {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Path of the first existing definition file for `name`.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        MODEL_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{name}.{ext}")))
            .find(|path| path.exists())
    }

    /// Load a model definition.
    ///
    /// Returns `Ok(None)` when no definition exists. Malformed JSON is an
    /// error.
    pub fn load(&self, name: &str) -> Result<Option<ModelConfig>> {
        let Some(path) = self.locate(name) else {
            tracing::debug!(model = name, dir = %self.dir.display(), "model definition not found");
            return Ok(None);
        };

        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");

        if is_json {
            Ok(Some(ModelConfig::Structured(serde_json::from_str(&content)?)))
        } else {
            Ok(Some(ModelConfig::RawText(content)))
        }
    }

    /// Declared outputs of a model.
    pub fn outputs(&self, name: &str) -> Result<Vec<ModelOutput>> {
        let config = self.load(name)?;
        Ok(model_outputs(config.as_ref()))
    }
}
