//! Messages exchanged between a rendering host and the panel controller.
//!
//! Both directions are JSON objects tagged by `"type"` with camelCase field
//! names, e.g.
//!
//! ```json
//! {"type": "detectVariables", "filePath": "input.txt", "model": "perfectgas"}
//! {"type": "variablesDetected", "variables": [{"name": "T_celsius", "type": "single"}]}
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::{ModelConfig, ModelOutput, ModelSummary};
use crate::results::{ResultDirEntry, ResultRecord, TableStats};
use crate::variables::Variable;

// =============================================================================
// Requests
// =============================================================================

/// A user action forwarded by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PanelRequest {
    /// Refresh the model list
    GetModels,
    /// Show a model's configuration and outputs
    SelectModel { model: String },
    /// Show a model's declared outputs
    GetOutputs { model: String },
    /// Detect the variables of a template
    DetectVariables { file_path: PathBuf, model: String },
    /// Compile a template with the entered values
    Compile {
        template_path: PathBuf,
        model: String,
        variables: Vec<Variable>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_dir: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        results_dir: Option<PathBuf>,
    },
    /// Run simulations with the entered values
    RunSimulation {
        template_path: PathBuf,
        model: String,
        variables: Vec<Variable>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        calculator: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        results_dir: Option<PathBuf>,
    },
    /// Parse a results directory for the results viewer
    LoadResults { results_path: PathBuf, model: String },
    /// Save a results directory as CSV
    ExportCsv {
        results_path: PathBuf,
        model: String,
        destination: PathBuf,
    },
    /// List result directories in the workspace
    ListResults,
    /// A document was opened in the editor
    DocumentOpened { file_path: PathBuf, text: String },
}

impl PanelRequest {
    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get the request type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::GetModels => "getModels",
            Self::SelectModel { .. } => "selectModel",
            Self::GetOutputs { .. } => "getOutputs",
            Self::DetectVariables { .. } => "detectVariables",
            Self::Compile { .. } => "compile",
            Self::RunSimulation { .. } => "runSimulation",
            Self::LoadResults { .. } => "loadResults",
            Self::ExportCsv { .. } => "exportCsv",
            Self::ListResults => "listResults",
            Self::DocumentOpened { .. } => "documentOpened",
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Severity of a notice shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// An update for the host to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PanelEvent {
    ModelsList {
        models: Vec<String>,
    },
    ModelConfig {
        model: String,
        config: Option<ModelConfig>,
        summary: Option<ModelSummary>,
    },
    OutputsList {
        model: String,
        outputs: Vec<ModelOutput>,
    },
    VariablesDetected {
        variables: Vec<Variable>,
    },
    /// Raw stdout chunk of a running simulation
    Progress {
        run_id: String,
        chunk: String,
    },
    CompileFinished {
        output_dir: PathBuf,
    },
    SimulationFinished {
        run_id: String,
        results_dir: PathBuf,
    },
    ResultsData {
        results_path: PathBuf,
        results: Vec<ResultRecord>,
        stats: TableStats,
    },
    Exported {
        path: PathBuf,
    },
    ResultsList {
        entries: Vec<ResultDirEntry>,
    },
    Notice {
        level: NoticeLevel,
        message: String,
    },
}

impl PanelEvent {
    /// Create an info notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// Create a warning notice.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    /// Create an error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
