//! Front-end configuration.
//!
//! A [`FunzConfig`] is built once at startup (from defaults, the environment
//! and command-line overrides) and then shared by reference with every
//! component that needs the interpreter path or the workspace layout.

use std::path::{Path, PathBuf};

/// Default ceiling for buffered tool output (10 MiB).
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 10 * 1024 * 1024;

/// Default calculator used by simulation runs.
pub const DEFAULT_CALCULATOR: &str = "sh://bash";

/// Configuration for the Funz front end.
#[derive(Debug, Clone)]
pub struct FunzConfig {
    /// Interpreter used to launch the tool (default: "python")
    pub python_path: String,
    /// Workspace root; models and results live underneath it
    pub workspace_root: PathBuf,
    /// Python package providing the subcommand modules (default: "fz")
    pub tool_namespace: String,
    /// Maximum captured stdout/stderr for buffered calls, in bytes
    pub max_buffer_bytes: usize,
    /// Detect variables automatically when a template document is opened
    pub auto_detect_variables: bool,
    /// Calculator used when a run does not name one
    pub default_calculator: String,
}

impl Default for FunzConfig {
    fn default() -> Self {
        Self {
            python_path: "python".to_string(),
            workspace_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            tool_namespace: "fz".to_string(),
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            auto_detect_variables: false,
            default_calculator: DEFAULT_CALCULATOR.to_string(),
        }
    }
}

impl FunzConfig {
    /// Create a config rooted at a workspace directory.
    pub fn with_workspace(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            python_path: std::env::var("FUNZ_PYTHON_PATH").unwrap_or(defaults.python_path),
            workspace_root: std::env::var("FUNZ_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_root),
            tool_namespace: std::env::var("FUNZ_NAMESPACE").unwrap_or(defaults.tool_namespace),
            max_buffer_bytes: std::env::var("FUNZ_MAX_BUFFER_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_buffer_bytes),
            auto_detect_variables: std::env::var("FUNZ_AUTO_DETECT")
                .map(|s| s != "0" && s.to_lowercase() != "false")
                .unwrap_or(defaults.auto_detect_variables),
            default_calculator: defaults.default_calculator,
        }
    }

    /// Set the interpreter path.
    pub fn with_python_path(mut self, python_path: impl Into<String>) -> Self {
        self.python_path = python_path.into();
        self
    }

    /// Set the workspace root.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Set the tool namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.tool_namespace = namespace.into();
        self
    }

    /// Set the buffered output ceiling.
    pub fn with_max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = bytes;
        self
    }

    /// Enable or disable automatic variable detection.
    pub fn with_auto_detect(mut self, enabled: bool) -> Self {
        self.auto_detect_variables = enabled;
        self
    }

    /// Directory holding model definitions: `<root>/.fz/models`.
    pub fn models_dir(&self) -> PathBuf {
        self.workspace_root.join(".fz").join("models")
    }

    /// Default location of result directories: `<root>/results`.
    pub fn results_root(&self) -> PathBuf {
        self.workspace_root.join("results")
    }

    /// Resolve a path relative to the workspace root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    /// Resolve the interpreter to launch.
    ///
    /// `~` is expanded and bare program names are looked up on `PATH`. When
    /// lookup fails the configured value is returned unchanged so the spawn
    /// error reports what the user configured.
    pub fn resolve_python(&self) -> String {
        let expanded = shellexpand::tilde(&self.python_path).to_string();

        if expanded.contains(std::path::MAIN_SEPARATOR) || expanded.contains('/') {
            return expanded;
        }

        match which::which(&expanded) {
            Ok(path) => path.to_string_lossy().to_string(),
            Err(_) => expanded,
        }
    }
}
