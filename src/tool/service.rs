//! High-level operations over the Funz tool.
//!
//! [`FunzService`] ties together the configuration, the model catalog and a
//! [`ToolExecutor`]. Every front end (CLI, panel controller) goes through it,
//! so input checks happen in one place before any process is started.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::FunzConfig;
use crate::effort::BestEffort;
use crate::error::{Error, Result};
use crate::models::{model_outputs, ModelCatalog, ModelConfig, ModelOutput, ModelSummary};
use crate::results::{self, OutputFormat, ResultDirEntry, ResultRecord};
use crate::variables::{has_template_markers, parse_detection_output, VariableSet};

use super::args::Invocation;
use super::process::{ProcessExecutor, ToolExecutor};

/// Parameters of a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub template_path: PathBuf,
    pub model: String,
    pub variables: VariableSet,
    /// Calculator specifier; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculator: Option<String>,
    /// Results directory; `<root>/results` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
}

impl RunRequest {
    /// Create a run request with default calculator and results directory.
    pub fn new(template_path: impl Into<PathBuf>, model: impl Into<String>, variables: VariableSet) -> Self {
        Self {
            template_path: template_path.into(),
            model: model.into(),
            variables,
            calculator: None,
            results_dir: None,
        }
    }

    /// Set the calculator.
    pub fn with_calculator(mut self, calculator: impl Into<String>) -> Self {
        self.calculator = Some(calculator.into());
        self
    }

    /// Set the results directory.
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }
}

/// Default compile output for a results directory: `<dir>_compiled`.
pub fn compiled_dir_for(results_dir: &Path) -> PathBuf {
    let mut name = results_dir.as_os_str().to_os_string();
    name.push("_compiled");
    PathBuf::from(name)
}

fn require_model(model: &str) -> Result<()> {
    if model.trim().is_empty() {
        return Err(Error::missing_input("no model selected"));
    }
    Ok(())
}

fn require_path(path: &Path, what: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::missing_input(what));
    }
    Ok(())
}

/// Front-end operations over the Funz tool.
pub struct FunzService<E: ToolExecutor = ProcessExecutor> {
    config: Arc<FunzConfig>,
    catalog: ModelCatalog,
    executor: E,
}

impl FunzService<ProcessExecutor> {
    /// Create a service that launches the real tool.
    pub fn new(config: FunzConfig) -> Self {
        let config = Arc::new(config);
        let executor = ProcessExecutor::new(Arc::clone(&config));
        Self::with_shared_config(config, executor)
    }
}

impl<E: ToolExecutor> FunzService<E> {
    /// Create a service with a custom executor.
    pub fn with_executor(config: FunzConfig, executor: E) -> Self {
        Self::with_shared_config(Arc::new(config), executor)
    }

    fn with_shared_config(config: Arc<FunzConfig>, executor: E) -> Self {
        let catalog = ModelCatalog::from_config(&config);
        Self {
            config,
            catalog,
            executor,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &FunzConfig {
        &self.config
    }

    /// Model catalog of the workspace.
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    // =========================================================================
    // Models
    // =========================================================================

    /// Names of the models defined in the workspace.
    pub fn available_models(&self) -> Result<Vec<String>> {
        self.catalog.list()
    }

    /// Definition of a model, if one exists.
    pub fn model_config(&self, model: &str) -> Result<Option<ModelConfig>> {
        require_model(model)?;
        self.catalog.load(model)
    }

    /// Declared outputs of a model.
    pub fn model_outputs(&self, model: &str) -> Result<Vec<ModelOutput>> {
        Ok(model_outputs(self.model_config(model)?.as_ref()))
    }

    /// Summary of a model's settings, if the model exists.
    pub fn model_summary(&self, model: &str) -> Result<Option<ModelSummary>> {
        Ok(self.model_config(model)?.as_ref().map(ModelSummary::from_config))
    }

    // =========================================================================
    // Tool calls
    // =========================================================================

    /// Detect the variables of a template file.
    pub async fn detect_variables(&self, file: &Path, model: &str) -> Result<Vec<String>> {
        require_path(file, "no document to detect variables in")?;
        require_model(model)?;

        let output = self.executor.execute(&Invocation::detect(file, model)).await?;
        let names = parse_detection_output(&output.stdout)?;

        tracing::info!(model, count = names.len(), "variables detected");
        Ok(names)
    }

    /// Detect variables when a document is opened.
    ///
    /// Runs only when auto-detection is enabled and the text carries template
    /// markers, against the first available model. Any failure is logged and
    /// discarded.
    pub async fn auto_detect(&self, file: &Path, text: &str) -> BestEffort<Vec<String>> {
        if !self.config.auto_detect_variables || !has_template_markers(text) {
            return BestEffort::skipped();
        }

        let model = match self.available_models() {
            Ok(models) => match models.into_iter().next() {
                Some(model) => model,
                None => return BestEffort::skipped(),
            },
            Err(e) => return BestEffort::from_result("auto-detect", Err(e)),
        };

        BestEffort::from_result("auto-detect", self.detect_variables(file, &model).await)
    }

    /// Compile a template with concrete values.
    ///
    /// Writes to `output_dir`, or `<results root>_compiled` when absent, and
    /// returns the directory used.
    pub async fn compile_template(
        &self,
        template: &Path,
        model: &str,
        variables: &VariableSet,
        output_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        require_path(template, "no template to compile")?;
        require_model(model)?;

        let output_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => compiled_dir_for(&self.config.results_root()),
        };

        let invocation = Invocation::compile(template, model, variables, &output_dir)?;
        self.executor.execute(&invocation).await?;

        tracing::info!(model, output = %output_dir.display(), "template compiled");
        Ok(output_dir)
    }

    /// Run a simulation, streaming progress output.
    ///
    /// Returns the results directory once the tool exits successfully. The
    /// run cannot be cancelled once started.
    pub async fn run_simulation(
        &self,
        request: &RunRequest,
        on_progress: &mut (dyn for<'p> FnMut(&'p str) + Send),
    ) -> Result<PathBuf> {
        require_path(&request.template_path, "no template to run")?;
        require_model(&request.model)?;
        if request.variables.is_empty() {
            return Err(Error::missing_input("no variable values set"));
        }

        let calculator = request
            .calculator
            .as_deref()
            .unwrap_or(&self.config.default_calculator);
        let results_dir = request
            .results_dir
            .clone()
            .unwrap_or_else(|| self.config.results_root());

        let invocation = Invocation::run(
            &request.template_path,
            &request.model,
            &request.variables,
            calculator,
            &results_dir,
        )?;
        self.executor.stream(&invocation, on_progress).await?;

        Ok(results_dir)
    }

    /// Raw stdout of `parse` for a results directory.
    pub async fn raw_output(
        &self,
        results_dir: &Path,
        model: &str,
        format: OutputFormat,
    ) -> Result<String> {
        require_path(results_dir, "no results directory chosen")?;
        require_model(model)?;

        let output = self
            .executor
            .execute(&Invocation::parse(results_dir, model, format))
            .await?;
        Ok(output.stdout)
    }

    /// Parse a results directory into records.
    ///
    /// `table` output is opaque and yields no records.
    pub async fn parse_output(
        &self,
        results_dir: &Path,
        model: &str,
        format: OutputFormat,
    ) -> Result<Vec<ResultRecord>> {
        let stdout = self.raw_output(results_dir, model, format).await?;
        results::normalize(&stdout, format, results_dir)
    }

    /// Export a results directory as CSV, writing the tool's text verbatim.
    pub async fn export_csv(
        &self,
        results_dir: &Path,
        model: &str,
        destination: &Path,
    ) -> Result<PathBuf> {
        require_path(destination, "no export destination chosen")?;

        let csv = self.raw_output(results_dir, model, OutputFormat::Csv).await?;
        let destination = self.config.resolve(destination);
        std::fs::write(&destination, csv).map_err(|e| Error::io(&destination, e))?;

        tracing::info!(path = %destination.display(), "results exported");
        Ok(destination)
    }

    /// Whether the tool can be launched at all.
    pub async fn check_installation(&self) -> bool {
        self.executor.probe_version().await
    }

    // =========================================================================
    // Results directories
    // =========================================================================

    /// Result directories under the workspace's results root.
    pub fn list_result_dirs(&self) -> Result<Vec<ResultDirEntry>> {
        results::list_result_dirs(&self.config.results_root())
    }
}
