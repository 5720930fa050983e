//! Request handling for panel front ends.
//!
//! A [`PanelController`] turns [`PanelRequest`]s into service calls and
//! reports every outcome as [`PanelEvent`]s on a channel. Explicit actions
//! always produce either a result event or a notice; the `documentOpened`
//! background path produces nothing when it fails.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::results::{OutputFormat, ResultTable};
use crate::tool::service::compiled_dir_for;
use crate::tool::{FunzService, ProcessExecutor, RunRequest, ToolExecutor};
use crate::variables::{parse_variable_input, DetectedVariables, Variable, VariableSet};

use super::messages::{PanelEvent, PanelRequest};

/// Interpret values typed into a panel.
///
/// String values are parsed according to the variable's kind; structured
/// values are taken as they are.
pub fn panel_variable_set(variables: &[Variable]) -> VariableSet {
    let mut set = VariableSet::new();
    for variable in variables {
        let value = match &variable.value {
            Some(serde_json::Value::String(text)) => parse_variable_input(variable.kind, text),
            other => other.clone(),
        };
        if let Some(value) = value {
            set.insert(variable.name.clone(), value);
        }
    }
    set
}

/// Dispatches panel requests and emits events.
pub struct PanelController<E: ToolExecutor = ProcessExecutor> {
    service: Arc<FunzService<E>>,
    detected: DetectedVariables,
    events: mpsc::UnboundedSender<PanelEvent>,
}

impl<E: ToolExecutor> PanelController<E> {
    /// Create a controller sending events to `events`.
    pub fn new(service: Arc<FunzService<E>>, events: mpsc::UnboundedSender<PanelEvent>) -> Self {
        Self {
            service,
            detected: DetectedVariables::new(),
            events,
        }
    }

    /// Variables from the most recent detection.
    pub fn detected(&self) -> &DetectedVariables {
        &self.detected
    }

    /// Handle one request.
    ///
    /// Operation failures become notices; the only error returned is a
    /// closed event channel.
    pub async fn handle(&mut self, request: PanelRequest) -> Result<()> {
        tracing::debug!(request = request.type_name(), "handling panel request");

        let background = matches!(request, PanelRequest::DocumentOpened { .. });
        match self.dispatch(request).await {
            Ok(()) => Ok(()),
            Err(Error::ChannelClosed) => Err(Error::ChannelClosed),
            Err(e) if background => {
                tracing::warn!(error = %e, "background request failed");
                Ok(())
            }
            Err(e) if e.is_missing_input() => self.emit(PanelEvent::warning(e.to_string())),
            Err(e) => self.emit(PanelEvent::error(e.to_string())),
        }
    }

    fn emit(&self, event: PanelEvent) -> Result<()> {
        self.events.send(event).map_err(|_| Error::ChannelClosed)
    }

    async fn dispatch(&mut self, request: PanelRequest) -> Result<()> {
        match request {
            PanelRequest::GetModels => {
                let models = self.service.available_models()?;
                self.emit(PanelEvent::ModelsList { models })
            }

            PanelRequest::SelectModel { model } => {
                let config = self.service.model_config(&model)?;
                let summary = config.as_ref().map(crate::models::ModelSummary::from_config);
                let outputs = crate::models::model_outputs(config.as_ref());
                self.emit(PanelEvent::ModelConfig {
                    model: model.clone(),
                    config,
                    summary,
                })?;
                self.emit(PanelEvent::OutputsList { model, outputs })
            }

            PanelRequest::GetOutputs { model } => {
                let outputs = self.service.model_outputs(&model)?;
                self.emit(PanelEvent::OutputsList { model, outputs })
            }

            PanelRequest::DetectVariables { file_path, model } => {
                let names = self.service.detect_variables(&file_path, &model).await?;
                self.publish_detected(&names)
            }

            PanelRequest::Compile {
                template_path,
                model,
                variables,
                output_dir,
                results_dir,
            } => {
                let output_dir = output_dir.or_else(|| results_dir.map(|d| compiled_dir_for(&d)));
                let variables = panel_variable_set(&variables);
                let output_dir = self
                    .service
                    .compile_template(&template_path, &model, &variables, output_dir.as_deref())
                    .await?;
                self.emit(PanelEvent::CompileFinished { output_dir })
            }

            PanelRequest::RunSimulation {
                template_path,
                model,
                variables,
                calculator,
                results_dir,
            } => {
                let request = RunRequest {
                    template_path,
                    model,
                    variables: panel_variable_set(&variables),
                    calculator,
                    results_dir,
                };
                self.run(request).await
            }

            PanelRequest::LoadResults { results_path, model } => {
                let results = self
                    .service
                    .parse_output(&results_path, &model, OutputFormat::Json)
                    .await?;
                let stats = ResultTable::new(results.clone()).stats();
                self.emit(PanelEvent::ResultsData {
                    results_path,
                    results,
                    stats,
                })
            }

            PanelRequest::ExportCsv {
                results_path,
                model,
                destination,
            } => {
                let path = self
                    .service
                    .export_csv(&results_path, &model, &destination)
                    .await?;
                self.emit(PanelEvent::Exported { path })
            }

            PanelRequest::ListResults => {
                let entries = self.service.list_result_dirs()?;
                self.emit(PanelEvent::ResultsList { entries })
            }

            PanelRequest::DocumentOpened { file_path, text } => {
                match self.service.auto_detect(&file_path, &text).await.into_option() {
                    Some(names) => self.publish_detected(&names),
                    None => Ok(()),
                }
            }
        }
    }

    fn publish_detected(&mut self, names: &[String]) -> Result<()> {
        self.detected.replace_names(names);
        self.emit(PanelEvent::VariablesDetected {
            variables: self.detected.variables().to_vec(),
        })
    }

    async fn run(&self, request: RunRequest) -> Result<()> {
        let run_id = Uuid::new_v4().to_string();
        tracing::info!(run_id = %run_id, model = %request.model, "starting simulation");

        let events = self.events.clone();
        let progress_id = run_id.clone();
        let mut on_progress = move |chunk: &str| {
            // A closed channel only means nobody is watching; the run goes on.
            let _ = events.send(PanelEvent::Progress {
                run_id: progress_id.clone(),
                chunk: chunk.to_string(),
            });
        };

        let results_dir: PathBuf = self
            .service
            .run_simulation(&request, &mut on_progress)
            .await?;
        self.emit(PanelEvent::SimulationFinished {
            run_id,
            results_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::messages::NoticeLevel;
    use crate::config::FunzConfig;
    use crate::tool::{Invocation, Subcommand, ToolOutput};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct ScriptedExecutor {
        detect: String,
        parse: String,
        fail: bool,
    }

    #[async_trait]
    impl ToolExecutor for ScriptedExecutor {
        async fn execute(&self, invocation: &Invocation) -> Result<ToolOutput> {
            if self.fail {
                return Err(Error::tool_failed(
                    invocation.subcommand.name(),
                    "exit status: 2",
                    "Traceback: model not found",
                ));
            }
            let stdout = match invocation.subcommand {
                Subcommand::Detect => self.detect.clone(),
                Subcommand::Parse => self.parse.clone(),
                _ => String::new(),
            };
            Ok(ToolOutput {
                stdout,
                stderr: String::new(),
            })
        }

        async fn stream(
            &self,
            _invocation: &Invocation,
            on_progress: &mut (dyn for<'p> FnMut(&'p str) + Send),
        ) -> Result<()> {
            on_progress("running case 1\n");
            if self.fail {
                return Err(Error::SimulationFailed {
                    code: Some(1),
                    stderr: "calculator failed".to_string(),
                });
            }
            Ok(())
        }

        async fn probe_version(&self) -> bool {
            !self.fail
        }
    }

    fn executor(fail: bool) -> ScriptedExecutor {
        ScriptedExecutor {
            detect: r#"["T_celsius", "V_L"]"#.to_string(),
            parse: r#"{"a": {"x": 1, "y.err": 0.5}, "b": {"x": 2, "y.err": 0.7}}"#.to_string(),
            fail,
        }
    }

    fn setup(
        dir: &TempDir,
        fail: bool,
        auto_detect: bool,
    ) -> (
        PanelController<ScriptedExecutor>,
        mpsc::UnboundedReceiver<PanelEvent>,
    ) {
        let models = dir.path().join(".fz").join("models");
        fs::create_dir_all(&models).unwrap();
        fs::write(
            models.join("perfectgas.json"),
            r#"{"varprefix": "$", "output": {"pressure": "grep P out.txt"}}"#,
        )
        .unwrap();

        let config = FunzConfig::with_workspace(dir.path()).with_auto_detect(auto_detect);
        let service = Arc::new(FunzService::with_executor(config, executor(fail)));
        let (tx, rx) = mpsc::unbounded_channel();
        (PanelController::new(service, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PanelEvent>) -> Vec<PanelEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_panel_variable_set_parses_text_by_kind() {
        let variables = vec![
            Variable {
                name: "T".to_string(),
                value: Some(json!("20, 30")),
                kind: crate::variables::VariableKind::Array,
            },
            Variable {
                name: "n".to_string(),
                value: Some(json!("1.5")),
                kind: crate::variables::VariableKind::Single,
            },
            Variable {
                name: "p".to_string(),
                value: Some(json!([1, 2])),
                kind: crate::variables::VariableKind::Array,
            },
            Variable::detected("unset"),
        ];
        let set = panel_variable_set(&variables);
        assert_eq!(set.get("T"), Some(&json!(["20", "30"])));
        assert_eq!(set.get("n"), Some(&json!(1.5)));
        assert_eq!(set.get("p"), Some(&json!([1, 2])));
        assert_eq!(set.get("unset"), None);
    }

    #[tokio::test]
    async fn test_select_model_emits_config_and_outputs() {
        let dir = TempDir::new().unwrap();
        let (mut controller, mut rx) = setup(&dir, false, false);

        controller.handle(PanelRequest::GetModels).await.unwrap();
        controller
            .handle(PanelRequest::SelectModel {
                model: "perfectgas".to_string(),
            })
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(
            events[0],
            PanelEvent::ModelsList {
                models: vec!["perfectgas".to_string()]
            }
        );
        assert!(matches!(&events[1], PanelEvent::ModelConfig { config: Some(_), .. }));
        match &events[2] {
            PanelEvent::OutputsList { outputs, .. } => assert_eq!(outputs[0].name, "pressure"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_detect_replaces_carried_variables() {
        let dir = TempDir::new().unwrap();
        let (mut controller, mut rx) = setup(&dir, false, false);

        controller
            .handle(PanelRequest::DetectVariables {
                file_path: PathBuf::from("input.txt"),
                model: "perfectgas".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(controller.detected().variables().len(), 2);
        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![PanelEvent::VariablesDetected {
                variables: vec![Variable::detected("T_celsius"), Variable::detected("V_L")]
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_model_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let (mut controller, mut rx) = setup(&dir, false, false);

        controller
            .handle(PanelRequest::LoadResults {
                results_path: PathBuf::from("results/a"),
                model: String::new(),
            })
            .await
            .unwrap();

        match &drain(&mut rx)[..] {
            [PanelEvent::Notice { level, .. }] => assert_eq!(*level, NoticeLevel::Warning),
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tool_failure_is_an_error_notice() {
        let dir = TempDir::new().unwrap();
        let (mut controller, mut rx) = setup(&dir, true, false);

        controller
            .handle(PanelRequest::DetectVariables {
                file_path: PathBuf::from("input.txt"),
                model: "perfectgas".to_string(),
            })
            .await
            .unwrap();

        match &drain(&mut rx)[..] {
            [PanelEvent::Notice { level, message }] => {
                assert_eq!(*level, NoticeLevel::Error);
                assert!(message.contains("Traceback: model not found"));
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_results_reports_records_and_stats() {
        let dir = TempDir::new().unwrap();
        let (mut controller, mut rx) = setup(&dir, false, false);

        controller
            .handle(PanelRequest::LoadResults {
                results_path: PathBuf::from("/r"),
                model: "perfectgas".to_string(),
            })
            .await
            .unwrap();

        match &drain(&mut rx)[..] {
            [PanelEvent::ResultsData { results, stats, .. }] => {
                assert_eq!(results.len(), 2);
                assert_eq!(results[0].path, Path::new("/r").join("a"));
                assert_eq!(stats.runs, 2);
                assert_eq!(stats.parameters, 1);
                assert_eq!(stats.outputs, 2);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_streams_progress_then_finishes() {
        let dir = TempDir::new().unwrap();
        let (mut controller, mut rx) = setup(&dir, false, false);

        controller
            .handle(PanelRequest::RunSimulation {
                template_path: PathBuf::from("input.txt"),
                model: "perfectgas".to_string(),
                variables: vec![Variable::new(
                    "T_celsius",
                    crate::variables::VariableKind::Single,
                    json!(20),
                )],
                calculator: None,
                results_dir: Some(PathBuf::from("results/run1")),
            })
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        let (progress_id, finished_id) = match (&events[0], &events[1]) {
            (
                PanelEvent::Progress { run_id: a, chunk },
                PanelEvent::SimulationFinished {
                    run_id: b,
                    results_dir,
                },
            ) => {
                assert_eq!(chunk, "running case 1\n");
                assert_eq!(results_dir, &PathBuf::from("results/run1"));
                (a.clone(), b.clone())
            }
            other => panic!("unexpected events: {other:?}"),
        };
        assert_eq!(progress_id, finished_id);
    }

    #[tokio::test]
    async fn test_run_failure_after_progress() {
        let dir = TempDir::new().unwrap();
        let (mut controller, mut rx) = setup(&dir, true, false);

        controller
            .handle(PanelRequest::RunSimulation {
                template_path: PathBuf::from("input.txt"),
                model: "perfectgas".to_string(),
                variables: vec![Variable::new(
                    "x",
                    crate::variables::VariableKind::Single,
                    json!(1),
                )],
                calculator: Some("sh://bash".to_string()),
                results_dir: None,
            })
            .await
            .unwrap();

        let events = drain(&mut rx);
        assert!(matches!(events[0], PanelEvent::Progress { .. }));
        match &events[1] {
            PanelEvent::Notice { level, message } => {
                assert_eq!(*level, NoticeLevel::Error);
                assert!(message.contains("calculator failed"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_document_opened_is_silent_on_failure() {
        let dir = TempDir::new().unwrap();
        let (mut controller, mut rx) = setup(&dir, true, true);

        controller
            .handle(PanelRequest::DocumentOpened {
                file_path: PathBuf::from("input.txt"),
                text: "P = $T_celsius".to_string(),
            })
            .await
            .unwrap();
        assert!(drain(&mut rx).is_empty());

        let dir = TempDir::new().unwrap();
        let (mut controller, mut rx) = setup(&dir, false, true);
        controller
            .handle(PanelRequest::DocumentOpened {
                file_path: PathBuf::from("input.txt"),
                text: "P = $T_celsius".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(
            &drain(&mut rx)[..],
            [PanelEvent::VariablesDetected { .. }]
        ));
    }

    #[tokio::test]
    async fn test_closed_channel_is_reported() {
        let dir = TempDir::new().unwrap();
        let (mut controller, rx) = setup(&dir, false, false);
        drop(rx);

        let err = controller.handle(PanelRequest::ListResults).await.unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
    }
}
