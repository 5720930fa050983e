//! # funz-core
//!
//! Front-end library for the Funz parametric simulation tool. Everything that
//! does real work (variable detection, template compilation, simulation runs,
//! result extraction) is delegated to the tool's Python subcommands; this
//! crate builds their arguments, runs them, and turns their output into
//! uniform records for display.
//!
//! ## Core Components
//!
//! - **Models**: model definitions under `<workspace>/.fz/models`
//! - **Tool**: argument builders, subprocess execution and [`FunzService`]
//! - **Results**: JSON/CSV normalization and the [`ResultTable`] view model
//! - **Adapters**: a request/event boundary for panel hosts and CLI rendering
//!
//! ## Example
//!
//! ```rust,ignore
//! use funz_core::{FunzConfig, FunzService, OutputFormat, ResultTable};
//!
//! let service = FunzService::new(FunzConfig::from_env());
//! for model in service.available_models()? {
//!     println!("{model}");
//! }
//!
//! let records = service
//!     .parse_output("results/run1".as_ref(), "perfectgas", OutputFormat::Json)
//!     .await?;
//! let table = ResultTable::new(records);
//! println!("{} runs", table.stats().runs);
//! ```

pub mod adapters;
pub mod config;
pub mod effort;
pub mod error;
pub mod models;
pub mod results;
pub mod tool;
pub mod value;
pub mod variables;

// Re-exports for convenience
pub use adapters::{NoticeLevel, PanelController, PanelEvent, PanelRequest};
pub use config::FunzConfig;
pub use effort::BestEffort;
pub use error::{Error, Result};
pub use models::{ModelCatalog, ModelConfig, ModelOutput, ModelSummary};
pub use results::{
    normalize_csv, normalize_json, OutputFormat, ResultDirEntry, ResultRecord, ResultTable,
    SortOrder, TableStats,
};
pub use tool::{
    FunzService, Invocation, ProcessExecutor, RunRequest, Subcommand, ToolExecutor, ToolOutput,
};
pub use value::coerce_cell;
pub use variables::{DetectedVariables, Variable, VariableKind, VariableSet};
