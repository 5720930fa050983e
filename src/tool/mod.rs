//! Invocation of the external Funz tool.
//!
//! The tool is a Python package whose subcommands are modules launched as
//! `<python> -m <namespace>.<module> ...`:
//!
//! | Subcommand | Module | Purpose |
//! |---|---|---|
//! | detect  | `fzi` | list the variables of a template |
//! | compile | `fzc` | substitute variable values into a template |
//! | run     | `fzr` | run simulations for every value combination |
//! | parse   | `fzo` | extract results from a results directory |
//!
//! `detect`, `compile` and `parse` are buffered: output is collected up to a
//! ceiling and returned when the process exits. `run` streams stdout to a
//! progress callback as it arrives.
//!
//! ## Example
//!
//! ```rust,ignore
//! use funz_core::{FunzConfig, FunzService, OutputFormat};
//!
//! let service = FunzService::new(FunzConfig::from_env());
//! let names = service.detect_variables("input.txt".as_ref(), "perfectgas").await?;
//! let records = service
//!     .parse_output("results/run1".as_ref(), "perfectgas", OutputFormat::Json)
//!     .await?;
//! ```

pub mod args;
pub mod process;
pub mod service;

pub use args::{Invocation, Subcommand};
pub use process::{ProcessExecutor, ToolExecutor, ToolOutput};
pub use service::{FunzService, RunRequest};
