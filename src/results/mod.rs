//! Simulation results.
//!
//! The tool's `parse` subcommand prints results as JSON (an array of rows or
//! an object of rows keyed by run name) or CSV. This module turns either form
//! into a uniform list of [`ResultRecord`]s and provides the table view used
//! to browse them.
//!
//! ## Column classification
//!
//! Every column of a row lands in `outputs`. Columns whose name contains no
//! `.` and does not start with `_` are also copied into `parameters`, so a
//! plain column such as `x` appears in both maps:
//!
//! ```rust
//! use funz_core::results::normalize_json;
//! use std::path::Path;
//!
//! let records = normalize_json(r#"[{"x": 1, "y.err": 0.02}]"#, Path::new("/r")).unwrap();
//! assert_eq!(records[0].parameters.len(), 1);
//! assert_eq!(records[0].outputs.len(), 2);
//! assert_eq!(records[0].path, Path::new("/r/run_0"));
//! ```

pub mod listing;
pub mod normalize;
mod proptest;
pub mod table;
pub mod types;

pub use listing::list_result_dirs;
pub use normalize::{
    classify_row, is_parameter_key, normalize, normalize_csv, normalize_json,
    normalize_json_value,
};
pub use table::{ResultTable, SortOrder, TableStats};
pub use types::{OutputFormat, ResultDirEntry, ResultRecord, Row};
