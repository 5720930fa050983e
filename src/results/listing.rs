//! Discovery of result directories under the workspace.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

use super::types::ResultDirEntry;

/// List the sub-directories of a results root, sorted by name.
///
/// A missing root yields an empty list.
pub fn list_result_dirs(results_root: &Path) -> Result<Vec<ResultDirEntry>> {
    if !results_root.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(results_root).map_err(|e| Error::io(results_root, e))?;
    let mut dirs = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| Error::io(results_root, e))?;
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        dirs.push(ResultDirEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            path: entry.path(),
            modified,
        });
    }

    dirs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(dirs)
}
