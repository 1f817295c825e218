//! Local solution files.
//!
//! A solved dataset is written as `<output_dir>/<rfd_id>_solution.json`,
//! pretty-printed, atomically (tmp + rename).

use std::path::{Path, PathBuf};

use tracing::info;

use crate::types::Dataset;
use crate::{Result, SolverError};

/// File name for an RFD's solution. Path separators and other characters
/// outside `[A-Za-z0-9._-]` in the id are replaced with `_`.
pub fn solution_file_name(rfd_id: &str) -> String {
    let safe: String = rfd_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim_start_matches('.');
    let safe = if safe.is_empty() { "rfd" } else { safe };
    format!("{safe}_solution.json")
}

/// Path of the solution file for `rfd_id` under `dir`.
pub fn solution_path(dir: &Path, rfd_id: &str) -> PathBuf {
    dir.join(solution_file_name(rfd_id))
}

/// Write `dataset` to `dir`, creating it if needed. Returns the final path.
pub fn write_local(dir: &Path, dataset: &Dataset) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| {
        SolverError::Configuration(format!(
            "failed to create output dir {}: {e}",
            dir.display()
        ))
    })?;

    let path = solution_path(dir, &dataset.rfd_id);
    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(dataset)?;
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, &path)?;

    info!(path = %path.display(), count = dataset.metadata.count, "wrote solution");
    Ok(path)
}

/// Read a solution file written by [`write_local`].
pub fn read_local(path: &Path) -> Result<Dataset> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
