use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SummaryError;

/// Resolves the input path to the SARIF files to read, sorted.
///
/// A file is returned as is. A directory yields the files carrying
/// `extension` (case-insensitive), descending into sub-directories only when
/// `recursive` is set.
pub(crate) fn list_sarif_files(
    path: &Path,
    recursive: bool,
    extension: &str,
) -> Result<Vec<PathBuf>, SummaryError> {
    if !path.exists() {
        return Err(SummaryError::InputNotFound {
            reason: format!("path does not exist: {}", path.display()),
        });
    }
    if !path.is_dir() {
        info!("input path is a file: {}", path.display());
        return Ok(vec![path.to_path_buf()]);
    }

    let extension = extension.trim_start_matches('.');
    let mut files = Vec::new();
    collect_files(path, recursive, extension, &mut files)?;
    files.sort();
    info!(
        "found {} files with .{extension} extension in {}",
        files.len(),
        path.display()
    );
    Ok(files)
}

fn collect_files(
    dir: &Path,
    recursive: bool,
    extension: &str,
    files: &mut Vec<PathBuf>,
) -> Result<(), SummaryError> {
    let read_error = |source| SummaryError::ReadInput {
        path: dir.to_path_buf(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, extension, files)?;
            }
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            debug!("found {}", path.display());
            files.push(path);
        }
    }
    Ok(())
}
