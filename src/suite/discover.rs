//! Test-unit discovery.

use std::fs;
use std::path::{Path, PathBuf};

use sir_conform_core::UNIT_EXTENSION;

use super::TestUnit;
use crate::error::SuiteError;
use crate::metadata::{Metadata, read_metadata};

/// All `.sir` files under `root`, recursively, sorted by path.
///
/// Hidden directories are not entered. Subdirectories that cannot be read are logged and skipped; only an
/// unreadable root is an error.
pub fn discover_unit_paths(root: &Path) -> Result<Vec<PathBuf>, SuiteError> {
    if !root.is_dir() {
        return Err(SuiteError::MissingTestRoot {
            path: root.to_path_buf(),
        });
    }
    let entries = fs::read_dir(root).map_err(|source| SuiteError::Discovery {
        path: root.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    collect(entries, &mut files);
    files.sort();
    Ok(files)
}

fn collect(entries: fs::ReadDir, files: &mut Vec<PathBuf>) {
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_dir() {
            if name.starts_with('.') {
                continue;
            }
            match fs::read_dir(&path) {
                Ok(sub) => collect(sub, files),
                Err(err) => tracing::warn!(path = %path.display(), %err, "skipping unreadable directory"),
            }
        } else if path.extension().is_some_and(|ext| ext == UNIT_EXTENSION) {
            files.push(path);
        }
    }
}

/// Discover units and read their headers.
///
/// Each unit gets a key `<index>_<stem>` that is unique within the run and names its scratch files.
pub fn discover_units(root: &Path) -> Result<Vec<TestUnit>, SuiteError> {
    let paths = discover_unit_paths(root)?;
    tracing::info!(root = %root.display(), units = paths.len(), "discovered units");

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(index, path)| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let metadata = read_metadata(&path).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), %err, "failed to read unit header");
                Metadata::default()
            });
            let relative_path = path.strip_prefix(root).unwrap_or(path.as_path()).to_path_buf();
            TestUnit {
                key: format!("{index:04}_{stem}"),
                path,
                relative_path,
                metadata,
            }
        })
        .collect())
}
