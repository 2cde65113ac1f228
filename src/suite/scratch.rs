//! Scratch directory for generated artifacts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SuiteError;

/// The run's scratch directory.
///
/// Removed on drop unless [`ScratchDir::persist`] was called, so every exit path (including an early `?`
/// return) cleans up. A directory that existed before the run is never removed.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    created: bool,
    keep: bool,
}

impl ScratchDir {
    /// Use `path` if given (creating it when missing), otherwise a fresh directory under the system temp dir.
    pub fn create(path: Option<&Path>) -> Result<ScratchDir, SuiteError> {
        match path {
            Some(path) => {
                let existed = path.is_dir();
                std::fs::create_dir_all(path).map_err(|source| SuiteError::Scratch {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(ScratchDir {
                    path: path.to_path_buf(),
                    created: !existed,
                    keep: false,
                })
            }
            None => Self::fresh(),
        }
    }

    fn fresh() -> Result<ScratchDir, SuiteError> {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let base = std::env::temp_dir();
        let pid = std::process::id();

        loop {
            let n = COUNTER.fetch_add(1, Ordering::Relaxed);
            let path = base.join(format!("sir-conform_{pid}_{n}"));
            match std::fs::create_dir(&path) {
                Ok(()) => {
                    return Ok(ScratchDir {
                        path,
                        created: true,
                        keep: false,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists && n < 10_000 => continue,
                Err(source) => return Err(SuiteError::Scratch { path, source }),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the directory after drop.
    pub fn persist(&mut self) {
        self.keep = true;
    }

    /// End of run: keep the directory when asked to, otherwise remove it.
    ///
    /// Returns the path when the directory is left on disk.
    pub fn finish(mut self, keep: bool) -> Option<PathBuf> {
        if keep {
            self.persist();
        }
        (self.keep || !self.created).then(|| self.path.clone())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.created && !self.keep {
            if let Err(err) = std::fs::remove_dir_all(&self.path) {
                tracing::debug!(path = %self.path.display(), %err, "failed to remove scratch directory");
            }
        }
    }
}
