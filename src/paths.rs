use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Host directories derived from the invocation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub work_dir: PathBuf,
    pub data_dir: PathBuf,
    pub pretrained_dir: PathBuf,
}

impl ResolvedPaths {
    /// Derive `data` and `data/pretrained` beneath `work_dir`.
    ///
    /// Existence is not checked; a missing pretrained directory shows up as a
    /// mount failure from the container runtime.
    pub fn from_work_dir(work_dir: &Path) -> Self {
        let data_dir = work_dir.join("data");
        let pretrained_dir = data_dir.join("pretrained");
        Self {
            work_dir: work_dir.to_path_buf(),
            data_dir,
            pretrained_dir,
        }
    }
}

/// Make `path` absolute against `base`. Bind mount sources must be absolute.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Create the output directory and any missing parents. No-op if it exists.
pub fn prepare_output_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(path)
        .with_context(|| format!("failed to create output directory {}", path.display()))?;
    tracing::debug!(path = %path.display(), "created output directory");
    Ok(())
}
