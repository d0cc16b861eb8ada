//! Build artifacts consumed by downstream pipeline stages.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StepError;

pub const ARTIFACTS_DIR: &str = "artifacts";
pub const BUILD_ID_FILE: &str = "build-id.txt";

pub fn build_id_path(workdir: &Path) -> PathBuf {
    workdir.join(ARTIFACTS_DIR).join(BUILD_ID_FILE)
}

/// Write `build_id` to `artifacts/build-id.txt`, creating the directory on demand.
///
/// The file holds exactly the identifier with no trailing newline and is
/// overwritten on every build.
pub fn write_build_id(workdir: &Path, build_id: &str) -> Result<PathBuf, StepError> {
    let dir = workdir.join(ARTIFACTS_DIR);
    fs::create_dir_all(&dir)
        .map_err(|e| StepError::io(format!("create artifacts dir {}", dir.display()), e))?;
    let path = build_id_path(workdir);
    fs::write(&path, build_id)
        .map_err(|e| StepError::io(format!("write {}", path.display()), e))?;
    debug!(path = %path.display(), build_id, "wrote build id");
    Ok(path)
}
