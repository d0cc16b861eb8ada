//! Per-run context shared by step predicates and actions.

use std::path::{Path, PathBuf};

use crate::io::config::Env;
use crate::io::git::{DEFAULT_REFERENCE, RefComparator};
use crate::io::process::CommandRunner;

/// Everything a step may read or invoke during one run.
///
/// The working directory and environment are read-only from the engine's
/// point of view; only the build-image action writes, under `artifacts/`.
pub struct Workspace<'a> {
    pub workdir: PathBuf,
    pub env: &'a dyn Env,
    pub commands: &'a dyn CommandRunner,
    pub refs: &'a dyn RefComparator,
    /// Reference branch compared against HEAD.
    pub reference: String,
}

impl<'a> Workspace<'a> {
    pub fn new(
        workdir: impl Into<PathBuf>,
        env: &'a dyn Env,
        commands: &'a dyn CommandRunner,
        refs: &'a dyn RefComparator,
    ) -> Self {
        Self {
            workdir: workdir.into(),
            env,
            commands,
            refs,
            reference: DEFAULT_REFERENCE.to_string(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}
