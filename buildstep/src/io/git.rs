//! Git adapter used to decide whether the checkout is the tip of the reference branch.
//!
//! Only two read-only inspection commands are ever run: `git show-ref <ref> --hash`
//! and `git rev-parse HEAD`.

use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;

use tracing::{debug, instrument, warn};

use crate::error::StepError;

/// Remote-tracking branch whose tip marks a main-line build.
pub const DEFAULT_REFERENCE: &str = "origin/master";

/// How the two resolved refs are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefComparison {
    /// Compare the raw stdout of both inspection commands.
    #[default]
    ResolvedHash,
    /// Compare the inspection commands' argument vectors instead of their output.
    ///
    /// This never reports a tip, so every build is a `pr` build. Kept for
    /// pipelines that depend on that behavior.
    ArgumentVectors,
}

impl FromStr for RefComparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(Self::ResolvedHash),
            "argv" => Ok(Self::ArgumentVectors),
            other => Err(format!("unknown ref comparison '{other}' (expected hash or argv)")),
        }
    }
}

/// Answers "is HEAD the tip of `reference`?".
pub trait RefComparator {
    fn is_current_commit_tip_of(&self, reference: &str) -> Result<bool, StepError>;
}

/// Wrapper for executing git inspection commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    comparison: RefComparison,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            comparison: RefComparison::default(),
        }
    }

    pub fn with_comparison(mut self, comparison: RefComparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Raw stdout of `git show-ref <reference> --hash`.
    pub fn reference_tip(&self, reference: &str) -> Result<String, StepError> {
        self.resolve(&reference_tip_args(reference))
    }

    /// Raw stdout of `git rev-parse HEAD`.
    pub fn head(&self) -> Result<String, StepError> {
        self.resolve(&head_args())
    }

    /// Run an inspection command, failing on any stderr output, a non-zero
    /// exit, or empty stdout.
    fn resolve(&self, args: &[String]) -> Result<String, StepError> {
        let line = format!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| StepError::RefResolutionFailed(format!("spawn {line}: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(command = %line, stderr = %stderr.trim(), "git reported an error");
            return Err(StepError::RefResolutionFailed(format!(
                "{line}: {}",
                stderr.trim()
            )));
        }
        if !output.status.success() {
            return Err(StepError::RefResolutionFailed(format!(
                "{line} exited with {:?}",
                output.status.code()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if stdout.trim().is_empty() {
            return Err(StepError::RefResolutionFailed(format!(
                "{line} produced no output"
            )));
        }
        Ok(stdout)
    }
}

impl RefComparator for Git {
    #[instrument(skip_all, fields(reference = %reference, comparison = ?self.comparison))]
    fn is_current_commit_tip_of(&self, reference: &str) -> Result<bool, StepError> {
        let tip_args = reference_tip_args(reference);
        let head_args = head_args();
        let tip = self.resolve(&tip_args)?;
        let head = self.resolve(&head_args)?;

        let is_tip = match self.comparison {
            RefComparison::ResolvedHash => tip == head,
            RefComparison::ArgumentVectors => tip_args == head_args,
        };
        debug!(tip = %tip.trim(), head = %head.trim(), is_tip, "compared refs");
        Ok(is_tip)
    }
}

fn reference_tip_args(reference: &str) -> Vec<String> {
    vec![
        "show-ref".to_string(),
        reference.to_string(),
        "--hash".to_string(),
    ]
}

fn head_args() -> Vec<String> {
    vec!["rev-parse".to_string(), "HEAD".to_string()]
}
