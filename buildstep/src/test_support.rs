//! Test-only helpers: scripted command runners, fixed ref answers, temp git repos.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use tempfile::TempDir;

use crate::error::StepError;
use crate::io::git::RefComparator;
use crate::io::process::{CommandRunner, command_line};
use crate::step::StepReporter;

/// Build an [`Env`](crate::io::config::Env) from literal pairs.
pub fn env_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Create an empty file at `rel` under `root`, including parent directories.
pub fn touch(root: &Path, rel: &str) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(&path, "").with_context(|| format!("write {}", path.display()))
}

/// Cloneable in-memory writer for capturing echoed output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.inner.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).to_string()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Records every command instead of spawning it.
///
/// Commands whose program matches `fail_program` fail with `fail_code`
/// (after being recorded).
#[derive(Debug, Default)]
pub struct ScriptedCommands {
    fail_program: Option<String>,
    fail_code: Option<i32>,
    hang_program: Option<String>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedCommands {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing_on(program: &str, exit_code: Option<i32>) -> Self {
        Self {
            fail_program: Some(program.to_string()),
            fail_code: exit_code,
            ..Self::default()
        }
    }

    pub fn hanging_on(program: &str) -> Self {
        Self {
            hang_program: Some(program.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Recorded commands joined with spaces.
    pub fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| command_line(c)).collect()
    }
}

impl CommandRunner for ScriptedCommands {
    fn run(&self, _workdir: &Path, command: &[String]) -> Result<(), StepError> {
        self.calls.borrow_mut().push(command.to_vec());
        let program = command.first().map(String::as_str);
        if program.is_some() && program == self.hang_program.as_deref() {
            return Err(StepError::HungProcess {
                command: command_line(command),
            });
        }
        if program.is_some() && program == self.fail_program.as_deref() {
            return Err(StepError::CommandFailed {
                command: command_line(command),
                exit_code: self.fail_code,
            });
        }
        Ok(())
    }
}

/// Answers every ref comparison the same way.
#[derive(Debug, Default)]
pub struct FixedRefs {
    is_tip: bool,
    failure: Option<String>,
    calls: Cell<usize>,
    references: RefCell<Vec<String>>,
}

impl FixedRefs {
    pub fn tip(is_tip: bool) -> Self {
        Self {
            is_tip,
            ..Self::default()
        }
    }

    pub fn unresolvable(detail: &str) -> Self {
        Self {
            failure: Some(detail.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn references(&self) -> Vec<String> {
        self.references.borrow().clone()
    }
}

impl RefComparator for FixedRefs {
    fn is_current_commit_tip_of(&self, reference: &str) -> Result<bool, StepError> {
        self.calls.set(self.calls.get() + 1);
        self.references.borrow_mut().push(reference.to_string());
        match &self.failure {
            Some(detail) => Err(StepError::RefResolutionFailed(detail.clone())),
            None => Ok(self.is_tip),
        }
    }
}

/// Collects reporter notices as `"<event> <step>"` strings.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: RefCell<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn push(&self, event: &str, step: &str) {
        self.events.borrow_mut().push(format!("{event} {step}"));
    }
}

impl StepReporter for RecordingReporter {
    fn skipped(&self, step: &str) {
        self.push("skipped", step);
    }

    fn running(&self, step: &str) {
        self.push("running", step);
    }

    fn finished(&self, step: &str) {
        self.push("finished", step);
    }

    fn failed(&self, step: &str, _err: &StepError) {
        self.push("failed", step);
    }
}

/// Throwaway git repository with a local identity configured.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("tempdir")?;
        let repo = Self { dir };
        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.email", "ci@example.com"])?;
        repo.git(&["config", "user.name", "CI"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-q", "--allow-empty", "-m", message])
    }

    /// Point `refs/remotes/<reference>` at the current HEAD.
    pub fn set_remote_ref(&self, reference: &str) -> Result<()> {
        self.git(&["update-ref", &format!("refs/remotes/{reference}"), "HEAD"])
    }

    pub fn git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
