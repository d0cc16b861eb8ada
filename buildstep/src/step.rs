//! Ordered step model and the orchestrator that drives it.
//!
//! Steps run strictly in sequence. Each predicate is evaluated immediately
//! before its own step, and the first failing action aborts the run with its
//! error unchanged.

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::actions::{do_build_image, do_make, do_push_image};
use crate::error::StepError;
use crate::predicates::{needs_build_image, needs_make, needs_push_image};
use crate::workspace::Workspace;

/// A named, independently gated unit of build work.
#[derive(Clone, Copy)]
pub struct Step {
    pub name: &'static str,
    pub is_needed: fn(&Workspace<'_>) -> bool,
    pub run: fn(&Workspace<'_>) -> Result<(), StepError>,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).finish()
    }
}

/// The fixed pipeline: `make`, then `build-image`, then `push-image`.
pub fn default_steps() -> Vec<Step> {
    vec![
        Step {
            name: "make",
            is_needed: |ws| needs_make(ws.workdir()),
            run: do_make,
        },
        Step {
            name: "build-image",
            is_needed: |ws| needs_build_image(ws.workdir()),
            run: do_build_image,
        },
        Step {
            name: "push-image",
            is_needed: |ws| needs_push_image(ws.workdir()),
            run: do_push_image,
        },
    ]
}

/// Keep only the named steps, preserving pipeline order.
///
/// An empty selection keeps every step. Unknown names are rejected before
/// anything runs.
pub fn select_steps(steps: &[Step], names: &[String]) -> Result<Vec<Step>> {
    if names.is_empty() {
        return Ok(steps.to_vec());
    }
    let unknown: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !steps.iter().any(|step| step.name == *name))
        .collect();
    if !unknown.is_empty() {
        let known: Vec<&str> = steps.iter().map(|step| step.name).collect();
        bail!(
            "unknown step(s): {} (known: {})",
            unknown.join(", "),
            known.join(", ")
        );
    }
    Ok(steps
        .iter()
        .filter(|step| names.iter().any(|name| name == step.name))
        .copied()
        .collect())
}

/// Receives per-step progress notices.
pub trait StepReporter {
    fn skipped(&self, step: &str);
    fn running(&self, step: &str);
    fn finished(&self, _step: &str) {}
    fn failed(&self, _step: &str, _err: &StepError) {}
}

/// Reports progress as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StepReporter for TracingReporter {
    fn skipped(&self, step: &str) {
        info!(step, "step not needed");
    }

    fn running(&self, step: &str) {
        info!(step, "running step");
    }

    fn finished(&self, step: &str) {
        info!(step, "step finished");
    }

    fn failed(&self, step: &str, err: &StepError) {
        warn!(step, err = %err, "step failed");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Ran,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: &'static str,
    pub status: StepStatus,
}

/// What happened to each step of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: Vec<StepRecord>,
}

impl RunSummary {
    pub fn ran(&self) -> Vec<&'static str> {
        self.with_status(StepStatus::Ran)
    }

    pub fn skipped(&self) -> Vec<&'static str> {
        self.with_status(StepStatus::Skipped)
    }

    fn with_status(&self, status: StepStatus) -> Vec<&'static str> {
        self.steps
            .iter()
            .filter(|record| record.status == status)
            .map(|record| record.name)
            .collect()
    }
}

/// Predicate outcome for one step, without running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub name: &'static str,
    pub needed: bool,
}

/// Drives a step sequence with an injected reporter.
#[derive(Debug, Default)]
pub struct Orchestrator<R: StepReporter> {
    reporter: R,
}

impl<R: StepReporter> Orchestrator<R> {
    pub fn new(reporter: R) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Run `steps` in order, skipping those whose predicate is false.
    pub fn run_all(&self, ws: &Workspace<'_>, steps: &[Step]) -> Result<RunSummary, StepError> {
        let mut summary = RunSummary::default();
        for step in steps {
            if !(step.is_needed)(ws) {
                self.reporter.skipped(step.name);
                summary.steps.push(StepRecord {
                    name: step.name,
                    status: StepStatus::Skipped,
                });
                continue;
            }

            self.reporter.running(step.name);
            if let Err(err) = (step.run)(ws) {
                self.reporter.failed(step.name, &err);
                return Err(err);
            }
            self.reporter.finished(step.name);
            summary.steps.push(StepRecord {
                name: step.name,
                status: StepStatus::Ran,
            });
        }
        Ok(summary)
    }

    /// Evaluate every predicate without running any action.
    pub fn plan(&self, ws: &Workspace<'_>, steps: &[Step]) -> Vec<PlannedStep> {
        steps
            .iter()
            .map(|step| PlannedStep {
                name: step.name,
                needed: (step.is_needed)(ws),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::test_support::{FixedRefs, RecordingReporter, ScriptedCommands, env_map};

    thread_local! {
        static CALLS: Cell<u32> = const { Cell::new(0) };
    }

    fn count_call(_ws: &Workspace<'_>) -> Result<(), StepError> {
        CALLS.with(|calls| calls.set(calls.get() + 1));
        Ok(())
    }

    fn fail(_ws: &Workspace<'_>) -> Result<(), StepError> {
        Err(StepError::CommandFailed {
            command: "false".to_string(),
            exit_code: Some(1),
        })
    }

    fn always(_ws: &Workspace<'_>) -> bool {
        true
    }

    fn never(_ws: &Workspace<'_>) -> bool {
        false
    }

    fn step(name: &'static str, is_needed: fn(&Workspace<'_>) -> bool) -> Step {
        Step {
            name,
            is_needed,
            run: count_call,
        }
    }

    #[test]
    fn default_pipeline_order_is_fixed() {
        let names: Vec<&str> = default_steps().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["make", "build-image", "push-image"]);
    }

    #[test]
    fn skipped_steps_do_not_run() {
        let temp = tempfile::tempdir().expect("tempdir");
        let env = env_map(&[]);
        let commands = ScriptedCommands::succeeding();
        let refs = FixedRefs::tip(false);
        let ws = Workspace::new(temp.path(), &env, &commands, &refs);
        let orchestrator = Orchestrator::new(RecordingReporter::default());
        CALLS.with(|calls| calls.set(0));

        let summary = orchestrator
            .run_all(&ws, &[step("a", never), step("b", always), step("c", never)])
            .expect("run");

        assert_eq!(CALLS.with(Cell::get), 1);
        assert_eq!(summary.ran(), vec!["b"]);
        assert_eq!(summary.skipped(), vec!["a", "c"]);
        assert_eq!(
            orchestrator.reporter().events(),
            vec!["skipped a", "running b", "finished b", "skipped c"]
        );
    }

    #[test]
    fn first_failure_aborts_remaining_steps() {
        let temp = tempfile::tempdir().expect("tempdir");
        let env = env_map(&[]);
        let commands = ScriptedCommands::succeeding();
        let refs = FixedRefs::tip(false);
        let ws = Workspace::new(temp.path(), &env, &commands, &refs);
        let orchestrator = Orchestrator::new(RecordingReporter::default());
        CALLS.with(|calls| calls.set(0));

        let steps = [
            step("a", always),
            Step {
                name: "b",
                is_needed: always,
                run: fail,
            },
            step("c", always),
        ];
        let err = orchestrator.run_all(&ws, &steps).unwrap_err();

        assert!(matches!(err, StepError::CommandFailed { exit_code: Some(1), .. }));
        assert_eq!(CALLS.with(Cell::get), 1);
        assert_eq!(
            orchestrator.reporter().events(),
            vec!["running a", "finished a", "running b", "failed b"]
        );
    }

    #[test]
    fn predicates_are_evaluated_just_before_each_step() {
        let temp = tempfile::tempdir().expect("tempdir");
        let env = env_map(&[]);
        let commands = ScriptedCommands::succeeding();
        let refs = FixedRefs::tip(false);
        let ws = Workspace::new(temp.path(), &env, &commands, &refs);
        let orchestrator = Orchestrator::new(RecordingReporter::default());

        // The first step creates the makefile the second step is gated on.
        let steps = [
            Step {
                name: "create",
                is_needed: always,
                run: |ws| {
                    std::fs::write(ws.workdir().join("makefile"), "all:\n")
                        .map_err(|e| StepError::io("write makefile", e))
                },
            },
            default_steps()[0],
        ];
        orchestrator.run_all(&ws, &steps).expect("run");

        assert_eq!(commands.lines(), vec!["make all"]);
    }

    #[test]
    fn plan_runs_no_actions() {
        let temp = tempfile::tempdir().expect("tempdir");
        crate::test_support::touch(temp.path(), "docker/Dockerfile").expect("touch");
        let env = env_map(&[]);
        let commands = ScriptedCommands::succeeding();
        let refs = FixedRefs::tip(true);
        let ws = Workspace::new(temp.path(), &env, &commands, &refs);
        let orchestrator = Orchestrator::new(RecordingReporter::default());

        let plan = orchestrator.plan(&ws, &default_steps());

        let needed: Vec<(&str, bool)> = plan.iter().map(|p| (p.name, p.needed)).collect();
        assert_eq!(
            needed,
            vec![("make", false), ("build-image", true), ("push-image", true)]
        );
        assert!(commands.lines().is_empty());
        assert_eq!(refs.calls(), 0);
        assert!(orchestrator.reporter().events().is_empty());
    }

    #[test]
    fn select_keeps_pipeline_order() {
        let names = vec!["push-image".to_string(), "make".to_string()];
        let selected = select_steps(&default_steps(), &names).expect("select");
        let selected: Vec<&str> = selected.iter().map(|s| s.name).collect();
        assert_eq!(selected, vec!["make", "push-image"]);
    }

    #[test]
    fn empty_selection_keeps_everything() {
        let selected = select_steps(&default_steps(), &[]).expect("select");
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn select_rejects_unknown_names() {
        let names = vec!["deploy".to_string()];
        let err = select_steps(&default_steps(), &names).unwrap_err();
        assert!(err.to_string().contains("unknown step(s): deploy"));
    }
}
