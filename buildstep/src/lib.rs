//! Minimal build-pipeline step runner.
//!
//! Inspects a working directory for a `makefile` and a container descriptor
//! (`docker/Dockerfile`), then runs the matching steps of a fixed pipeline:
//! `make`, `build-image`, `push-image`. The layout keeps a strict split:
//!
//! - **[`core`]**: Pure logic (build identity, command shapes). No I/O.
//! - **[`io`]**: Environment, artifacts, git inspection, supervised child processes.
//!
//! [`predicates`] and [`actions`] are the two halves of each step, and
//! [`step`] holds the ordered step list plus the orchestrator that drives it.

pub mod actions;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod predicates;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workspace;

pub use error::StepError;
