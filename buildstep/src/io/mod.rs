//! Side-effecting adapters: environment, filesystem artifacts, git, child processes.

pub mod artifacts;
pub mod config;
pub mod git;
pub mod process;
