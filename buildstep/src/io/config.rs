//! Environment-sourced configuration.
//!
//! The only configuration surface is a fixed set of environment variables.
//! Lookups go through [`Env`] so tests can supply a map instead of mutating
//! the process environment.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::error::StepError;
use crate::io::git::{DEFAULT_REFERENCE, RefComparison};
use crate::io::process::DEFAULT_TIMEOUT;

/// Image repository identifier, e.g. `registry/app`.
pub const DOCKER_IMAGE: &str = "DOCKER_IMAGE";
/// Unique build counter supplied by the CI server.
pub const PIPELINE_COUNTER: &str = "GO_PIPELINE_COUNTER";
pub const REFERENCE: &str = "BUILDSTEP_REFERENCE";
pub const TIMEOUT_SECS: &str = "BUILDSTEP_TIMEOUT_SECS";
pub const REF_COMPARISON: &str = "BUILDSTEP_REF_COMPARISON";
pub const KILL_ON_HANG: &str = "BUILDSTEP_KILL_ON_HANG";

/// Read-only view of environment variables.
pub trait Env {
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Env for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Look up a required variable. Unset and empty are both missing.
pub fn require(env: &dyn Env, name: &str) -> Result<String, StepError> {
    match env.var(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(StepError::MissingConfiguration(name.to_string())),
    }
}

/// Values required by the image build and push steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    pub image: String,
    pub counter: String,
}

impl ImageConfig {
    /// `DOCKER_IMAGE` is checked before `GO_PIPELINE_COUNTER`.
    pub fn from_env(env: &dyn Env) -> Result<Self, StepError> {
        let image = require(env, DOCKER_IMAGE)?;
        let counter = require(env, PIPELINE_COUNTER)?;
        Ok(Self { image, counter })
    }
}

/// Optional knobs; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Reference branch whose tip marks a main-line build.
    pub reference: String,
    /// Wait for child exit after its stdout closes.
    pub timeout: Duration,
    pub comparison: RefComparison,
    /// Kill children that outlive `timeout` instead of leaving them running.
    pub kill_on_hang: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reference: DEFAULT_REFERENCE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            comparison: RefComparison::default(),
            kill_on_hang: false,
        }
    }
}

impl Settings {
    pub fn from_env(env: &dyn Env) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(reference) = non_empty(env, REFERENCE) {
            settings.reference = reference;
        }
        if let Some(raw) = non_empty(env, TIMEOUT_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|e| anyhow!("{TIMEOUT_SECS}='{raw}' is not a number of seconds: {e}"))?;
            settings.timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = non_empty(env, REF_COMPARISON) {
            settings.comparison = raw
                .parse()
                .map_err(|e: String| anyhow!("{REF_COMPARISON}: {e}"))?;
        }
        if let Some(raw) = non_empty(env, KILL_ON_HANG) {
            settings.kill_on_hang = parse_flag(&raw)
                .ok_or_else(|| anyhow!("{KILL_ON_HANG}='{raw}' is not a boolean"))?;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(anyhow!("{TIMEOUT_SECS} must be > 0"));
        }
        if self.reference.trim().is_empty() {
            return Err(anyhow!("{REFERENCE} must not be blank"));
        }
        Ok(())
    }
}

fn non_empty(env: &dyn Env, name: &str) -> Option<String> {
    env.var(name).filter(|v| !v.trim().is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
