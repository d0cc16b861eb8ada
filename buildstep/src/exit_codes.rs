//! Stable exit codes for the `buildstep` binary.

use crate::error::StepError;

/// Every needed step succeeded.
pub const OK: i32 = 0;
/// A step failed: missing configuration, ref resolution, or a failing command.
pub const FAILED: i32 = 1;
/// A child process did not exit within the wait after closing its output.
pub const HUNG: i32 = 124;
/// Invalid invocation or settings; no step was attempted.
pub const INVALID: i32 = 3;

pub fn for_step_error(err: &StepError) -> i32 {
    match err {
        StepError::HungProcess { .. } => HUNG,
        _ => FAILED,
    }
}
