//! Failure taxonomy for step execution.
//!
//! Every error aborts the current step and the whole run. Nothing in the
//! engine catches a [`StepError`] to retry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    /// A required environment variable is unset or empty.
    #[error("missing configuration: environment variable {0} is not set")]
    MissingConfiguration(String),

    /// Version-control inspection produced an error or no output.
    #[error("unable to resolve ref: {0}")]
    RefResolutionFailed(String),

    /// The child did not terminate within the allotted wait.
    #[error("command `{command}` did not exit in time, is it hanging?")]
    HungProcess { command: String },

    /// The child terminated unsuccessfully. `exit_code` is `None` when it was
    /// ended by a signal.
    #[error("command `{command}` failed with {}", describe_exit(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StepError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}
