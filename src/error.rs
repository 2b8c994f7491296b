//! Error types shared across the daemon.
//!
//! The taxonomy separates "the registry does not know this image" (which
//! the checker turns into a local-image classification) from failures
//! that must reach the caller.

use thiserror::Error;

/// Failures raised by a [`ContainerRuntime`](crate::runtime::ContainerRuntime).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The container or image does not exist (HTTP 404 from the engine or
    /// the registry).
    #[error("not found: {0}")]
    NotFound(String),
    /// The engine answered with an error response, or a pull stream
    /// reported a registry failure.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Transport failures, unreachable engine, helper exit failures.
    #[error("{0}")]
    Other(String),
}

impl RuntimeError {
    /// Whether this error means the registry could not resolve the
    /// reference at all.
    pub fn is_unresolvable(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_) | RuntimeError::Api { .. })
    }
}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        use bollard::errors::Error as DockerError;
        match err {
            DockerError::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            DockerError::DockerResponseServerError {
                status_code,
                message,
            } => RuntimeError::Api {
                status: status_code,
                message,
            },
            // Pull failures reported inside the progress stream
            // ("manifest unknown", "pull access denied", ...).
            DockerError::DockerStreamError { error } => RuntimeError::Api {
                status: 0,
                message: error,
            },
            other => RuntimeError::Other(other.to_string()),
        }
    }
}

/// Failures of a single update check.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("could not determine image name for container {container}")]
    UnknownImage { container: String },
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Failures while reading a settings patch or persisting the result.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings update must be a JSON object")]
    NotAnObject,
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("failed to save settings")]
    SaveFailed,
}
