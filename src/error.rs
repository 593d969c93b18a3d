//! Error types for the edge deployment orchestrator.
//!
//! The hierarchy mirrors the deploy lifecycle: reading the manifest, tracking
//! local state, talking to the edge platform, and running the ordered deploy
//! pipeline.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::Step;

/// The main error type for the edge deployment orchestrator.
#[derive(Debug, Error)]
pub enum EdgeDeployError {
    /// Manifest-related errors.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Local state errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Edge platform API errors.
    #[error("Platform API error: {0}")]
    Platform(#[from] PlatformError),

    /// Deploy pipeline errors.
    #[error("Deploy error: {0}")]
    Deploy(#[from] DeployError),

    /// Platform settings errors.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Manifest-related errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// No manifest file could be found.
    #[error("Manifest file not found: {path}")]
    FileNotFound {
        /// Path that was expected to hold the manifest.
        path: PathBuf,
    },

    /// The manifest could not be parsed.
    #[error("Failed to parse manifest: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Manifest validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A declaration references a resource that does not exist.
    #[error("Unresolved {resource_type} reference '{name}' in {referrer}")]
    UnresolvedReference {
        /// Kind of resource being referenced.
        resource_type: String,
        /// Name that could not be resolved.
        name: String,
        /// Declaration holding the reference.
        referrer: String,
    },
}

/// Local state errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State file not found.
    #[error("State file not found: {path}")]
    NotFound {
        /// Path to the missing state file.
        path: PathBuf,
    },

    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State could not be written.
    #[error("Failed to persist state: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("State is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// Edge platform API errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Authentication failed.
    #[error("Platform authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Platform API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Rate limited.
    #[error("Platform API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// A remote resource does not exist.
    #[error("{resource_type} not found: {id}")]
    ResourceNotFound {
        /// Kind of resource.
        resource_type: String,
        /// Identifier that was looked up.
        id: String,
    },

    /// Network error.
    #[error("Network error communicating with the platform: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from platform API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Deploy pipeline errors.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A pipeline step failed; the run stopped there.
    #[error("Deploy step '{step}' failed: {source}")]
    StepFailed {
        /// Step that failed.
        step: Step,
        /// Underlying error, unmodified.
        #[source]
        source: Box<EdgeDeployError>,
    },

    /// The build artifact to register as a function is missing.
    #[error("Function artifact not found: {path}")]
    ArtifactNotFound {
        /// Expected artifact location.
        path: PathBuf,
    },

    /// A step ran without the output of a step it depends on.
    #[error("Step '{step}' requires {missing}, which no earlier step produced")]
    MissingPrerequisite {
        /// Step that could not run.
        step: Step,
        /// Description of the missing input.
        missing: String,
    },
}

/// Platform settings errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Environment variable holds an unusable value.
    #[error("Invalid value for {name}: {message}")]
    InvalidValue {
        /// Name of the variable.
        name: String,
        /// Why the value was rejected.
        message: String,
    },

    /// The `.env` file could not be loaded.
    #[error("Failed to load {path}: {message}")]
    DotenvFailed {
        /// Path of the `.env` file.
        path: PathBuf,
        /// Loader error.
        message: String,
    },
}

/// Result type alias for edge deploy operations.
pub type Result<T> = std::result::Result<T, EdgeDeployError>;

impl EdgeDeployError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable by the transport.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Platform(
                PlatformError::RateLimited { .. } | PlatformError::NetworkError { .. }
            ) | Self::State(StateError::LockFailed { .. })
        )
    }

    /// Returns the retry delay the platform asked for, in seconds.
    ///
    /// Other retryable errors return `None` and use the caller's backoff.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Platform(PlatformError::RateLimited { retry_after_secs }) => {
                Some(*retry_after_secs)
            }
            _ => None,
        }
    }

    /// Returns the step a deploy failed at, if this is a step failure.
    #[must_use]
    pub const fn failed_step(&self) -> Option<Step> {
        match self {
            Self::Deploy(DeployError::StepFailed { step, .. }) => Some(*step),
            _ => None,
        }
    }

    /// Unwraps step context, returning the error the step itself produced.
    #[must_use]
    pub fn into_root(self) -> Self {
        match self {
            Self::Deploy(DeployError::StepFailed { source, .. }) => source.into_root(),
            other => other,
        }
    }
}

impl ManifestError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a parse error with an optional location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: Option<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location,
        }
    }
}

impl StateError {
    /// Creates a write error with the given message.
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl PlatformError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl DeployError {
    /// Wraps an error with the step it happened in.
    #[must_use]
    pub fn step_failed(step: Step, source: EdgeDeployError) -> Self {
        Self::StepFailed {
            step,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failure_names_the_step() {
        let err = EdgeDeployError::from(DeployError::step_failed(
            Step::Origin,
            PlatformError::api_error(422, "invalid address").into(),
        ));

        assert_eq!(err.failed_step(), Some(Step::Origin));
        assert!(err.to_string().contains("'origin'"));
        assert!(err.to_string().contains("invalid address"));
    }

    #[test]
    fn test_into_root_unwraps_step_context() {
        let err = EdgeDeployError::from(DeployError::step_failed(
            Step::Application,
            PlatformError::network("connection reset").into(),
        ));

        let root = err.into_root();
        assert!(matches!(
            root,
            EdgeDeployError::Platform(PlatformError::NetworkError { .. })
        ));
    }

    #[test]
    fn test_retryable_errors() {
        let rate_limited = EdgeDeployError::from(PlatformError::RateLimited {
            retry_after_secs: 7,
        });
        assert!(rate_limited.is_retryable());
        assert_eq!(rate_limited.retry_delay_secs(), Some(7));

        let dropped = EdgeDeployError::from(PlatformError::network("connection reset"));
        assert!(dropped.is_retryable());
        assert_eq!(dropped.retry_delay_secs(), None);

        let rejected = EdgeDeployError::from(PlatformError::api_error(400, "bad request"));
        assert!(!rejected.is_retryable());
        assert_eq!(rejected.retry_delay_secs(), None);
    }
}
