//! Error types for Middle.
//!
//! This module provides the [`Error`] type, which is the standard error type
//! used throughout the request pipeline. Failures are returned, never
//! encoded as sentinel responses; the outermost error handler (or the host
//! server) turns an uncaught [`Error`] into an HTTP response.
//!
//! # Taxonomy
//!
//! | Kind | Variants | Handling |
//! |---|---|---|
//! | Programmer errors | `EmptyStack`, `AlreadyCalled`, `InvalidControllerType`, `MissingController` | fatal, never retried |
//! | Expected domain failures | `ValidationFailed`, `Domain` | converted to a response by a dedicated stage |
//! | Routing non-match | `RouteNotMatched` | only raised when reading a non-match as if it matched |
//! | Unexpected failures | `Internal`, `Routing`, `InvalidJson`, `Panic` | logged and converted by the error handler |

use std::fmt;
use std::panic::Location;

use http::StatusCode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Standard error type for the request pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// `process` or `handle` was invoked with no middleware left to run.
    #[error("cannot process with an empty stack")]
    EmptyStack,

    /// `handle` was invoked a second time on the same request handler.
    #[error("request handler already called, it cannot be run twice")]
    AlreadyCalled,

    /// The `controller` request attribute is absent or is not a controller.
    #[error("invalid controller type: {found}")]
    InvalidControllerType {
        /// Description of what was found instead of a controller.
        found: String,
    },

    /// A controller or attributes were requested from a route non-match.
    #[error("{0}")]
    RouteNotMatched(&'static str),

    /// A matched route was constructed without a controller.
    #[error("a matched route must always be provided a controller (route `{route}`)")]
    MissingController {
        /// Name of the offending route.
        route: String,
    },

    /// Request validation failed with field-level messages.
    #[error(transparent)]
    ValidationFailed(#[from] ValidationFailed),

    /// The request body could not be decoded as JSON.
    #[error("could not decode JSON body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The path-matching engine failed for a reason other than "no match".
    #[error("routing failed: {0}")]
    Routing(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// A classified application failure (not found, unauthenticated, ...).
    #[error("{kind}: {message}")]
    Domain {
        /// The failure class.
        kind: DomainErrorKind,
        /// Human-readable error message.
        message: String,
    },

    /// A panic raised further down the pipeline and captured by the error handler.
    #[error("panic in request pipeline: {message}")]
    Panic {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// Any other failure.
    #[error("{source}")]
    Internal {
        /// The underlying error.
        source: anyhow::Error,
        /// Where the error entered the pipeline's error type.
        location: &'static Location<'static>,
    },
}

impl Error {
    /// Wraps an arbitrary error, recording the caller's source location.
    #[track_caller]
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            source: error.into(),
            location: Location::caller(),
        }
    }

    /// Creates an internal error from a message.
    #[track_caller]
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::internal(anyhow::Error::msg(message))
    }

    /// Wraps a failure of the path-matching engine.
    pub fn routing(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Routing(Box::new(error))
    }

    /// Creates an invalid controller type error.
    pub fn invalid_controller(found: impl Into<String>) -> Self {
        Self::InvalidControllerType {
            found: found.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::domain(DomainErrorKind::NotFound, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::domain(DomainErrorKind::Authentication, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::domain(DomainErrorKind::Authorization, message)
    }

    /// Creates an input error.
    pub fn input(message: impl Into<String>) -> Self {
        Self::domain(DomainErrorKind::Input, message)
    }

    /// Creates a data storage error.
    pub fn data_storage(message: impl Into<String>) -> Self {
        Self::domain(DomainErrorKind::DataStorage, message)
    }

    fn domain(kind: DomainErrorKind, message: impl Into<String>) -> Self {
        Self::Domain {
            kind,
            message: message.into(),
        }
    }

    /// Returns the validation failure, if this is one.
    pub fn as_validation_failed(&self) -> Option<&ValidationFailed> {
        match self {
            Self::ValidationFailed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns the source location recorded for internal errors.
    pub fn location(&self) -> Option<&'static Location<'static>> {
        match self {
            Self::Internal { location, .. } => Some(location),
            _ => None,
        }
    }

    /// Returns the messages of this error and all of its sources, outermost first.
    pub fn chain(&self) -> Vec<String> {
        if let Self::Internal { source, .. } = self {
            return source.chain().map(ToString::to_string).collect();
        }

        let mut messages = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            messages.push(err.to_string());
            current = err.source();
        }
        messages
    }

    /// Returns the HTTP status code conventionally associated with this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationFailed(_) | Self::InvalidJson(_) => StatusCode::BAD_REQUEST,
            Self::RouteNotMatched(_) => StatusCode::NOT_FOUND,
            Self::Domain { kind, .. } => kind.default_status_code(),
            Self::EmptyStack
            | Self::AlreadyCalled
            | Self::InvalidControllerType { .. }
            | Self::MissingController { .. }
            | Self::Routing(_)
            | Self::Panic { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyStack => "EMPTY_STACK",
            Self::AlreadyCalled => "ALREADY_CALLED",
            Self::InvalidControllerType { .. } => "INVALID_CONTROLLER_TYPE",
            Self::RouteNotMatched(_) => "ROUTE_NOT_MATCHED",
            Self::MissingController { .. } => "MISSING_CONTROLLER",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::InvalidJson(_) => "INVALID_JSON",
            Self::Routing(_) => "ROUTING_ERROR",
            Self::Domain { kind, .. } => kind.code(),
            Self::Panic { .. } => "PANIC",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details: self
                    .as_validation_failed()
                    .and_then(|failure| serde_json::to_value(failure.errors()).ok()),
            },
        }
    }
}

impl From<anyhow::Error> for Error {
    #[track_caller]
    fn from(source: anyhow::Error) -> Self {
        Self::internal(source)
    }
}

/// Classes of application failure carried by [`Error::Domain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainErrorKind {
    /// The requested resource does not exist.
    NotFound,
    /// Invalid or missing credentials.
    Authentication,
    /// Permission denied.
    Authorization,
    /// Malformed input.
    Input,
    /// A storage backend is unavailable.
    DataStorage,
}

impl DomainErrorKind {
    /// Returns the default HTTP status code for this kind.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::Input => StatusCode::BAD_REQUEST,
            Self::DataStorage => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Authentication => "AUTHENTICATION_ERROR",
            Self::Authorization => "AUTHORIZATION_DENIED",
            Self::Input => "INPUT_ERROR",
            Self::DataStorage => "DATA_STORAGE_ERROR",
        }
    }
}

impl fmt::Display for DomainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::Authentication => "authentication failed",
            Self::Authorization => "authorization denied",
            Self::Input => "invalid input",
            Self::DataStorage => "data storage unavailable",
        })
    }
}

/// Field-level validation failure raised by a controller's validator.
///
/// # Example
///
/// ```
/// use middle_core::ValidationFailed;
///
/// let failure = ValidationFailed::new([("name", "required")]);
/// assert_eq!(failure.errors()["name"], "required");
/// assert_eq!(failure.to_string(), "Validation failed");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("Validation failed")]
pub struct ValidationFailed {
    errors: IndexMap<String, String>,
}

impl ValidationFailed {
    /// Creates a failure from `(field, message)` pairs.
    pub fn new<I, K, V>(errors: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            errors: errors
                .into_iter()
                .map(|(field, message)| (field.into(), message.into()))
                .collect(),
        }
    }

    /// Returns the field to message mapping.
    pub fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    /// Consumes the failure, returning the field to message mapping.
    pub fn into_errors(self) -> IndexMap<String, String> {
        self.errors
    }

    /// Returns the HTTP status code for validation failures.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error details (field errors for validation failures).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
