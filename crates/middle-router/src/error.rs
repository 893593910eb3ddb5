//! Router errors.

use thiserror::Error;

/// Errors raised while registering routes, matching paths or generating URLs.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A route with this name is already registered.
    #[error("route `{0}` is already registered")]
    DuplicateName(String),

    /// A requirement is not a valid regular expression.
    #[error("invalid requirement for `{param}` on route `{route}`: {source}")]
    InvalidRequirement {
        /// Name of the route.
        route: String,
        /// Path variable the requirement applies to.
        param: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// The path pattern is malformed.
    #[error("route `{route}` has an invalid path: {source}")]
    InvalidPath {
        /// Name of the route.
        route: String,
        /// The matcher's insertion error.
        #[source]
        source: matchit::InsertError,
    },

    /// The base URL could not be parsed.
    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No route with this name exists.
    #[error("route `{0}` does not exist")]
    UnknownRoute(String),

    /// A path variable has neither a parameter nor a default.
    #[error("missing parameter `{param}` to generate a URL for route `{route}`")]
    MissingParameter {
        /// Name of the route.
        route: String,
        /// The missing path variable.
        param: String,
    },

    /// A parameter does not satisfy its requirement.
    #[error("parameter `{param}` for route `{route}` must match `{requirement}` (`{value}` given)")]
    InvalidParameter {
        /// Name of the route.
        route: String,
        /// The path variable.
        param: String,
        /// The requirement pattern.
        requirement: String,
        /// The rejected value.
        value: String,
    },
}

impl From<RouterError> for middle_core::Error {
    fn from(error: RouterError) -> Self {
        Self::routing(error)
    }
}
