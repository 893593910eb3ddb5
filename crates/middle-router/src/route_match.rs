//! Route resolution results.

use std::fmt;

use indexmap::IndexMap;
use middle_core::{Error, SharedController};
use serde_json::Value;

/// The result of resolving a request against a route table.
///
/// A non-match is a regular value, not an error. Reading the controller or
/// attributes of a non-match fails with [`Error::RouteNotMatched`].
#[derive(Clone)]
pub enum RouteMatch {
    /// A route matched.
    Matched {
        /// Name of the matched route.
        name: String,
        /// Controller produced by the route's factory.
        controller: SharedController,
        /// Route defaults overlaid with the decoded path variables.
        attributes: IndexMap<String, Value>,
    },
    /// No route matched.
    NotMatched,
}

impl RouteMatch {
    /// Creates a match.
    pub fn matched(
        name: impl Into<String>,
        controller: SharedController,
        attributes: IndexMap<String, Value>,
    ) -> Self {
        Self::Matched {
            name: name.into(),
            controller,
            attributes,
        }
    }

    /// Creates a match from an optional controller.
    ///
    /// Fails with [`Error::MissingController`] when `controller` is `None`.
    pub fn try_new(
        name: impl Into<String>,
        controller: Option<SharedController>,
        attributes: IndexMap<String, Value>,
    ) -> Result<Self, Error> {
        let name = name.into();
        match controller {
            Some(controller) => Ok(Self::matched(name, controller, attributes)),
            None => Err(Error::MissingController { route: name }),
        }
    }

    /// Returns true for a match.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// Returns the matched route name, or an empty string for a non-match.
    pub fn name(&self) -> &str {
        match self {
            Self::Matched { name, .. } => name,
            Self::NotMatched => "",
        }
    }

    /// Returns the matched controller.
    pub fn controller(&self) -> Result<&SharedController, Error> {
        match self {
            Self::Matched { controller, .. } => Ok(controller),
            Self::NotMatched => Err(Error::RouteNotMatched(
                "an unmatched route does not have a controller",
            )),
        }
    }

    /// Returns the matched attributes.
    pub fn attributes(&self) -> Result<&IndexMap<String, Value>, Error> {
        match self {
            Self::Matched { attributes, .. } => Ok(attributes),
            Self::NotMatched => Err(Error::RouteNotMatched(
                "an unmatched route does not have attributes",
            )),
        }
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched {
                name, attributes, ..
            } => f
                .debug_struct("Matched")
                .field("name", name)
                .field("attributes", attributes)
                .finish_non_exhaustive(),
            Self::NotMatched => f.write_str("NotMatched"),
        }
    }
}
