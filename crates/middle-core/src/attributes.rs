//! Request attributes.
//!
//! Attributes are named values attached to a request as it travels through
//! the pipeline: the routed controller, route parameters, the session, or the
//! error being handled. They are stored in the request extensions, so adding
//! one never touches headers or the body.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use middle_core::{Request, RequestExt};
//!
//! let request = Request::new(Bytes::new()).with_attribute("id", "123");
//! assert_eq!(request.param("id"), Some("123"));
//!
//! let request = request.without_attribute("id");
//! assert!(request.attribute("id").is_none());
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::controller::SharedController;
use crate::error::Error;
use crate::session::SharedSession;

/// Attribute holding the controller selected by routing.
pub const CONTROLLER_ATTRIBUTE: &str = "controller";

/// Attribute holding the error an error controller is rendering.
pub const ERROR_ATTRIBUTE: &str = "error";

/// Attribute holding the request's session.
pub const SESSION_ATTRIBUTE: &str = "session";

/// A single request attribute value.
#[derive(Clone)]
pub enum Attribute {
    /// A controller.
    Controller(SharedController),
    /// An error captured further down the pipeline.
    Error(Arc<Error>),
    /// A session.
    Session(SharedSession),
    /// Any other value, such as a route parameter.
    Value(Value),
}

impl Attribute {
    /// Returns the controller, if this attribute holds one.
    pub fn as_controller(&self) -> Option<&SharedController> {
        match self {
            Self::Controller(controller) => Some(controller),
            _ => None,
        }
    }

    /// Returns the error, if this attribute holds one.
    pub fn as_error(&self) -> Option<&Arc<Error>> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the session, if this attribute holds one.
    pub fn as_session(&self) -> Option<&SharedSession> {
        match self {
            Self::Session(session) => Some(session),
            _ => None,
        }
    }

    /// Returns the plain value, if this attribute holds one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the string value, if this attribute holds a string.
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    /// Describes the kind of value held, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Controller(_) => "controller",
            Self::Error(_) => "error",
            Self::Session(_) => "session",
            Self::Value(Value::Null) => "null",
            Self::Value(Value::Bool(_)) => "boolean",
            Self::Value(Value::Number(_)) => "number",
            Self::Value(Value::String(_)) => "string",
            Self::Value(Value::Array(_)) => "array",
            Self::Value(Value::Object(_)) => "object",
        }
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller(_) => f.write_str("Controller(..)"),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Self::Session(session) => f.debug_tuple("Session").field(session).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl From<Value> for Attribute {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<SharedController> for Attribute {
    fn from(controller: SharedController) -> Self {
        Self::Controller(controller)
    }
}

impl From<SharedSession> for Attribute {
    fn from(session: SharedSession) -> Self {
        Self::Session(session)
    }
}

impl From<Arc<Error>> for Attribute {
    fn from(error: Arc<Error>) -> Self {
        Self::Error(error)
    }
}

impl From<Error> for Attribute {
    fn from(error: Error) -> Self {
        Self::Error(Arc::new(error))
    }
}

/// Ordered attribute map stored in the request extensions.
#[derive(Clone, Debug, Default)]
pub struct Attributes {
    inner: IndexMap<String, Attribute>,
}

impl Attributes {
    /// Returns the attribute stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.inner.get(key)
    }

    /// Sets an attribute, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Attribute>) {
        self.inner.insert(key.into(), value.into());
    }

    /// Removes an attribute, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<Attribute> {
        self.inner.shift_remove(key)
    }

    /// Returns true when `key` is set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Iterates the attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.inner.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true when no attributes are set.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Into<String>, V: Into<Attribute>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// A request body that an upstream stage already decoded.
#[derive(Clone, Debug)]
struct ParsedBody(Value);

/// Attribute and parsed-body access on requests.
///
/// The `with_*`/`without_*` methods consume the request and return the
/// modified one; a middleware that wants to keep the original clones first.
pub trait RequestExt: Sized {
    /// Returns the attribute stored under `key`.
    fn attribute(&self, key: &str) -> Option<&Attribute>;

    /// Returns all attributes.
    fn attributes(&self) -> Option<&Attributes>;

    /// Returns the request with `key` set to `value`.
    fn with_attribute(self, key: impl Into<String>, value: impl Into<Attribute>) -> Self;

    /// Returns the request with `key` removed.
    fn without_attribute(self, key: &str) -> Self;

    /// Returns the controller attribute.
    ///
    /// Fails with [`Error::InvalidControllerType`] when the attribute is
    /// missing or holds something else.
    fn controller(&self) -> Result<SharedController, Error> {
        match self.attribute(CONTROLLER_ATTRIBUTE) {
            Some(Attribute::Controller(controller)) => Ok(Arc::clone(controller)),
            Some(other) => Err(Error::invalid_controller(other.kind())),
            None => Err(Error::invalid_controller("nothing")),
        }
    }

    /// Returns the error attribute.
    fn error(&self) -> Option<&Arc<Error>> {
        self.attribute(ERROR_ATTRIBUTE).and_then(Attribute::as_error)
    }

    /// Returns the session attribute.
    fn session(&self) -> Option<SharedSession> {
        self.attribute(SESSION_ATTRIBUTE)
            .and_then(Attribute::as_session)
            .cloned()
    }

    /// Returns a string attribute, typically a route parameter.
    fn param(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(Attribute::as_str)
    }

    /// Returns the decoded body, if a parsing stage stored one.
    fn parsed_body(&self) -> Option<&Value>;

    /// Returns the request with its decoded body stored.
    fn with_parsed_body(self, body: Value) -> Self;
}

impl<B> RequestExt for http::Request<B> {
    fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes().and_then(|attributes| attributes.get(key))
    }

    fn attributes(&self) -> Option<&Attributes> {
        self.extensions().get::<Attributes>()
    }

    fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Attribute>) -> Self {
        let extensions = self.extensions_mut();
        if let Some(attributes) = extensions.get_mut::<Attributes>() {
            attributes.insert(key, value);
        } else {
            let mut attributes = Attributes::default();
            attributes.insert(key, value);
            extensions.insert(attributes);
        }
        self
    }

    fn without_attribute(mut self, key: &str) -> Self {
        if let Some(attributes) = self.extensions_mut().get_mut::<Attributes>() {
            attributes.remove(key);
        }
        self
    }

    fn parsed_body(&self) -> Option<&Value> {
        self.extensions().get::<ParsedBody>().map(|body| &body.0)
    }

    fn with_parsed_body(mut self, body: Value) -> Self {
        self.extensions_mut().insert(ParsedBody(body));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::CallableController;
    use crate::session::MemorySession;
    use crate::types::{Request, Response};
    use bytes::Bytes;
    use serde_json::json;

    fn request() -> Request {
        Request::new(Bytes::new())
    }

    #[test]
    fn test_with_attribute() {
        let request = request()
            .with_attribute("id", "123")
            .with_attribute("page", json!(2));

        assert_eq!(request.param("id"), Some("123"));
        assert_eq!(request.attribute("page").unwrap().as_value(), Some(&json!(2)));
        assert_eq!(request.param("page"), None);
        assert_eq!(request.attributes().unwrap().len(), 2);
    }

    #[test]
    fn test_without_attribute_preserves_order() {
        let request = request()
            .with_attribute("a", "1")
            .with_attribute("b", "2")
            .with_attribute("c", "3")
            .without_attribute("b");

        let keys: Vec<&str> = request.attributes().unwrap().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_clone_keeps_original_attributes() {
        let original = request().with_attribute("a", "1");
        let modified = original.clone().with_attribute("a", "2");
        assert_eq!(original.param("a"), Some("1"));
        assert_eq!(modified.param("a"), Some("2"));
    }

    #[test]
    fn test_controller_attribute() {
        let controller =
            CallableController::shared(|_| Ok(Response::new(Bytes::from_static(b"ok"))));
        let request = request().with_attribute(CONTROLLER_ATTRIBUTE, controller);
        let found = request.controller().unwrap();
        assert_eq!(found.execute(Request::new(Bytes::new())).unwrap().body(), "ok");
    }

    #[test]
    fn test_controller_attribute_invalid() {
        let err = request().controller().err().unwrap();
        assert_eq!(err.to_string(), "invalid controller type: nothing");

        let err = request()
            .with_attribute(CONTROLLER_ATTRIBUTE, "not-a-controller")
            .controller()
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "invalid controller type: string");
    }

    #[test]
    fn test_error_and_session_attributes() {
        let session: SharedSession = Arc::new(MemorySession::default());
        let request = request()
            .with_attribute(ERROR_ATTRIBUTE, Error::not_found("missing"))
            .with_attribute(SESSION_ATTRIBUTE, Arc::clone(&session));

        assert_eq!(request.error().unwrap().to_string(), "not found: missing");
        assert!(Arc::ptr_eq(&request.session().unwrap(), &session));
    }

    #[test]
    fn test_parsed_body() {
        let request = request();
        assert!(request.parsed_body().is_none());

        let request = request.with_parsed_body(json!({"name": "John"}));
        assert_eq!(request.parsed_body().unwrap()["name"], "John");
    }
}
