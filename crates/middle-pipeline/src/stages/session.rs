//! Session loading and persistence stage.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::header::{COOKIE, SET_COOKIE};
use http::HeaderValue;
use indexmap::IndexMap;
use middle_core::{
    Error, MemorySession, Request, RequestExt, Response, SharedSession, SESSION_ATTRIBUTE,
};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::handler::RequestHandler;
use crate::middleware::Middleware;

/// Loads a session into the request and persists it from the response.
pub trait SessionProcessor: Send + Sync {
    /// Attaches the session to the request under [`SESSION_ATTRIBUTE`].
    fn process_request(&self, request: Request) -> Result<Request, Error>;

    /// Persists the session carried by `request` and updates the response.
    fn process_response(&self, request: &Request, response: Response) -> Result<Response, Error>;
}

/// Wraps the rest of the stack in a [`SessionProcessor`].
///
/// Errors from the rest of the stack skip [`SessionProcessor::process_response`].
pub struct SessionMiddleware {
    processor: Arc<dyn SessionProcessor>,
}

impl SessionMiddleware {
    /// Creates the stage over `processor`.
    pub fn new(processor: impl SessionProcessor + 'static) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }
}

impl Middleware for SessionMiddleware {
    fn name(&self) -> &'static str {
        "session"
    }

    fn process(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error> {
        let request = self.processor.process_request(request)?;
        let response = handler.handle(request.clone())?;
        self.processor.process_response(&request, response)
    }
}

impl fmt::Debug for SessionMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMiddleware").finish_non_exhaustive()
    }
}

/// Cookie name used by [`MemorySessionProcessor::new`].
pub const DEFAULT_SESSION_COOKIE: &str = "session_id";

/// Identifier presented by the client, kept in the request extensions.
#[derive(Debug, Clone)]
struct SessionCookie(Option<String>);

type SessionStore = HashMap<String, IndexMap<String, Value>>;

/// Process-local [`SessionProcessor`] backed by [`MemorySession`].
///
/// Sessions are identified by a cookie. A changed session is stored under its
/// identifier, and a fresh identifier is issued for new sessions and after
/// [`Session::rotate_id`]. Emptied sessions
/// are dropped and their cookie expired.
#[derive(Clone)]
pub struct MemorySessionProcessor {
    cookie_name: String,
    store: Arc<Mutex<SessionStore>>,
}

impl MemorySessionProcessor {
    /// Creates a processor using the [`DEFAULT_SESSION_COOKIE`] cookie.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cookie_name(DEFAULT_SESSION_COOKIE)
    }

    /// Creates a processor using a custom cookie name.
    pub fn with_cookie_name(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            store: Arc::default(),
        }
    }

    /// Returns the number of stored sessions.
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    /// Returns true when no session is stored.
    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    fn cookie_value(&self, request: &Request) -> Option<String> {
        request
            .headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.to_string())
    }

    fn set_cookie(&self, response: &mut Response, value: &str, expire: bool) -> Result<(), Error> {
        let mut cookie = format!("{}={value}; Path=/; HttpOnly; SameSite=Lax", self.cookie_name);
        if expire {
            cookie.push_str("; Max-Age=0");
        }
        let header = HeaderValue::from_str(&cookie).map_err(Error::internal)?;
        response.headers_mut().append(SET_COOKIE, header);
        Ok(())
    }
}

impl Default for MemorySessionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProcessor for MemorySessionProcessor {
    fn process_request(&self, mut request: Request) -> Result<Request, Error> {
        let id = self.cookie_value(&request);
        let stored = id.as_ref().and_then(|id| self.store.lock().get(id).cloned());
        // Unknown identifiers start over with a fresh session.
        let id = stored.as_ref().and(id);

        let session: SharedSession = Arc::new(MemorySession::new(stored.unwrap_or_default()));
        request.extensions_mut().insert(SessionCookie(id));
        Ok(request.with_attribute(SESSION_ATTRIBUTE, session))
    }

    fn process_response(
        &self,
        request: &Request,
        mut response: Response,
    ) -> Result<Response, Error> {
        let Some(session) = request.session() else {
            return Ok(response);
        };
        let current = request
            .extensions()
            .get::<SessionCookie>()
            .and_then(|cookie| cookie.0.clone());

        if session.is_empty() {
            if let Some(id) = current {
                self.store.lock().remove(&id);
                self.set_cookie(&mut response, "", true)?;
                debug!(session = %id, "session removed");
            }
            return Ok(response);
        }

        if !session.has_changed() && !session.rotate_requested() {
            return Ok(response);
        }

        let id = match current {
            Some(id) if !session.rotate_requested() => id,
            previous => {
                if let Some(previous) = previous {
                    self.store.lock().remove(&previous);
                }
                let id = Uuid::now_v7().to_string();
                self.set_cookie(&mut response, &id, false)?;
                id
            }
        };
        self.store.lock().insert(id.clone(), session.to_map());
        debug!(session = %id, "session stored");
        Ok(response)
    }
}

impl fmt::Debug for MemorySessionProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySessionProcessor")
            .field("cookie_name", &self.cookie_name)
            .field("sessions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{FnMiddleware, SharedMiddleware};
    use bytes::Bytes;
    use http::StatusCode;
    use middle_core::ResponseExt;
    use serde_json::json;

    fn request(cookie: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Bytes::new()).unwrap()
    }

    fn run(
        processor: &MemorySessionProcessor,
        cookie: Option<&str>,
        action: fn(&SharedSession),
    ) -> Response {
        let controller: SharedMiddleware =
            FnMiddleware::new("controller", move |request: Request, _handler| {
                let session = request.session().expect("session attribute is set");
                action(&session);
                let user = session.get("user").unwrap_or(Value::Null);
                Ok(Response::text(StatusCode::OK, user.to_string()))
            })
            .into();
        let mut handler = RequestHandler::new(vec![controller]);
        SessionMiddleware::new(processor.clone())
            .process(request(cookie), &mut handler)
            .unwrap()
    }

    fn issued_cookie(response: &Response) -> Option<String> {
        let header = response.headers().get(SET_COOKIE)?.to_str().ok()?;
        let (pair, _) = header.split_once(';')?;
        Some(pair.to_string())
    }

    #[test]
    fn test_new_session_is_stored_and_reloaded() {
        let processor = MemorySessionProcessor::new();
        let response = run(&processor, None, |session| session.set("user", json!("alice")));
        let cookie = issued_cookie(&response).unwrap();
        assert!(cookie.starts_with("session_id="));
        assert_eq!(processor.len(), 1);

        let response = run(&processor, Some(&format!("theme=dark; {cookie}")), |_| {});
        assert_eq!(response.body(), "\"alice\"");
        assert!(issued_cookie(&response).is_none());
    }

    #[test]
    fn test_untouched_session_is_not_stored() {
        let processor = MemorySessionProcessor::new();
        let response = run(&processor, None, |_| {});
        assert!(issued_cookie(&response).is_none());
        assert!(processor.is_empty());
    }

    #[test]
    fn test_unknown_identifier_starts_over() {
        let processor = MemorySessionProcessor::new();
        let response = run(&processor, Some("session_id=forged"), |session| {
            session.set("user", json!("mallory"));
        });
        let cookie = issued_cookie(&response).unwrap();
        assert_ne!(cookie, "session_id=forged");
    }

    #[test]
    fn test_rotate_issues_new_identifier() {
        let processor = MemorySessionProcessor::new();
        let first = issued_cookie(&run(&processor, None, |session| {
            session.set("user", json!("bob"));
        }))
        .unwrap();

        let second = issued_cookie(&run(&processor, Some(&first), |session| session.rotate_id()))
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(processor.len(), 1);

        let response = run(&processor, Some(&second), |_| {});
        assert_eq!(response.body(), "\"bob\"");
        let response = run(&processor, Some(&first), |_| {});
        assert_eq!(response.body(), "null");
    }

    #[test]
    fn test_destroy_expires_cookie() {
        let processor = MemorySessionProcessor::new();
        let cookie = issued_cookie(&run(&processor, None, |session| {
            session.set("user", json!("carol"));
        }))
        .unwrap();

        let response = run(&processor, Some(&cookie), |session| session.destroy());
        let header = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(header.contains("Max-Age=0"));
        assert!(processor.is_empty());
    }

    #[test]
    fn test_flash_survives_one_request() {
        let processor = MemorySessionProcessor::new();
        let cookie = issued_cookie(&run(&processor, None, |session| {
            session.set("user", json!("dave"));
            session.set_flash("notice", json!("saved"));
        }))
        .unwrap();

        let seen = run(&processor, Some(&cookie), |session| {
            assert_eq!(session.get_flash("notice"), Some(json!("saved")));
        });
        assert!(issued_cookie(&seen).is_none());

        run(&processor, Some(&cookie), |session| {
            assert!(!session.has_flash("notice"));
        });
    }

    #[test]
    fn test_errors_skip_persistence() {
        let processor = MemorySessionProcessor::new();
        let failing: SharedMiddleware =
            FnMiddleware::new("failing", |request: Request, _handler| {
                request
                    .session()
                    .expect("session attribute is set")
                    .set("user", json!("eve"));
                Err(Error::msg("boom"))
            })
            .into();
        let mut handler = RequestHandler::new(vec![failing]);
        let result = SessionMiddleware::new(processor.clone()).process(request(None), &mut handler);
        assert!(result.is_err());
        assert!(processor.is_empty());
    }
}
