//! Views and renderers.
//!
//! A [`ViewController`] returns a [`View`] instead of a response; a
//! [`Renderer`] turns that view into the response. [`RenderingController`]
//! joins the two so a view controller can be routed like any other
//! [`Controller`].
//!
//! Templating engines live outside this crate. They only need to implement
//! [`Renderer`], usually on top of [`create_response`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use http::StatusCode;
//! use middle_core::{
//!     Controller, JsonRenderer, RedirectRenderer, RenderingController, Request, View,
//!     CONTENT_TYPE_JSON,
//! };
//!
//! let renderer = Arc::new(RedirectRenderer::new(JsonRenderer));
//! let controller = RenderingController::new(
//!     |request: &Request| {
//!         if request.uri().path() == "/old" {
//!             return View::redirect("/new", StatusCode::MOVED_PERMANENTLY);
//!         }
//!         Ok(View::new("page")
//!             .with_content_type(CONTENT_TYPE_JSON)
//!             .with_parameter("path", request.uri().path()))
//!     },
//!     renderer,
//! );
//!
//! let request = http::Request::get("/old").body(Bytes::new()).unwrap();
//! let response = controller.execute(request).unwrap();
//! assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
//! assert_eq!(response.headers()["location"], "/new");
//! ```

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, StatusCode};
use indexmap::IndexMap;
use serde_json::Value;

use crate::controller::Controller;
use crate::error::Error;
use crate::types::{Request, Response, ResponseExt};

/// Content type of HTML views.
pub const CONTENT_TYPE_HTML: &str = "text/html";

/// Content type of JSON views.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// What a view controller wants rendered.
///
/// Redirect views, built with [`View::redirect`], carry a 3xx status and a
/// `Location` header but no template, parameters or content type.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    template: String,
    parameters: IndexMap<String, Value>,
    status: StatusCode,
    content_type: String,
    headers: HeaderMap,
}

impl View {
    /// Creates an HTML view of `template` with status 200.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            parameters: IndexMap::new(),
            status: StatusCode::OK,
            content_type: CONTENT_TYPE_HTML.to_string(),
            headers: HeaderMap::new(),
        }
    }

    /// Creates a redirect to `location`.
    ///
    /// Fails unless `status` is in the 3xx range or when `location` is not a
    /// valid header value.
    pub fn redirect(location: &str, status: StatusCode) -> Result<Self, Error> {
        if !status.is_redirection() {
            return Err(Error::msg(format!(
                "redirect must have a 3xx status code, got {status}"
            )));
        }
        let location = HeaderValue::from_str(location).map_err(Error::internal)?;

        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, location);
        Ok(Self {
            template: String::new(),
            parameters: IndexMap::new(),
            status,
            content_type: String::new(),
            headers,
        })
    }

    /// Adds a template parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_parameter(key, value);
        self
    }

    /// Sets the status code.
    #[must_use]
    pub const fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets the content type, for example [`CONTENT_TYPE_JSON`].
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Adds a response header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets a template parameter in place.
    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(key.into(), value.into());
    }

    /// Sets a response header in place, replacing earlier values.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Returns the template name; empty for redirects.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the template parameters in insertion order.
    pub const fn parameters(&self) -> &IndexMap<String, Value> {
        &self.parameters
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the content type; empty for redirects.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the response headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns true for a 3xx view.
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }
}

/// Turns views into responses.
pub trait Renderer: Send + Sync + 'static {
    /// Renders `view` in the context of `request`.
    fn render(&self, request: &Request, view: &View) -> Result<Response, Error>;
}

impl<R: Renderer + ?Sized> Renderer for Arc<R> {
    fn render(&self, request: &Request, view: &View) -> Result<Response, Error> {
        (**self).render(request, view)
    }
}

/// A renderer shared between controllers.
pub type SharedRenderer = Arc<dyn Renderer>;

/// Builds the response skeleton for a view: status, headers and the
/// `Content-Type` matching the view's content type.
///
/// Only [`CONTENT_TYPE_HTML`] and [`CONTENT_TYPE_JSON`] are supported.
pub fn create_response(view: &View, body: impl Into<Bytes>) -> Result<Response, Error> {
    let content_type = match view.content_type() {
        CONTENT_TYPE_HTML => HeaderValue::from_static("text/html; charset=utf-8"),
        CONTENT_TYPE_JSON => HeaderValue::from_static("application/json"),
        other => {
            return Err(Error::msg(format!(
                "unsupported view content type `{other}`"
            )))
        }
    };

    let mut response = Response::new(body.into());
    *response.status_mut() = view.status();
    response.headers_mut().extend(view.headers().clone());
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    Ok(response)
}

/// Renders the parameters of JSON views as a JSON object.
///
/// The template name is ignored. Views with any other content type are
/// rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, _request: &Request, view: &View) -> Result<Response, Error> {
        if view.content_type() != CONTENT_TYPE_JSON {
            return Err(Error::msg(format!(
                "cannot render `{}` views as JSON",
                view.content_type()
            )));
        }
        let body = serde_json::to_vec(view.parameters()).map_err(Error::internal)?;
        create_response(view, body)
    }
}

/// Answers 3xx views with a redirect and hands every other view to the
/// wrapped renderer.
///
/// A 3xx view without a `Location` header is an error.
#[derive(Debug, Clone)]
pub struct RedirectRenderer<R> {
    inner: R,
}

impl<R: Renderer> RedirectRenderer<R> {
    /// Wraps `inner`.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Renderer> Renderer for RedirectRenderer<R> {
    fn render(&self, request: &Request, view: &View) -> Result<Response, Error> {
        if !view.is_redirect() {
            return self.inner.render(request, view);
        }
        if !view.headers().contains_key(LOCATION) {
            return Err(Error::msg(format!(
                "redirect view with status {} has no Location header",
                view.status()
            )));
        }

        let mut response = Response::empty(view.status());
        *response.headers_mut() = view.headers().clone();
        Ok(response)
    }
}

/// A controller that produces a [`View`] instead of a response.
pub trait ViewController: Send + Sync + 'static {
    /// Builds the view for `request`.
    fn view(&self, request: &Request) -> Result<View, Error>;
}

impl<F> ViewController for F
where
    F: Fn(&Request) -> Result<View, Error> + Send + Sync + 'static,
{
    fn view(&self, request: &Request) -> Result<View, Error> {
        self(request)
    }
}

/// Adapts a [`ViewController`] into a [`Controller`] by rendering its view.
pub struct RenderingController {
    controller: Arc<dyn ViewController>,
    renderer: SharedRenderer,
}

impl RenderingController {
    /// Pairs a view controller with the renderer for its views.
    pub fn new(controller: impl ViewController, renderer: SharedRenderer) -> Self {
        Self {
            controller: Arc::new(controller),
            renderer,
        }
    }
}

impl Controller for RenderingController {
    fn execute(&self, request: Request) -> Result<Response, Error> {
        let view = self.controller.view(&request)?;
        self.renderer.render(&request, &view)
    }
}

impl fmt::Debug for RenderingController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderingController").finish_non_exhaustive()
    }
}
