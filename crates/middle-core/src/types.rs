//! HTTP message types used throughout the pipeline.
//!
//! The pipeline is synchronous, so bodies are fully buffered [`Bytes`].
//! Converting to and from a streaming server body is the host's job.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use serde::Serialize;

use crate::error::Error;

/// The HTTP request type flowing through the pipeline.
pub type Request = http::Request<Bytes>;

/// The HTTP response type produced by controllers and middleware.
pub type Response = http::Response<Bytes>;

/// Extension trait for building common responses.
pub trait ResponseExt: Sized {
    /// Creates a plain text response.
    fn text(status: StatusCode, body: impl Into<String>) -> Self;

    /// Creates a JSON response from a serializable value.
    fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Self, Error>;

    /// Creates a response with an empty body.
    fn empty(status: StatusCode) -> Self;

    /// Creates a JSON error response with a machine-readable code.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Self;

    /// Creates a JSON error response from an error, using its status code.
    fn from_error(error: &Error) -> Self;
}

impl ResponseExt for Response {
    fn text(status: StatusCode, body: impl Into<String>) -> Self {
        build(
            status,
            HeaderValue::from_static("text/plain; charset=utf-8"),
            Bytes::from(body.into()),
        )
    }

    fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value).map_err(Error::internal)?;
        Ok(build(
            status,
            HeaderValue::from_static("application/json"),
            Bytes::from(body),
        ))
    }

    fn empty(status: StatusCode) -> Self {
        let mut response = Self::new(Bytes::new());
        *response.status_mut() = status;
        response
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Self {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        build(
            status,
            HeaderValue::from_static("application/json"),
            Bytes::from(body.to_string()),
        )
    }

    fn from_error(error: &Error) -> Self {
        let body = serde_json::to_vec(&error.to_envelope()).unwrap_or_default();
        build(
            error.status_code(),
            HeaderValue::from_static("application/json"),
            Bytes::from(body),
        )
    }
}

fn build(status: StatusCode, content_type: HeaderValue, body: Bytes) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}
