//! JSON body decoding stage.

use http::header::CONTENT_TYPE;
use middle_core::{Error, Request, RequestExt, Response};
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::handler::RequestHandler;
use crate::middleware::Middleware;

/// Content types decoded when none are configured.
pub const DEFAULT_JSON_CONTENT_TYPE: &str = "^application/json(;|$)";

/// Decodes JSON request bodies into the parsed body.
///
/// A request is decoded when its `Content-Type` matches any of the configured
/// patterns, compared case-insensitively. Other requests pass through as they
/// are. A body that is not valid JSON fails with [`Error::InvalidJson`].
#[derive(Debug, Clone)]
pub struct JsonRequestParserMiddleware {
    content_types: Vec<Regex>,
}

impl JsonRequestParserMiddleware {
    /// Creates the stage matching [`DEFAULT_JSON_CONTENT_TYPE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            content_types: vec![compile(DEFAULT_JSON_CONTENT_TYPE)
                .expect("default content type pattern is valid")],
        }
    }

    /// Creates the stage matching the given content-type patterns.
    pub fn with_content_types<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let content_types = patterns
            .into_iter()
            .map(|pattern| compile(pattern.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(Self { content_types })
    }

    fn is_json(&self, request: &Request) -> bool {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        self.content_types
            .iter()
            .any(|pattern| pattern.is_match(content_type))
    }
}

impl Default for JsonRequestParserMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

impl Middleware for JsonRequestParserMiddleware {
    fn name(&self) -> &'static str {
        "json_parser"
    }

    fn process(&self, request: Request, handler: &mut RequestHandler) -> Result<Response, Error> {
        if !self.is_json(&request) {
            return handler.handle(request);
        }

        let body = serde_json::from_slice(request.body()).map_err(Error::InvalidJson)?;
        debug!(bytes = request.body().len(), "decoded JSON request body");
        handler.handle(request.with_parsed_body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{FnMiddleware, SharedMiddleware};
    use bytes::Bytes;
    use serde_json::json;

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = http::Request::builder().method("POST").uri("/users");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Bytes::from_static(body.as_bytes())).unwrap()
    }

    fn report_parsed() -> SharedMiddleware {
        FnMiddleware::new("report", |request: Request, _handler| {
            let parsed = request.parsed_body().cloned().unwrap_or(serde_json::Value::Null);
            Ok(Response::new(Bytes::from(parsed.to_string())))
        })
        .into()
    }

    fn run(stage: &JsonRequestParserMiddleware, request: Request) -> Result<Response, Error> {
        let mut handler = RequestHandler::new(vec![report_parsed()]);
        stage.process(request, &mut handler)
    }

    #[test]
    fn test_decodes_json_body() {
        let stage = JsonRequestParserMiddleware::new();
        let response = run(
            &stage,
            request(Some("application/json; charset=utf-8"), r#"{"name":"Jane"}"#),
        )
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(parsed, json!({"name": "Jane"}));
    }

    #[test]
    fn test_content_type_is_case_insensitive() {
        let stage = JsonRequestParserMiddleware::new();
        let response = run(&stage, request(Some("Application/JSON"), "[1,2]")).unwrap();
        assert_eq!(response.body(), "[1,2]");
    }

    #[test]
    fn test_other_content_types_pass_through() {
        let stage = JsonRequestParserMiddleware::new();
        let response = run(&stage, request(Some("text/plain"), "not json")).unwrap();
        assert_eq!(response.body(), "null");

        let response = run(&stage, request(None, "not json")).unwrap();
        assert_eq!(response.body(), "null");

        let response = run(&stage, request(Some("application/jsonp"), "x")).unwrap();
        assert_eq!(response.body(), "null");
    }

    #[test]
    fn test_invalid_json_fails() {
        let stage = JsonRequestParserMiddleware::new();
        let err = run(&stage, request(Some("application/json"), "{broken")).unwrap_err();
        assert!(matches!(err, Error::InvalidJson(_)));

        let err = run(&stage, request(Some("application/json"), "")).unwrap_err();
        assert!(matches!(err, Error::InvalidJson(_)));
    }

    #[test]
    fn test_custom_content_types() {
        let stage =
            JsonRequestParserMiddleware::with_content_types([r"^application/(.+\+)?json(;|$)"])
                .unwrap();
        let response = run(&stage, request(Some("application/vnd.api+json"), "{}")).unwrap();
        assert_eq!(response.body(), "{}");

        assert!(JsonRequestParserMiddleware::with_content_types(["("]).is_err());
    }
}
