//! Routing for the Middle request pipeline.
//!
//! This crate maps requests to controllers and builds URLs back from route
//! names. Each path pattern is parsed and matched by [`matchit`]; this crate
//! layers route names, method sets, host constraints, regex requirements,
//! defaults and a mount prefix on top of it. Routes are tried in
//! registration order and the first one accepting the request wins.
//!
//! # Features
//!
//! - **Named routes**: every route has a unique name used for URL generation
//! - **Path Parameters**: `{id}` segments and `{*path}` catch-alls
//! - **Method Sets**: pipe-delimited, compared literally (`GET|HEAD`)
//! - **Requirements**: anchored regexes on decoded path variables
//! - **Non-match as a value**: [`RouteMatch::NotMatched`] instead of an error
//!
//! # Example
//!
//! ```rust
//! use bytes::Bytes;
//! use middle_core::{CallableController, Response};
//! use middle_router::{RouteOptions, Router};
//!
//! let mut router = Router::new("http://localhost").unwrap();
//! router
//!     .get(
//!         "hello",
//!         "/hello/{name}",
//!         || CallableController::from_fn(|_| Ok(Response::new(Bytes::from_static(b"hi")))),
//!         RouteOptions::new(),
//!     )
//!     .unwrap();
//!
//! let request = http::Request::get("/hello/world").body(Bytes::new()).unwrap();
//! let route_match = router.parse_request(&request).unwrap();
//! assert!(route_match.is_match());
//! assert_eq!(route_match.attributes().unwrap()["name"], "world");
//!
//! let request = http::Request::get("/goodbye").body(Bytes::new()).unwrap();
//! assert!(!router.parse_request(&request).unwrap().is_match());
//! ```

#![doc(html_root_url = "https://docs.rs/middle-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod generator;
mod provider;
mod route;
mod route_match;
mod router;

pub use error::RouterError;
pub use generator::UrlGenerator;
pub use provider::{RoutingProvider, RoutingProviderCollection};
pub use route::{Route, RouteConfigurator, RouteOptions};
pub use route_match::RouteMatch;
pub use router::{RouteResolver, Router};
