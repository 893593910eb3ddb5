//! Built-in middleware stages.
//!
//! Every stage implements [`Middleware`](crate::Middleware) and can be pushed
//! onto an [`ApplicationStack`](crate::ApplicationStack) in any order. The
//! conventional arrangement, top of the stack first:
//!
//! | Stage | Middleware                          | Purpose                                        |
//! |-------|-------------------------------------|------------------------------------------------|
//! | 1     | [`ErrorHandlerMiddleware`]          | Turn failures and panics into a response       |
//! | 2     | [`JsonRequestParserMiddleware`]     | Decode JSON bodies                             |
//! | 3     | [`SessionMiddleware`]               | Load and persist the session                   |
//! | 4     | [`RoutingMiddleware`]               | Resolve the controller and route parameters    |
//! | 5     | [`FilterValidationMiddleware`]      | Filter, then validate, through the controller  |
//! | 6     | [`ControllerRunner`]                | Execute the controller                         |
//!
//! [`RequestFilterMiddleware`] and [`RequestValidatorMiddleware`] split stage 5
//! in two for stacks that need something in between.

pub mod controller_runner;
pub mod error_handler;
pub mod filter_validation;
pub mod json_parser;
pub mod request_filter;
pub mod request_validator;
pub mod routing;
pub mod session;

pub use controller_runner::ControllerRunner;
pub use error_handler::ErrorHandlerMiddleware;
pub use filter_validation::FilterValidationMiddleware;
pub use json_parser::{JsonRequestParserMiddleware, DEFAULT_JSON_CONTENT_TYPE};
pub use request_filter::RequestFilterMiddleware;
pub use request_validator::{RequestValidatorMiddleware, ValidationErrorHandler};
pub use routing::RoutingMiddleware;
pub use session::{
    MemorySessionProcessor, SessionMiddleware, SessionProcessor, DEFAULT_SESSION_COOKIE,
};
