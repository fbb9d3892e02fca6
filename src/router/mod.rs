//! # Router Module
//!
//! Turns the methods of a [`Service`](crate::service::Service) into routes and
//! matches request paths against them.
//!
//! ## Overview
//!
//! Every dispatchable method `foo` gets the path `/foo`. The matcher accepts the
//! path in any case, with an optional trailing slash and an optional query
//! string, so `/foo`, `/Foo/` and `/FOO?x=1` all reach the same route while
//! `/food` does not.
//!
//! The table is built once and never changes. Lookup is a linear scan in
//! declaration order; the first match wins.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use jsonrest::router::Router;
//!
//! struct Clock;
//!
//! #[jsonrest::service]
//! impl Clock {
//!     pub fn now(&self) -> u64 {
//!         0
//!     }
//! }
//!
//! let router = Router::build(Arc::new(Clock)).unwrap();
//! let route = router.route("/NOW/").unwrap();
//! assert_eq!(route.name(), "Clock.now");
//! assert!(router.route("/nowhere").is_none());
//! ```

mod core;
mod route;

pub use core::Router;
pub use route::{Callback, Invocation, PanicError, Route, INPUT_FORMAT_ERROR, OUTPUT_FORMAT_ERROR};
