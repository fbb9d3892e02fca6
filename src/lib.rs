//! # jsonrest
//!
//! **jsonrest** exposes the public methods of a Rust service as JSON-over-HTTP
//! endpoints. Each method `foo` answers at `/foo`; the request body is a JSON
//! object whose fields are bound, by name and ignoring case, to the method's
//! typed parameters.
//!
//! ## Overview
//!
//! ```rust
//! use std::sync::Arc;
//! use jsonrest::{Bindable, Dispatcher, IncomingRequest};
//!
//! #[derive(Bindable)]
//! pub struct Address {
//!     street: String,
//!     zip: u32,
//! }
//!
//! pub struct People;
//!
//! #[jsonrest::service]
//! impl People {
//!     pub fn greet(&self, name: String, age: u8) -> String {
//!         format!("{name} is {age}")
//!     }
//!
//!     pub fn zip_of(&self, address: Address) -> u32 {
//!         address.zip
//!     }
//! }
//!
//! let dispatcher = Dispatcher::new(Arc::new(People));
//! let response = dispatcher.handle(
//!     &IncomingRequest::new("/Greet").with_body(r#"{"NAME":"Ann","age":5}"#),
//! );
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body["response"], "Ann is 5");
//! ```
//!
//! ## Architecture
//!
//! - **[`binder`]** - JSON → typed value conversion driven by [`binder::TypeShape`]
//! - **[`resolver`]** - Request body → method arguments
//! - **[`service`]** - Method descriptors and the [`Service`] trait behind `#[service]`
//! - **[`router`]** - Route table, path matching, auth gate and invocation
//! - **[`dispatcher`]** - HTTP-agnostic entry point and response rendering
//! - **[`session`]** - Session sources for `#[requires_auth]` methods
//! - **[`trace`]** - Call tracing for `#[log_io]` methods
//! - **[`config`]**, **[`registry`]**, **[`logging`]**, **[`cli`]** - Host plumbing
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as HTTP host
//!     participant D as Dispatcher
//!     participant R as Router
//!     participant Route
//!     participant Res as Resolver
//!     participant S as Service
//!
//!     Host->>D: handle(IncomingRequest)
//!     D->>D: normalize_path, build RequestContext
//!     D->>R: route(path)
//!     R-->>D: first matching Route
//!     D->>Route: check_auth(sessions, ctx)
//!     Route-->>D: false → 401
//!     D->>Route: invoke(body)
//!     Route->>Res: resolve(body, descriptor, ctx)
//!     Res-->>Route: BoundArguments
//!     Route->>S: method(args)
//!     S-->>Route: result or error
//!     Route-->>D: Value or DispatchError
//!     D-->>Host: HandlerResponse
//! ```
//!
//! ## Errors
//!
//! Binding failures ([`DispatchError::MalformedInput`],
//! [`DispatchError::MissingParameter`], [`DispatchError::TypeConversion`]) are
//! client errors. Errors returned by, or panics raised in, the service method are
//! [`DispatchError::TargetFailure`], unless the method returns a [`Fault`], which
//! asks for a `400` with an error code.

extern crate self as jsonrest;

pub mod binder;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod ids;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod router;
pub mod service;
pub mod session;
pub mod trace;

pub use binder::{BindError, Bindable, BinderOptions, NullPolicy};
pub use config::HandlerConfig;
pub use context::RequestContext;
pub use dispatcher::{Dispatcher, HandlerResponse, IncomingRequest};
pub use error::{DispatchError, Fault};
pub use jsonrest_macros::{service, Bindable};
pub use registry::ServiceRegistry;
pub use router::{Route, Router};
pub use service::Service;
pub use session::{SessionSource, SessionStore};
