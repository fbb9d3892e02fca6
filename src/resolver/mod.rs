//! # Parameter Resolver
//!
//! Produces [`BoundArguments`](crate::binder::BoundArguments) for a method from the
//! raw request body.
//!
//! The body is percent-decoded until it stops changing, parsed as JSON and
//! matched against the declared parameters by name (ignoring case). Parameters of
//! type [`RequestContext`](crate::RequestContext) are filled from the request,
//! wherever they appear in the signature. Extra JSON fields are ignored.

mod core;

pub use core::{decode_body, resolve};
