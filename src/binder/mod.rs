//! # Binder Module
//!
//! Converts loosely typed JSON values into the statically typed arguments a
//! service method expects.
//!
//! ## Overview
//!
//! Binding happens in two steps:
//!
//! 1. **Shape walk**: [`bind`] walks a `serde_json::Value` against a [`TypeShape`]
//!    and produces a [`Bound`] tree. This is where all coercion rules live
//!    (numeric strings, case-insensitive member matching, null handling).
//!
//! 2. **Materialisation**: [`Bindable::from_bound`] turns the [`Bound`] tree into
//!    the concrete Rust value. This step cannot fail for a tree produced against
//!    the type's own shape.
//!
//! ## Coercion rules
//!
//! - `null` into `Option<T>` is `None`; into anything else it follows
//!   [`NullPolicy`] (zero value by default)
//! - integers are range-checked; integral floats (`3.0`) and numeric strings
//!   (`"42"`) are accepted, fractional values are not
//! - numbers and booleans are accepted where a `String` is expected
//! - object keys match struct members ignoring case; the first key in document
//!   order wins, unknown keys are ignored and missing members get zero values
//! - a scalar binds into a struct with exactly one member
//!
//! ## Example
//!
//! ```rust
//! use jsonrest::binder::{bind, Bindable, BinderOptions};
//! use serde_json::json;
//!
//! let shape = <Vec<u8>>::shape();
//! let bound = bind(&json!([1, "2", 3.0]), &shape, "bytes", &BinderOptions::default()).unwrap();
//! assert_eq!(Vec::<u8>::from_bound(bound).unwrap(), vec![1, 2, 3]);
//! ```

mod bindable;
mod bound;
mod core;
mod error;
mod shape;

pub use bindable::Bindable;
pub use bound::{ArgumentCursor, Bound, BoundArgument, BoundArguments, Members};
pub use core::{bind, eq_ignore_case, find_field, zero_value, BinderOptions, NullPolicy};
pub use error::BindError;
pub use shape::{CompositeShape, MemberShape, PrimitiveKind, TypeShape};
