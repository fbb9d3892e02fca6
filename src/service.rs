//! The dispatchable surface of a service.
//!
//! A service exposes its methods through the [`Service`] trait. Implementations are
//! normally generated by `#[jsonrest::service]` on an inherent `impl` block: every
//! `pub fn` taking `&self` becomes one [`MethodEntry`], in declaration order.
//!
//! ```rust
//! use jsonrest::service::Service;
//!
//! struct Greeter;
//!
//! #[jsonrest::service]
//! impl Greeter {
//!     pub fn hello(&self, name: String) -> String {
//!         format!("hello {name}")
//!     }
//!
//!     #[requires_auth]
//!     pub fn secret(&self) -> u32 {
//!         42
//!     }
//!
//!     fn helper(&self) {}
//! }
//!
//! let methods = Greeter::methods();
//! assert_eq!(methods.len(), 2);
//! assert_eq!(methods[0].descriptor.name, "hello");
//! assert!(methods[1].descriptor.requires_auth);
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::binder::{BindError, BoundArguments, TypeShape};
use crate::error::DispatchError;

/// Outcome of a generated invoker.
pub type InvokeResult = Result<Value, InvokeError>;

/// Calls one method on a service instance with already bound arguments.
pub type Invoker<S> = fn(&S, BoundArguments) -> InvokeResult;

/// A type whose methods can be exposed as routes.
pub trait Service: Send + Sync + 'static {
    /// Name of the concrete type, used in `Type.method` display names.
    fn type_name(&self) -> &'static str;

    /// Dispatchable methods in declaration order.
    fn methods() -> Vec<MethodEntry<Self>>
    where
        Self: Sized;
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub shape: TypeShape,
}

impl ParamDescriptor {
    /// `true` when the parameter is filled from the request context, not the body.
    #[must_use]
    pub fn is_context(&self) -> bool {
        self.shape.is_request_context()
    }
}

/// Immutable description of a dispatchable method.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub params: Vec<ParamDescriptor>,
    /// Return type as written in the source
    pub return_type: &'static str,
    pub requires_auth: bool,
    pub log_io: bool,
}

impl MethodDescriptor {
    #[must_use]
    pub fn new(name: &'static str, return_type: &'static str) -> Self {
        Self {
            name,
            params: Vec::new(),
            return_type,
            requires_auth: false,
            log_io: false,
        }
    }

    /// Appends a parameter. Declaration order is binding order.
    #[must_use]
    pub fn param(mut self, name: &'static str, shape: fn() -> TypeShape) -> Self {
        self.params.push(ParamDescriptor {
            name,
            shape: shape(),
        });
        self
    }

    #[must_use]
    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    #[must_use]
    pub fn log_io(mut self, log_io: bool) -> Self {
        self.log_io = log_io;
        self
    }

    /// Parameters that must be found in the request body.
    pub fn body_params(&self) -> impl Iterator<Item = &ParamDescriptor> {
        self.params.iter().filter(|p| !p.is_context())
    }
}

/// Descriptor plus the function that calls the method.
pub struct MethodEntry<S> {
    pub descriptor: MethodDescriptor,
    pub invoke: Invoker<S>,
}

impl<S> MethodEntry<S> {
    #[must_use]
    pub fn new(descriptor: MethodDescriptor, invoke: Invoker<S>) -> Self {
        Self { descriptor, invoke }
    }
}

impl<S> std::fmt::Debug for MethodEntry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Failure inside a generated invoker.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// A bound argument could not be materialised
    #[error(transparent)]
    Arguments(#[from] BindError),
    /// The method returned an error
    #[error("{0}")]
    Target(anyhow::Error),
    /// The return value could not be serialized
    #[error(transparent)]
    Serialize(serde_json::Error),
}

impl InvokeError {
    /// Classifies the failure for the method named `method`.
    #[must_use]
    pub fn into_dispatch(self, method: &str) -> DispatchError {
        match self {
            Self::Arguments(err) => err.into(),
            Self::Target(error) => DispatchError::TargetFailure {
                method: method.to_string(),
                error,
            },
            Self::Serialize(source) => DispatchError::ResultSerialization {
                method: method.to_string(),
                source,
            },
        }
    }
}

/// Wraps a plain return value.
///
/// # Errors
///
/// Fails if the value cannot be serialized.
pub fn from_value<T: Serialize>(value: T) -> InvokeResult {
    serde_json::to_value(value).map_err(InvokeError::Serialize)
}

/// Wraps a `Result` return value; `Err` is a target failure.
///
/// # Errors
///
/// Returns [`InvokeError::Target`] for `Err` and [`InvokeError::Serialize`] if
/// the `Ok` value cannot be serialized.
pub fn from_result<T, E>(result: Result<T, E>) -> InvokeResult
where
    T: Serialize,
    E: Into<anyhow::Error>,
{
    match result {
        Ok(value) => from_value(value),
        Err(err) => Err(InvokeError::Target(err.into())),
    }
}

/// Methods without a return type produce `null`.
///
/// # Errors
///
/// Never fails; the signature matches the other wrappers.
#[allow(clippy::unnecessary_wraps)]
pub fn from_unit(_: ()) -> InvokeResult {
    Ok(Value::Null)
}
