//! Concrete values produced by the binder.

use std::fmt;

use serde_json::{Map, Value};

use super::{BindError, Bindable};
use crate::context::RequestContext;

/// A value bound to a static target shape.
///
/// Unlike the raw JSON tree, every `Bound` already satisfies its target shape:
/// integers are range-checked, composites carry every member (missing ones as
/// zero values) and sequences keep the array/list distinction.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Str(String),
    Json(Value),
    /// Fixed-size sequence
    Array(Vec<Bound>),
    /// Growable collection
    List(Vec<Bound>),
    Composite {
        name: &'static str,
        members: Vec<(&'static str, Bound)>,
    },
    Context(Box<RequestContext>),
}

impl Bound {
    /// Short variant name for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "signed integer",
            Self::UInt(_) => "unsigned integer",
            Self::Float(_) => "float",
            Self::Char(_) => "char",
            Self::Str(_) => "string",
            Self::Json(_) => "json",
            Self::Array(_) => "array",
            Self::List(_) => "list",
            Self::Composite { .. } => "composite",
            Self::Context(_) => "request context",
        }
    }

    /// Renders the bound value back to JSON for logging.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::UInt(u) => Value::from(*u),
            Self::Float(f) => Value::from(*f),
            Self::Char(c) => Value::String(c.to_string()),
            Self::Str(s) => Value::String(s.clone()),
            Self::Json(v) => v.clone(),
            Self::Array(items) | Self::List(items) => {
                Value::Array(items.iter().map(Bound::to_json).collect())
            }
            Self::Composite { members, .. } => Value::Object(
                members
                    .iter()
                    .map(|(name, value)| ((*name).to_string(), value.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            Self::Context(ctx) => Value::String(format!("<request {}>", ctx.request_id)),
        }
    }

    /// Opens a composite for member-wise extraction.
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] if the value is not a composite.
    pub fn into_members(self, expected: &'static str) -> Result<Members, BindError> {
        match self {
            Self::Composite { members, .. } => Ok(Members { members }),
            other => Err(BindError::unexpected(expected, &other)),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Members of a bound composite, consumed by generated `from_bound` code.
#[derive(Debug)]
pub struct Members {
    members: Vec<(&'static str, Bound)>,
}

impl Members {
    /// Removes the named member and converts it into `T`.
    ///
    /// # Errors
    ///
    /// Fails if the member is absent or cannot be converted.
    pub fn take<T: Bindable>(&mut self, name: &'static str) -> Result<T, BindError> {
        let index = self
            .members
            .iter()
            .position(|(member, _)| *member == name)
            .ok_or_else(|| {
                BindError::new(name, std::any::type_name::<T>(), "member was not bound")
            })?;
        let (_, value) = self.members.swap_remove(index);
        T::from_bound(value).map_err(|e| e.within(name))
    }
}

/// One resolved method argument.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgument {
    pub name: &'static str,
    pub value: Bound,
}

/// Arguments for one invocation, positionally aligned with the method's
/// declared parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    arguments: Vec<BoundArgument>,
}

impl BoundArguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arguments: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: &'static str, value: Bound) {
        self.arguments.push(BoundArgument { name, value });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Argument value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Bound> {
        self.arguments.get(index).map(|arg| &arg.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundArgument> {
        self.arguments.iter()
    }

    /// Consumes the arguments in declaration order.
    #[must_use]
    pub fn into_cursor(self) -> ArgumentCursor {
        ArgumentCursor {
            inner: self.arguments.into_iter(),
        }
    }
}

impl fmt::Display for BoundArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", arg.name, arg.value)?;
        }
        Ok(())
    }
}

/// Sequential reader over [`BoundArguments`] used by generated invokers.
#[derive(Debug)]
pub struct ArgumentCursor {
    inner: std::vec::IntoIter<BoundArgument>,
}

impl ArgumentCursor {
    /// Takes the next argument and converts it into `T`.
    ///
    /// # Errors
    ///
    /// Fails if the arguments are exhausted or the value does not fit `T`.
    pub fn next_arg<T: Bindable>(&mut self, name: &'static str) -> Result<T, BindError> {
        let arg = self.inner.next().ok_or_else(|| {
            BindError::new(name, std::any::type_name::<T>(), "argument was not resolved")
        })?;
        T::from_bound(arg.value).map_err(|e| e.within(name))
    }
}
