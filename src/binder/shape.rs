//! Static target-type descriptors.
//!
//! A [`TypeShape`] is the binder's view of a Rust type: enough structure to walk a
//! JSON tree against it, nothing more. Shapes are produced by [`Bindable::shape`]
//! and by the `#[derive(Bindable)]` macro.
//!
//! [`Bindable::shape`]: super::Bindable::shape

use std::fmt;

/// Primitive ("core") target types that accept a direct scalar conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Char,
    String,
}

impl PrimitiveKind {
    /// Rust spelling of the primitive, used in error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String => "String",
        }
    }

    /// Inclusive range accepted by a signed integer kind.
    pub(crate) fn signed_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::I8 => Some((i8::MIN.into(), i8::MAX.into())),
            Self::I16 => Some((i16::MIN.into(), i16::MAX.into())),
            Self::I32 => Some((i32::MIN.into(), i32::MAX.into())),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            Self::Isize => Some((
                i64::try_from(isize::MIN).unwrap_or(i64::MIN),
                i64::try_from(isize::MAX).unwrap_or(i64::MAX),
            )),
            _ => None,
        }
    }

    /// Inclusive upper bound accepted by an unsigned integer kind.
    pub(crate) fn unsigned_max(&self) -> Option<u64> {
        match self {
            Self::U8 => Some(u8::MAX.into()),
            Self::U16 => Some(u16::MAX.into()),
            Self::U32 => Some(u32::MAX.into()),
            Self::U64 => Some(u64::MAX),
            Self::Usize => Some(u64::try_from(usize::MAX).unwrap_or(u64::MAX)),
            _ => None,
        }
    }
}

/// One writable member of a composite target type.
///
/// The shape is stored as a function pointer and only evaluated when the binder
/// descends into the member, so self-referencing types (`struct Node { children:
/// Vec<Node> }`) describe themselves without infinite recursion.
#[derive(Clone, Copy)]
pub struct MemberShape {
    /// Member name as matched against JSON keys (case-insensitively)
    pub name: &'static str,
    /// Lazily evaluated member shape
    pub shape: fn() -> TypeShape,
}

impl MemberShape {
    #[must_use]
    pub const fn new(name: &'static str, shape: fn() -> TypeShape) -> Self {
        Self { name, shape }
    }
}

impl fmt::Debug for MemberShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberShape")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A named struct with writable members.
#[derive(Debug, Clone)]
pub struct CompositeShape {
    pub name: &'static str,
    pub members: Vec<MemberShape>,
}

impl CompositeShape {
    #[must_use]
    pub fn new(name: &'static str, members: Vec<MemberShape>) -> Self {
        Self { name, members }
    }
}

/// Closed description of a binder target type.
#[derive(Debug, Clone)]
pub enum TypeShape {
    /// Directly convertible scalar type
    Primitive(PrimitiveKind),
    /// Untyped JSON (`serde_json::Value`); accepts anything as-is
    Any,
    /// Nullable wrapper (`Option<T>`)
    Nullable(Box<TypeShape>),
    /// Fixed-size sequence. `len` is `Some(n)` for `[T; N]` and `None` when the
    /// length is taken from the JSON array (`Box<[T]>`).
    Array {
        element: Box<TypeShape>,
        len: Option<usize>,
    },
    /// Growable collection (`Vec<T>`, `VecDeque<T>`)
    List(Box<TypeShape>),
    /// Struct with named members
    Composite(CompositeShape),
    /// Ambient request context; filled by the resolver, never from JSON
    RequestContext,
}

impl TypeShape {
    /// Returns `true` when this shape is the ambient request context.
    #[must_use]
    pub fn is_request_context(&self) -> bool {
        matches!(self, Self::RequestContext)
    }

    /// Human-readable type name used in `TypeConversion` errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Primitive(kind) => kind.as_str().to_string(),
            Self::Any => "json".to_string(),
            Self::Nullable(inner) => format!("Option<{}>", inner.describe()),
            Self::Array {
                element,
                len: Some(len),
            } => format!("[{}; {len}]", element.describe()),
            Self::Array { element, len: None } => format!("Box<[{}]>", element.describe()),
            Self::List(element) => format!("Vec<{}>", element.describe()),
            Self::Composite(composite) => composite.name.to_string(),
            Self::RequestContext => "RequestContext".to_string(),
        }
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
