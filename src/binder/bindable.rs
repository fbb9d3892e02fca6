use std::collections::VecDeque;

use serde_json::Value;

use super::shape::{PrimitiveKind, TypeShape};
use super::{BindError, Bound};
use crate::context::RequestContext;

/// A Rust type that method parameters can be bound to.
///
/// `shape` tells the binder how to walk the JSON; `from_bound` turns the
/// resulting [`Bound`] tree into the concrete value. Structs get both from
/// `#[derive(Bindable)]`.
pub trait Bindable: Sized {
    /// Static shape of the type.
    fn shape() -> TypeShape;

    /// Converts a value produced by binding against [`Bindable::shape`].
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] if the bound value does not match the type.
    fn from_bound(bound: Bound) -> Result<Self, BindError>;
}

macro_rules! bindable_signed {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Bindable for $ty {
            fn shape() -> TypeShape {
                TypeShape::Primitive(PrimitiveKind::$kind)
            }

            fn from_bound(bound: Bound) -> Result<Self, BindError> {
                let converted = match &bound {
                    Bound::Int(i) => <$ty>::try_from(*i).ok(),
                    Bound::UInt(u) => <$ty>::try_from(*u).ok(),
                    _ => return Err(BindError::unexpected(stringify!($ty), &bound)),
                };
                converted.ok_or_else(|| {
                    BindError::new("", stringify!($ty), format!("{bound} is out of range"))
                })
            }
        }
    )*};
}

bindable_signed! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
}

impl Bindable for f64 {
    fn shape() -> TypeShape {
        TypeShape::Primitive(PrimitiveKind::F64)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Float(f) => Ok(f),
            Bound::Int(i) => Ok(i as f64),
            Bound::UInt(u) => Ok(u as f64),
            other => Err(BindError::unexpected("f64", &other)),
        }
    }
}

impl Bindable for f32 {
    fn shape() -> TypeShape {
        TypeShape::Primitive(PrimitiveKind::F32)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        f64::from_bound(bound)
            .map(|f| f as f32)
            .map_err(|e| BindError::new(e.path, "f32", e.reason))
    }
}

impl Bindable for bool {
    fn shape() -> TypeShape {
        TypeShape::Primitive(PrimitiveKind::Bool)
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Bool(b) => Ok(b),
            other => Err(BindError::unexpected("bool", &other)),
        }
    }
}

impl Bindable for char {
    fn shape() -> TypeShape {
        TypeShape::Primitive(PrimitiveKind::Char)
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Char(c) => Ok(c),
            other => Err(BindError::unexpected("char", &other)),
        }
    }
}

impl Bindable for String {
    fn shape() -> TypeShape {
        TypeShape::Primitive(PrimitiveKind::String)
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Str(s) => Ok(s),
            other => Err(BindError::unexpected("String", &other)),
        }
    }
}

impl Bindable for Value {
    fn shape() -> TypeShape {
        TypeShape::Any
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Json(value) => Ok(value),
            other => Ok(other.to_json()),
        }
    }
}

impl<T: Bindable> Bindable for Option<T> {
    fn shape() -> TypeShape {
        TypeShape::Nullable(Box::new(T::shape()))
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Null => Ok(None),
            other => T::from_bound(other).map(Some),
        }
    }
}

fn elements<T: Bindable>(bound: Bound, expected: &str) -> Result<Vec<T>, BindError> {
    match bound {
        Bound::Array(items) | Bound::List(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| T::from_bound(item).map_err(|e| e.within(&format!("[{i}]"))))
            .collect(),
        other => Err(BindError::unexpected(expected, &other)),
    }
}

impl<T: Bindable> Bindable for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::List(Box::new(T::shape()))
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        elements(bound, "Vec")
    }
}

impl<T: Bindable> Bindable for VecDeque<T> {
    fn shape() -> TypeShape {
        TypeShape::List(Box::new(T::shape()))
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        elements(bound, "VecDeque").map(VecDeque::from)
    }
}

impl<T: Bindable> Bindable for Box<[T]> {
    fn shape() -> TypeShape {
        TypeShape::Array {
            element: Box::new(T::shape()),
            len: None,
        }
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        elements(bound, "Box<[T]>").map(Vec::into_boxed_slice)
    }
}

impl<T: Bindable, const N: usize> Bindable for [T; N] {
    fn shape() -> TypeShape {
        TypeShape::Array {
            element: Box::new(T::shape()),
            len: Some(N),
        }
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        let items: Vec<T> = elements(bound, "array")?;
        let found = items.len();
        <[T; N]>::try_from(items).map_err(|_| {
            BindError::new(
                "",
                format!("[T; {N}]"),
                format!("expected {N} elements, found {found}"),
            )
        })
    }
}

impl Bindable for RequestContext {
    fn shape() -> TypeShape {
        TypeShape::RequestContext
    }

    fn from_bound(bound: Bound) -> Result<Self, BindError> {
        match bound {
            Bound::Context(ctx) => Ok(*ctx),
            other => Err(BindError::unexpected("RequestContext", &other)),
        }
    }
}
