//! Recursive JSON → [`Bound`] conversion.
//!
//! Single pass, allocation-heavy and stateless: the same `(value, shape)` pair
//! always yields the same result.

use serde::Deserialize;
use serde_json::{Map, Number, Value};

use super::shape::{CompositeShape, PrimitiveKind, TypeShape};
use super::{BindError, Bound};

/// What to do when JSON `null` meets a non-nullable target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Substitute the zero value of the target shape
    #[default]
    ZeroValue,
    /// Fail with a type conversion error
    Reject,
}

/// Tunables for the binder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct BinderOptions {
    #[serde(default)]
    pub null_policy: NullPolicy,
}

impl BinderOptions {
    #[must_use]
    pub fn with_null_policy(mut self, null_policy: NullPolicy) -> Self {
        self.null_policy = null_policy;
        self
    }
}

/// Binds one JSON value to `shape`.
///
/// `path` names the value for error messages (the parameter name at the top level).
///
/// # Errors
///
/// Returns a [`BindError`] when the value cannot be coerced into the shape.
pub fn bind(
    value: &Value,
    shape: &TypeShape,
    path: &str,
    options: &BinderOptions,
) -> Result<Bound, BindError> {
    match shape {
        TypeShape::Nullable(inner) => {
            if value.is_null() {
                Ok(Bound::Null)
            } else {
                bind(value, inner, path, options)
            }
        }
        TypeShape::Any => Ok(Bound::Json(value.clone())),
        TypeShape::RequestContext => Err(BindError::new(
            path,
            shape.describe(),
            "the request context is supplied by the dispatcher, not the request body",
        )),
        _ if value.is_null() => match options.null_policy {
            NullPolicy::ZeroValue => zero_value(shape, path),
            NullPolicy::Reject => Err(BindError::new(
                path,
                shape.describe(),
                "null is not allowed for a non-nullable type",
            )),
        },
        TypeShape::Primitive(kind) => bind_primitive(value, *kind, path),
        TypeShape::Array { element, len } => match value {
            Value::Array(items) => {
                if let Some(expected) = len {
                    if *expected != items.len() {
                        return Err(BindError::new(
                            path,
                            shape.describe(),
                            format!("expected {expected} elements, found {}", items.len()),
                        ));
                    }
                }
                bind_elements(items, element, path, options).map(Bound::Array)
            }
            other => Err(mismatch(path, shape, other)),
        },
        TypeShape::List(element) => match value {
            Value::Array(items) => bind_elements(items, element, path, options).map(Bound::List),
            other => Err(mismatch(path, shape, other)),
        },
        TypeShape::Composite(composite) => match value {
            Value::Object(map) => bind_composite(map, composite, path, options),
            Value::Array(_) => Err(mismatch(path, shape, value)),
            scalar => bind_scalar_composite(scalar, composite, path, options),
        },
    }
}

/// Zero value of a shape: what an unmatched member or a coerced `null` becomes.
///
/// # Errors
///
/// Fails only for shapes that have no zero value (the request context).
pub fn zero_value(shape: &TypeShape, path: &str) -> Result<Bound, BindError> {
    Ok(match shape {
        TypeShape::Primitive(kind) => match kind {
            PrimitiveKind::Bool => Bound::Bool(false),
            PrimitiveKind::I8
            | PrimitiveKind::I16
            | PrimitiveKind::I32
            | PrimitiveKind::I64
            | PrimitiveKind::Isize => Bound::Int(0),
            PrimitiveKind::U8
            | PrimitiveKind::U16
            | PrimitiveKind::U32
            | PrimitiveKind::U64
            | PrimitiveKind::Usize => Bound::UInt(0),
            PrimitiveKind::F32 | PrimitiveKind::F64 => Bound::Float(0.0),
            PrimitiveKind::Char => Bound::Char('\0'),
            PrimitiveKind::String => Bound::Str(String::new()),
        },
        TypeShape::Any => Bound::Json(Value::Null),
        TypeShape::Nullable(_) => Bound::Null,
        TypeShape::Array {
            element,
            len: Some(len),
        } => {
            let zero = zero_value(element, path)?;
            Bound::Array(vec![zero; *len])
        }
        TypeShape::Array { len: None, .. } => Bound::Array(Vec::new()),
        TypeShape::List(_) => Bound::List(Vec::new()),
        TypeShape::Composite(composite) => {
            let mut members = Vec::with_capacity(composite.members.len());
            for member in &composite.members {
                let member_path = join(path, member.name);
                members.push((member.name, zero_value(&(member.shape)(), &member_path)?));
            }
            Bound::Composite {
                name: composite.name,
                members,
            }
        }
        TypeShape::RequestContext => {
            return Err(BindError::new(
                path,
                shape.describe(),
                "the request context has no zero value",
            ))
        }
    })
}

/// Finds the first key of `map` equal to `name` ignoring case.
pub fn find_field<'a>(map: &'a Map<String, Value>, name: &str) -> Option<(&'a str, &'a Value)> {
    map.iter()
        .find(|(key, _)| eq_ignore_case(key, name))
        .map(|(key, value)| (key.as_str(), value))
}

/// Unicode-aware case-insensitive comparison.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn bind_elements(
    items: &[Value],
    element: &TypeShape,
    path: &str,
    options: &BinderOptions,
) -> Result<Vec<Bound>, BindError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| bind(item, element, &format!("{path}[{i}]"), options))
        .collect()
}

fn bind_composite(
    map: &Map<String, Value>,
    composite: &CompositeShape,
    path: &str,
    options: &BinderOptions,
) -> Result<Bound, BindError> {
    let mut members = Vec::with_capacity(composite.members.len());
    for member in &composite.members {
        let shape = (member.shape)();
        let member_path = join(path, member.name);
        let value = match find_field(map, member.name) {
            Some((_, value)) => bind(value, &shape, &member_path, options)?,
            None => zero_value(&shape, &member_path)?,
        };
        members.push((member.name, value));
    }
    Ok(Bound::Composite {
        name: composite.name,
        members,
    })
}

/// A scalar can only become a composite that wraps exactly one member.
fn bind_scalar_composite(
    scalar: &Value,
    composite: &CompositeShape,
    path: &str,
    options: &BinderOptions,
) -> Result<Bound, BindError> {
    match composite.members.as_slice() {
        [member] => {
            let shape = (member.shape)();
            let value = bind(scalar, &shape, &join(path, member.name), options)?;
            Ok(Bound::Composite {
                name: composite.name,
                members: vec![(member.name, value)],
            })
        }
        _ => Err(BindError::new(
            path,
            composite.name,
            format!(
                "cannot convert {} into a composite with {} members",
                json_kind(scalar),
                composite.members.len()
            ),
        )),
    }
}

fn bind_primitive(value: &Value, kind: PrimitiveKind, path: &str) -> Result<Bound, BindError> {
    let fail = |reason: String| BindError::new(path, kind.as_str(), reason);
    match kind {
        PrimitiveKind::String => match value {
            Value::String(s) => Ok(Bound::Str(s.clone())),
            Value::Number(n) => Ok(Bound::Str(n.to_string())),
            Value::Bool(b) => Ok(Bound::Str(b.to_string())),
            other => Err(fail(format!("found {}", json_kind(other)))),
        },
        PrimitiveKind::Bool => match value {
            Value::Bool(b) => Ok(Bound::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Bound::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Bound::Bool(false)),
            other => Err(fail(format!("found {}", describe_value(other)))),
        },
        PrimitiveKind::Char => match value {
            Value::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Bound::Char(c)),
                    _ => Err(fail(format!("expected a single character, found {s:?}"))),
                }
            }
            other => Err(fail(format!("found {}", json_kind(other)))),
        },
        PrimitiveKind::F32 | PrimitiveKind::F64 => {
            let number = scalar_number(value).map_err(&fail)?;
            let float = number
                .as_f64()
                .ok_or_else(|| fail(format!("{number} is not representable")))?;
            if kind == PrimitiveKind::F32 && float.is_finite() && (float as f32).is_infinite() {
                return Err(fail(format!("{number} overflows f32")));
            }
            Ok(Bound::Float(float))
        }
        _ => {
            let number = scalar_number(value).map_err(&fail)?;
            bind_integer(&number, kind).map_err(fail)
        }
    }
}

/// Strict integer conversion: out-of-range or fractional values are errors.
fn bind_integer(number: &Number, kind: PrimitiveKind) -> Result<Bound, String> {
    let as_i128 = if let Some(i) = number.as_i64() {
        i128::from(i)
    } else if let Some(u) = number.as_u64() {
        i128::from(u)
    } else {
        let f = number
            .as_f64()
            .ok_or_else(|| format!("{number} is not a number"))?;
        if f.fract() != 0.0 || !f.is_finite() {
            return Err(format!("{number} is not an integer"));
        }
        if f < i128::MIN as f64 || f > i128::MAX as f64 {
            return Err(format!("{number} overflows {}", kind.as_str()));
        }
        f as i128
    };

    if let Some((min, max)) = kind.signed_range() {
        if as_i128 < i128::from(min) || as_i128 > i128::from(max) {
            return Err(format!("{number} overflows {}", kind.as_str()));
        }
        return i64::try_from(as_i128)
            .map(Bound::Int)
            .map_err(|_| format!("{number} overflows {}", kind.as_str()));
    }
    if let Some(max) = kind.unsigned_max() {
        if as_i128 < 0 || as_i128 > i128::from(max) {
            return Err(format!("{number} overflows {}", kind.as_str()));
        }
        return u64::try_from(as_i128)
            .map(Bound::UInt)
            .map_err(|_| format!("{number} overflows {}", kind.as_str()));
    }
    Err(format!("{} is not an integer type", kind.as_str()))
}

/// Numbers pass through; numeric strings are parsed.
fn scalar_number(value: &Value) -> Result<Number, String> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Ok(Number::from(i))
            } else if let Ok(u) = trimmed.parse::<u64>() {
                Ok(Number::from(u))
            } else {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .ok_or_else(|| format!("{s:?} is not numeric"))
            }
        }
        other => Err(format!("found {}", json_kind(other))),
    }
}

fn mismatch(path: &str, shape: &TypeShape, value: &Value) -> BindError {
    BindError::new(path, shape.describe(), format!("found {}", json_kind(value)))
}

fn join(path: &str, member: &str) -> String {
    if path.is_empty() {
        member.to_string()
    } else {
        format!("{path}.{member}")
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => json_kind(value).to_string(),
        scalar => format!("{} {scalar}", json_kind(scalar)),
    }
}
