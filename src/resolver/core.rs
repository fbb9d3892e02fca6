use serde_json::Value;
use tracing::debug;

use crate::binder::{bind, find_field, BinderOptions, Bound, BoundArguments};
use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::service::MethodDescriptor;

/// Percent-decodes `raw` repeatedly until the text stops changing.
///
/// Invalid UTF-8 is replaced, and decoding stops at the first pass that
/// would produce invalid UTF-8.
#[must_use]
pub fn decode_body(raw: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(raw).into_owned();
    loop {
        let decoded = match urlencoding::decode(&text) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => break,
        };
        if decoded == text {
            break;
        }
        text = decoded;
    }
    text
}

/// Builds the arguments of `descriptor` from a raw request body.
///
/// # Arguments
///
/// * `raw` - Request body bytes as received
/// * `descriptor` - Method whose parameters are filled
/// * `ctx` - Context handed to `RequestContext` parameters
/// * `options` - Binder tunables
///
/// # Returns
///
/// One bound value per declared parameter, in declaration order.
///
/// # Errors
///
/// * [`DispatchError::MalformedInput`] - the body is not JSON, or not an object
/// * [`DispatchError::MissingParameter`] - no field matches a parameter name
/// * [`DispatchError::TypeConversion`] - a field cannot be bound to its parameter type
pub fn resolve(
    raw: &[u8],
    descriptor: &MethodDescriptor,
    ctx: &RequestContext,
    options: &BinderOptions,
) -> Result<BoundArguments, DispatchError> {
    let mut args = BoundArguments::with_capacity(descriptor.params.len());

    // Nothing to read from the body: it is not even parsed.
    let Some(first_body_param) = descriptor.body_params().next() else {
        for param in &descriptor.params {
            args.push(param.name, Bound::Context(Box::new(ctx.clone())));
        }
        return Ok(args);
    };

    let text = decode_body(raw);
    let parsed = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).map_err(|e| {
            debug!(method = descriptor.name, error = %e, "request body is not valid JSON");
            DispatchError::MalformedInput {
                reason: e.to_string(),
                raw: String::from_utf8_lossy(raw).into_owned(),
            }
        })?
    };

    let fields = match parsed {
        Value::Object(fields) => fields,
        Value::Null => {
            return Err(DispatchError::MissingParameter {
                name: first_body_param.name.to_string(),
            })
        }
        _ => {
            return Err(DispatchError::MalformedInput {
                reason: "expected a JSON object".to_string(),
                raw: String::from_utf8_lossy(raw).into_owned(),
            })
        }
    };

    for param in &descriptor.params {
        let value = if param.is_context() {
            Bound::Context(Box::new(ctx.clone()))
        } else {
            let (_, field) = find_field(&fields, param.name).ok_or_else(|| {
                DispatchError::MissingParameter {
                    name: param.name.to_string(),
                }
            })?;
            bind(field, &param.shape, param.name, options)?
        };
        args.push(param.name, value);
    }

    Ok(args)
}
