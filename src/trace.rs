//! Call tracing for routes marked `#[log_io]`.
//!
//! The route hands every call's arguments and result to a [`TraceSink`]. A sink
//! that fails, or panics, is reported through [`TraceSink::log_error`] and the
//! request carries on.

use std::error::Error;
use std::fmt::{self, Write};

use serde_json::Value;
use tracing::{error, info};

use crate::binder::BoundArguments;

/// Receives call input/output of logged routes.
pub trait TraceSink: Send + Sync {
    /// Called with the bound arguments before the method runs.
    ///
    /// # Errors
    ///
    /// Returns an error when the call cannot be formatted.
    fn log_call_input(&self, method: &str, args: &BoundArguments) -> fmt::Result;

    /// Called with the serialized result after the method returned.
    ///
    /// # Errors
    ///
    /// Returns an error when the result cannot be formatted.
    fn log_call_output(&self, method: &str, result: &Value, args: &BoundArguments) -> fmt::Result;

    /// Reports a failure of the sink itself.
    fn log_error(&self, message: &str, error: &dyn Error);
}

/// Sink writing calls as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// `Type.method(a=1, b="x")`
    ///
    /// # Errors
    ///
    /// Propagates formatter errors.
    pub fn format_call(method: &str, args: &BoundArguments) -> Result<String, fmt::Error> {
        let mut line = String::with_capacity(method.len() + 16);
        write!(line, "{method}({args})")?;
        Ok(line)
    }

    /// `Type.method(a=1) returned (value)`
    ///
    /// # Errors
    ///
    /// Propagates formatter errors.
    pub fn format_result(
        method: &str,
        result: &Value,
        args: &BoundArguments,
    ) -> Result<String, fmt::Error> {
        let mut line = Self::format_call(method, args)?;
        write!(line, " returned ({result})")?;
        Ok(line)
    }
}

impl TraceSink for TracingSink {
    fn log_call_input(&self, method: &str, args: &BoundArguments) -> fmt::Result {
        let call = Self::format_call(method, args)?;
        info!(target: "jsonrest::trace", method, call = %call, "invoking");
        Ok(())
    }

    fn log_call_output(&self, method: &str, result: &Value, args: &BoundArguments) -> fmt::Result {
        let call = Self::format_result(method, result, args)?;
        info!(target: "jsonrest::trace", method, call = %call, "invoked");
        Ok(())
    }

    fn log_error(&self, message: &str, error: &dyn Error) {
        error!(target: "jsonrest::trace", error = %error, "{message}");
    }
}
