//! Classified outcomes of a failed dispatch.

use http::StatusCode;
use thiserror::Error;

use crate::binder::BindError;

/// Business error that asks the host to answer `400` with an error code.
///
/// Service methods return it (through `anyhow::Error`) when the request is
/// well formed but cannot be honoured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Fault {
    pub reason: String,
    pub code: Option<String>,
}

impl Fault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Everything that can go wrong between receiving a path and returning a value.
///
/// The first three variants are binding failures: deterministic for a given body
/// and reported to the caller as client errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Body is not valid JSON after percent-decoding, or not an object
    #[error("malformed request body: {reason}")]
    MalformedInput { reason: String, raw: String },

    #[error("missing parameter `{name}`")]
    MissingParameter { name: String },

    #[error("parameter `{parameter}` cannot be converted to {expected}: {reason}")]
    TypeConversion {
        parameter: String,
        expected: String,
        reason: String,
    },

    #[error("authentication required for {method}")]
    Unauthorized { method: String },

    #[error("no route for `{path}`")]
    UnknownPath { path: String },

    /// The invoked method returned an error or panicked
    #[error("{method} failed: {error}")]
    TargetFailure {
        method: String,
        error: anyhow::Error,
    },

    #[error("cannot serialize the result of {method}")]
    ResultSerialization {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("service initialisation failed: {message}")]
    ServiceInit { message: String },
}

impl DispatchError {
    /// HTTP status the host should answer with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedInput { .. }
            | Self::MissingParameter { .. }
            | Self::TypeConversion { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::UnknownPath { .. } => StatusCode::NOT_FOUND,
            Self::TargetFailure { error, .. } if error.is::<Fault>() => StatusCode::BAD_REQUEST,
            Self::TargetFailure { .. }
            | Self::ResultSerialization { .. }
            | Self::ServiceInit { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `true` for failures caused by the request body rather than the service.
    #[must_use]
    pub fn is_binding_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedInput { .. }
                | Self::MissingParameter { .. }
                | Self::TypeConversion { .. }
        )
    }

    /// Business error raised by the target method, if that is what happened.
    #[must_use]
    pub fn target_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::TargetFailure { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The [`Fault`] a target method returned, if any.
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        self.target_error().and_then(|e| e.downcast_ref::<Fault>())
    }
}

impl From<BindError> for DispatchError {
    fn from(err: BindError) -> Self {
        Self::TypeConversion {
            parameter: err.path,
            expected: err.expected,
            reason: err.reason,
        }
    }
}
