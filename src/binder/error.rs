use thiserror::Error;

/// A JSON value could not be coerced into its target type.
///
/// `path` locates the failing value from the parameter down, e.g.
/// `address.zip` or `items[2]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot bind `{path}` as {expected}: {reason}")]
pub struct BindError {
    pub path: String,
    pub expected: String,
    pub reason: String,
}

impl BindError {
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            reason: reason.into(),
        }
    }

    /// Error raised by `Bindable::from_bound` when the bound value does not have
    /// the variant the target type expects.
    pub fn unexpected(expected: impl Into<String>, found: &super::Bound) -> Self {
        Self::new("", expected, format!("found {}", found.kind()))
    }

    /// Prefixes the path with the parameter or member that contained the value.
    #[must_use]
    pub fn within(mut self, parent: &str) -> Self {
        self.path = match (parent.is_empty(), self.path.is_empty()) {
            (true, _) => self.path,
            (false, true) => parent.to_string(),
            (false, false) if self.path.starts_with('[') => format!("{parent}{}", self.path),
            (false, false) => format!("{parent}.{}", self.path),
        };
        self
    }
}
