use std::fmt;

use crate::bind::BindingError;
use crate::validator::ValidationError;

/// Errors produced anywhere in the toolkit.
///
/// The taxonomy separates recoverable rejections from programming errors:
///
/// - [`Error::Validation`]: input was rejected; the caller re-prompts or
///   discards. Recoverable.
/// - [`Error::Policy`]: a sanitizer/validator policy or query template is
///   malformed. This is a construction-time programming error and never
///   reaches end users.
/// - [`Error::Binding`]: a bind call failed before any execution
///   collaborator was invoked, so a partially-bound query can never run.
///   Recoverable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Input rejected by a [`ValidationPolicy`](crate::ValidationPolicy) check.
    Validation(ValidationError),
    /// Malformed policy or template, detected at construction time.
    Policy(PolicyError),
    /// Placeholder/value mismatch detected during binding.
    Binding(BindingError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(e) => write!(f, "validation failed: {}", e),
            Error::Policy(e) => write!(f, "policy error: {}", e),
            Error::Binding(e) => write!(f, "binding failed: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<PolicyError> for Error {
    fn from(e: PolicyError) -> Self {
        Error::Policy(e)
    }
}

impl From<BindingError> for Error {
    fn from(e: BindingError) -> Self {
        Error::Binding(e)
    }
}

/// A malformed or unusable policy/template, detected at construction time.
///
/// Policy errors are caller programming errors, not data errors: they are
/// surfaced once when the policy object is built and must never be shown
/// to end users. Every constructor in this crate returns `Result<_,
/// PolicyError>` rather than panicking, so a misconfigured service fails
/// at startup instead of at request time.
///
/// # Examples
///
/// ```
/// use sink_guard::{PolicyError, PolicyErrorKind, ValidationPolicy};
///
/// let err = ValidationPolicy::builder()
///     .max_length(0)
///     .charset("[a-z]")
///     .build()
///     .unwrap_err();
/// assert_eq!(err.kind(), PolicyErrorKind::EmptyPolicy);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyError {
    kind: PolicyErrorKind,
    message: String,
}

impl PolicyError {
    /// Creates a new policy error.
    pub(crate) fn new(kind: PolicyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> PolicyErrorKind {
        self.kind
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PolicyError {}

/// Kind of policy construction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyErrorKind {
    /// The charset allow-list pattern failed to compile.
    InvalidCharset,
    /// The policy admits nothing (zero max length, empty allow-list entry).
    EmptyPolicy,
    /// A query template is malformed (empty or duplicate placeholder name).
    InvalidTemplate,
    /// An element or attribute name in an allow-list is not a valid name.
    InvalidName,
}

impl fmt::Display for PolicyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCharset => write!(f, "invalid charset pattern"),
            Self::EmptyPolicy => write!(f, "policy admits nothing"),
            Self::InvalidTemplate => write!(f, "invalid template"),
            Self::InvalidName => write!(f, "invalid name"),
        }
    }
}
