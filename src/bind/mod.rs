//! Parameterized query binding.
//!
//! One abstraction, three grammar adapters: SQL templates compile to
//! positional bind markers ([`sql`]), document-store filters are built as
//! structured expression trees ([`nosql`]), and XPath expressions resolve
//! variables by name at evaluation time ([`xpath`]). In every adapter the
//! untrusted value travels out-of-band from the query text; nothing is
//! ever concatenated.

mod nosql;
mod sql;
mod template;
mod xpath;

pub use nosql::{FilterBuilder, FilterExpr, FilterOp};
pub use sql::{bind_sql, SqlQuery};
pub use template::Template;
pub use xpath::{bind_xpath, VariableResolver, XPathQuery, XPathTemplate};

use std::fmt;

/// A typed value supplied for a placeholder.
///
/// Created and owned by the caller; binding copies it into the produced
/// query object, retaining no reference back.
///
/// # Examples
///
/// ```
/// use sink_guard::BoundValue;
///
/// let v = BoundValue::from("yellow");
/// assert_eq!(v.value_type(), sink_guard::ValueType::Str);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    /// A text value.
    Str(String),
    /// A 64-bit integer value.
    Int(i64),
    /// A boolean value.
    Bool(bool),
    /// An explicit null.
    Null,
}

impl BoundValue {
    /// Returns the value's type tag.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Str(_) => ValueType::Str,
            Self::Int(_) => ValueType::Int,
            Self::Bool(_) => ValueType::Bool,
            Self::Null => ValueType::Null,
        }
    }
}

impl From<&str> for BoundValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for BoundValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for BoundValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for BoundValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<bool> for BoundValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// The type of a [`BoundValue`], used in mismatch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Text.
    Str,
    /// 64-bit integer.
    Int,
    /// Boolean.
    Bool,
    /// Null.
    Null,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => write!(f, "string"),
            Self::Int => write!(f, "integer"),
            Self::Bool => write!(f, "boolean"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A mapping of placeholder names to values, in insertion order.
///
/// Bindings are strict: binding the same name twice is rejected at
/// insertion time, so a typo cannot silently overwrite an earlier value.
///
/// # Examples
///
/// ```
/// use sink_guard::Bindings;
///
/// let mut values = Bindings::new();
/// values.insert("name", "yellow").unwrap();
/// assert!(values.insert("name", "orange").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, BoundValue)>,
}

impl Bindings {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`BindingErrorKind::DuplicateBinding`] if the name is
    /// already bound.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<BoundValue>,
    ) -> Result<(), BindingError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(BindingError::new(BindingErrorKind::DuplicateBinding {
                name,
            }));
        }
        self.entries.push((name, value.into()));
        Ok(())
    }

    /// Looks up a value by placeholder name.
    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the number of bound names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no names are bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Error returned when a bind call fails.
///
/// Binding errors surface before any execution collaborator is invoked,
/// so a partially-bound query can never run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingError {
    kind: BindingErrorKind,
}

impl BindingError {
    /// Creates a new binding error.
    pub(crate) fn new(kind: BindingErrorKind) -> Self {
        Self { kind }
    }

    /// Returns the error kind.
    pub fn kind(&self) -> &BindingErrorKind {
        &self.kind
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for BindingError {}

/// Kind of binding failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingErrorKind {
    /// The template references a placeholder absent from the values.
    UnboundPlaceholder {
        /// The unbound placeholder name.
        name: String,
    },
    /// The values supply a name the template never references.
    UnusedValue {
        /// The superfluous value name.
        name: String,
    },
    /// A value's type conflicts with what the adapter expects for its
    /// slot.
    TypeMismatch {
        /// The placeholder name.
        name: String,
        /// The type the adapter expects.
        expected: ValueType,
        /// The type actually supplied.
        actual: ValueType,
    },
    /// The same name was bound twice.
    DuplicateBinding {
        /// The name bound twice.
        name: String,
    },
}

impl fmt::Display for BindingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnboundPlaceholder { name } => {
                write!(f, "placeholder ':{}' has no bound value", name)
            }
            Self::UnusedValue { name } => {
                write!(f, "value '{}' matches no placeholder", name)
            }
            Self::TypeMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "placeholder '{}' expects {} but got {}",
                name, expected, actual
            ),
            Self::DuplicateBinding { name } => {
                write!(f, "name '{}' bound more than once", name)
            }
        }
    }
}

/// Checks the strict placeholder/value correspondence shared by every
/// adapter: each referenced name must be bound, each bound name must be
/// referenced.
pub(crate) fn check_correspondence(
    placeholders: &[String],
    values: &Bindings,
) -> Result<(), BindingError> {
    for name in placeholders {
        if values.get(name).is_none() {
            return Err(BindingError::new(BindingErrorKind::UnboundPlaceholder {
                name: name.clone(),
            }));
        }
    }
    for (name, _) in values.iter() {
        if !placeholders.iter().any(|p| p == name) {
            return Err(BindingError::new(BindingErrorKind::UnusedValue {
                name: name.to_string(),
            }));
        }
    }
    Ok(())
}
