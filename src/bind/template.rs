use crate::bind::ValueType;
use crate::error::{PolicyError, PolicyErrorKind};

/// An immutable SQL query template with named placeholders.
///
/// The template consumes already-composed query text and only governs how
/// values are bound; it is not a SQL parser. Placeholders are written
/// `:name` and must be unique within one template; a duplicate is a
/// construction-time [`PolicyError`], never a silent merge.
///
/// A `Template` is immutable and may be shared read-only across
/// concurrent binds; each bind produces an independent query object.
///
/// # Examples
///
/// ```
/// use sink_guard::Template;
///
/// let template =
///     Template::parse("select * from color where friendly_name = :name").unwrap();
/// assert_eq!(template.placeholders(), ["name"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
    /// Placeholder names in order of appearance.
    placeholders: Vec<String>,
    /// `(placeholder index, expected type)` constraints, if declared.
    expected: Vec<(usize, ValueType)>,
}

impl Template {
    /// Parses query text, extracting `:name` placeholders.
    ///
    /// A placeholder name is one or more of `[a-zA-Z0-9_]` following a
    /// `:`. A `:` followed by anything else (`::` casts, `:=`, a lone
    /// `:`) is left alone as query text.
    ///
    /// # Errors
    ///
    /// [`PolicyErrorKind::InvalidTemplate`] if the same placeholder name
    /// appears twice or the template has no text.
    pub fn parse(text: impl Into<String>) -> Result<Self, PolicyError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PolicyError::new(
                PolicyErrorKind::InvalidTemplate,
                "template text is empty",
            ));
        }

        let mut placeholders = Vec::new();
        for name in extract_placeholders(&text) {
            if placeholders.contains(&name) {
                return Err(PolicyError::new(
                    PolicyErrorKind::InvalidTemplate,
                    format!("placeholder ':{name}' appears more than once"),
                ));
            }
            placeholders.push(name);
        }

        Ok(Self {
            text,
            placeholders,
            expected: Vec::new(),
        })
    }

    /// Declares the expected value type for a placeholder, enabling
    /// type-mismatch detection at bind time.
    ///
    /// # Errors
    ///
    /// [`PolicyErrorKind::InvalidTemplate`] if the named placeholder does
    /// not exist in this template.
    pub fn expect_type(mut self, name: &str, expected: ValueType) -> Result<Self, PolicyError> {
        match self.placeholders.iter().position(|p| p == name) {
            Some(index) => {
                self.expected.retain(|(i, _)| *i != index);
                self.expected.push((index, expected));
                Ok(self)
            }
            None => Err(PolicyError::new(
                PolicyErrorKind::InvalidTemplate,
                format!("no placeholder ':{name}' to constrain"),
            )),
        }
    }

    /// Returns the raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the placeholder names in order of appearance.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Returns the declared expected type for a placeholder, if any.
    pub(crate) fn expected_type(&self, name: &str) -> Option<ValueType> {
        let index = self.placeholders.iter().position(|p| p == name)?;
        self.expected
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, t)| *t)
    }
}

/// Scans template text for `:name` placeholders, in order.
fn extract_placeholders(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b':' {
            // '::' is a cast, not a placeholder.
            if i + 1 < bytes.len() && bytes[i + 1] == b':' {
                i += 2;
                continue;
            }
            let start = i + 1;
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
            {
                end += 1;
            }
            if end > start {
                names.push(text[start..end].to_string());
                i = end;
                continue;
            }
        }
        i += 1;
    }

    names
}
