/// An untrusted sequence of characters, immutable once captured.
///
/// `RawInput` marks data from untrusted sources (form fields, query
/// parameters, upstream APIs) and carries a source-context tag naming
/// where it came from, e.g. `"user-display-name"`. The tag travels with
/// the value into validation results and log events so rejections can be
/// traced to their entry point.
///
/// The raw text is deliberately not exposed through `Display` or any
/// implicit conversion: it can be inspected for validation and echoed
/// only through a codec-mediated path.
///
/// # Examples
///
/// ```
/// use sink_guard::RawInput;
///
/// let input = RawInput::new("Brooklyn", "borough-filter");
/// assert_eq!(input.origin(), "borough-filter");
/// assert_eq!(input.len(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput {
    text: String,
    origin: String,
}

impl RawInput {
    /// Captures untrusted text together with its source-context tag.
    pub fn new(text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: origin.into(),
        }
    }

    /// Returns the raw text for inspection.
    ///
    /// Validators and codecs read it through this accessor; nothing in
    /// this crate embeds it anywhere without encoding it first.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the source-context tag.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the length of the raw text in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns `true` if the raw text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

// Do NOT add Display, Deref, or AsRef<str> to RawInput. Printing or
// borrowing the raw text implicitly is exactly the reflection bug this
// crate exists to prevent; every use must go through text() so it is
// visible in review.
