use std::fmt;

/// The destination grammar an encoded string is bound for.
///
/// Each context has its own set of reserved characters and its own escape
/// rules; encoding for the wrong context is as unsafe as not encoding at
/// all, so [`EncodedOutput`] carries its context with it.
///
/// # Examples
///
/// ```
/// use sink_guard::{encode, Context};
///
/// let out = encode("<b>hi</b>", Context::HtmlText);
/// assert_eq!(out.as_str(), "&lt;b&gt;hi&lt;/b&gt;");
/// assert_eq!(out.context(), Context::HtmlText);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    /// HTML element text content.
    HtmlText,
    /// A quoted HTML attribute value.
    HtmlAttribute,
    /// One physical line of an append-only text log.
    LogLine,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlText => write!(f, "html-text"),
            Self::HtmlAttribute => write!(f, "html-attribute"),
            Self::LogLine => write!(f, "log-line"),
        }
    }
}

/// A string guaranteed to contain no unescaped control sequence for its
/// declared target grammar.
///
/// Produced by [`encode`] or by [`Sanitizer::sanitize`](crate::Sanitizer::sanitize);
/// immutable once produced and safe to hand directly to the matching sink.
/// There is no public constructor from raw text: the only way to obtain an
/// `EncodedOutput` is through an encoding path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedOutput {
    text: String,
    context: Context,
}

impl EncodedOutput {
    /// Wraps already-encoded text. Callers must have applied the escape
    /// rules for `context` to every character of `text`.
    pub(crate) fn new_unchecked(text: String, context: Context) -> Self {
        Self { text, context }
    }

    /// Returns the encoded text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the output and returns the encoded text.
    pub fn into_string(self) -> String {
        self.text
    }

    /// Returns the context this output was encoded for.
    pub fn context(&self) -> Context {
        self.context
    }

    /// Returns the encoded length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns `true` if the encoded text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for EncodedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for EncodedOutput {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Encodes `text` for the given target grammar.
///
/// This is a pure, total function: every input character has a defined
/// mapping (identity for unreserved characters), every character of
/// arbitrary-length input is mapped, and nothing is ever truncated.
///
/// Encoding is NOT idempotent. Re-encoding an already-encoded string
/// double-escapes it (`&lt;` becomes `&amp;lt;`), so encode exactly once,
/// at the last step before the value reaches its sink.
///
/// # Contexts
///
/// - [`Context::HtmlText`]: the five HTML-reserved characters
///   (`& < > " '`) become entity references.
/// - [`Context::HtmlAttribute`]: the same five, plus backtick and `=`,
///   which can terminate or extend an attribute value in lenient parsers.
/// - [`Context::LogLine`]: carriage-return and line-feed become the
///   two-character literal escapes `\r` and `\n`, so no payload can forge
///   a line boundary and inject an extra log record.
///
/// # Examples
///
/// ```
/// use sink_guard::{encode, Context};
///
/// let line = encode("user\nadmin logged in", Context::LogLine);
/// assert_eq!(line.as_str(), "user\\nadmin logged in");
/// assert_eq!(line.as_str().lines().count(), 1);
/// ```
pub fn encode(text: &str, context: Context) -> EncodedOutput {
    let encoded = match context {
        Context::HtmlText => encode_html_text(text),
        Context::HtmlAttribute => encode_html_attribute(text),
        Context::LogLine => encode_log_line(text),
    };
    EncodedOutput::new_unchecked(encoded, context)
}

fn encode_html_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn encode_html_attribute(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            // These can terminate or extend an attribute value under
            // lenient parsing rules.
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3d;"),
            _ => out.push(ch),
        }
    }
    out
}

fn encode_log_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}
