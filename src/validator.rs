use std::fmt;

use regex::Regex;

use crate::error::{PolicyError, PolicyErrorKind};
use crate::input::RawInput;

/// Error returned when untrusted input fails validation.
///
/// The rejection reason is typed and deterministic: for a given input and
/// policy, the same reason is always produced. The reason never contains
/// the rejected text itself, only positions and rule identifiers.
///
/// # Examples
///
/// ```
/// use sink_guard::{RawInput, ValidationErrorKind, ValidationPolicy};
///
/// let policy = ValidationPolicy::builder()
///     .max_length(5)
///     .charset("[a-z]")
///     .build()
///     .unwrap();
///
/// let err = policy.validate(&RawInput::new("toolong", "field")).unwrap_err();
/// assert_eq!(err.kind(), &ValidationErrorKind::TooLong { limit: 5 });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    kind: ValidationErrorKind,
}

impl ValidationError {
    /// Creates a new validation error.
    pub(crate) fn new(kind: ValidationErrorKind) -> Self {
        Self { kind }
    }

    /// Returns the rejection reason.
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for ValidationError {}

/// Why an input was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The input exceeds the policy's maximum length.
    TooLong {
        /// The policy's character limit.
        limit: usize,
    },
    /// A character outside the allow-list charset was found.
    DisallowedCharacter {
        /// Character index (not byte offset) of the first offender.
        index: usize,
    },
    /// A structural rule failed.
    StructuralViolation {
        /// Stable identifier of the failing rule.
        rule_id: String,
    },
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong { limit } => write!(f, "input exceeds maximum length of {}", limit),
            Self::DisallowedCharacter { index } => {
                write!(f, "disallowed character at index {}", index)
            }
            Self::StructuralViolation { rule_id } => {
                write!(f, "structural rule '{}' violated", rule_id)
            }
        }
    }
}

/// A structural predicate applied after the charset check.
///
/// Rules are pure: they inspect the input and answer pass/fail, never
/// rewriting it. Each rule carries a stable identifier that becomes the
/// rejection reason when it fails.
#[derive(Debug, Clone)]
enum StructuralCheck {
    /// Fails if any of the listed characters occurs anywhere.
    ForbidChars(Vec<char>),
    /// Fails if the sequence occurs twice in a row once spaces are
    /// removed. Catches `--`-style comment injection through characters
    /// the charset had to allow for business reasons.
    NoRepeatedSequence(String),
}

/// A named structural rule inside a [`ValidationPolicy`].
#[derive(Debug, Clone)]
struct StructuralRule {
    id: String,
    check: StructuralCheck,
}

impl StructuralRule {
    fn passes(&self, text: &str) -> bool {
        match &self.check {
            StructuralCheck::ForbidChars(chars) => !text.chars().any(|c| chars.contains(&c)),
            StructuralCheck::NoRepeatedSequence(seq) => {
                let squeezed: String = text.chars().filter(|c| *c != ' ').collect();
                let doubled = format!("{seq}{seq}");
                !squeezed.contains(&doubled)
            }
        }
    }
}

/// An allow-list input validation policy.
///
/// A policy is a pure predicate over untrusted input: a maximum length, a
/// charset allow-list (unknown characters are rejected by default; this
/// is an allow-list, never a deny-list), and an ordered list of structural
/// rules. Checks run in a fixed order (length, charset, rules in insertion
/// order) so the rejection reason is deterministic and testable.
///
/// Policies are immutable once built and safe to share across threads.
///
/// # Examples
///
/// ```
/// use sink_guard::{RawInput, ValidationPolicy};
///
/// let policy = ValidationPolicy::builder()
///     .max_length(50)
///     .charset("[a-zA-Z0-9 -]")
///     .no_repeated_sequence("no-sql-comment", "--")
///     .build()
///     .unwrap();
///
/// assert!(policy.validate(&RawInput::new("owasp-user01", "login")).is_ok());
/// assert!(policy.validate(&RawInput::new("x' or 1=1 --", "login")).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    max_length: usize,
    charset: Regex,
    rules: Vec<StructuralRule>,
}

impl ValidationPolicy {
    /// Starts building a policy.
    pub fn builder() -> ValidationPolicyBuilder {
        ValidationPolicyBuilder::new()
    }

    /// A preset matching the structural metacharacters of document-store
    /// query APIs: rejects `' " \ ; { } $` on top of a permissive charset.
    ///
    /// Used by the structured filter builder as defense in depth, even
    /// though structured construction alone already prevents injection.
    pub fn nosql_value() -> Self {
        Self::builder()
            .max_length(50)
            .charset("[^\\x00-\\x1f]")
            .forbid_chars("nosql-metacharacters", &['\'', '"', '\\', ';', '{', '}', '$'])
            .build()
            .expect("preset policy is well-formed")
    }

    /// A preset for human display names: letters, digits, spaces and
    /// hyphens, at most 50 characters, and no doubled hyphen.
    pub fn display_name() -> Self {
        Self::builder()
            .max_length(50)
            .charset("[a-zA-Z0-9 -]")
            .no_repeated_sequence("no-doubled-hyphen", "-")
            .build()
            .expect("preset policy is well-formed")
    }

    /// Validates untrusted input against this policy.
    ///
    /// Pure function of `(input, policy)`: no side effects, no external
    /// state. Checks run in order (length bound, charset allow-list,
    /// then each structural rule in insertion order) and the first
    /// failure determines the rejection reason.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] with the typed rejection reason.
    pub fn validate(&self, input: &RawInput) -> Result<(), ValidationError> {
        if input.len() > self.max_length {
            return Err(ValidationError::new(ValidationErrorKind::TooLong {
                limit: self.max_length,
            }));
        }

        for (index, ch) in input.text().chars().enumerate() {
            let mut buf = [0u8; 4];
            if !self.charset.is_match(ch.encode_utf8(&mut buf)) {
                return Err(ValidationError::new(
                    ValidationErrorKind::DisallowedCharacter { index },
                ));
            }
        }

        for rule in &self.rules {
            if !rule.passes(input.text()) {
                return Err(ValidationError::new(
                    ValidationErrorKind::StructuralViolation {
                        rule_id: rule.id.clone(),
                    },
                ));
            }
        }

        Ok(())
    }

    /// Returns the policy's maximum input length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

/// Builder for [`ValidationPolicy`].
///
/// All misconfiguration is reported from [`build`](Self::build) as a
/// [`PolicyError`]; nothing panics.
#[derive(Debug, Default)]
pub struct ValidationPolicyBuilder {
    max_length: Option<usize>,
    charset: Option<String>,
    rules: Vec<StructuralRule>,
}

impl ValidationPolicyBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum input length in characters. Required, must be
    /// greater than zero.
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Sets the charset allow-list as a regex character class, e.g.
    /// `"[a-zA-Z0-9 -]"`. Every character of the input must match it.
    /// Required.
    pub fn charset(mut self, class: impl Into<String>) -> Self {
        self.charset = Some(class.into());
        self
    }

    /// Adds a rule forbidding the listed characters, identified by
    /// `rule_id` in rejection reasons.
    pub fn forbid_chars(mut self, rule_id: impl Into<String>, chars: &[char]) -> Self {
        self.rules.push(StructuralRule {
            id: rule_id.into(),
            check: StructuralCheck::ForbidChars(chars.to_vec()),
        });
        self
    }

    /// Adds a rule rejecting two consecutive occurrences of `sequence`
    /// (spaces ignored), identified by `rule_id` in rejection reasons.
    pub fn no_repeated_sequence(
        mut self,
        rule_id: impl Into<String>,
        sequence: impl Into<String>,
    ) -> Self {
        self.rules.push(StructuralRule {
            id: rule_id.into(),
            check: StructuralCheck::NoRepeatedSequence(sequence.into()),
        });
        self
    }

    /// Builds the policy.
    ///
    /// # Errors
    ///
    /// - [`PolicyErrorKind::EmptyPolicy`] if the maximum length is missing
    ///   or zero, or the charset is missing.
    /// - [`PolicyErrorKind::InvalidCharset`] if the charset class does not
    ///   compile as a regex.
    pub fn build(self) -> Result<ValidationPolicy, PolicyError> {
        let max_length = match self.max_length {
            Some(n) if n > 0 => n,
            Some(_) => {
                return Err(PolicyError::new(
                    PolicyErrorKind::EmptyPolicy,
                    "max length must be greater than zero",
                ));
            }
            None => {
                return Err(PolicyError::new(
                    PolicyErrorKind::EmptyPolicy,
                    "max length is required",
                ));
            }
        };

        let class = self.charset.ok_or_else(|| {
            PolicyError::new(PolicyErrorKind::EmptyPolicy, "charset allow-list is required")
        })?;

        // Anchor so exactly one character must match the class.
        let charset = Regex::new(&format!("^(?:{class})$")).map_err(|e| {
            PolicyError::new(
                PolicyErrorKind::InvalidCharset,
                format!("charset class '{class}' does not compile: {e}"),
            )
        })?;

        Ok(ValidationPolicy {
            max_length,
            charset,
            rules: self.rules,
        })
    }
}
