use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PolicyError, PolicyErrorKind};

/// A declarative allow-list of permitted markup elements and attributes.
///
/// The policy maps an element name to the set of attribute names permitted
/// on it. Absence from the map means the element is stripped by the
/// [`Sanitizer`](crate::Sanitizer), not merely de-tagged, and an
/// attribute absent from its element's set is dropped silently.
///
/// Names are matched case-insensitively (stored lowercased). Insertion
/// order is irrelevant; the map is ordered only so `Debug` output and
/// iteration are deterministic.
///
/// # Examples
///
/// ```
/// use sink_guard::AllowListPolicy;
///
/// let policy = AllowListPolicy::builder()
///     .allow_element("p")
///     .allow_element("a")
///     .allow_attribute("a", "href")
///     .build()
///     .unwrap();
///
/// assert!(policy.allows_element("p"));
/// assert!(policy.allows_attribute("a", "href"));
/// assert!(!policy.allows_attribute("a", "onclick"));
/// assert!(!policy.allows_element("script"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowListPolicy {
    elements: BTreeMap<String, BTreeSet<String>>,
}

impl AllowListPolicy {
    /// Starts building a policy.
    pub fn builder() -> AllowListPolicyBuilder {
        AllowListPolicyBuilder::new()
    }

    /// Returns `true` if the element is permitted.
    pub fn allows_element(&self, name: &str) -> bool {
        self.elements.contains_key(&name.to_ascii_lowercase())
    }

    /// Returns `true` if the attribute is permitted on the element.
    pub fn allows_attribute(&self, element: &str, attribute: &str) -> bool {
        self.elements
            .get(&element.to_ascii_lowercase())
            .is_some_and(|set| set.contains(&attribute.to_ascii_lowercase()))
    }

    /// Iterates over the permitted element names.
    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }
}

/// Builder for [`AllowListPolicy`].
#[derive(Debug, Default)]
pub struct AllowListPolicyBuilder {
    elements: BTreeMap<String, BTreeSet<String>>,
    error: Option<PolicyError>,
}

impl AllowListPolicyBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Permits an element with, initially, no attributes.
    pub fn allow_element(mut self, name: &str) -> Self {
        match check_name(name, "element") {
            Ok(lower) => {
                self.elements.entry(lower).or_default();
            }
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Permits an attribute on an element, permitting the element too if
    /// it was not already listed.
    pub fn allow_attribute(mut self, element: &str, attribute: &str) -> Self {
        match (check_name(element, "element"), check_name(attribute, "attribute")) {
            (Ok(el), Ok(attr)) => {
                self.elements.entry(el).or_default().insert(attr);
            }
            (Err(e), _) | (_, Err(e)) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Builds the policy. An empty policy is legal and strips everything.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyErrorKind::InvalidName`] if any element or
    /// attribute name was empty or contained characters outside
    /// `[a-zA-Z0-9-]`.
    pub fn build(self) -> Result<AllowListPolicy, PolicyError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(AllowListPolicy {
                elements: self.elements,
            }),
        }
    }
}

fn check_name(name: &str, what: &str) -> Result<String, PolicyError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(name.to_ascii_lowercase())
    } else {
        Err(PolicyError::new(
            PolicyErrorKind::InvalidName,
            format!("'{name}' is not a valid {what} name"),
        ))
    }
}
