use crate::allowlist::AllowListPolicy;
use crate::codec::{encode, Context, EncodedOutput};
use crate::markup::{self, Node};

/// A policy-driven markup sanitizer.
///
/// The sanitizer parses markup into a tree, rewrites the tree against an
/// [`AllowListPolicy`], serializes it back to text, and finally encodes
/// the result for the HTML text context. The rewrite is a pure recursive
/// transform returning a new tree; unaffected subtrees are rebuilt, never
/// mutated in place.
///
/// # Rewrite rules
///
/// - An allowed element is kept; its attributes are filtered to the
///   policy's permitted set for that tag, others dropped silently.
/// - A disallowed element is discarded but its children are re-attached
///   at its position in its parent: content survives, structural wrapping
///   does not, and nothing is auto-closed into sibling content.
/// - Raw-text containers (`script`, `style`) are the exception: their
///   body is executable payload, not reader-facing content, so a
///   disallowed one is dropped wholesale, body included.
/// - Text nodes pass through unchanged into the rebuilt tree.
///
/// # Order of operations
///
/// Sanitize first, encode second. Encoding first would turn permitted
/// tags into inert escaped text and defeat the allow-list; encoding after
/// the rewrite renders any residual reserved character inert, including
/// those inside retained attribute values.
///
/// # Examples
///
/// ```
/// use sink_guard::{AllowListPolicy, Sanitizer};
///
/// let policy = AllowListPolicy::builder()
///     .allow_element("p")
///     .allow_element("strong")
///     .build()
///     .unwrap();
/// let sanitizer = Sanitizer::new(policy);
///
/// let out = sanitizer.sanitize(
///     "You <p>user login</p> is <strong>owasp-user01</strong><script>alert(22)</script>",
/// );
/// assert_eq!(
///     out.as_str(),
///     "You &lt;p&gt;user login&lt;/p&gt; is &lt;strong&gt;owasp-user01&lt;/strong&gt;"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Sanitizer {
    policy: AllowListPolicy,
}

impl Sanitizer {
    /// Creates a sanitizer over the given policy.
    pub fn new(policy: AllowListPolicy) -> Self {
        Self { policy }
    }

    /// Returns the policy this sanitizer enforces.
    pub fn policy(&self) -> &AllowListPolicy {
        &self.policy
    }

    /// Parses, rewrites and serializes `markup` without the final
    /// encoding step.
    ///
    /// The result contains only policy-approved tags and attributes but
    /// may still carry reserved characters in text content. Callers that
    /// emit it directly must encode it first; [`sanitize`](Self::sanitize)
    /// does exactly that and is the right call for untrusted output.
    pub fn clean(&self, markup: &str) -> String {
        let tree = markup::parse(markup);
        let filtered = self.filter_nodes(tree);
        markup::serialize(&filtered)
    }

    /// Sanitizes `markup` and encodes the result for the HTML text
    /// context.
    ///
    /// Output is a pure function of `(markup, policy)`; no external state
    /// is consulted.
    pub fn sanitize(&self, markup: &str) -> EncodedOutput {
        encode(&self.clean(markup), Context::HtmlText)
    }

    /// Rewrites a forest of nodes against the policy.
    fn filter_nodes(&self, nodes: Vec<Node>) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Text(text) => out.push(Node::Text(text)),
                Node::Element {
                    name,
                    attrs,
                    children,
                } => {
                    if self.policy.allows_element(&name) {
                        let kept_attrs = attrs
                            .into_iter()
                            .filter(|(attr, _)| self.policy.allows_attribute(&name, attr))
                            .collect();
                        out.push(Node::Element {
                            name,
                            attrs: kept_attrs,
                            children: self.filter_nodes(children),
                        });
                    } else if markup::is_raw_text_element(&name) {
                        // Executable payload, dropped with its container.
                    } else {
                        // Unwrap: children take the element's position.
                        out.extend(self.filter_nodes(children));
                    }
                }
            }
        }
        out
    }
}
