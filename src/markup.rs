//! Lenient markup parsing for the sanitizer.
//!
//! This is deliberately not a full HTML parser. It tokenizes tags, builds
//! a tree of [`Node`]s, and guarantees the properties the sanitizer needs
//! from its parser collaborator: nothing is executed, nothing is fetched,
//! and entities are never resolved (the parser has no entity
//! table at all; text passes through verbatim). Malformed input never fails; unmatched
//! markup degrades to text or is auto-closed.

use crate::codec::{encode, Context};

/// A parsed markup node.
///
/// The tree is a plain tagged union so rewriting can be a pure recursive
/// transform returning a new tree, with no mutation in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element with its tag name (lowercased), attributes in source
    /// order, and child nodes.
    Element {
        /// Lowercased tag name.
        name: String,
        /// Attributes as (name, value) pairs in source order. A value-less
        /// attribute has an empty value.
        attrs: Vec<(String, String)>,
        /// Child nodes in document order.
        children: Vec<Node>,
    },
    /// A run of character data, verbatim from the source.
    Text(String),
}

/// Elements that never have children and need no closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw character data, not markup. Their body
/// is script or style payload, never text meant for a reader.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Returns `true` if `name` is a void element.
pub(crate) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Returns `true` if `name` is a raw-text container.
pub(crate) fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// An element still waiting for its closing tag.
struct OpenElement {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

/// Parses markup into a forest of [`Node`]s.
///
/// Lenient by construction:
/// - comments (`<!-- -->`) and doctypes (`<!...>`) are skipped;
/// - a `<` that does not begin a tag is literal text;
/// - unmatched closing tags are ignored;
/// - elements still open at end of input are auto-closed in place, never
///   spilled into sibling content;
/// - `script`/`style` bodies are captured as a single raw text child.
pub fn parse(input: &str) -> Vec<Node> {
    Parser::new(input).run()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    root: Vec<Node>,
    stack: Vec<OpenElement>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            root: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Node> {
        while self.pos < self.input.len() {
            match self.rest().find('<') {
                Some(offset) => {
                    if offset > 0 {
                        let text = self.rest()[..offset].to_string();
                        self.push_text(text);
                        self.pos += offset;
                    }
                    self.consume_tag();
                }
                None => {
                    let text = self.rest().to_string();
                    self.push_text(text);
                    self.pos = self.input.len();
                }
            }
        }

        // Auto-close whatever is still open.
        while let Some(open) = self.stack.pop() {
            let node = Node::Element {
                name: open.name,
                attrs: open.attrs,
                children: open.children,
            };
            self.push_node(node);
        }

        self.root
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn push_text(&mut self, text: String) {
        if !text.is_empty() {
            self.push_node(Node::Text(text));
        }
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.root.push(node),
        }
    }

    /// Consumes one construct starting at a `<`.
    fn consume_tag(&mut self) {
        let rest = self.rest();

        if rest.starts_with("<!--") {
            self.pos += match rest.find("-->") {
                Some(end) => end + 3,
                None => rest.len(),
            };
            return;
        }

        if rest.starts_with("<!") {
            self.pos += match rest.find('>') {
                Some(end) => end + 1,
                None => rest.len(),
            };
            return;
        }

        if rest.starts_with("</") {
            self.consume_closing_tag();
            return;
        }

        let after_lt = &rest[1..];
        if after_lt.starts_with(|c: char| c.is_ascii_alphabetic()) {
            self.consume_opening_tag();
        } else {
            // A lone '<' is literal text.
            self.push_text("<".to_string());
            self.pos += 1;
        }
    }

    fn consume_closing_tag(&mut self) {
        let rest = self.rest();
        let end = match rest.find('>') {
            Some(end) => end,
            None => {
                // Truncated closing tag at EOF; drop it.
                self.pos = self.input.len();
                return;
            }
        };
        let name = rest[2..end]
            .trim()
            .trim_end_matches('/')
            .to_ascii_lowercase();
        self.pos += end + 1;

        // Pop to the matching open element, auto-closing anything above
        // it. An unmatched closing tag is ignored.
        if let Some(depth) = self.stack.iter().rposition(|open| open.name == name) {
            while self.stack.len() > depth {
                let open = self.stack.pop().expect("depth bounded by stack length");
                let node = Node::Element {
                    name: open.name,
                    attrs: open.attrs,
                    children: open.children,
                };
                self.push_node(node);
            }
        }
    }

    fn consume_opening_tag(&mut self) {
        let rest = self.rest();
        let mut cursor = 1; // past '<'

        let name_end = rest[cursor..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .map(|o| cursor + o)
            .unwrap_or(rest.len());
        let name = rest[cursor..name_end].to_ascii_lowercase();
        cursor = name_end;

        let (attrs, after_attrs, self_closing) = parse_attributes(&rest[cursor..]);
        cursor += after_attrs;
        self.pos += cursor;

        if self_closing || is_void_element(&name) {
            self.push_node(Node::Element {
                name,
                attrs,
                children: Vec::new(),
            });
            return;
        }

        if is_raw_text_element(&name) {
            let body = self.consume_raw_text(&name);
            let children = if body.is_empty() {
                Vec::new()
            } else {
                vec![Node::Text(body)]
            };
            self.push_node(Node::Element {
                name,
                attrs,
                children,
            });
            return;
        }

        self.stack.push(OpenElement {
            name,
            attrs,
            children: Vec::new(),
        });
    }

    /// Captures everything up to the matching closing tag of a raw-text
    /// element, consuming the closing tag as well.
    fn consume_raw_text(&mut self, name: &str) -> String {
        let rest = self.rest();
        let lower = rest.to_ascii_lowercase();
        let close = format!("</{name}");

        match lower.find(&close) {
            Some(start) => {
                let body = rest[..start].to_string();
                let after = &rest[start..];
                let consumed = match after.find('>') {
                    Some(gt) => start + gt + 1,
                    None => rest.len(),
                };
                self.pos += consumed;
                body
            }
            None => {
                // Unterminated raw-text element swallows the rest.
                let body = rest.to_string();
                self.pos = self.input.len();
                body
            }
        }
    }
}

/// Parses an attribute list. Returns the attributes, the byte offset just
/// past the closing `>` (relative to the given slice), and whether the
/// tag was self-closing.
fn parse_attributes(slice: &str) -> (Vec<(String, String)>, usize, bool) {
    let mut attrs = Vec::new();
    let mut chars = slice.char_indices().peekable();
    let mut self_closing = false;

    loop {
        // Skip whitespace and stray slashes.
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else if c == '/' {
                self_closing = true;
                chars.next();
            } else {
                break;
            }
        }

        match chars.peek() {
            None => return (attrs, slice.len(), self_closing),
            Some(&(i, '>')) => return (attrs, i + 1, self_closing),
            Some(_) => {}
        }

        // An attribute name resets any '/' seen earlier in the tag.
        self_closing = false;

        let name_start = chars.peek().map(|&(i, _)| i).unwrap_or(slice.len());
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() || c == '=' || c == '>' || c == '/' {
                break;
            }
            chars.next();
        }
        let name_end = chars.peek().map(|&(i, _)| i).unwrap_or(slice.len());
        let name = slice[name_start..name_end].to_ascii_lowercase();

        // Skip whitespace before a possible '='.
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }

        let value = if let Some(&(_, '=')) = chars.peek() {
            chars.next();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() {
                    chars.next();
                } else {
                    break;
                }
            }
            match chars.peek() {
                Some(&(i, quote)) if quote == '"' || quote == '\'' => {
                    chars.next();
                    let value_start = i + quote.len_utf8();
                    let mut value_end = slice.len();
                    for (j, c) in chars.by_ref() {
                        if c == quote {
                            value_end = j;
                            break;
                        }
                    }
                    slice[value_start..value_end].to_string()
                }
                Some(&(i, _)) => {
                    let value_start = i;
                    let mut value_end = slice.len();
                    while let Some(&(j, c)) = chars.peek() {
                        if c.is_whitespace() || c == '>' {
                            value_end = j;
                            break;
                        }
                        chars.next();
                    }
                    slice[value_start..value_end].to_string()
                }
                None => String::new(),
            }
        } else {
            String::new()
        };

        if !name.is_empty() {
            attrs.push((name, value));
        }
    }
}

/// Serializes a forest of nodes back to markup text.
///
/// Tag names are emitted lowercased; attribute values are quoted and
/// attribute-context escaped. Text nodes are written verbatim; callers
/// that emit the result directly must apply
/// [`encode`](crate::encode) with [`Context::HtmlText`] afterwards,
/// which is exactly what [`Sanitizer::sanitize`](crate::Sanitizer::sanitize)
/// does.
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    serialize_into(nodes, &mut out);
    out
}

fn serialize_into(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element {
                name,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(name);
                for (attr_name, attr_value) in attrs {
                    out.push(' ');
                    out.push_str(attr_name);
                    out.push_str("=\"");
                    out.push_str(encode(attr_value, Context::HtmlAttribute).as_str());
                    out.push('"');
                }
                if is_void_element(name) && children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    serialize_into(children, out);
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }
}
