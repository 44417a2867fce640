//! Injection-defense toolkit: context-aware encoding, sanitization and
//! parameter binding for untrusted data.
//!
//! Untrusted data is only dangerous relative to the grammar of the sink
//! it reaches. A single escaping function is therefore unsafe; this crate
//! provides one safe representation per sink:
//!
//! - [`encode`]: contextual output encoding for HTML text, HTML
//!   attributes, and append-only log lines ([`Context`])
//! - [`Sanitizer`] + [`AllowListPolicy`]: policy-driven markup
//!   sanitization that strips everything not explicitly permitted
//! - [`ValidationPolicy`]: allow-list input validation applied before
//!   values reach any binder or sanitizer
//! - [`Template`]/[`bind_sql`], [`FilterBuilder`], [`XPathTemplate`]/
//!   [`bind_xpath`]: parameterized binding that keeps values out-of-band
//!   from SQL text, document-store filters, and XPath expressions
//! - [`InjectionGuard`]: the configured entry point wiring it together
//!
//! Every component is a stateless pure transform: build policies once,
//! share them read-only, call from as many threads as you like.
//!
//! # Examples
//!
//! ```
//! use sink_guard::{bind_sql, Bindings, Template};
//!
//! let template =
//!     Template::parse("select * from color where friendly_name = :name").unwrap();
//! let mut values = Bindings::new();
//! values.insert("name", "yellow").unwrap();
//!
//! let query = bind_sql(&template, &values).unwrap();
//! assert_eq!(query.text(), "select * from color where friendly_name = ?");
//! assert!(!query.text().contains("yellow"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod allowlist;
mod bind;
mod codec;
mod error;
mod input;
pub mod markup;
mod orchestrator;
mod sanitizer;
mod validator;

pub use allowlist::{AllowListPolicy, AllowListPolicyBuilder};
pub use bind::{
    bind_sql, bind_xpath, BindingError, BindingErrorKind, Bindings, BoundValue, FilterBuilder,
    FilterExpr, FilterOp, SqlQuery, Template, ValueType, VariableResolver, XPathQuery,
    XPathTemplate,
};
pub use codec::{encode, Context, EncodedOutput};
pub use error::{Error, PolicyError, PolicyErrorKind};
pub use input::RawInput;
pub use orchestrator::{InjectionGuard, InjectionGuardBuilder};
pub use sanitizer::Sanitizer;
pub use validator::{
    ValidationError, ValidationErrorKind, ValidationPolicy, ValidationPolicyBuilder,
};
