use crate::bind::{check_correspondence, BindingError, BindingErrorKind, Bindings, BoundValue};
use crate::bind::template::Template;

/// An executable SQL query: marker text plus out-of-band parameters.
///
/// The text contains one `?` positional marker per placeholder; the
/// values travel separately, in marker order, for the driver to transmit
/// as typed parameters. No value ever appears in the text.
///
/// # Examples
///
/// ```
/// use sink_guard::{bind_sql, Bindings, Template};
///
/// let template =
///     Template::parse("select * from color where friendly_name = :name").unwrap();
/// let mut values = Bindings::new();
/// values.insert("name", "yellow").unwrap();
///
/// let query = bind_sql(&template, &values).unwrap();
/// assert_eq!(query.text(), "select * from color where friendly_name = ?");
/// assert!(!query.text().contains("yellow"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    text: String,
    params: Vec<BoundValue>,
}

impl SqlQuery {
    /// Returns the query text with positional markers.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the parameters in marker order.
    pub fn params(&self) -> &[BoundValue] {
        &self.params
    }
}

/// Binds values to a SQL template, producing an executable query.
///
/// Works uniformly for SELECT, INSERT, UPDATE and DELETE; the adapter
/// only rewrites placeholders, never interprets the statement.
///
/// # Errors
///
/// - [`BindingErrorKind::UnboundPlaceholder`] if the template references
///   a name absent from `values`.
/// - [`BindingErrorKind::UnusedValue`] if `values` supplies a name absent
///   from the template.
/// - [`BindingErrorKind::TypeMismatch`] if a value conflicts with a type
///   declared on the template via
///   [`Template::expect_type`].
pub fn bind_sql(template: &Template, values: &Bindings) -> Result<SqlQuery, BindingError> {
    check_correspondence(template.placeholders(), values)?;

    let mut params = Vec::with_capacity(template.placeholders().len());
    for name in template.placeholders() {
        let value = values.get(name).ok_or_else(|| {
            BindingError::new(BindingErrorKind::UnboundPlaceholder { name: name.clone() })
        })?;
        if let Some(expected) = template.expected_type(name) {
            let actual = value.value_type();
            if actual != expected {
                return Err(BindingError::new(BindingErrorKind::TypeMismatch {
                    name: name.clone(),
                    expected,
                    actual,
                }));
            }
        }
        params.push(value.clone());
    }

    Ok(SqlQuery {
        text: replace_placeholders(template.text(), template.placeholders()),
        params,
    })
}

/// Rewrites each `:name` occurrence to a `?` marker.
fn replace_placeholders(text: &str, placeholders: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b':' {
            if i + 1 < bytes.len() && bytes[i + 1] == b':' {
                out.push_str("::");
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
            if end > start && placeholders.iter().any(|p| p == &text[start..end]) {
                out.push('?');
                i = end;
                continue;
            }
        }
        // Safe: i is always on a character boundary here because we only
        // land on ASCII ':' or advance one char at a time below.
        let ch = text[i..].chars().next().expect("index within text");
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::ValueType;

    fn values(pairs: &[(&str, BoundValue)]) -> Bindings {
        let mut b = Bindings::new();
        for (name, value) in pairs {
            b.insert(*name, value.clone()).unwrap();
        }
        b
    }

    #[test]
    fn select_binds_to_positional_marker() {
        let template =
            Template::parse("select * from color where friendly_name = :name").unwrap();
        let query = bind_sql(&template, &values(&[("name", BoundValue::from("yellow"))])).unwrap();

        assert_eq!(query.text(), "select * from color where friendly_name = ?");
        assert_eq!(query.params(), &[BoundValue::from("yellow")]);
        assert!(!query.text().contains("yellow"));
    }

    #[test]
    fn insert_binds_parameters_in_order() {
        let template = Template::parse(
            "insert into color(friendly_name, red, green, blue) values(:name, :red, :green, :blue)",
        )
        .unwrap();
        let query = bind_sql(
            &template,
            &values(&[
                ("name", BoundValue::from("orange")),
                ("red", BoundValue::from(239i64)),
                ("green", BoundValue::from(125i64)),
                ("blue", BoundValue::from(11i64)),
            ]),
        )
        .unwrap();

        assert_eq!(
            query.text(),
            "insert into color(friendly_name, red, green, blue) values(?, ?, ?, ?)"
        );
        assert_eq!(query.params().len(), 4);
        assert_eq!(query.params()[0], BoundValue::from("orange"));
        assert_eq!(query.params()[3], BoundValue::from(11i64));
    }

    #[test]
    fn update_and_delete_bind_uniformly() {
        let update = Template::parse("update color set blue = :blue where friendly_name = :name")
            .unwrap();
        let query = bind_sql(
            &update,
            &values(&[
                ("blue", BoundValue::from(10i64)),
                ("name", BoundValue::from("orange")),
            ]),
        )
        .unwrap();
        assert_eq!(
            query.text(),
            "update color set blue = ? where friendly_name = ?"
        );
        // Parameter order follows placeholder order, not insertion order.
        assert_eq!(query.params()[0], BoundValue::from(10i64));

        let delete = Template::parse("delete from color where friendly_name = :name").unwrap();
        let query = bind_sql(&delete, &values(&[("name", BoundValue::from("orange"))])).unwrap();
        assert_eq!(query.text(), "delete from color where friendly_name = ?");
    }

    #[test]
    fn unbound_placeholder_fails() {
        let template = Template::parse("select * from t where a = :a and b = :b").unwrap();
        let err = bind_sql(&template, &values(&[("a", BoundValue::from(1i64))])).unwrap_err();
        assert_eq!(
            err.kind(),
            &BindingErrorKind::UnboundPlaceholder {
                name: "b".to_string()
            }
        );
    }

    #[test]
    fn unused_value_fails() {
        let template = Template::parse("select * from t where a = :a").unwrap();
        let err = bind_sql(
            &template,
            &values(&[
                ("a", BoundValue::from(1i64)),
                ("typo", BoundValue::from(2i64)),
            ]),
        )
        .unwrap_err();
        assert_eq!(
            err.kind(),
            &BindingErrorKind::UnusedValue {
                name: "typo".to_string()
            }
        );
    }

    #[test]
    fn declared_type_mismatch_fails() {
        let template = Template::parse("select * from t where n = :n")
            .unwrap()
            .expect_type("n", ValueType::Int)
            .unwrap();
        let err = bind_sql(&template, &values(&[("n", BoundValue::from("ten"))])).unwrap_err();
        assert_eq!(
            err.kind(),
            &BindingErrorKind::TypeMismatch {
                name: "n".to_string(),
                expected: ValueType::Int,
                actual: ValueType::Str,
            }
        );
    }

    #[test]
    fn malicious_value_never_reaches_query_text() {
        let template =
            Template::parse("select * from color where friendly_name = :name").unwrap();
        let payload = "' or 1=1 --";
        let query = bind_sql(&template, &values(&[("name", BoundValue::from(payload))])).unwrap();

        assert!(!query.text().contains(payload));
        assert!(!query.text().contains("1=1"));
        assert_eq!(query.params(), &[BoundValue::from(payload)]);
    }

    #[test]
    fn double_colon_cast_survives_rewrite() {
        let template = Template::parse("select id::text from t where a = :a").unwrap();
        let query = bind_sql(&template, &values(&[("a", BoundValue::from(1i64))])).unwrap();
        assert_eq!(query.text(), "select id::text from t where a = ?");
    }

    #[test]
    fn template_is_shareable_across_binds() {
        let template = Template::parse("select * from t where a = :a").unwrap();

        let q1 = bind_sql(&template, &values(&[("a", BoundValue::from(1i64))])).unwrap();
        let q2 = bind_sql(&template, &values(&[("a", BoundValue::from(2i64))])).unwrap();

        // Independent results; the template is unchanged.
        assert_ne!(q1.params(), q2.params());
        assert_eq!(template.text(), "select * from t where a = :a");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: bound query text never contains the raw string
            /// value, whatever the payload.
            #[test]
            fn proptest_value_stays_out_of_band(payload in ".{1,40}") {
                let template =
                    Template::parse("select * from t where c = :c").unwrap();
                let mut values = Bindings::new();
                values.insert("c", payload.clone()).unwrap();

                let query = bind_sql(&template, &values).unwrap();
                prop_assert_eq!(query.text(), "select * from t where c = ?");
                prop_assert_eq!(query.params(), &[BoundValue::Str(payload)]);
            }
        }
    }
}
