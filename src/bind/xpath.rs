use crate::bind::{check_correspondence, BindingError, Bindings, BoundValue};
use crate::error::{PolicyError, PolicyErrorKind};

/// A compiled XPath expression template referencing variables by name.
///
/// Variables are written `$name` inside the expression; the expression
/// text is fixed at compile time and raw values are never interpolated
/// into it. Multiple references to the same variable count as a single
/// reference.
///
/// # Examples
///
/// ```
/// use sink_guard::XPathTemplate;
///
/// let template = XPathTemplate::compile("//book[@id=$bookId]").unwrap();
/// assert_eq!(template.variables(), ["bookId"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathTemplate {
    expression: String,
    /// Variable names in order of first reference.
    variables: Vec<String>,
}

impl XPathTemplate {
    /// Compiles an expression, recording its `$name` variable references.
    ///
    /// # Errors
    ///
    /// [`PolicyErrorKind::InvalidTemplate`] if the expression is empty.
    pub fn compile(expression: impl Into<String>) -> Result<Self, PolicyError> {
        let expression = expression.into();
        if expression.trim().is_empty() {
            return Err(PolicyError::new(
                PolicyErrorKind::InvalidTemplate,
                "xpath expression is empty",
            ));
        }

        let mut variables: Vec<String> = Vec::new();
        let bytes = expression.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                if end > start {
                    let name = expression[start..end].to_string();
                    if !variables.contains(&name) {
                        variables.push(name);
                    }
                    i = end;
                    continue;
                }
            }
            i += 1;
        }

        Ok(Self {
            expression,
            variables,
        })
    }

    /// Returns the expression text.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the referenced variable names, in order of first
    /// reference.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

/// A variable-resolution context consulted by the query engine at
/// evaluation time.
///
/// Mirrors the resolver interface of XPath engines: the engine asks for
/// a variable by name while evaluating the compiled expression, and the
/// value is supplied out-of-band from the expression text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableResolver {
    vars: Vec<(String, BoundValue)>,
}

impl VariableResolver {
    /// Resolves a variable by name. Returns `None` for unknown names,
    /// which an engine reports as an evaluation error.
    pub fn resolve(&self, name: &str) -> Option<&BoundValue> {
        self.vars.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns the number of registered variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if no variables are registered.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// An executable XPath query: the compiled expression plus its resolver.
///
/// Hand both to the engine; the expression never contains a raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct XPathQuery {
    expression: String,
    resolver: VariableResolver,
}

impl XPathQuery {
    /// Returns the expression text, with `$name` references intact.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the variable resolver for the engine to consult.
    pub fn resolver(&self) -> &VariableResolver {
        &self.resolver
    }
}

/// Binds values to an XPath template, producing an executable query.
///
/// # Errors
///
/// - [`UnboundPlaceholder`](crate::BindingErrorKind::UnboundPlaceholder)
///   if the expression references a variable absent from `values`.
/// - [`UnusedValue`](crate::BindingErrorKind::UnusedValue) if `values`
///   supplies a name the expression never references.
pub fn bind_xpath(
    template: &XPathTemplate,
    values: &Bindings,
) -> Result<XPathQuery, BindingError> {
    check_correspondence(template.variables(), values)?;

    let vars = values
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();

    Ok(XPathQuery {
        expression: template.expression().to_string(),
        resolver: VariableResolver { vars },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::BindingErrorKind;

    fn values(pairs: &[(&str, BoundValue)]) -> Bindings {
        let mut b = Bindings::new();
        for (name, value) in pairs {
            b.insert(*name, value.clone()).unwrap();
        }
        b
    }

    #[test]
    fn compile_records_variable_references() {
        let template = XPathTemplate::compile("//book[@id=$bookId]").unwrap();
        assert_eq!(template.variables(), ["bookId"]);
        assert_eq!(template.expression(), "//book[@id=$bookId]");
    }

    #[test]
    fn repeated_reference_counts_once() {
        let template =
            XPathTemplate::compile("//book[@id=$id or @alt-id=$id]").unwrap();
        assert_eq!(template.variables(), ["id"]);
    }

    #[test]
    fn expression_without_variables_is_legal() {
        let template = XPathTemplate::compile("//book").unwrap();
        assert!(template.variables().is_empty());
    }

    #[test]
    fn empty_expression_is_a_construction_error() {
        let err = XPathTemplate::compile("  ").unwrap_err();
        assert_eq!(err.kind(), PolicyErrorKind::InvalidTemplate);
    }

    #[test]
    fn bind_registers_values_with_the_resolver() {
        let template = XPathTemplate::compile("//book[@id=$bookId]").unwrap();
        let query =
            bind_xpath(&template, &values(&[("bookId", BoundValue::from("bk102"))])).unwrap();

        assert_eq!(query.expression(), "//book[@id=$bookId]");
        assert_eq!(
            query.resolver().resolve("bookId"),
            Some(&BoundValue::from("bk102"))
        );
        assert_eq!(query.resolver().resolve("other"), None);
    }

    #[test]
    fn raw_value_is_never_interpolated() {
        let template = XPathTemplate::compile("//user[name=$who]").unwrap();
        let payload = "'] | //secret | //user['";
        let query = bind_xpath(&template, &values(&[("who", BoundValue::from(payload))])).unwrap();

        assert!(!query.expression().contains(payload));
        assert_eq!(query.expression(), "//user[name=$who]");
    }

    #[test]
    fn unbound_variable_fails() {
        let template = XPathTemplate::compile("//book[@id=$bookId]").unwrap();
        let err = bind_xpath(&template, &Bindings::new()).unwrap_err();
        assert_eq!(
            err.kind(),
            &BindingErrorKind::UnboundPlaceholder {
                name: "bookId".to_string()
            }
        );
    }

    #[test]
    fn unused_value_fails() {
        let template = XPathTemplate::compile("//book[@id=$bookId]").unwrap();
        let err = bind_xpath(
            &template,
            &values(&[
                ("bookId", BoundValue::from("bk102")),
                ("bookid", BoundValue::from("typo")),
            ]),
        )
        .unwrap_err();
        assert_eq!(
            err.kind(),
            &BindingErrorKind::UnusedValue {
                name: "bookid".to_string()
            }
        );
    }

    #[test]
    fn lone_dollar_is_not_a_variable() {
        let template = XPathTemplate::compile("//price[text()='$']").unwrap();
        assert!(template.variables().is_empty());
    }

    #[test]
    fn template_is_shareable_across_binds() {
        let template = XPathTemplate::compile("//book[@id=$id]").unwrap();

        let q1 = bind_xpath(&template, &values(&[("id", BoundValue::from("a"))])).unwrap();
        let q2 = bind_xpath(&template, &values(&[("id", BoundValue::from("b"))])).unwrap();

        assert_ne!(q1.resolver(), q2.resolver());
        assert_eq!(template.expression(), "//book[@id=$id]");
    }
}
