use crate::allowlist::AllowListPolicy;
use crate::bind::{
    bind_sql, bind_xpath, Bindings, FilterBuilder, SqlQuery, Template, XPathQuery, XPathTemplate,
};
use crate::codec::{encode, Context, EncodedOutput};
use crate::error::{Error, PolicyError, PolicyErrorKind};
use crate::input::RawInput;
use crate::sanitizer::Sanitizer;
use crate::validator::ValidationPolicy;

/// The toolkit's public entry point, wiring validation, sanitization and
/// binding behind one configured object.
///
/// An `InjectionGuard` is built once from explicit policy configuration
/// and then shared read-only: every component underneath is a stateless
/// pure transform, so concurrent callers need no coordination and no
/// operation blocks or suspends. Discarding a produced value before it
/// reaches an execution collaborator is the only cancellation there is.
///
/// This is also the only layer that translates a rejection into a
/// user-visible message, and it encodes the offending input before
/// echoing it, so attacker-controlled text never reflects raw into a
/// response channel.
///
/// # Examples
///
/// ```
/// use sink_guard::{AllowListPolicy, InjectionGuard, RawInput, ValidationPolicy};
///
/// let guard = InjectionGuard::builder()
///     .validation(ValidationPolicy::display_name())
///     .allow_list(
///         AllowListPolicy::builder()
///             .allow_element("p")
///             .allow_element("strong")
///             .build()
///             .unwrap(),
///     )
///     .build()
///     .unwrap();
///
/// assert!(guard.check(&RawInput::new("Brooklyn", "borough")).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct InjectionGuard {
    validation: ValidationPolicy,
    sanitizer: Sanitizer,
    filters: FilterBuilder,
}

impl InjectionGuard {
    /// Starts building a guard.
    pub fn builder() -> InjectionGuardBuilder {
        InjectionGuardBuilder::default()
    }

    /// Validates untrusted input against the configured policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] with the typed rejection reason.
    pub fn check(&self, input: &RawInput) -> Result<(), Error> {
        match self.validation.validate(input) {
            Ok(()) => {
                tracing::debug!(origin = %input.origin(), "input accepted");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(origin = %input.origin(), reason = %e, "input rejected");
                Err(e.into())
            }
        }
    }

    /// Sanitizes markup against the configured allow-list and encodes it
    /// for the HTML text context.
    pub fn render_html(&self, markup: &str) -> EncodedOutput {
        let out = self.sanitizer.sanitize(markup);
        tracing::debug!(bytes = out.len(), "markup sanitized");
        out
    }

    /// Neutralizes a message for the log-line context: the result is
    /// exactly one physical line, whatever the payload.
    pub fn log_line(&self, message: &str) -> EncodedOutput {
        encode(message, Context::LogLine)
    }

    /// Validates then binds values to a SQL template.
    ///
    /// # Errors
    ///
    /// [`Error::Binding`] on any placeholder/value mismatch, before any
    /// execution collaborator is involved.
    pub fn bind_sql(&self, template: &Template, values: &Bindings) -> Result<SqlQuery, Error> {
        let query = bind_sql(template, values)?;
        tracing::debug!(params = query.params().len(), "sql template bound");
        Ok(query)
    }

    /// Returns the structured-filter builder, configured with the
    /// standard metacharacter-excluding value policy.
    pub fn filters(&self) -> &FilterBuilder {
        &self.filters
    }

    /// Binds values to a compiled XPath template.
    ///
    /// # Errors
    ///
    /// [`Error::Binding`] on any variable/value mismatch.
    pub fn bind_xpath(
        &self,
        template: &XPathTemplate,
        values: &Bindings,
    ) -> Result<XPathQuery, Error> {
        let query = bind_xpath(template, values)?;
        tracing::debug!(vars = query.resolver().len(), "xpath template bound");
        Ok(query)
    }

    /// Formats a user-visible rejection message for failed input.
    ///
    /// The offending text is passed through the codec before inclusion,
    /// first for the HTML text context and then for the log-line
    /// context, so the message is safe to write into a response body or
    /// a log line without reflecting raw attacker input. Neither pass
    /// introduces characters the other escapes, so the order does not
    /// double-escape.
    pub fn rejection_message(&self, input: &RawInput, error: &Error) -> String {
        let echoed = encode(
            encode(input.text(), Context::HtmlText).as_str(),
            Context::LogLine,
        );
        format!(
            "input from '{}' was rejected ({}): {}",
            input.origin(),
            error,
            echoed
        )
    }
}

/// Builder for [`InjectionGuard`].
///
/// Both policies are explicit configuration with no defaults; a guard
/// with a policy you never chose is worse than a build error.
#[derive(Debug, Default)]
pub struct InjectionGuardBuilder {
    validation: Option<ValidationPolicy>,
    allow_list: Option<AllowListPolicy>,
}

impl InjectionGuardBuilder {
    /// Sets the input validation policy. Required.
    pub fn validation(mut self, policy: ValidationPolicy) -> Self {
        self.validation = Some(policy);
        self
    }

    /// Sets the markup allow-list policy. Required.
    pub fn allow_list(mut self, policy: AllowListPolicy) -> Self {
        self.allow_list = Some(policy);
        self
    }

    /// Builds the guard.
    ///
    /// # Errors
    ///
    /// [`PolicyErrorKind::EmptyPolicy`] if either policy is missing.
    pub fn build(self) -> Result<InjectionGuard, PolicyError> {
        let validation = self.validation.ok_or_else(|| {
            PolicyError::new(PolicyErrorKind::EmptyPolicy, "validation policy is required")
        })?;
        let allow_list = self.allow_list.ok_or_else(|| {
            PolicyError::new(PolicyErrorKind::EmptyPolicy, "allow-list policy is required")
        })?;

        Ok(InjectionGuard {
            validation,
            sanitizer: Sanitizer::new(allow_list),
            filters: FilterBuilder::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::BoundValue;
    use crate::validator::ValidationErrorKind;

    fn guard() -> InjectionGuard {
        InjectionGuard::builder()
            .validation(ValidationPolicy::display_name())
            .allow_list(
                AllowListPolicy::builder()
                    .allow_element("p")
                    .allow_element("strong")
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_validation_policy() {
        let err = InjectionGuard::builder()
            .allow_list(AllowListPolicy::builder().build().unwrap())
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), PolicyErrorKind::EmptyPolicy);
    }

    #[test]
    fn builder_requires_allow_list_policy() {
        let err = InjectionGuard::builder()
            .validation(ValidationPolicy::display_name())
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), PolicyErrorKind::EmptyPolicy);
    }

    #[test]
    fn check_accepts_and_rejects_per_policy() {
        let guard = guard();
        assert!(guard.check(&RawInput::new("Brooklyn", "borough")).is_ok());

        let err = guard
            .check(&RawInput::new("x' or 1=1", "borough"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn render_html_applies_allow_list_then_encodes() {
        let guard = guard();
        let out = guard.render_html("<p>hi</p><script>alert(1)</script>");
        assert_eq!(out.as_str(), "&lt;p&gt;hi&lt;/p&gt;");
    }

    #[test]
    fn log_line_neutralizes_boundaries() {
        let guard = guard();
        let out = guard.log_line("a\r\nb");
        assert_eq!(out.as_str(), "a\\r\\nb");
        assert_eq!(out.context(), Context::LogLine);
    }

    #[test]
    fn bind_sql_delegates_with_errors_surfaced() {
        let guard = guard();
        let template = Template::parse("select * from t where a = :a").unwrap();

        let err = guard.bind_sql(&template, &Bindings::new()).unwrap_err();
        assert!(matches!(err, Error::Binding(_)));

        let mut values = Bindings::new();
        values.insert("a", BoundValue::from(1i64)).unwrap();
        assert!(guard.bind_sql(&template, &values).is_ok());
    }

    #[test]
    fn bind_xpath_delegates_with_errors_surfaced() {
        let guard = guard();
        let template = XPathTemplate::compile("//book[@id=$id]").unwrap();

        let mut values = Bindings::new();
        values.insert("id", "bk102").unwrap();
        let query = guard.bind_xpath(&template, &values).unwrap();
        assert_eq!(query.expression(), "//book[@id=$id]");
    }

    #[test]
    fn filters_use_the_metacharacter_policy() {
        let guard = guard();
        assert!(guard.filters().eq("borough", "Brooklyn").is_ok());
        assert!(guard.filters().eq("borough", "x$where").is_err());
    }

    #[test]
    fn rejection_message_never_echoes_raw_input() {
        let guard = guard();
        let payload = "<script>alert('pwn')</script>";
        let input = RawInput::new(payload, "comment");
        let err = guard.check(&input).unwrap_err();

        let message = guard.rejection_message(&input, &err);
        assert!(!message.contains(payload));
        assert!(!message.contains('<'));
        assert!(message.contains("comment"));
        assert!(message.contains("&lt;script&gt;"));
    }

    #[test]
    fn rejection_message_never_forges_a_log_record() {
        let guard = guard();
        let payload = "x!\n2026-08-30 INFO forged admin login";
        let input = RawInput::new(payload, "login");
        let err = guard.check(&input).unwrap_err();

        let message = guard.rejection_message(&input, &err);
        // One physical line, whatever boundary characters the payload
        // carried; the boundary arrives as its two-character escape.
        assert!(!message.contains('\n'));
        assert!(!message.contains('\r'));
        assert_eq!(message.lines().count(), 1);
        assert!(message.contains("x!\\n2026-08-30"));
    }

    #[test]
    fn rejection_reason_survives_into_message() {
        let guard = guard();
        let input = RawInput::new("toolongtoolongtoolongtoolongtoolongtoolongtoolongxx", "name");
        let err = guard.check(&input).unwrap_err();
        if let Error::Validation(v) = &err {
            assert_eq!(v.kind(), &ValidationErrorKind::TooLong { limit: 50 });
        }
        let message = guard.rejection_message(&input, &err);
        assert!(message.contains("maximum length"));
    }

    #[test]
    fn guard_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InjectionGuard>();
    }
}
