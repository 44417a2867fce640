use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::bind::{BindingError, BindingErrorKind, BoundValue, ValueType};
use crate::error::{Error, PolicyError, PolicyErrorKind};
use crate::input::RawInput;
use crate::validator::ValidationPolicy;

/// A comparison operator in a structured filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl FilterOp {
    /// The driver-level operator tag, e.g. `$eq`.
    fn tag(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }

    /// Ordering operators only make sense on numbers.
    fn requires_int(self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A structured filter expression: a tree of field/operator/value triples.
///
/// The filter is an object, never a textual query fragment, so embedded
/// metacharacters cannot alter its structure. It serializes to the
/// driver's wire shape, e.g. `{"borough":{"$eq":"Brooklyn"}}`.
///
/// Built through [`FilterBuilder`], which validates every string value as
/// defense in depth even though structured construction alone already
/// prevents injection.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// A single field/operator/value triple.
    Compare {
        /// The document field the comparison applies to.
        field: String,
        /// The comparison operator.
        op: FilterOp,
        /// The comparison value.
        value: BoundValue,
    },
    /// Conjunction of sub-filters.
    And(Vec<FilterExpr>),
    /// Disjunction of sub-filters.
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    /// Renders the filter as a JSON document in the driver wire shape.
    pub fn to_json(&self) -> serde_json::Value {
        // Every map key this Serialize impl emits is a string and every
        // value is a JSON primitive or a nested filter, so to_value has
        // no failure path for this type.
        serde_json::to_value(self).expect("filter serialization is infallible")
    }
}

impl Serialize for FilterExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Compare { field, op, value } => {
                let mut outer = serializer.serialize_map(Some(1))?;
                outer.serialize_entry(field, &OpValue { op: *op, value })?;
                outer.end()
            }
            Self::And(parts) => {
                let mut outer = serializer.serialize_map(Some(1))?;
                outer.serialize_entry("$and", parts)?;
                outer.end()
            }
            Self::Or(parts) => {
                let mut outer = serializer.serialize_map(Some(1))?;
                outer.serialize_entry("$or", parts)?;
                outer.end()
            }
        }
    }
}

struct OpValue<'a> {
    op: FilterOp,
    value: &'a BoundValue,
}

impl Serialize for OpValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self.value {
            BoundValue::Str(s) => map.serialize_entry(self.op.tag(), s)?,
            BoundValue::Int(i) => map.serialize_entry(self.op.tag(), i)?,
            BoundValue::Bool(b) => map.serialize_entry(self.op.tag(), b)?,
            BoundValue::Null => map.serialize_entry(self.op.tag(), &())?,
        }
        map.end()
    }
}

/// Builds [`FilterExpr`]s with defense-in-depth validation.
///
/// Every string value must pass the builder's [`ValidationPolicy`]
/// (by default [`ValidationPolicy::nosql_value`], which excludes the
/// grammar's structural metacharacters `' " \ ; { } $`) before it is
/// admitted into a filter. Field names are checked against a fixed
/// identifier shape.
///
/// # Examples
///
/// ```
/// use sink_guard::{FilterBuilder, FilterOp};
///
/// let builder = FilterBuilder::new();
/// let filter = builder.compare("borough", FilterOp::Eq, "Brooklyn").unwrap();
/// assert_eq!(
///     filter.to_json().to_string(),
///     r#"{"borough":{"$eq":"Brooklyn"}}"#
/// );
///
/// // Metacharacters are rejected before any filter exists.
/// assert!(builder.compare("borough", FilterOp::Eq, "x\"; {}").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    policy: ValidationPolicy,
}

impl FilterBuilder {
    /// Creates a builder with the standard metacharacter-excluding
    /// policy.
    pub fn new() -> Self {
        Self {
            policy: ValidationPolicy::nosql_value(),
        }
    }

    /// Creates a builder with a caller-supplied value policy.
    pub fn with_policy(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Builds a single field/operator/value comparison.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if a string value fails the value policy.
    /// - [`Error::Binding`] with
    ///   [`TypeMismatch`](crate::BindingErrorKind::TypeMismatch) if an
    ///   ordering operator is given a non-integer value.
    /// - [`Error::Policy`] if the field name is not a plain identifier.
    pub fn compare(
        &self,
        field: &str,
        op: FilterOp,
        value: impl Into<BoundValue>,
    ) -> Result<FilterExpr, Error> {
        let value = value.into();

        if !is_identifier(field) {
            return Err(PolicyError::new(
                PolicyErrorKind::InvalidName,
                format!("'{field}' is not a valid filter field name"),
            )
            .into());
        }

        if op.requires_int() && value.value_type() != ValueType::Int {
            return Err(BindingError::new(BindingErrorKind::TypeMismatch {
                name: field.to_string(),
                expected: ValueType::Int,
                actual: value.value_type(),
            })
            .into());
        }

        if let BoundValue::Str(s) = &value {
            self.policy
                .validate(&RawInput::new(s.clone(), "nosql-filter-value"))?;
        }

        Ok(FilterExpr::Compare {
            field: field.to_string(),
            op,
            value,
        })
    }

    /// Shorthand for an equality comparison, the most common filter.
    pub fn eq(&self, field: &str, value: impl Into<BoundValue>) -> Result<FilterExpr, Error> {
        self.compare(field, FilterOp::Eq, value)
    }

    /// Combines filters with logical AND.
    ///
    /// # Errors
    ///
    /// [`Error::Policy`] if `parts` is empty. Drivers reject an empty
    /// conjunction at execution time; failing here keeps the error
    /// ahead of any execution collaborator.
    pub fn and(&self, parts: Vec<FilterExpr>) -> Result<FilterExpr, Error> {
        Self::check_parts(&parts, "$and")?;
        Ok(FilterExpr::And(parts))
    }

    /// Combines filters with logical OR.
    ///
    /// # Errors
    ///
    /// [`Error::Policy`] if `parts` is empty.
    pub fn or(&self, parts: Vec<FilterExpr>) -> Result<FilterExpr, Error> {
        Self::check_parts(&parts, "$or")?;
        Ok(FilterExpr::Or(parts))
    }

    fn check_parts(parts: &[FilterExpr], tag: &str) -> Result<(), Error> {
        if parts.is_empty() {
            return Err(PolicyError::new(
                PolicyErrorKind::EmptyPolicy,
                format!("'{tag}' composition has no sub-filters"),
            )
            .into());
        }
        Ok(())
    }
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A field name must be a plain dotted identifier: no operators, no
/// quoting, nothing the driver could interpret structurally.
fn is_identifier(field: &str) -> bool {
    !field.is_empty()
        && !field.starts_with('$')
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidationErrorKind;

    #[test]
    fn eq_filter_serializes_to_wire_shape() {
        let filter = FilterBuilder::new().eq("borough", "Brooklyn").unwrap();
        assert_eq!(
            filter.to_json().to_string(),
            r#"{"borough":{"$eq":"Brooklyn"}}"#
        );
    }

    #[test]
    fn integer_and_boolean_values_serialize_natively() {
        let builder = FilterBuilder::new();

        let int_filter = builder.compare("stars", FilterOp::Gte, 4i64).unwrap();
        assert_eq!(int_filter.to_json().to_string(), r#"{"stars":{"$gte":4}}"#);

        let bool_filter = builder.eq("open", true).unwrap();
        assert_eq!(bool_filter.to_json().to_string(), r#"{"open":{"$eq":true}}"#);

        let null_filter = builder.eq("closed_at", BoundValue::Null).unwrap();
        assert_eq!(
            null_filter.to_json().to_string(),
            r#"{"closed_at":{"$eq":null}}"#
        );
    }

    #[test]
    fn and_or_compose_as_trees() {
        let builder = FilterBuilder::new();
        let filter = builder
            .and(vec![
                builder.eq("borough", "Brooklyn").unwrap(),
                builder
                    .or(vec![
                        builder.compare("stars", FilterOp::Gt, 3i64).unwrap(),
                        builder.eq("featured", true).unwrap(),
                    ])
                    .unwrap(),
            ])
            .unwrap();

        assert_eq!(
            filter.to_json().to_string(),
            r#"{"$and":[{"borough":{"$eq":"Brooklyn"}},{"$or":[{"stars":{"$gt":3}},{"featured":{"$eq":true}}]}]}"#
        );
    }

    #[test]
    fn metacharacters_in_values_are_rejected() {
        let builder = FilterBuilder::new();
        for payload in [
            "x'; return true; var y='",
            "a\"b",
            "a\\b",
            "a;b",
            "{$gt: ''}",
            "$where",
        ] {
            let result = builder.eq("borough", payload);
            assert!(result.is_err(), "expected rejection for {payload:?}");
            assert!(matches!(result.unwrap_err(), Error::Validation(_)));
        }
    }

    #[test]
    fn rejection_reason_is_the_metacharacter_rule() {
        let err = FilterBuilder::new().eq("borough", "Brook$lyn").unwrap_err();
        match err {
            Error::Validation(e) => assert_eq!(
                e.kind(),
                &ValidationErrorKind::StructuralViolation {
                    rule_id: "nosql-metacharacters".to_string()
                }
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_composition_is_a_construction_error() {
        let builder = FilterBuilder::new();

        let err = builder.and(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Policy(_)));

        let err = builder.or(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Policy(_)));

        // A single-part composition is legal.
        let part = builder.eq("borough", "Brooklyn").unwrap();
        assert!(builder.and(vec![part]).is_ok());
    }

    #[test]
    fn operator_prefixed_field_names_are_rejected() {
        let err = FilterBuilder::new().eq("$where", "x").unwrap_err();
        assert!(matches!(err, Error::Policy(_)));
    }

    #[test]
    fn quoted_field_names_are_rejected() {
        let err = FilterBuilder::new().eq("a\"b", "x").unwrap_err();
        assert!(matches!(err, Error::Policy(_)));
    }

    #[test]
    fn dotted_field_paths_are_allowed() {
        let filter = FilterBuilder::new().eq("address.zipcode", "11201").unwrap();
        assert_eq!(
            filter.to_json().to_string(),
            r#"{"address.zipcode":{"$eq":"11201"}}"#
        );
    }

    #[test]
    fn ordering_operator_requires_integer() {
        let err = FilterBuilder::new()
            .compare("stars", FilterOp::Gt, "three")
            .unwrap_err();
        match err {
            Error::Binding(e) => assert_eq!(
                e.kind(),
                &BindingErrorKind::TypeMismatch {
                    name: "stars".to_string(),
                    expected: ValueType::Int,
                    actual: ValueType::Str,
                }
            ),
            other => panic!("expected binding error, got {other:?}"),
        }
    }

    #[test]
    fn integers_bypass_string_validation() {
        // Int values carry no text, so the metacharacter policy does not
        // apply to them.
        let filter = FilterBuilder::new().eq("stars", 5i64).unwrap();
        assert_eq!(filter.to_json().to_string(), r#"{"stars":{"$eq":5}}"#);
    }

    #[test]
    fn custom_policy_is_honored() {
        let strict = ValidationPolicy::builder()
            .max_length(3)
            .charset("[a-z]")
            .build()
            .unwrap();
        let builder = FilterBuilder::with_policy(strict);

        assert!(builder.eq("f", "abc").is_ok());
        assert!(builder.eq("f", "abcd").is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: an admitted string value round-trips into the
            /// JSON document unchanged, as data rather than structure.
            #[test]
            fn proptest_admitted_value_stays_data(
                value in "[a-zA-Z0-9 -]{1,30}"
            ) {
                let builder = FilterBuilder::new();
                let filter = builder.eq("f", value.clone()).unwrap();
                let json = filter.to_json();
                prop_assert_eq!(json["f"]["$eq"].as_str(), Some(value.as_str()));
            }
        }
    }
}
