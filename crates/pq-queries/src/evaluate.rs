//! Rule Evaluation
//!
//! Compiles one [`FilterRule`] into a [`Predicate`]. Literals are coerced
//! and patterns parsed here, once; the resulting closure only compares.
//!
//! A rule on a collection-valued property holds when at least one element
//! passes the per-element test. A rule on a quantified path (`orders[].x`)
//! holds when at least one reached value passes. `Not…` operators negate
//! their positive form over the whole property, and the rule's own
//! `is_negated` flag is applied after that.

use pq_core::{QueryError, QueryResult, StringComparison, Value, ValueType};
use serde_json::Value as Json;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::coerce::{coerce, coerce_list, json_kind};
use crate::compile::CompileOptions;
use crate::filters::{FilterOperator, FilterRule};
use crate::path::{PathCache, Resolved};
use crate::predicate::Predicate;
use crate::schema::Entity;

type Test = Arc<dyn Fn(&Value<'_>) -> bool + Send + Sync>;

fn test<F>(f: F) -> Test
where
    F: Fn(&Value<'_>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Compile a single rule
pub fn compile_rule<T: Entity>(
    rule: &FilterRule,
    paths: &mut PathCache<T>,
    options: &CompileOptions,
) -> QueryResult<Predicate<T>> {
    let other = rule
        .compare_to_property
        .as_deref()
        .filter(|_| !rule.operator.ignores_compare_to_property());

    if !options.allows(&rule.property) || other.is_some_and(|p| !options.allows(p)) {
        debug!(
            property = %rule.property,
            operator = %rule.operator,
            "Rule neutralized: property not in allowed fields"
        );
        return Ok(Predicate::constant(true));
    }

    let (operator, negate_operator) = rule.operator.positive();
    let left = paths.resolve(&rule.property)?;

    let predicate = match other {
        Some(other) => {
            let right = paths.resolve(other)?;
            compare_properties(rule, &left, &right, options.string_comparison)?
        }
        None => compare_literal(rule, operator, &left, options.string_comparison)?,
    };

    let predicate = if negate_operator { predicate.not() } else { predicate };
    Ok(if rule.is_negated { predicate.not() } else { predicate })
}

/// Property-vs-property comparison. No coercion: both sides must already
/// have comparable types.
fn compare_properties<T: Entity>(
    rule: &FilterRule,
    left: &Resolved<T>,
    right: &Resolved<T>,
    mode: StringComparison,
) -> QueryResult<Predicate<T>> {
    let other = rule.compare_to_property.as_deref().unwrap_or_default();

    if !rule.operator.supports_property_comparison() {
        return Err(QueryError::unsupported(rule.operator, &rule.property, &left.ty));
    }
    for (path, side) in [(rule.property.as_str(), left), (other, right)] {
        if side.is_collection() || side.is_quantified() {
            return Err(QueryError::unsupported(rule.operator, path, &side.ty));
        }
    }
    if !left.ty.is_comparable_with(&right.ty) {
        return Err(QueryError::coercion(other, "property", &left.ty));
    }

    let (operator, _) = rule.operator.positive();
    let (l, r) = (left.accessor.clone(), right.accessor.clone());

    if operator == FilterOperator::Equal {
        return Ok(Predicate::new(move |t: &T| {
            values_equal(mode, &l.read(t), &r.read(t))
        }));
    }

    if !left.ty.is_ordered() {
        return Err(QueryError::unsupported(rule.operator, &rule.property, &left.ty));
    }
    let accept = ordering_check(operator);
    Ok(Predicate::new(move |t: &T| {
        compare_values(mode, &l.read(t), &r.read(t)).is_some_and(accept)
    }))
}

/// Property-vs-literal comparison
fn compare_literal<T: Entity>(
    rule: &FilterRule,
    operator: FilterOperator,
    left: &Resolved<T>,
    mode: StringComparison,
) -> QueryResult<Predicate<T>> {
    let collection = left.is_collection();
    let element = left.ty.element().unwrap_or(&left.ty);
    let literal = rule.literal();

    let property_test: Test = match (operator, literal) {
        (FilterOperator::Any, _) => {
            if !collection {
                return Err(QueryError::unsupported(rule.operator, &rule.property, &left.ty));
            }
            match literal {
                None => test(|v| v.as_list().is_some_and(|items| !items.is_empty())),
                Some(literal) => {
                    let wanted = coerce(literal, element)?;
                    test(move |v| {
                        v.as_list()
                            .is_some_and(|items| items.iter().any(|x| values_equal(mode, x, &wanted)))
                    })
                }
            }
        }
        // A null literal tests the property itself
        (FilterOperator::Equal, None) => test(|v| v.is_null()),
        (_, None) => {
            return Err(QueryError::coercion("null", "null", element));
        }
        (_, Some(literal)) => {
            let element_test = element_test(rule, operator, literal, element, mode)?;
            if collection {
                test(move |v| {
                    v.as_list()
                        .is_some_and(|items| items.iter().any(|x| element_test(x)))
                })
            } else {
                element_test
            }
        }
    };

    let accessor = left.accessor.clone();
    if accessor.is_quantified() {
        Ok(Predicate::new(move |t: &T| {
            let mut reached = Vec::new();
            accessor.collect_into(t, &mut reached);
            reached.iter().any(|v| property_test(v))
        }))
    } else {
        Ok(Predicate::new(move |t: &T| property_test(&accessor.read(t))))
    }
}

/// Test for a single scalar value of type `element`
fn element_test(
    rule: &FilterRule,
    operator: FilterOperator,
    literal: &Json,
    element: &ValueType,
    mode: StringComparison,
) -> QueryResult<Test> {
    let unsupported = || QueryError::unsupported(rule.operator, &rule.property, element);

    match operator {
        FilterOperator::Equal => {
            if literal.is_array() {
                let members = into_items(coerce_list(literal, element)?);
                Ok(membership(members, mode))
            } else {
                let wanted = coerce(literal, element)?;
                Ok(test(move |x| values_equal(mode, x, &wanted)))
            }
        }
        FilterOperator::GreaterThan
        | FilterOperator::GreaterThanOrEqual
        | FilterOperator::LessThan
        | FilterOperator::LessThanOrEqual => {
            if !element.is_ordered() {
                return Err(unsupported());
            }
            let bound = coerce(literal, element)?;
            let accept = ordering_check(operator);
            Ok(test(move |x| compare_values(mode, x, &bound).is_some_and(accept)))
        }
        FilterOperator::Like => {
            if !element.is_string() {
                return Err(unsupported());
            }
            let pattern = LikePattern::parse(&literal_text(literal, element)?, mode);
            Ok(test(move |x| x.as_str().is_some_and(|s| pattern.matches(s, mode))))
        }
        FilterOperator::Contains => {
            if element.is_string() {
                let needle = fold(mode, &literal_text(literal, element)?).into_owned();
                Ok(test(move |x| {
                    x.as_str().is_some_and(|s| fold(mode, s).contains(needle.as_str()))
                }))
            } else {
                let wanted = coerce(literal, element)?;
                Ok(test(move |x| values_equal(mode, x, &wanted)))
            }
        }
        FilterOperator::StartsWith | FilterOperator::EndsWith => {
            if !element.is_string() {
                return Err(unsupported());
            }
            let pattern = if operator == FilterOperator::StartsWith {
                LikePattern::StartsWith(fold(mode, &literal_text(literal, element)?).into_owned())
            } else {
                LikePattern::EndsWith(fold(mode, &literal_text(literal, element)?).into_owned())
            };
            Ok(test(move |x| x.as_str().is_some_and(|s| pattern.matches(s, mode))))
        }
        FilterOperator::In => {
            let members = into_items(coerce_list(literal, element)?);
            Ok(membership(members, mode))
        }
        FilterOperator::Between => {
            if !element.is_ordered() {
                return Err(unsupported());
            }
            let bounds = into_items(coerce_list(literal, element)?);
            let (min, max) = match <[Value<'static>; 2]>::try_from(bounds) {
                Ok([min, max]) if !min.is_null() && !max.is_null() => (min, max),
                _ => {
                    return Err(QueryError::coercion(
                        literal.to_string(),
                        json_kind(literal),
                        format!("range of {}", element),
                    ))
                }
            };
            Ok(test(move |x| {
                compare_values(mode, x, &min).is_some_and(Ordering::is_ge)
                    && compare_values(mode, x, &max).is_some_and(Ordering::is_le)
            }))
        }
        FilterOperator::Any
        | FilterOperator::NotEqual
        | FilterOperator::NotLike
        | FilterOperator::NotContains
        | FilterOperator::NotIn
        | FilterOperator::NotBetween
        | FilterOperator::NotAny => Err(unsupported()),
    }
}

fn into_items(list: Value<'static>) -> Vec<Value<'static>> {
    match list {
        Value::List(items) => items,
        Value::Null => vec![],
        other => vec![other],
    }
}

fn membership(members: Vec<Value<'static>>, mode: StringComparison) -> Test {
    test(move |x| members.iter().any(|m| values_equal(mode, x, m)))
}

fn literal_text(literal: &Json, element: &ValueType) -> QueryResult<String> {
    match coerce(literal, element)? {
        Value::String(s) => Ok(s.into_owned()),
        _ => Err(QueryError::coercion(literal.to_string(), json_kind(literal), element)),
    }
}

fn ordering_check(operator: FilterOperator) -> fn(Ordering) -> bool {
    match operator {
        FilterOperator::GreaterThan => Ordering::is_gt,
        FilterOperator::GreaterThanOrEqual => Ordering::is_ge,
        FilterOperator::LessThan => Ordering::is_lt,
        FilterOperator::LessThanOrEqual => Ordering::is_le,
        _ => Ordering::is_eq,
    }
}

fn fold(mode: StringComparison, s: &str) -> Cow<'_, str> {
    match mode {
        StringComparison::Ordinal => Cow::Borrowed(s),
        StringComparison::IgnoreCase => Cow::Owned(s.to_lowercase()),
    }
}

fn compare_values(mode: StringComparison, a: &Value<'_>, b: &Value<'_>) -> Option<Ordering> {
    match (mode, a, b) {
        (StringComparison::IgnoreCase, Value::String(x), Value::String(y)) => {
            Some(fold(mode, x).cmp(&fold(mode, y)))
        }
        _ => a.compare(b),
    }
}

fn values_equal(mode: StringComparison, a: &Value<'_>, b: &Value<'_>) -> bool {
    match (mode, a, b) {
        (StringComparison::IgnoreCase, Value::String(x), Value::String(y)) => {
            fold(mode, x) == fold(mode, y)
        }
        _ => a == b,
    }
}

/// Wildcard pattern: `%x%` contains, `x%` starts with, `%x` ends with.
/// A pattern without wildcards is a substring test.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LikePattern {
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

impl LikePattern {
    fn parse(pattern: &str, mode: StringComparison) -> Self {
        let (body, leading) = match pattern.strip_prefix('%') {
            Some(rest) => (rest, true),
            None => (pattern, false),
        };
        let (body, trailing) = match body.strip_suffix('%') {
            Some(rest) => (rest, true),
            None => (body, false),
        };
        let body = fold(mode, body).into_owned();
        match (leading, trailing) {
            (false, true) => Self::StartsWith(body),
            (true, false) => Self::EndsWith(body),
            _ => Self::Contains(body),
        }
    }

    fn matches(&self, candidate: &str, mode: StringComparison) -> bool {
        let candidate = fold(mode, candidate);
        match self {
            Self::Contains(s) => candidate.contains(s.as_str()),
            Self::StartsWith(s) => candidate.starts_with(s.as_str()),
            Self::EndsWith(s) => candidate.ends_with(s.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Address, Customer, Order};
    use serde_json::json;
    use std::collections::HashSet;

    fn compile(rule: FilterRule) -> QueryResult<Predicate<Customer>> {
        compile_with(rule, &CompileOptions::default())
    }

    fn compile_with(rule: FilterRule, options: &CompileOptions) -> QueryResult<Predicate<Customer>> {
        compile_rule(&rule, &mut PathCache::new(), options)
    }

    fn check(rule: FilterRule, customer: &Customer) -> bool {
        compile(rule).unwrap().matches(customer)
    }

    #[test]
    fn test_like_pattern_parsing() {
        let mode = StringComparison::Ordinal;
        assert_eq!(LikePattern::parse("%nak%", mode), LikePattern::Contains("nak".into()));
        assert_eq!(LikePattern::parse("Sna%", mode), LikePattern::StartsWith("Sna".into()));
        assert_eq!(LikePattern::parse("%ake", mode), LikePattern::EndsWith("ake".into()));
        assert_eq!(LikePattern::parse("nak", mode), LikePattern::Contains("nak".into()));
        assert!(LikePattern::parse("%", mode).matches("anything", mode));
    }

    #[test]
    fn test_equality_and_ordering() {
        let snake = Customer::new("Snake", 40);
        assert!(check(FilterRule::equal("name", "Snake"), &snake));
        assert!(!check(FilterRule::equal("name", "snake"), &snake));
        assert!(check(FilterRule::not_equal("name", "Boss"), &snake));
        assert!(check(FilterRule::greater_than("age", 30), &snake));
        assert!(check(FilterRule::greater_than("age", "30"), &snake));
        assert!(!check(FilterRule::less_than("age", 40), &snake));
        assert!(check(FilterRule::new("age", FilterOperator::LessThanOrEqual, 40), &snake));
        assert!(check(FilterRule::equal("age", json!([1, 40])), &snake));
    }

    #[test]
    fn test_string_operators() {
        let snake = Customer::new("Snake", 40);
        assert!(check(FilterRule::like("name", "%nak%"), &snake));
        assert!(check(FilterRule::like("name", "Sn%"), &snake));
        assert!(!check(FilterRule::like("name", "%Sn"), &snake));
        assert!(check(FilterRule::new("name", FilterOperator::NotLike, "%boss%"), &snake));
        assert!(check(FilterRule::contains("name", "ak"), &snake));
        assert!(check(FilterRule::new("name", FilterOperator::StartsWith, "Sna"), &snake));
        assert!(check(FilterRule::new("name", FilterOperator::EndsWith, "ke"), &snake));
        assert!(check(FilterRule::new("name", FilterOperator::NotContains, "x"), &snake));
    }

    #[test]
    fn test_ignore_case_mode() {
        let options = CompileOptions::default().with_string_comparison(StringComparison::IgnoreCase);
        let snake = Customer::new("Snake", 40);
        for rule in [
            FilterRule::equal("name", "SNAKE"),
            FilterRule::like("name", "%NAK%"),
            FilterRule::new("name", FilterOperator::StartsWith, "sn"),
            FilterRule::is_in("name", ["boss", "snake"]),
        ] {
            assert!(compile_with(rule, &options).unwrap().matches(&snake));
        }
    }

    #[test]
    fn test_contains_on_non_string_is_equality() {
        let snake = Customer::new("Snake", 40);
        assert!(check(FilterRule::contains("age", 40), &snake));
        assert!(!check(FilterRule::contains("age", 4), &snake));
    }

    #[test]
    fn test_in_and_between() {
        let snake = Customer::new("Snake", 40);
        assert!(check(FilterRule::is_in("age", [20, 40]), &snake));
        assert!(check(FilterRule::new("age", FilterOperator::In, "20,40"), &snake));
        assert!(check(FilterRule::new("age", FilterOperator::NotIn, json!([1, 2])), &snake));
        assert!(check(FilterRule::between("age", 40, 50), &snake));
        assert!(check(FilterRule::between("age", 30, 40), &snake));
        assert!(!check(FilterRule::new("age", FilterOperator::NotBetween, json!([40, 50])), &snake));
        assert!(!check(FilterRule::between("age", 41, 50), &snake));
    }

    #[test]
    fn test_between_requires_two_bounds() {
        let err = compile(FilterRule::new("age", FilterOperator::Between, json!([1]))).unwrap_err();
        assert_eq!(err.error_code(), "coercion");
        assert!(compile(FilterRule::new("age", FilterOperator::Between, json!([1, null]))).is_err());
    }

    #[test]
    fn test_collection_valued_property() {
        let mut customer = Customer::new("Snake", 40);
        customer.tags = Some(vec!["vip".into(), "gold".into()]);

        assert!(check(FilterRule::equal("tags", "vip"), &customer));
        assert!(check(FilterRule::equal("tags", json!(["x", "gold"])), &customer));
        assert!(check(FilterRule::like("tags", "go%"), &customer));
        assert!(check(FilterRule::is_in("tags", ["gold"]), &customer));
        assert!(!check(FilterRule::not_equal("tags", "vip"), &customer));
        assert!(check(FilterRule::not_equal("tags", "bronze"), &customer));
    }

    #[test]
    fn test_any_and_not_any() {
        let mut customer = Customer::new("Snake", 40);
        assert!(!check(FilterRule::any("tags"), &customer));
        assert!(check(FilterRule::not_any("tags"), &customer));

        customer.tags = Some(vec![]);
        assert!(!check(FilterRule::any("tags"), &customer));
        assert!(check(FilterRule::not_any("tags"), &customer));

        customer.tags = Some(vec!["vip".into()]);
        assert!(check(FilterRule::any("tags"), &customer));
        assert!(check(FilterRule::new("tags", FilterOperator::Any, "vip"), &customer));
        assert!(!check(FilterRule::new("tags", FilterOperator::Any, "x"), &customer));
        assert!(!check(FilterRule::new("tags", FilterOperator::NotAny, "vip"), &customer));
    }

    #[test]
    fn test_any_combined_with_rule_negation() {
        let mut customer = Customer::new("Snake", 40);
        customer.tags = Some(vec!["vip".into()]);

        // NotAny and is_negated both apply and cancel out
        let rule = FilterRule::new("tags", FilterOperator::NotAny, "vip").negated();
        assert!(check(rule.clone(), &customer));
        customer.tags = None;
        assert!(!check(rule, &customer));

        let rule = FilterRule::any("tags").negated();
        assert!(check(rule, &customer));
    }

    #[test]
    fn test_any_on_related_entities() {
        let mut customer = Customer::new("Snake", 40);
        assert!(!check(FilterRule::any("orders"), &customer));
        customer.orders.push(Order::with_total(5));
        assert!(check(FilterRule::any("orders"), &customer));
    }

    #[test]
    fn test_quantified_path() {
        let mut customer = Customer::new("Snake", 40);
        customer.orders = vec![Order::with_total(10), Order::with_total(99)];

        assert!(check(FilterRule::greater_than("orders[].total", 50), &customer));
        assert!(!check(FilterRule::greater_than("orders[].total", 100), &customer));
        assert!(check(FilterRule::between("orders[].total", 5, 10), &customer));
        assert!(!check(FilterRule::not_equal("orders[].total", 10), &customer));
        assert!(check(FilterRule::equal("orders[].lines[].sku", "FOX-1"), &customer));
        assert!(check(FilterRule::new("orders[].labels", FilterOperator::Any, "rush"), &customer));

        customer.orders.clear();
        assert!(!check(FilterRule::greater_than("orders[].total", 0), &customer));
    }

    #[test]
    fn test_null_safe_navigation() {
        let mut customer = Customer::new("Snake", 40);
        assert!(!check(FilterRule::equal("address.city", "Zanzibar"), &customer));
        assert!(check(FilterRule::equal("address.city", serde_json::Value::Null), &customer));
        assert!(check(FilterRule::equal("address", serde_json::Value::Null), &customer));

        customer.address = Some(Address::in_city("Zanzibar"));
        assert!(check(FilterRule::equal("address.city", "Zanzibar"), &customer));
        assert!(!check(FilterRule::equal("address", serde_json::Value::Null), &customer));
    }

    #[test]
    fn test_typed_properties() {
        let customer = Customer::new("Snake", 40);
        assert!(check(FilterRule::equal("status", "active"), &customer));
        assert!(check(FilterRule::less_than("status", "Closed"), &customer));
        assert!(check(FilterRule::equal("active", "1"), &customer));
        assert!(check(FilterRule::greater_than("joined", "2000-01-01"), &customer));
        assert!(check(FilterRule::between("balance", "99.5", "100.5"), &customer));
        assert!(check(FilterRule::equal("id", customer.id.to_string()), &customer));
    }

    #[test]
    fn test_property_comparison() {
        let mut customer = Customer::new("Snake", 40);
        customer.max_age = 50;
        assert!(check(FilterRule::compare("age", FilterOperator::LessThan, "max_age"), &customer));
        assert!(!check(FilterRule::compare("age", FilterOperator::Equal, "max_age"), &customer));
        assert!(check(FilterRule::compare("age", FilterOperator::NotEqual, "max_age"), &customer));
        assert!(check(FilterRule::compare("name", FilterOperator::Equal, "name"), &customer));
    }

    #[test]
    fn test_property_comparison_errors() {
        assert!(matches!(
            compile(FilterRule::compare("age", FilterOperator::Equal, "name")),
            Err(QueryError::Coercion { .. })
        ));
        assert!(matches!(
            compile(FilterRule::compare("tags", FilterOperator::Equal, "name")),
            Err(QueryError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            compile(FilterRule::compare("name", FilterOperator::Like, "name")),
            Err(QueryError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            compile(FilterRule::compare("age", FilterOperator::Equal, "nope")),
            Err(QueryError::PathResolution { .. })
        ));
    }

    #[test]
    fn test_between_ignores_compare_to_property() {
        let mut rule = FilterRule::between("age", 30, 50);
        rule.compare_to_property = Some("max_age".into());
        assert!(check(rule, &Customer::new("Snake", 40)));
    }

    #[test]
    fn test_unsupported_operators() {
        for rule in [
            FilterRule::new("age", FilterOperator::StartsWith, "4"),
            FilterRule::like("age", "%4%"),
            FilterRule::any("name"),
            FilterRule::greater_than("active", true),
            FilterRule::greater_than("id", "67e55044-10b1-426f-9247-bb680e5fe0c8"),
        ] {
            assert!(matches!(compile(rule), Err(QueryError::UnsupportedOperator { .. })));
        }
    }

    #[test]
    fn test_missing_or_bad_literal() {
        assert!(matches!(
            compile(FilterRule::new("age", FilterOperator::GreaterThan, Json::Null)),
            Err(QueryError::Coercion { .. })
        ));
        assert!(matches!(
            compile(FilterRule::equal("age", "forty")),
            Err(QueryError::Coercion { .. })
        ));
        assert!(matches!(
            compile(FilterRule::equal("orders", "x")),
            Err(QueryError::Coercion { .. })
        ));
    }

    #[test]
    fn test_allowed_fields_neutralize_rule() {
        let allowed: HashSet<String> = ["age".to_string()].into_iter().collect();
        let options = CompileOptions::default().with_allowed_fields(allowed);

        // Not allowed: no-op, even though the path does not resolve
        let predicate = compile_with(FilterRule::equal("nickname", "x"), &options).unwrap();
        assert!(predicate.matches(&Customer::new("Snake", 40)));

        let predicate = compile_with(FilterRule::equal("name", "Boss").negated(), &options).unwrap();
        assert!(predicate.matches(&Customer::new("Boss", 40)));

        let predicate =
            compile_with(FilterRule::compare("age", FilterOperator::Equal, "max_age"), &options).unwrap();
        assert!(predicate.matches(&Customer::new("Snake", 40)));

        let predicate = compile_with(FilterRule::greater_than("age", 50), &options).unwrap();
        assert!(!predicate.matches(&Customer::new("Snake", 40)));
    }
}
