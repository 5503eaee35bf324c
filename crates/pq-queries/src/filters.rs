//! Filter Specification
//!
//! Filters are trees of groups and rules. A rule compares one property path
//! of an entity against a literal or against another property; a group joins
//! its children with one logical connective and may negate the result.
//!
//! The types here are plain values. They serialize with the fixed PascalCase
//! field names (`Property`, `Operator`, `Value`, `LogicalOperator`,
//! `InterOperator`, `IsNegated`, `CompareToProperty`, `Rules`). Unknown
//! fields and operator names are rejected, so a misspelled rule fails to
//! parse instead of reading as an empty group.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

/// Comparison operators that can be applied to a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum FilterOperator {
    /// Equals (=), or "is one of" when the value is a list
    Equal,
    /// Not equals (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Wildcard match (`%x%`, `x%`, `%x`)
    Like,
    NotLike,
    /// Substring for strings, equality otherwise
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    /// Member of a list of values
    In,
    NotIn,
    /// Inclusive range given as two bounds
    Between,
    NotBetween,
    /// Collection is non-empty, or contains the value
    Any,
    /// Collection is null, empty, or does not contain the value
    NotAny,
}

impl FilterOperator {
    /// Parse operator from its name or symbol
    pub fn from_str(s: &str) -> Option<Self> {
        let op = match s {
            "=" | "==" => Self::Equal,
            "!=" | "<>" => Self::NotEqual,
            ">" => Self::GreaterThan,
            ">=" => Self::GreaterThanOrEqual,
            "<" => Self::LessThan,
            "<=" => Self::LessThanOrEqual,
            "~" => Self::Contains,
            "!~" => Self::NotContains,
            _ => match s.to_lowercase().as_str() {
                "equal" | "equals" | "eq" => Self::Equal,
                "notequal" | "notequals" | "ne" => Self::NotEqual,
                "greaterthan" | "gt" => Self::GreaterThan,
                "greaterthanorequal" | "gte" => Self::GreaterThanOrEqual,
                "lessthan" | "lt" => Self::LessThan,
                "lessthanorequal" | "lte" => Self::LessThanOrEqual,
                "like" => Self::Like,
                "notlike" => Self::NotLike,
                "contains" => Self::Contains,
                "notcontains" => Self::NotContains,
                "startswith" => Self::StartsWith,
                "endswith" => Self::EndsWith,
                "in" => Self::In,
                "notin" => Self::NotIn,
                "between" => Self::Between,
                "notbetween" => Self::NotBetween,
                "any" => Self::Any,
                "notany" => Self::NotAny,
                _ => return None,
            },
        };
        Some(op)
    }

    /// Canonical name, as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "Equal",
            Self::NotEqual => "NotEqual",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanOrEqual => "GreaterThanOrEqual",
            Self::LessThan => "LessThan",
            Self::LessThanOrEqual => "LessThanOrEqual",
            Self::Like => "Like",
            Self::NotLike => "NotLike",
            Self::Contains => "Contains",
            Self::NotContains => "NotContains",
            Self::StartsWith => "StartsWith",
            Self::EndsWith => "EndsWith",
            Self::In => "In",
            Self::NotIn => "NotIn",
            Self::Between => "Between",
            Self::NotBetween => "NotBetween",
            Self::Any => "Any",
            Self::NotAny => "NotAny",
        }
    }

    /// Split a `Not…` operator into its positive form and a negation flag
    pub fn positive(&self) -> (Self, bool) {
        match self {
            Self::NotEqual => (Self::Equal, true),
            Self::NotLike => (Self::Like, true),
            Self::NotContains => (Self::Contains, true),
            Self::NotIn => (Self::In, true),
            Self::NotBetween => (Self::Between, true),
            Self::NotAny => (Self::Any, true),
            other => (*other, false),
        }
    }

    /// Operators that may compare a property against another property
    pub fn supports_property_comparison(&self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::GreaterThan
                | Self::GreaterThanOrEqual
                | Self::LessThan
                | Self::LessThanOrEqual
        )
    }

    /// Operators whose literal is taken as a value even when
    /// `compare_to_property` is set
    pub fn ignores_compare_to_property(&self) -> bool {
        matches!(self, Self::In | Self::NotIn | Self::Between | Self::NotBetween)
    }
}

impl TryFrom<String> for FilterOperator {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(&s).ok_or_else(|| format!("unknown filter operator '{}'", s))
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connective joining rules within a group, or groups within a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "and" | "&&" => Some(Self::And),
            "or" | "||" => Some(Self::Or),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "And",
            Self::Or => "Or",
        }
    }

    fn or() -> Self {
        Self::Or
    }
}

impl TryFrom<String> for LogicalOperator {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str(&s).ok_or_else(|| format!("unknown logical operator '{}'", s))
    }
}

/// A single comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FilterRule {
    /// Dotted property path; `seg[]` quantifies over a collection
    pub property: String,
    /// The operator to apply
    pub operator: FilterOperator,
    /// Literal operand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
    /// Compare against this property instead of `value`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_to_property: Option<String>,
    /// Negate the rule's result
    #[serde(default)]
    pub is_negated: bool,
}

impl FilterRule {
    /// Create a new rule against a literal
    pub fn new(property: impl Into<String>, operator: FilterOperator, value: impl Into<Json>) -> Self {
        let value = value.into();
        Self {
            property: property.into(),
            operator,
            value: (!value.is_null()).then_some(value),
            compare_to_property: None,
            is_negated: false,
        }
    }

    /// Create a rule comparing two properties of the same entity
    pub fn compare(
        property: impl Into<String>,
        operator: FilterOperator,
        other: impl Into<String>,
    ) -> Self {
        Self {
            property: property.into(),
            operator,
            value: None,
            compare_to_property: Some(other.into()),
            is_negated: false,
        }
    }

    pub fn equal(property: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::new(property, FilterOperator::Equal, value)
    }

    pub fn not_equal(property: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::new(property, FilterOperator::NotEqual, value)
    }

    pub fn greater_than(property: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::new(property, FilterOperator::GreaterThan, value)
    }

    pub fn less_than(property: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::new(property, FilterOperator::LessThan, value)
    }

    pub fn like(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(property, FilterOperator::Like, Json::String(pattern.into()))
    }

    pub fn contains(property: impl Into<String>, value: impl Into<Json>) -> Self {
        Self::new(property, FilterOperator::Contains, value)
    }

    pub fn is_in<V: Into<Json>>(property: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Json> = values.into_iter().map(Into::into).collect();
        Self::new(property, FilterOperator::In, values)
    }

    pub fn between(property: impl Into<String>, min: impl Into<Json>, max: impl Into<Json>) -> Self {
        Self::new(property, FilterOperator::Between, vec![min.into(), max.into()])
    }

    /// Collection is non-empty
    pub fn any(property: impl Into<String>) -> Self {
        Self::new(property, FilterOperator::Any, Json::Null)
    }

    /// Collection is null or empty
    pub fn not_any(property: impl Into<String>) -> Self {
        Self::new(property, FilterOperator::NotAny, Json::Null)
    }

    /// Return this rule with its negation flag flipped
    pub fn negated(mut self) -> Self {
        self.is_negated = !self.is_negated;
        self
    }

    /// The literal operand, treating an explicit JSON null as absent
    pub fn literal(&self) -> Option<&Json> {
        self.value.as_ref().filter(|v| !v.is_null())
    }

}

/// A child of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterNode {
    Rule(FilterRule),
    Group(FilterGroup),
}

impl From<FilterRule> for FilterNode {
    fn from(rule: FilterRule) -> Self {
        Self::Rule(rule)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        Self::Group(group)
    }
}

/// A node combining child rules and groups with one connective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct FilterGroup {
    /// Connective used among this group's rules
    #[serde(default)]
    pub logical_operator: LogicalOperator,
    /// Connective attaching the next group in a sequence to this one
    #[serde(default = "LogicalOperator::or")]
    pub inter_operator: LogicalOperator,
    /// Negate the group's combined result
    #[serde(default)]
    pub is_negated: bool,
    /// Child rules and groups
    #[serde(default)]
    pub rules: Vec<FilterNode>,
}

impl Default for FilterGroup {
    fn default() -> Self {
        Self::new(LogicalOperator::And)
    }
}

impl FilterGroup {
    /// Create a new empty group
    pub fn new(logical_operator: LogicalOperator) -> Self {
        Self {
            logical_operator,
            inter_operator: LogicalOperator::Or,
            is_negated: false,
            rules: vec![],
        }
    }

    /// Create an empty AND group
    pub fn and() -> Self {
        Self::new(LogicalOperator::And)
    }

    /// Create an empty OR group
    pub fn or() -> Self {
        Self::new(LogicalOperator::Or)
    }

    /// Add a rule or sub-group and return self (builder pattern)
    pub fn with(mut self, node: impl Into<FilterNode>) -> Self {
        self.rules.push(node.into());
        self
    }

    /// Set the connective to the next group in a sequence
    pub fn then(mut self, inter_operator: LogicalOperator) -> Self {
        self.inter_operator = inter_operator;
        self
    }

    /// Return this group with its negation flag flipped
    pub fn negated(mut self) -> Self {
        self.is_negated = !self.is_negated;
        self
    }

    /// Check if the group has no children
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of rules in this group and all nested groups
    pub fn rule_count(&self) -> usize {
        self.rules
            .iter()
            .map(|node| match node {
                FilterNode::Rule(_) => 1,
                FilterNode::Group(group) => group.rule_count(),
            })
            .sum()
    }

    /// Every rule in the tree, depth-first
    pub fn all_rules(&self) -> Vec<&FilterRule> {
        let mut out = Vec::with_capacity(self.rules.len());
        self.collect_rules(&mut out);
        out
    }

    fn collect_rules<'a>(&'a self, out: &mut Vec<&'a FilterRule>) {
        for node in &self.rules {
            match node {
                FilterNode::Rule(rule) => out.push(rule),
                FilterNode::Group(group) => group.collect_rules(out),
            }
        }
    }

    /// Copy of this group with structurally identical children collapsed.
    ///
    /// Nested groups are deduplicated first, so two sub-groups that only
    /// differ by repeated rules compare equal at the parent. The first
    /// occurrence of each child is kept.
    pub fn deduplicated(&self) -> FilterGroup {
        let mut rules: Vec<FilterNode> = Vec::with_capacity(self.rules.len());
        for node in &self.rules {
            let node = match node {
                FilterNode::Rule(rule) => FilterNode::Rule(rule.clone()),
                FilterNode::Group(group) => FilterNode::Group(group.deduplicated()),
            };
            if !rules.contains(&node) {
                rules.push(node);
            }
        }
        FilterGroup {
            logical_operator: self.logical_operator,
            inter_operator: self.inter_operator,
            is_negated: self.is_negated,
            rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_operator_parsing() {
        assert_eq!(FilterOperator::from_str("="), Some(FilterOperator::Equal));
        assert_eq!(FilterOperator::from_str("!="), Some(FilterOperator::NotEqual));
        assert_eq!(FilterOperator::from_str("notBetween"), Some(FilterOperator::NotBetween));
        assert_eq!(FilterOperator::from_str("STARTSWITH"), Some(FilterOperator::StartsWith));
        assert_eq!(FilterOperator::from_str("between-ish"), None);
    }

    #[test]
    fn test_operator_positive_form() {
        assert_eq!(FilterOperator::NotIn.positive(), (FilterOperator::In, true));
        assert_eq!(FilterOperator::Like.positive(), (FilterOperator::Like, false));
        assert_eq!(FilterOperator::NotAny.positive(), (FilterOperator::Any, true));
    }

    #[test]
    fn test_rule_creation() {
        let rule = FilterRule::equal("name", "Snake");
        assert_eq!(rule.property, "name");
        assert_eq!(rule.operator, FilterOperator::Equal);
        assert_eq!(rule.literal(), Some(&json!("Snake")));

        let any = FilterRule::any("tags");
        assert!(any.literal().is_none());
        assert!(FilterRule::new("age", FilterOperator::GreaterThan, Json::Null).value.is_none());

        let compare = FilterRule::compare("start", FilterOperator::LessThan, "end");
        assert_eq!(compare.compare_to_property.as_deref(), Some("end"));
        assert!(compare.value.is_none());
    }

    #[test]
    fn test_rule_negation_toggles() {
        let rule = FilterRule::equal("name", "x").negated();
        assert!(rule.is_negated);
        assert!(!rule.negated().is_negated);
    }

    #[test]
    fn test_group_builder() {
        let group = FilterGroup::or()
            .with(FilterRule::greater_than("age", 40))
            .with(FilterGroup::and().with(FilterRule::like("name", "%nak%")))
            .then(LogicalOperator::And);

        assert_eq!(group.logical_operator, LogicalOperator::Or);
        assert_eq!(group.inter_operator, LogicalOperator::And);
        assert_eq!(group.rules.len(), 2);
        assert_eq!(group.rule_count(), 2);
        assert_eq!(group.all_rules().len(), 2);
    }

    #[test]
    fn test_deduplicated_collapses_nested_duplicates() {
        let inner = FilterGroup::and()
            .with(FilterRule::equal("name", "x"))
            .with(FilterRule::equal("name", "x"));
        let group = FilterGroup::or()
            .with(inner.clone())
            .with(FilterGroup::and().with(FilterRule::equal("name", "x")))
            .with(FilterRule::equal("age", 3))
            .with(FilterRule::equal("age", 3));

        let deduped = group.deduplicated();
        assert_eq!(deduped.rules.len(), 2);
        assert_eq!(deduped.rule_count(), 2);
        // Input is untouched
        assert_eq!(group.rules.len(), 4);
        assert_eq!(deduped.deduplicated(), deduped);
    }

    #[test]
    fn test_group_deserializes_from_wire_format() {
        let group: FilterGroup = serde_json::from_value(json!({
            "LogicalOperator": "OR",
            "IsNegated": true,
            "Rules": [
                { "Property": "age", "Operator": "GreaterThan", "Value": 40 },
                {
                    "LogicalOperator": "And",
                    "Rules": [
                        { "Property": "start", "Operator": "LessThan", "CompareToProperty": "end" }
                    ]
                }
            ]
        }))
        .unwrap();

        assert_eq!(group.logical_operator, LogicalOperator::Or);
        assert_eq!(group.inter_operator, LogicalOperator::Or);
        assert!(group.is_negated);
        assert!(matches!(group.rules[0], FilterNode::Rule(_)));
        match &group.rules[1] {
            FilterNode::Group(inner) => match &inner.rules[0] {
                FilterNode::Rule(rule) => {
                    assert_eq!(rule.compare_to_property.as_deref(), Some("end"));
                    assert!(rule.value.is_none());
                }
                other => panic!("expected rule, got {:?}", other),
            },
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_rule_is_rejected() {
        let unknown_operator = json!({
            "Rules": [{ "Property": "age", "Operator": "Approximately", "Value": 99 }]
        });
        assert!(serde_json::from_value::<FilterGroup>(unknown_operator).is_err());

        let misspelled_field = json!({
            "Rules": [{ "Propety": "age", "Operator": "Equal", "Value": 99 }]
        });
        assert!(serde_json::from_value::<FilterGroup>(misspelled_field).is_err());

        let err = serde_json::from_value::<FilterOperator>(json!("Approximately")).unwrap_err();
        assert!(err.to_string().contains("unknown filter operator 'Approximately'"));
        assert!(serde_json::from_value::<LogicalOperator>(json!("Xor")).is_err());
    }

    #[test]
    fn test_operator_aliases_on_the_wire() {
        let group: FilterGroup = serde_json::from_value(json!({
            "LogicalOperator": "or",
            "Rules": [
                { "Property": "age", "Operator": "Equals", "Value": 99 },
                { "Property": "age", "Operator": ">=", "Value": 10 }
            ]
        }))
        .unwrap();
        assert_eq!(group.logical_operator, LogicalOperator::Or);
        let operators: Vec<_> = group.all_rules().iter().map(|r| r.operator).collect();
        assert_eq!(operators, vec![FilterOperator::Equal, FilterOperator::GreaterThanOrEqual]);
    }

    #[test]
    fn test_group_serializes_with_pascal_case() {
        let group = FilterGroup::and().with(FilterRule::equal("name", "Snake"));
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(
            value,
            json!({
                "LogicalOperator": "And",
                "InterOperator": "Or",
                "IsNegated": false,
                "Rules": [{ "Property": "name", "Operator": "Equal", "Value": "Snake", "IsNegated": false }]
            })
        );
    }
}
