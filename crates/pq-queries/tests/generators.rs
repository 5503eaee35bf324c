//! Proptest generators and a small entity shared by the property tests

#![allow(dead_code)]

use once_cell::sync::Lazy;
use pq_core::{Value, ValueType};
use pq_queries::{
    Entity, FilterGroup, FilterNode, FilterOperator, FilterRule, LogicalOperator, Predicate, Schema,
};
use proptest::collection::vec;
use proptest::prelude::*;

pub const NAMES: &[&str] = &["Snake", "Otacon", "Meryl", "Boss", "Raiden"];
pub const TAGS: &[&str] = &["vip", "new", "gold"];

#[derive(Debug, Clone)]
pub struct Person {
    pub name: String,
    pub age: i32,
    pub tags: Option<Vec<String>>,
    pub partner: Option<Box<Person>>,
}

impl Entity for Person {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: Lazy<Schema<Person>> = Lazy::new(|| {
            Schema::<Person>::new("Person")
                .value("name", ValueType::String, |p| Value::from(&p.name))
                .value("age", ValueType::Int32, |p| Value::from(p.age))
                .value("tags", ValueType::list(ValueType::String), |p| match &p.tags {
                    Some(tags) => Value::list(tags),
                    None => Value::Null,
                })
                .has_one("partner", |p| p.partner.as_deref())
        });
        &SCHEMA
    }
}

/// Whether two predicates agree on every person
pub fn agree(a: &Predicate<Person>, b: &Predicate<Person>, people: &[Person]) -> bool {
    people.iter().all(|p| a.matches(p) == b.matches(p))
}

pub fn arb_name() -> impl Strategy<Value = String> {
    proptest::sample::select(NAMES).prop_map(str::to_string)
}

pub fn arb_tag() -> impl Strategy<Value = String> {
    proptest::sample::select(TAGS).prop_map(str::to_string)
}

pub fn arb_tags() -> impl Strategy<Value = Option<Vec<String>>> {
    proptest::option::of(vec(arb_tag(), 0..3))
}

fn arb_single() -> impl Strategy<Value = Person> {
    (arb_name(), 0..100i32, arb_tags()).prop_map(|(name, age, tags)| Person {
        name,
        age,
        tags,
        partner: None,
    })
}

pub fn arb_person() -> impl Strategy<Value = Person> {
    (arb_single(), proptest::option::of(arb_single())).prop_map(|(mut person, partner)| {
        person.partner = partner.map(Box::new);
        person
    })
}

pub fn arb_people() -> impl Strategy<Value = Vec<Person>> {
    vec(arb_person(), 1..12)
}

pub fn arb_logical() -> impl Strategy<Value = LogicalOperator> {
    prop_oneof![Just(LogicalOperator::And), Just(LogicalOperator::Or)]
}

/// Rules that always compile against [`Person`]
pub fn arb_rule() -> impl Strategy<Value = FilterRule> {
    let name_rule = (
        proptest::sample::select(vec![
            FilterOperator::Equal,
            FilterOperator::NotEqual,
            FilterOperator::Contains,
            FilterOperator::NotContains,
            FilterOperator::StartsWith,
            FilterOperator::EndsWith,
        ]),
        arb_name(),
    )
        .prop_map(|(op, name)| FilterRule::new("name", op, name));

    let like_rule = (arb_name(), 0..3usize).prop_map(|(name, shape)| {
        let pattern = match shape {
            0 => format!("%{}%", &name[1..3]),
            1 => format!("{}%", &name[..2]),
            _ => format!("%{}", &name[name.len() - 2..]),
        };
        FilterRule::like("name", pattern)
    });

    let age_rule = (
        proptest::sample::select(vec![
            FilterOperator::Equal,
            FilterOperator::NotEqual,
            FilterOperator::GreaterThan,
            FilterOperator::GreaterThanOrEqual,
            FilterOperator::LessThan,
            FilterOperator::LessThanOrEqual,
        ]),
        0..100i32,
    )
        .prop_map(|(op, age)| FilterRule::new("age", op, age));

    let range_rule = (0..100i32, 0..100i32, any::<bool>()).prop_map(|(a, b, inverted)| {
        let rule = FilterRule::between("age", a.min(b), a.max(b));
        if inverted {
            FilterRule { operator: FilterOperator::NotBetween, ..rule }
        } else {
            rule
        }
    });

    let tag_rule = (
        proptest::sample::select(vec![FilterOperator::Any, FilterOperator::NotAny, FilterOperator::Equal]),
        proptest::option::of(arb_tag()),
    )
        .prop_map(|(op, tag)| match (op, tag) {
            (FilterOperator::Equal, None) => FilterRule::equal("tags", "vip"),
            (op, Some(tag)) => FilterRule::new("tags", op, tag),
            (op, None) => FilterRule::new("tags", op, serde_json::Value::Null),
        });

    let partner_rule = (0..100i32).prop_map(|age| FilterRule::greater_than("partner.age", age));

    (
        prop_oneof![name_rule, like_rule, age_rule, range_rule, tag_rule, partner_rule],
        any::<bool>(),
    )
        .prop_map(|(rule, negate)| if negate { rule.negated() } else { rule })
}

pub fn arb_group() -> impl Strategy<Value = FilterGroup> {
    let leaf = (arb_logical(), vec(arb_rule(), 0..4), any::<bool>()).prop_map(build_group);
    leaf.prop_recursive(2, 16, 4, |inner| {
        (
            arb_logical(),
            vec(
                prop_oneof![
                    arb_rule().prop_map(FilterNode::Rule),
                    inner.prop_map(FilterNode::Group),
                ],
                0..4,
            ),
            any::<bool>(),
        )
            .prop_map(|(op, nodes, negated)| FilterGroup {
                rules: nodes,
                ..build_group((op, vec![], negated))
            })
    })
}

fn build_group((op, rules, negated): (LogicalOperator, Vec<FilterRule>, bool)) -> FilterGroup {
    let group = rules
        .into_iter()
        .fold(FilterGroup::new(op), |group, rule| group.with(rule));
    if negated {
        group.negated()
    } else {
        group
    }
}
