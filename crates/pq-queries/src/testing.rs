//! Entity fixtures shared by the unit tests

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use pq_core::{EnumDef, Value, ValueType};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::schema::{Entity, Schema};

pub const STATUS: EnumDef = EnumDef::new("Status", &["Active", "Closed"]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub max_age: i32,
    pub active: bool,
    pub status: Status,
    pub joined: NaiveDate,
    pub balance: Decimal,
    pub tags: Option<Vec<String>>,
    pub address: Option<Address>,
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone)]
pub struct Address {
    pub city: String,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub total: i64,
    pub labels: Vec<String>,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub sku: String,
}

impl Customer {
    pub fn new(name: &str, age: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            age,
            max_age: age,
            active: true,
            status: Status::Active,
            joined: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
            balance: Decimal::from(100),
            tags: None,
            address: None,
            orders: vec![],
        }
    }

    pub fn named(name: &str) -> Self {
        Self::new(name, 0)
    }
}

impl Address {
    pub fn in_city(city: &str) -> Self {
        Self {
            city: city.to_string(),
        }
    }
}

impl Order {
    pub fn with_total(total: i64) -> Self {
        Self {
            total,
            labels: vec!["rush".to_string()],
            lines: vec![OrderLine {
                sku: "FOX-1".to_string(),
            }],
        }
    }
}

impl Entity for Customer {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: Lazy<Schema<Customer>> = Lazy::new(|| {
            Schema::<Customer>::new("Customer")
                .value("id", ValueType::Uuid, |c| Value::from(c.id))
                .value("name", ValueType::String, |c| Value::from(&c.name))
                .value("age", ValueType::Int32, |c| Value::from(c.age))
                .value("max_age", ValueType::Int32, |c| Value::from(c.max_age))
                .value("active", ValueType::Bool, |c| Value::from(c.active))
                .value("status", ValueType::Enum(STATUS), |c| {
                    Value::enumeration(c.status as u32)
                })
                .value("joined", ValueType::Date, |c| Value::from(c.joined))
                .value("balance", ValueType::Decimal, |c| Value::from(c.balance))
                .value("tags", ValueType::list(ValueType::String), |c| match &c.tags {
                    Some(tags) => Value::list(tags),
                    None => Value::Null,
                })
                .has_one("address", |c| c.address.as_ref())
                .has_many("orders", |c| Some(c.orders.as_slice()))
        });
        &SCHEMA
    }
}

impl Entity for Address {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: Lazy<Schema<Address>> =
            Lazy::new(|| Schema::<Address>::new("Address").value("city", ValueType::String, |a| Value::from(&a.city)));
        &SCHEMA
    }
}

impl Entity for Order {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: Lazy<Schema<Order>> = Lazy::new(|| {
            Schema::<Order>::new("Order")
                .value("total", ValueType::Int64, |o| Value::from(o.total))
                .value("labels", ValueType::list(ValueType::String), |o| Value::list(&o.labels))
                .has_many("lines", |o| Some(o.lines.as_slice()))
        });
        &SCHEMA
    }
}

impl Entity for OrderLine {
    fn schema() -> &'static Schema<Self> {
        static SCHEMA: Lazy<Schema<OrderLine>> =
            Lazy::new(|| Schema::<OrderLine>::new("OrderLine").value("sku", ValueType::String, |l| Value::from(&l.sku)));
        &SCHEMA
    }
}
