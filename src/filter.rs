//! Declarative record filter
//!
//! A [`RecordFilter`] is a conjunction of [`Clause`]s. Each clause is plain data
//! (it deserializes from configuration) and is evaluated by one generic
//! evaluator, so other RIDB collections can reuse the engine with their own
//! rule lists. All comparisons are ASCII case-insensitive on both names and
//! values.
//!
//! Missing lists, missing entries and missing values make a clause fail: an
//! existential test over nothing is false.

use crate::types::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acceptance rule applied to a single string value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accept {
    /// Value equals the token
    Equals(String),
    /// Value is present and differs from the token
    NotEquals(String),
    /// Value contains the token
    Contains(String),
    /// Value contains at least one of the tokens
    ContainsAny(Vec<String>),
}

impl Accept {
    /// Evaluate the rule against an already upper-cased value
    fn accepts(&self, value: &str) -> bool {
        match self {
            Accept::Equals(token) => value == token.to_ascii_uppercase(),
            Accept::NotEquals(token) => value != token.to_ascii_uppercase(),
            Accept::Contains(token) => value.contains(&token.to_ascii_uppercase()),
            Accept::ContainsAny(tokens) => tokens
                .iter()
                .any(|token| value.contains(&token.to_ascii_uppercase())),
        }
    }
}

/// One conjunct of a [`RecordFilter`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Clause {
    /// A scalar field of the record satisfies `accept`
    Field {
        /// Field name on the record
        field: String,
        /// Rule for the field's value
        accept: Accept,
    },

    /// Some element of the array `list` satisfies the clause
    AnyEntry {
        /// Array field on the record (e.g. "ATTRIBUTES")
        list: String,
        /// Entry key holding the entry's name (e.g. "AttributeName")
        #[serde(default)]
        name_key: Option<String>,
        /// Required entry name; `None` matches every entry
        #[serde(default)]
        name: Option<String>,
        /// Entry key holding the value tested by `accept`
        value_key: String,
        /// Rule for the entry's value
        accept: Accept,
    },
}

impl Clause {
    /// Attribute-list clause: entry `name` in `ATTRIBUTES` whose value satisfies `accept`
    pub fn attribute(name: &str, accept: Accept) -> Self {
        Clause::AnyEntry {
            list: "ATTRIBUTES".to_string(),
            name_key: Some("AttributeName".to_string()),
            name: Some(name.to_string()),
            value_key: "AttributeValue".to_string(),
            accept,
        }
    }

    /// Whether the record satisfies this clause
    pub fn matches(&self, record: &JsonObject) -> bool {
        match self {
            Clause::Field { field, accept } => record
                .get(field)
                .and_then(scalar_upper)
                .is_some_and(|value| accept.accepts(&value)),
            Clause::AnyEntry {
                list,
                name_key,
                name,
                value_key,
                accept,
            } => {
                let Some(entries) = record.get(list).and_then(Value::as_array) else {
                    return false;
                };
                entries
                    .iter()
                    .filter_map(Value::as_object)
                    .filter(|entry| match (name_key, name) {
                        (Some(key), Some(wanted)) => entry
                            .get(key)
                            .and_then(scalar_upper)
                            .is_some_and(|n| n == wanted.to_ascii_uppercase()),
                        _ => true,
                    })
                    .any(|entry| {
                        entry
                            .get(value_key)
                            .and_then(scalar_upper)
                            .is_some_and(|value| accept.accepts(&value))
                    })
            }
        }
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Clause::Field { field, accept } => write!(f, "{field} {accept:?}"),
            Clause::AnyEntry {
                list,
                name: Some(name),
                accept,
                ..
            } => write!(f, "{list}[{name}] {accept:?}"),
            Clause::AnyEntry {
                list,
                value_key,
                accept,
                ..
            } => write!(f, "{list}[*].{value_key} {accept:?}"),
        }
    }
}

/// Upper-cased text of a scalar JSON value
fn scalar_upper(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_ascii_uppercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string().to_ascii_uppercase()),
        _ => None,
    }
}

/// Conjunction of clauses deciding which records are kept
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Clauses that must all match
    pub clauses: Vec<Clause>,
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self::rv_hookups()
    }
}

impl RecordFilter {
    /// Build a filter from clauses
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// Filter that accepts every record
    pub fn accept_all() -> Self {
        Self::new(Vec::new())
    }

    /// Campsites usable by an RV with full hookups
    ///
    /// Standard or RV site, RV listed in permitted equipment, water hookup,
    /// and electricity and sewer hookups not marked `N/A`.
    pub fn rv_hookups() -> Self {
        Self::new(vec![
            Clause::Field {
                field: "CampsiteType".to_string(),
                accept: Accept::ContainsAny(vec!["STANDARD".to_string(), "RV".to_string()]),
            },
            Clause::AnyEntry {
                list: "PERMITTEDEQUIPMENT".to_string(),
                name_key: None,
                name: None,
                value_key: "EquipmentName".to_string(),
                accept: Accept::Contains("RV".to_string()),
            },
            Clause::attribute("WATER HOOKUP", Accept::Equals("YES".to_string())),
            Clause::attribute("ELECTRICITY HOOKUP", Accept::NotEquals("N/A".to_string())),
            Clause::attribute("SEWER HOOKUP", Accept::NotEquals("N/A".to_string())),
        ])
    }

    /// Whether the record satisfies every clause
    pub fn matches(&self, record: &JsonObject) -> bool {
        self.first_rejection(record).is_none()
    }

    /// The first clause the record fails, if any
    pub fn first_rejection(&self, record: &JsonObject) -> Option<&Clause> {
        self.clauses.iter().find(|clause| !clause.matches(record))
    }
}
