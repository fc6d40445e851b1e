//! Condition filters.
//!
//! A condition compares a field against an operator and a text value,
//! optionally joined with one more comparison through AND or OR:
//!
//! - [`Condition::Leaf`]: a single comparison
//! - [`Condition::And`]: the second comparison must also pass
//! - [`Condition::Or`]: the second comparison is tried when the first fails
//!
//! Fields are AND-ed together and evaluation stops at the first failing
//! field.
//!
//! On the wire a condition keeps the flat shape
//! `{ "operation", "value", "and"?, "or"? }` so descriptors stay readable by
//! hosts that build them by hand.

use crate::{
    column::{find_column, Column, Datatype},
    error::Result,
    value::{self, coerce, is_blank},
    Error, FieldName, Row,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Comparison operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    IsBlank,
    NotBlank,
    IsTrue,
    IsFalse,
    /// Operator this engine does not know; it lets every row through
    Other(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Equal => "Equal",
            Operation::NotEqual => "Not equal",
            Operation::GreaterThan => "Greater than",
            Operation::GreaterThanOrEqual => "Greater than or equal",
            Operation::LessThan => "Less than",
            Operation::LessThanOrEqual => "Less than or equal",
            Operation::Contains => "Contains",
            Operation::StartsWith => "Starts with",
            Operation::EndsWith => "Ends with",
            Operation::IsBlank => "Is blank",
            Operation::NotBlank => "Not blank",
            Operation::IsTrue => "Is true",
            Operation::IsFalse => "Is false",
            Operation::Other(name) => name,
        }
    }

    /// Operators that need no comparison value.
    pub fn is_self_contained(&self) -> bool {
        matches!(
            self,
            Operation::IsBlank | Operation::NotBlank | Operation::IsTrue | Operation::IsFalse
        )
    }
}

impl From<String> for Operation {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Equal" => Operation::Equal,
            "Not equal" => Operation::NotEqual,
            "Greater than" => Operation::GreaterThan,
            "Greater than or equal" => Operation::GreaterThanOrEqual,
            "Less than" => Operation::LessThan,
            "Less than or equal" => Operation::LessThanOrEqual,
            "Contains" => Operation::Contains,
            "Starts with" => Operation::StartsWith,
            "Ends with" => Operation::EndsWith,
            "Is blank" => Operation::IsBlank,
            "Not blank" => Operation::NotBlank,
            "Is true" => Operation::IsTrue,
            "Is false" => Operation::IsFalse,
            _ => Operation::Other(name),
        }
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaf {
    pub operation: Operation,
    #[serde(default)]
    pub value: String,
}

impl Leaf {
    pub fn new(operation: Operation, value: impl Into<String>) -> Self {
        Self {
            operation,
            value: value.into(),
        }
    }

    /// A leaf is usable when its operator is self-contained or it carries
    /// a comparison value.
    pub fn is_complete(&self) -> bool {
        self.operation.is_self_contained() || !self.value.is_empty()
    }

    /// Test a row value against this comparison.
    ///
    /// Time columns pad the filter value with seconds for comparisons only;
    /// substring operators see it as typed.
    pub fn test(&self, datatype: Datatype, row_value: Option<&Value>) -> bool {
        let filter_value = self.value.as_str();

        match &self.operation {
            Operation::IsBlank => is_blank(row_value),
            Operation::NotBlank => !is_blank(row_value),
            Operation::IsTrue => row_value == Some(&Value::Bool(true)),
            Operation::IsFalse => row_value == Some(&Value::Bool(false)),
            Operation::Contains => value::display(row_value).contains(filter_value),
            Operation::StartsWith => value::display(row_value).starts_with(filter_value),
            Operation::EndsWith => value::display(row_value).ends_with(filter_value),
            Operation::Other(_) => true,
            comparison => {
                let padded;
                let filter_value = if datatype == Datatype::Time {
                    padded = value::pad_time(filter_value);
                    padded.as_str()
                } else {
                    filter_value
                };
                let (left, right) = coerce(row_value, filter_value);
                let ord = left.compare(&right);
                match comparison {
                    Operation::Equal => ord == Some(Ordering::Equal),
                    Operation::NotEqual => ord != Some(Ordering::Equal),
                    Operation::GreaterThan => ord == Some(Ordering::Greater),
                    Operation::GreaterThanOrEqual => {
                        matches!(ord, Some(Ordering::Greater | Ordering::Equal))
                    }
                    Operation::LessThan => ord == Some(Ordering::Less),
                    Operation::LessThanOrEqual => {
                        matches!(ord, Some(Ordering::Less | Ordering::Equal))
                    }
                    _ => true,
                }
            }
        }
    }
}

/// A per-field condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OperationValue", into = "OperationValue")]
pub enum Condition {
    Leaf(Leaf),
    And(Leaf, Leaf),
    Or(Leaf, Leaf),
}

impl Condition {
    pub fn leaf(operation: Operation, value: impl Into<String>) -> Self {
        Condition::Leaf(Leaf::new(operation, value))
    }

    /// Join a second comparison that must also pass.
    pub fn and(self, operation: Operation, value: impl Into<String>) -> Self {
        Condition::And(self.into_primary(), Leaf::new(operation, value))
    }

    /// Join a second comparison that is tried when the first fails.
    pub fn or(self, operation: Operation, value: impl Into<String>) -> Self {
        Condition::Or(self.into_primary(), Leaf::new(operation, value))
    }

    pub fn primary(&self) -> &Leaf {
        match self {
            Condition::Leaf(leaf) | Condition::And(leaf, _) | Condition::Or(leaf, _) => leaf,
        }
    }

    /// Every comparison, primary first.
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        let (first, second) = match self {
            Condition::Leaf(leaf) => (leaf, None),
            Condition::And(first, second) | Condition::Or(first, second) => (first, Some(second)),
        };
        std::iter::once(first).chain(second)
    }

    fn into_primary(self) -> Leaf {
        match self {
            Condition::Leaf(leaf) | Condition::And(leaf, _) | Condition::Or(leaf, _) => leaf,
        }
    }

    /// Drop incomplete parts: `None` when the primary comparison is
    /// incomplete, the primary alone when only the joined one is.
    pub fn sanitize(self) -> Option<Condition> {
        if !self.primary().is_complete() {
            return None;
        }
        Some(match self {
            Condition::And(first, second) if !second.is_complete() => Condition::Leaf(first),
            Condition::Or(first, second) if !second.is_complete() => Condition::Leaf(first),
            complete => complete,
        })
    }

    /// Evaluate against one field's row value.
    pub fn evaluate(&self, datatype: Datatype, row_value: Option<&Value>) -> bool {
        match self {
            Condition::Leaf(leaf) => leaf.test(datatype, row_value),
            Condition::And(first, second) => {
                first.test(datatype, row_value) && second.test(datatype, row_value)
            }
            Condition::Or(first, second) => {
                first.test(datatype, row_value) || second.test(datatype, row_value)
            }
        }
    }
}

/// Flat wire form of a [`Condition`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Leaf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Leaf>,
}

impl TryFrom<OperationValue> for Condition {
    type Error = String;

    fn try_from(raw: OperationValue) -> std::result::Result<Self, Self::Error> {
        let operation = raw.operation.ok_or("missing operation")?;
        let first = Leaf::new(operation, raw.value);
        match (raw.and, raw.or) {
            (Some(_), Some(_)) => Err("`and` and `or` are mutually exclusive".to_string()),
            (Some(second), None) => Ok(Condition::And(first, second)),
            (None, Some(second)) => Ok(Condition::Or(first, second)),
            (None, None) => Ok(Condition::Leaf(first)),
        }
    }
}

impl From<Condition> for OperationValue {
    fn from(condition: Condition) -> Self {
        let (first, and, or) = match condition {
            Condition::Leaf(first) => (first, None, None),
            Condition::And(first, second) => (first, Some(second), None),
            Condition::Or(first, second) => (first, None, Some(second)),
        };
        Self {
            operation: Some(first.operation),
            value: first.value,
            and,
            or,
        }
    }
}

/// Conditions by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionFilter(BTreeMap<FieldName, Condition>);

impl ConditionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<FieldName>, condition: Condition) -> Self {
        self.0.insert(field.into(), condition);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Condition)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop every incomplete condition, as `apply` would.
    pub fn sanitized(self) -> Self {
        Self(
            self.0
                .into_iter()
                .filter_map(|(field, condition)| condition.sanitize().map(|c| (field, c)))
                .collect(),
        )
    }

    /// Whether a row passes every field's condition. Stops at the first
    /// failing field.
    pub fn matches(&self, row: &Row, columns: &[Column]) -> bool {
        self.0.iter().all(|(field, condition)| {
            let datatype = find_column(columns, field)
                .map(|c| c.datatype)
                .unwrap_or_default();
            condition.evaluate(datatype, row.get(field))
        })
    }
}

/// Tracks the active condition filter and its initial snapshot.
#[derive(Debug, Clone, Default)]
pub struct ConditionFilterEngine {
    filter: ConditionFilter,
    initial: ConditionFilter,
}

impl ConditionFilterEngine {
    pub fn new(initial: ConditionFilter) -> Self {
        Self {
            filter: initial.clone(),
            initial,
        }
    }

    pub fn filter(&self) -> &ConditionFilter {
        &self.filter
    }

    pub fn initial(&self) -> &ConditionFilter {
        &self.initial
    }

    /// Merge per-field updates. `None` clears a field; incomplete
    /// conditions clear it too, and an incomplete joined comparison is
    /// stripped while the primary one is kept.
    pub fn apply<I>(&mut self, update: I) -> &ConditionFilter
    where
        I: IntoIterator<Item = (FieldName, Option<Condition>)>,
    {
        for (field, condition) in update {
            match condition.and_then(Condition::sanitize) {
                Some(condition) => {
                    self.filter.0.insert(field, condition);
                }
                None => {
                    tracing::debug!(field = %field, "condition filter cleared");
                    self.filter.0.remove(&field);
                }
            }
        }
        &self.filter
    }

    /// Merge updates in wire form. An entry without an operation clears
    /// the field.
    pub fn apply_raw<I>(&mut self, update: I) -> Result<&ConditionFilter>
    where
        I: IntoIterator<Item = (FieldName, OperationValue)>,
    {
        let parsed = Self::parse_raw(update)?;
        Ok(self.apply(parsed))
    }

    /// Convert wire-form updates, failing on the first malformed entry.
    pub fn parse_raw<I>(update: I) -> Result<Vec<(FieldName, Option<Condition>)>>
    where
        I: IntoIterator<Item = (FieldName, OperationValue)>,
    {
        let mut parsed = Vec::new();
        for (field, raw) in update {
            if raw.operation.is_none() {
                parsed.push((field, None));
                continue;
            }
            match Condition::try_from(raw) {
                Ok(condition) => parsed.push((field, Some(condition))),
                Err(reason) => return Err(Error::InvalidCondition { field, reason }),
            }
        }
        Ok(parsed)
    }

    /// Clear to empty, or restore the initial snapshot.
    pub fn reset(&mut self, use_initial: bool) -> &ConditionFilter {
        self.filter = if use_initial {
            self.initial.clone()
        } else {
            ConditionFilter::default()
        };
        &self.filter
    }

    /// Replace the active filter wholesale.
    pub fn restore(&mut self, filter: ConditionFilter) {
        self.filter = filter;
    }
}
