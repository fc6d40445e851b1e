//! Column schema definitions.
//!
//! A column describes one field of the rows shown in the table: how it is
//! typed, which filter operators apply to it, and whether it can be sorted,
//! filtered, edited or hidden.

use crate::{
    condition::{Condition, Operation},
    error::Result,
    Error, FieldName,
};
use serde::{Deserialize, Serialize};

/// Data types a column can hold.
///
/// The datatype decides which operator set and which input kind apply when
/// the column is filtered or edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    #[default]
    String,
    Boolean,
    Date,
    Datetime,
    Time,
    Image,
    Link,
    Email,
    Phone,
    Name,
    Paragraph,
    Number,
}

const TEXT_OPERATIONS: &[Operation] = &[
    Operation::Contains,
    Operation::Equal,
    Operation::NotEqual,
    Operation::StartsWith,
    Operation::EndsWith,
    Operation::IsBlank,
    Operation::NotBlank,
];

const RANGE_OPERATIONS: &[Operation] = &[
    Operation::Equal,
    Operation::NotEqual,
    Operation::IsBlank,
    Operation::NotBlank,
    Operation::GreaterThan,
    Operation::GreaterThanOrEqual,
    Operation::LessThan,
    Operation::LessThanOrEqual,
];

const BOOLEAN_OPERATIONS: &[Operation] = &[
    Operation::IsTrue,
    Operation::IsFalse,
    Operation::IsBlank,
    Operation::NotBlank,
];

impl Datatype {
    /// Whether values of this type are free text.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            Datatype::String
                | Datatype::Image
                | Datatype::Link
                | Datatype::Email
                | Datatype::Phone
                | Datatype::Name
                | Datatype::Paragraph
        )
    }

    /// Operators a condition filter may use on this type.
    pub fn operations(self) -> &'static [Operation] {
        match self {
            Datatype::Boolean => BOOLEAN_OPERATIONS,
            text if text.is_textual() => TEXT_OPERATIONS,
            _ => RANGE_OPERATIONS,
        }
    }

    /// Input kind used to enter a filter value, `None` when the operators
    /// of this type are all self-contained.
    pub fn filter_input(self) -> Option<InputKind> {
        match self {
            Datatype::Boolean => None,
            Datatype::Number => Some(InputKind::Number),
            Datatype::Date => Some(InputKind::Date),
            Datatype::Datetime => Some(InputKind::DatetimeLocal),
            Datatype::Time => Some(InputKind::Time),
            _ => Some(InputKind::Text),
        }
    }

    /// Input kind used when a cell of this type is edited in place.
    pub fn edit_input(self) -> InputKind {
        match self {
            Datatype::Boolean => InputKind::Boolean,
            Datatype::Paragraph => InputKind::Textarea,
            other => other.filter_input().unwrap_or(InputKind::Text),
        }
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Datatype::String => "string",
            Datatype::Boolean => "boolean",
            Datatype::Date => "date",
            Datatype::Datetime => "datetime",
            Datatype::Time => "time",
            Datatype::Image => "image",
            Datatype::Link => "link",
            Datatype::Email => "email",
            Datatype::Phone => "phone",
            Datatype::Name => "name",
            Datatype::Paragraph => "paragraph",
            Datatype::Number => "number",
        };
        f.write_str(name)
    }
}

/// Kind of input control the presentation layer should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    Text,
    Textarea,
    Number,
    Date,
    DatetimeLocal,
    Time,
    Boolean,
}

/// Definition of a table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ColumnConfig")]
pub struct Column {
    /// Row field this column reads
    pub field: FieldName,
    /// Header label
    pub column_name: String,
    pub datatype: Datatype,
    pub sortable: bool,
    pub filterable: bool,
    pub editable: bool,
    /// Hidden from view (still filtered and sorted)
    pub omit: bool,
    /// Discrete values offered by the set filter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_options: Option<Vec<serde_json::Value>>,
    /// Restricts the datatype's operator set when non-empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter_operations: Vec<Operation>,
    /// Offer the condition filter alongside the set filter
    pub multi_filter: bool,
}

impl Column {
    /// Create a column with default flags for the given field and type.
    pub fn new(field: impl Into<FieldName>, datatype: Datatype) -> Self {
        ColumnConfig {
            field: field.into(),
            datatype: Some(datatype),
            ..ColumnConfig::default()
        }
        .into()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.column_name = name.into();
        self
    }

    pub fn with_set_options<I, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        self.set_options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_filter_operations(mut self, operations: Vec<Operation>) -> Self {
        self.filter_operations = operations;
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn omitted(mut self) -> Self {
        self.omit = true;
        self
    }

    pub fn with_multi_filter(mut self) -> Self {
        self.multi_filter = true;
        self
    }

    /// Operators offered for this column.
    pub fn filter_operations(&self) -> &[Operation] {
        if self.filter_operations.is_empty() {
            self.datatype.operations()
        } else {
            &self.filter_operations
        }
    }

    /// Whether a condition may use this operator here. Operators the engine
    /// does not recognize are let through.
    pub fn accepts(&self, operation: &Operation) -> bool {
        matches!(operation, Operation::Other(_)) || self.filter_operations().contains(operation)
    }

    /// Reject a condition that uses an operator this column does not offer.
    pub fn check_condition(&self, condition: &Condition) -> Result<()> {
        match condition.leaves().find(|leaf| !self.accepts(&leaf.operation)) {
            None => Ok(()),
            Some(leaf) => {
                tracing::warn!(
                    field = %self.field,
                    operation = %leaf.operation,
                    "operator not offered"
                );
                Err(Error::InvalidCondition {
                    field: self.field.clone(),
                    reason: format!(
                        "'{}' is not offered for {} columns",
                        leaf.operation, self.datatype
                    ),
                })
            }
        }
    }

    /// Whether the condition filter applies to this column. Columns with set
    /// options only get one when operators were listed explicitly or
    /// `multi_filter` is set.
    pub fn has_condition_filter(&self) -> bool {
        self.set_options.is_none() || !self.filter_operations.is_empty() || self.multi_filter
    }
}

/// Column definition as supplied by the host, with every flag optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnConfig {
    pub field: FieldName,
    #[serde(default)]
    pub column_name: Option<String>,
    #[serde(default)]
    pub datatype: Option<Datatype>,
    #[serde(default)]
    pub sortable: Option<bool>,
    #[serde(default)]
    pub filterable: Option<bool>,
    #[serde(default)]
    pub editable: Option<bool>,
    #[serde(default)]
    pub omit: Option<bool>,
    #[serde(default)]
    pub set_options: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub filter_operations: Vec<Operation>,
    #[serde(default)]
    pub multi_filter: bool,
}

impl From<ColumnConfig> for Column {
    fn from(config: ColumnConfig) -> Self {
        let column_name = config
            .column_name
            .unwrap_or_else(|| humanize_field(&config.field));
        Self {
            field: config.field,
            column_name,
            datatype: config.datatype.unwrap_or_default(),
            sortable: config.sortable.unwrap_or(true),
            filterable: config.filterable.unwrap_or(true),
            editable: config.editable.unwrap_or(true),
            omit: config.omit.unwrap_or(false),
            set_options: config.set_options,
            filter_operations: config.filter_operations,
            multi_filter: config.multi_filter,
        }
    }
}

/// Look up a column by field name.
pub fn find_column<'a>(columns: &'a [Column], field: &str) -> Option<&'a Column> {
    columns.iter().find(|c| c.field == field)
}

/// Look up a column that may be filtered.
pub fn filterable_column<'a>(columns: &'a [Column], field: &str) -> Result<&'a Column> {
    let column = find_column(columns, field).ok_or_else(|| {
        tracing::warn!(field, "filter on unknown column");
        Error::UnknownColumn(field.to_string())
    })?;
    if column.filterable {
        Ok(column)
    } else {
        tracing::warn!(field, "filter on unfilterable column");
        Err(Error::InvalidConfig(format!("column '{field}' is not filterable")))
    }
}

/// Turn `firstName` or `first_name` into `first name`.
fn humanize_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    let mut prev_lower = false;
    for ch in field.chars() {
        if ch == '_' {
            out.push(' ');
            prev_lower = false;
            continue;
        }
        if ch.is_ascii_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = ch.is_ascii_lowercase();
        out.push(ch.to_ascii_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_applied_on_deserialize() {
        let column: Column = serde_json::from_value(json!({"field": "firstName"})).unwrap();

        assert_eq!(column.column_name, "first name");
        assert_eq!(column.datatype, Datatype::String);
        assert!(column.sortable);
        assert!(column.filterable);
        assert!(column.editable);
        assert!(!column.omit);
        assert!(column.set_options.is_none());
    }

    #[test]
    fn explicit_flags_win() {
        let column: Column = serde_json::from_value(json!({
            "field": "age",
            "columnName": "Age",
            "datatype": "number",
            "sortable": false,
            "editable": false
        }))
        .unwrap();

        assert_eq!(column.column_name, "Age");
        assert_eq!(column.datatype, Datatype::Number);
        assert!(!column.sortable);
        assert!(!column.editable);
    }

    #[test]
    fn humanize_snake_and_camel() {
        assert_eq!(humanize_field("last_name"), "last name");
        assert_eq!(humanize_field("createdAt"), "created at");
        assert_eq!(humanize_field("id"), "id");
    }

    #[test]
    fn operations_by_datatype() {
        assert!(Datatype::Boolean.operations().contains(&Operation::IsTrue));
        assert!(!Datatype::Boolean.operations().contains(&Operation::Contains));
        assert!(Datatype::Time.operations().contains(&Operation::GreaterThan));
        assert!(Datatype::Email.operations().contains(&Operation::StartsWith));
    }

    #[test]
    fn explicit_filter_operations_restrict() {
        let column = Column::new("name", Datatype::Name)
            .with_filter_operations(vec![Operation::Equal, Operation::Contains]);
        assert_eq!(
            column.filter_operations(),
            &[Operation::Equal, Operation::Contains]
        );

        let plain = Column::new("name", Datatype::Name);
        assert_eq!(plain.filter_operations().len(), 7);
    }

    #[test]
    fn input_kinds() {
        assert_eq!(Datatype::Boolean.filter_input(), None);
        assert_eq!(Datatype::Datetime.filter_input(), Some(InputKind::DatetimeLocal));
        assert_eq!(Datatype::Paragraph.edit_input(), InputKind::Textarea);
        assert_eq!(Datatype::Boolean.edit_input(), InputKind::Boolean);
        assert_eq!(
            serde_json::to_value(InputKind::DatetimeLocal).unwrap(),
            json!("datetime-local")
        );
    }

    #[test]
    fn condition_filter_availability() {
        let set_only = Column::new("status", Datatype::String).with_set_options(["a", "b"]);
        assert!(!set_only.has_condition_filter());
        assert!(set_only.clone().with_multi_filter().has_condition_filter());
        assert!(Column::new("name", Datatype::String).has_condition_filter());
    }

    #[test]
    fn textual_types_get_text_operators() {
        assert!(Datatype::Email.is_textual());
        assert!(!Datatype::Time.is_textual());
        assert!(Datatype::Paragraph.operations().contains(&Operation::Contains));
        assert!(!Datatype::Date.operations().contains(&Operation::Contains));
    }

    #[test]
    fn condition_operators_checked_against_column() {
        let age = Column::new("age", Datatype::Number);
        assert!(age.check_condition(&Condition::leaf(Operation::GreaterThan, "3")).is_ok());
        assert!(matches!(
            age.check_condition(&Condition::leaf(Operation::IsTrue, "")),
            Err(Error::InvalidCondition { .. })
        ));
        assert!(matches!(
            age.check_condition(
                &Condition::leaf(Operation::Equal, "3").or(Operation::Contains, "4")
            ),
            Err(Error::InvalidCondition { .. })
        ));
        let unknown = Condition::leaf(Operation::from("Sounds like".to_string()), "x");
        assert!(age.check_condition(&unknown).is_ok());
    }

    #[test]
    fn filterable_column_lookup() {
        let columns = vec![
            Column::new("name", Datatype::String),
            ColumnConfig {
                field: "secret".into(),
                filterable: Some(false),
                ..ColumnConfig::default()
            }
            .into(),
        ];
        assert!(filterable_column(&columns, "name").is_ok());
        assert_eq!(
            filterable_column(&columns, "nope"),
            Err(Error::UnknownColumn("nope".into()))
        );
        assert!(matches!(
            filterable_column(&columns, "secret"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn datatype_display() {
        assert_eq!(Datatype::Datetime.to_string(), "datetime");
        assert_eq!(Datatype::Number.to_string(), "number");
    }
}
