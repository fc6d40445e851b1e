//! Set filters: per-field allow-lists of discrete values.
//!
//! A field without an entry is unrestricted. A field with an entry only
//! lets through rows whose value is in its include list, so an empty list
//! hides every row. `isAll` entries stand for "every known option" and are
//! evaluated against the column's current option list, which keeps saved
//! filters valid when options are added later.

use crate::{
    column::{find_column, Column},
    FieldName, Row,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Allowed values for one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFilterEntry {
    pub include: Vec<Value>,
    #[serde(default)]
    pub is_all: bool,
}

impl SetFilterEntry {
    pub fn new<I, V>(include: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            is_all: false,
        }
    }

    /// Every option selected.
    pub fn all(options: &[Value]) -> Self {
        Self {
            include: options.to_vec(),
            is_all: true,
        }
    }

    /// Build an entry from a selection, marking it `isAll` when it covers
    /// every option.
    fn from_selection(include: Vec<Value>, options: &[Value]) -> Self {
        let is_all = !options.is_empty() && options.iter().all(|o| include.contains(o));
        Self { include, is_all }
    }

    fn allows(&self, value: &Value, options: Option<&[Value]>) -> bool {
        match options {
            Some(options) if self.is_all => options.contains(value),
            _ => self.include.contains(value),
        }
    }
}

/// Allow-lists by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetFilter(BTreeMap<FieldName, SetFilterEntry>);

impl SetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every filterable column with set options, fully selected.
    pub fn all_selected(columns: &[Column]) -> Self {
        Self(
            columns
                .iter()
                .filter(|c| c.filterable)
                .filter_map(|c| {
                    c.set_options
                        .as_deref()
                        .map(|options| (c.field.clone(), SetFilterEntry::all(options)))
                })
                .collect(),
        )
    }

    pub fn with(mut self, field: impl Into<FieldName>, entry: SetFilterEntry) -> Self {
        self.0.insert(field.into(), entry);
        self
    }

    pub fn get(&self, field: &str) -> Option<&SetFilterEntry> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &SetFilterEntry)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a row's value for every filtered field is allowed.
    pub fn matches(&self, row: &Row, columns: &[Column]) -> bool {
        self.0.iter().all(|(field, entry)| {
            let options = find_column(columns, field).and_then(|c| c.set_options.as_deref());
            let value = row.get(field).unwrap_or(&Value::Null);
            entry.allows(value, options)
        })
    }
}

/// Tracks the active set filter, its initial snapshot and the default
/// (everything selected) filter.
#[derive(Debug, Clone, Default)]
pub struct SetFilterEngine {
    filter: SetFilter,
    initial: SetFilter,
    default: SetFilter,
}

impl SetFilterEngine {
    /// Start from `initial`, falling back to `default` when absent.
    pub fn new(initial: Option<SetFilter>, default: SetFilter) -> Self {
        let initial = initial.unwrap_or_else(|| default.clone());
        Self {
            filter: initial.clone(),
            initial,
            default,
        }
    }

    pub fn filter(&self) -> &SetFilter {
        &self.filter
    }

    pub fn initial(&self) -> &SetFilter {
        &self.initial
    }

    /// Merge per-field allow-lists into the current filter.
    pub fn apply<I>(&mut self, update: I) -> &SetFilter
    where
        I: IntoIterator<Item = (FieldName, SetFilterEntry)>,
    {
        for (field, entry) in update {
            if entry.include.is_empty() {
                tracing::debug!(field = %field, "set filter excludes every value");
            }
            self.filter.0.insert(field, entry);
        }
        &self.filter
    }

    /// Remove a field's restriction entirely.
    pub fn clear_field(&mut self, field: &str) -> &SetFilter {
        self.filter.0.remove(field);
        &self.filter
    }

    /// Check or uncheck one option in a field's list.
    pub fn toggle_option(&mut self, field: &str, value: Value, options: &[Value]) -> &SetFilter {
        let mut selected = self.selection(field, options);
        match selected.iter().position(|v| *v == value) {
            Some(pos) => {
                selected.remove(pos);
            }
            None => selected.push(value),
        }
        let entry = SetFilterEntry::from_selection(selected, options);
        self.filter.0.insert(field.to_string(), entry);
        &self.filter
    }

    /// Select every option, or none when every option is already selected.
    pub fn toggle_all(&mut self, field: &str, options: &[Value]) -> &SetFilter {
        let selected = self.selection(field, options);
        let everything = options.iter().all(|o| selected.contains(o));
        let entry = if everything {
            SetFilterEntry::new(Vec::<Value>::new())
        } else {
            SetFilterEntry::all(options)
        };
        self.filter.0.insert(field.to_string(), entry);
        &self.filter
    }

    /// Whether a field is narrowed below its full option list.
    pub fn has_filter(&self, field: &str, options: &[Value]) -> bool {
        match self.filter.get(field) {
            None => false,
            Some(entry) if entry.is_all => false,
            Some(entry) => !options.iter().all(|o| entry.include.contains(o)),
        }
    }

    /// Restore the default filter, or the initial snapshot.
    pub fn reset(&mut self, use_default: bool) -> &SetFilter {
        self.filter = if use_default {
            self.default.clone()
        } else {
            self.initial.clone()
        };
        &self.filter
    }

    /// Replace the active filter wholesale.
    pub fn restore(&mut self, filter: SetFilter) {
        self.filter = filter;
    }

    fn selection(&self, field: &str, options: &[Value]) -> Vec<Value> {
        match self.filter.get(field) {
            Some(entry) if entry.is_all => options.to_vec(),
            Some(entry) => entry.include.clone(),
            None => options.to_vec(),
        }
    }
}
