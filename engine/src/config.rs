//! Table configuration.
//!
//! Everything serialisable about a table lives here and can be loaded from
//! JSON. Host callbacks (selectability, validators, change listener) are
//! attached on [`crate::Table`] instead.

use crate::{
    column::{filterable_column, Column},
    condition::ConditionFilter,
    error::Result,
    pagination::Page,
    pipeline::DataMode,
    set_filter::SetFilter,
    sort::SortOrder,
    Error, FieldName,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn default_row_identifier() -> FieldName {
    "id".to_string()
}

/// Serialisable table setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_sort_order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_page: Option<Page>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_condition_filter: Option<ConditionFilter>,
    /// When absent, every column with set options starts fully selected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_set_filter: Option<SetFilter>,
    #[serde(default = "default_row_identifier")]
    pub unique_row_identifier: FieldName,
    /// Filtering, sorting and paging happen on the host
    #[serde(default)]
    pub server_side: bool,
    /// Total row count reported by the host in server-side mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TableConfig {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            initial_sort_order: None,
            initial_page: None,
            initial_condition_filter: None,
            initial_set_filter: None,
            unique_row_identifier: default_row_identifier(),
            server_side: false,
            count: None,
        }
    }

    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.initial_sort_order = Some(order);
        self
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.initial_page = Some(page);
        self
    }

    pub fn with_condition_filter(mut self, filter: ConditionFilter) -> Self {
        self.initial_condition_filter = Some(filter);
        self
    }

    pub fn with_set_filter(mut self, filter: SetFilter) -> Self {
        self.initial_set_filter = Some(filter);
        self
    }

    pub fn with_row_identifier(mut self, field: impl Into<FieldName>) -> Self {
        self.unique_row_identifier = field.into();
        self
    }

    pub fn server_side(mut self, count: usize) -> Self {
        self.server_side = true;
        self.count = Some(count);
        self
    }

    pub fn mode(&self) -> DataMode {
        if self.server_side {
            DataMode::ServerSide
        } else {
            DataMode::Local
        }
    }

    /// Load from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Reject duplicate columns, a blank row identifier and broken pages.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for column in &self.columns {
            if !seen.insert(column.field.as_str()) {
                return Err(self.reject(format!("duplicate column field '{}'", column.field)));
            }
        }

        if self.unique_row_identifier.trim().is_empty() {
            return Err(self.reject("uniqueRowIdentifier must not be blank".to_string()));
        }

        check_filter_fields(
            &self.columns,
            self.initial_condition_filter.as_ref(),
            self.initial_set_filter.as_ref(),
        )?;

        if let Some(page) = &self.initial_page {
            page.validate().inspect_err(|e| {
                tracing::warn!(error = %e, "invalid initial page");
            })?;
        }
        Ok(())
    }

    fn reject(&self, reason: String) -> Error {
        tracing::warn!(%reason, "invalid table configuration");
        Error::InvalidConfig(reason)
    }
}

/// Every filtered field must be a filterable column, and conditions may
/// only use the operators their column offers.
pub(crate) fn check_filter_fields(
    columns: &[Column],
    conditions: Option<&ConditionFilter>,
    set_filter: Option<&SetFilter>,
) -> Result<()> {
    for (field, condition) in conditions.into_iter().flat_map(ConditionFilter::iter) {
        filterable_column(columns, field)?.check_condition(condition)?;
    }
    for (field, _) in set_filter.into_iter().flat_map(SetFilter::iter) {
        filterable_column(columns, field)?;
    }
    Ok(())
}
