//! The table: column schema, rows and every engine behind one handle.
//!
//! Each mutation runs to completion before the next starts. After every
//! change to sort, page or filters the table recomputes the visible rows
//! (in local mode) and hands the resulting [`FilterState`] to the
//! registered listener. In server-side mode nothing is recomputed; the
//! host reacts to the listener and answers with [`Table::set_server_data`].
//!
//! Selection is positional over the visible rows, so it is cleared when
//! sort, page or filters change. A plain data refresh keeps it, minus rows
//! that disappeared or became unselectable.

use crate::{
    column::{filterable_column, find_column, Column},
    condition::{Condition, ConditionFilter, ConditionFilterEngine, OperationValue},
    config::{check_filter_fields, TableConfig},
    edit::{EditEngine, FieldError, SaveOutcome, SaveStart, ValidationErrors, Validators},
    error::Result,
    pagination::{Page, Pagination},
    pipeline::{self, DataMode, FilterState},
    selection::{SelectablePredicate, Selection, SelectionState},
    set_filter::{SetFilter, SetFilterEngine, SetFilterEntry},
    snapshot::FilterSnapshot,
    sort::{SortEngine, SortOrder},
    Error, FieldName, Row, RowIndex,
};
use serde_json::Value;
use std::future::Future;

/// Receives the filter state after every change.
pub type FilterListener = Box<dyn FnMut(&FilterState) + Send>;

pub struct Table {
    columns: Vec<Column>,
    mode: DataMode,
    /// Full data set (local mode only)
    data: Vec<Row>,
    visible: Vec<Row>,
    sort: SortEngine,
    pagination: Pagination,
    conditions: ConditionFilterEngine,
    set_filter: SetFilterEngine,
    selection: Selection,
    edit: EditEngine,
    is_selectable: Option<SelectablePredicate>,
    on_filter: Option<FilterListener>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("columns", &self.columns.len())
            .field("mode", &self.mode)
            .field("rows", &self.data.len())
            .field("visible", &self.visible.len())
            .field("filters", &self.filter_state())
            .field("selection", &self.selection)
            .field("edit", &self.edit)
            .finish_non_exhaustive()
    }
}

impl Table {
    /// Build a table. In server-side mode `rows` is the first slice from
    /// the host and the configured `count` its total.
    pub fn new(config: TableConfig, rows: Vec<Row>) -> Result<Self> {
        config.validate()?;
        let mode = config.mode();
        let default_set_filter = SetFilter::all_selected(&config.columns);

        let mut table = Self {
            mode,
            data: Vec::new(),
            visible: Vec::new(),
            sort: SortEngine::new(config.initial_sort_order.unwrap_or_default()),
            pagination: Pagination::new(config.initial_page.unwrap_or_default(), Page::default()),
            conditions: ConditionFilterEngine::new(
                config.initial_condition_filter.unwrap_or_default().sanitized(),
            ),
            set_filter: SetFilterEngine::new(config.initial_set_filter, default_set_filter),
            selection: Selection::new(),
            edit: EditEngine::new(config.unique_row_identifier),
            is_selectable: None,
            on_filter: None,
            columns: config.columns,
        };

        match mode {
            DataMode::Local => {
                table.data = rows;
                table.recompute();
            }
            DataMode::ServerSide => {
                let count = config.count.unwrap_or(rows.len());
                table.load_server_rows(rows, count);
            }
        }
        tracing::debug!(columns = table.columns.len(), ?mode, "table created");
        Ok(table)
    }

    /// Load config from JSON and build the table.
    pub fn from_json(config: &str, rows: Vec<Row>) -> Result<Self> {
        Self::new(TableConfig::from_json(config)?, rows)
    }

    pub fn with_selectable<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        self.is_selectable = Some(Box::new(predicate));
        self.sync_selection();
        self
    }

    pub fn with_validators(mut self, validators: Validators) -> Self {
        self.edit.set_validators(validators);
        self
    }

    /// Register the filter change listener. It fires after every mutation,
    /// not on registration.
    pub fn on_filter_change<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&FilterState) + Send + 'static,
    {
        self.on_filter = Some(Box::new(listener));
        self
    }

    // ---------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------

    pub fn mode(&self) -> DataMode {
        self.mode
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns not hidden with `omit`.
    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.omit)
    }

    /// Rows on the current page.
    pub fn rows(&self) -> &[Row] {
        &self.visible
    }

    /// Rows after filtering (or the host's total in server-side mode).
    pub fn count(&self) -> usize {
        self.pagination.count()
    }

    pub fn sort_order(&self) -> &SortOrder {
        self.sort.sort_order()
    }

    pub fn page(&self) -> &Page {
        self.pagination.page()
    }

    pub fn last_page_number(&self) -> usize {
        self.pagination.last_page_number()
    }

    /// 1-based first and last row numbers on the current page.
    pub fn range_label(&self) -> (usize, usize) {
        self.pagination.range_label(self.visible.len())
    }

    pub fn condition_filter(&self) -> &ConditionFilter {
        self.conditions.filter()
    }

    pub fn set_filter(&self) -> &SetFilter {
        self.set_filter.filter()
    }

    pub fn filter_state(&self) -> FilterState {
        FilterState {
            sort_order: self.sort.sort_order().clone(),
            page: self.pagination.page().clone(),
            condition_filter: self.conditions.filter().clone(),
            set_filter: self.set_filter.filter().clone(),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn edits(&self) -> &EditEngine {
        &self.edit
    }

    // ---------------------------------------------------------------
    // Data
    // ---------------------------------------------------------------

    /// Replace the full data set (local mode).
    pub fn set_data(&mut self, rows: Vec<Row>) -> Result<()> {
        if self.mode != DataMode::Local {
            return Err(Error::InvalidConfig(
                "set_data requires local mode; use set_server_data".into(),
            ));
        }
        self.data = rows;
        self.recompute();
        Ok(())
    }

    /// Replace the visible slice and total count (server-side mode). If
    /// the new count puts the current page out of range the page is pulled
    /// back and the listener is told, so the host can fetch again.
    pub fn set_server_data(&mut self, rows: Vec<Row>, count: usize) -> Result<()> {
        if self.mode != DataMode::ServerSide {
            return Err(Error::InvalidConfig(
                "set_server_data requires server-side mode".into(),
            ));
        }
        let before = self.pagination.page().current_page;
        self.load_server_rows(rows, count);
        if self.pagination.page().current_page != before {
            self.notify();
        }
        Ok(())
    }

    pub fn set_column_omitted(&mut self, field: &str, omit: bool) -> Result<()> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.field == field)
            .ok_or_else(|| Error::UnknownColumn(field.to_string()))?;
        column.omit = omit;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Sorting
    // ---------------------------------------------------------------

    /// Sort by a column. `multi` keeps the other sorted columns.
    pub fn on_sort(&mut self, field: &str, multi: bool) -> Result<&SortOrder> {
        let column = self.column(field)?;
        if !column.sortable {
            tracing::warn!(field, "sort requested on unsortable column");
            return Err(Error::InvalidConfig(format!("column '{field}' is not sortable")));
        }
        self.sort.on_sort(field, multi);
        self.filters_changed();
        Ok(self.sort.sort_order())
    }

    pub fn reset_sort(&mut self, use_initial: bool) -> &SortOrder {
        self.sort.reset(use_initial);
        self.filters_changed();
        self.sort.sort_order()
    }

    // ---------------------------------------------------------------
    // Paging
    // ---------------------------------------------------------------

    pub fn first_page(&mut self) -> &Page {
        self.pagination.first_page();
        self.filters_changed();
        self.pagination.page()
    }

    pub fn last_page(&mut self) -> &Page {
        self.pagination.last_page();
        self.filters_changed();
        self.pagination.page()
    }

    pub fn next_page(&mut self) -> &Page {
        self.pagination.next_page();
        self.filters_changed();
        self.pagination.page()
    }

    pub fn previous_page(&mut self) -> &Page {
        self.pagination.previous_page();
        self.filters_changed();
        self.pagination.page()
    }

    pub fn go_to_page(&mut self, page: usize) -> &Page {
        self.pagination.go_to_page(page);
        self.filters_changed();
        self.pagination.page()
    }

    pub fn on_change_rows_per_page(&mut self, rows_per_page: usize) -> Result<&Page> {
        self.pagination
            .on_change_rows_per_page(rows_per_page)
            .inspect_err(|e| tracing::warn!(error = %e, "rows per page rejected"))?;
        self.filters_changed();
        Ok(self.pagination.page())
    }

    // ---------------------------------------------------------------
    // Set filter
    // ---------------------------------------------------------------

    /// Merge per-field allow-lists. Every field must be a filterable
    /// column; nothing changes when one is not.
    pub fn apply_set_filter<I>(&mut self, update: I) -> Result<&SetFilter>
    where
        I: IntoIterator<Item = (FieldName, SetFilterEntry)>,
    {
        let update: Vec<_> = update.into_iter().collect();
        for (field, _) in &update {
            filterable_column(&self.columns, field)?;
        }
        self.set_filter.apply(update);
        self.filters_changed();
        Ok(self.set_filter.filter())
    }

    pub fn clear_set_filter(&mut self, field: &str) -> &SetFilter {
        self.set_filter.clear_field(field);
        self.filters_changed();
        self.set_filter.filter()
    }

    /// Check or uncheck one option of a column's set filter.
    pub fn toggle_set_option(&mut self, field: &str, value: Value) -> Result<&SetFilter> {
        let options = self.set_options(field)?;
        self.set_filter.toggle_option(field, value, &options);
        self.filters_changed();
        Ok(self.set_filter.filter())
    }

    /// Select all of a column's options, or none when all are selected.
    pub fn toggle_set_all(&mut self, field: &str) -> Result<&SetFilter> {
        let options = self.set_options(field)?;
        self.set_filter.toggle_all(field, &options);
        self.filters_changed();
        Ok(self.set_filter.filter())
    }

    /// Whether a column's set filter hides any of its options.
    pub fn has_set_filter(&self, field: &str) -> bool {
        find_column(&self.columns, field)
            .and_then(|c| c.set_options.as_deref())
            .is_some_and(|options| self.set_filter.has_filter(field, options))
    }

    pub fn reset_set_filter(&mut self, use_default: bool) -> &SetFilter {
        self.set_filter.reset(use_default);
        self.filters_changed();
        self.set_filter.filter()
    }

    // ---------------------------------------------------------------
    // Condition filter
    // ---------------------------------------------------------------

    /// Merge per-field conditions; `None` clears a field.
    ///
    /// Each field must be a filterable column and every comparison must use
    /// an operator the column offers. The update is all or nothing.
    pub fn apply_condition_filter<I>(&mut self, update: I) -> Result<&ConditionFilter>
    where
        I: IntoIterator<Item = (FieldName, Option<Condition>)>,
    {
        let update: Vec<_> = update.into_iter().collect();
        for (field, condition) in &update {
            match condition {
                Some(condition) => {
                    filterable_column(&self.columns, field)?.check_condition(condition)?;
                }
                None => {
                    self.column(field)?;
                }
            }
        }
        self.conditions.apply(update);
        self.filters_changed();
        Ok(self.conditions.filter())
    }

    /// Merge conditions in their wire form.
    pub fn apply_condition_filter_raw<I>(&mut self, update: I) -> Result<&ConditionFilter>
    where
        I: IntoIterator<Item = (FieldName, OperationValue)>,
    {
        let parsed = ConditionFilterEngine::parse_raw(update)
            .inspect_err(|e| tracing::warn!(error = %e, "condition rejected"))?;
        self.apply_condition_filter(parsed)
    }

    pub fn reset_condition_filter(&mut self, use_initial: bool) -> &ConditionFilter {
        self.conditions.reset(use_initial);
        self.filters_changed();
        self.conditions.filter()
    }

    // ---------------------------------------------------------------
    // Whole filter state
    // ---------------------------------------------------------------

    /// Reset every engine and clear the selection. With `use_initial` the
    /// configured initial state comes back; otherwise sort and conditions
    /// are emptied, the page returns to the default and the set filter
    /// selects every option.
    pub fn reset(&mut self, use_initial: bool) -> FilterState {
        self.sort.reset(use_initial);
        self.pagination.reset(!use_initial);
        self.conditions.reset(use_initial);
        self.set_filter.reset(!use_initial);
        tracing::debug!(use_initial, "filters reset");
        self.filters_changed();
        self.filter_state()
    }

    /// Snapshot of the current filter state.
    pub fn get_filters(&self) -> FilterSnapshot {
        FilterSnapshot::new(self.filter_state())
    }

    /// Restore a saved filter state.
    pub fn set_filters(&mut self, snapshot: FilterSnapshot) -> Result<FilterState> {
        let state = snapshot.into_state();
        state
            .page
            .validate()
            .inspect_err(|e| tracing::warn!(error = %e, "snapshot page rejected"))?;
        check_filter_fields(
            &self.columns,
            Some(&state.condition_filter),
            Some(&state.set_filter),
        )?;
        self.sort.restore(state.sort_order);
        self.pagination.restore(state.page);
        self.conditions.restore(state.condition_filter.sanitized());
        self.set_filter.restore(state.set_filter);
        self.filters_changed();
        Ok(self.filter_state())
    }

    // ---------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------

    pub fn select_all(&mut self, select: bool) -> SelectionState {
        self.selection.select_all(select)
    }

    pub fn on_select_row(&mut self, checked: bool, index: RowIndex) -> Result<SelectionState> {
        self.selection.on_select_row(checked, index)
    }

    /// Data of the selected visible rows.
    pub fn selected_rows(&self) -> Vec<&Row> {
        self.selection
            .selected_rows()
            .into_iter()
            .filter_map(|i| self.visible.get(i))
            .collect()
    }

    // ---------------------------------------------------------------
    // Editing
    // ---------------------------------------------------------------

    /// Start or cancel editing a cell of a visible row.
    pub fn on_edit(&mut self, index: RowIndex, field: &str, cancel: bool) -> Result<()> {
        self.ensure_editable(field)?;
        let row = row_at(&self.visible, index)?;
        self.edit.on_edit(row, field, cancel)
    }

    /// Record a pending value for a cell of a visible row.
    pub fn on_change(&mut self, index: RowIndex, field: &str, value: Value) -> Result<()> {
        self.ensure_editable(field)?;
        let row = row_at(&self.visible, index)?;
        self.edit.on_change(row, field, value)
    }

    pub fn is_dirty(&self) -> bool {
        self.edit.is_dirty()
    }

    pub fn is_field_dirty(&self, index: RowIndex, field: &str) -> bool {
        self.visible
            .get(index)
            .is_some_and(|row| self.edit.is_field_dirty(row, field))
    }

    /// Pending value of a cell, if any.
    pub fn dirty_value(&self, index: RowIndex, field: &str) -> Option<&Value> {
        self.edit.dirty_value(self.visible.get(index)?, field)
    }

    /// Value to display for a cell: the pending edit, else a value that
    /// failed validation, else the row's own.
    pub fn cell_value(&self, index: RowIndex, field: &str) -> Option<&Value> {
        let row = self.visible.get(index)?;
        self.edit.shown_value(row, field).or_else(|| row.get(field))
    }

    pub fn validation_errors(&self) -> &ValidationErrors {
        self.edit.validation_errors()
    }

    pub fn validation_error(&self, index: RowIndex, field: &str) -> Option<&FieldError> {
        self.edit.validation_error(self.visible.get(index)?, field)
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.edit.submit_error()
    }

    pub fn is_saving(&self) -> bool {
        self.edit.is_saving()
    }

    pub fn begin_save(&mut self) -> Result<SaveStart> {
        self.edit.begin_save(&self.columns)
    }

    pub fn finish_save(&mut self, result: std::result::Result<(), String>) -> Result<SaveOutcome> {
        self.edit.finish_save(result)
    }

    /// Validate pending edits and submit them through `submit`.
    pub async fn save<F, Fut, T, E>(&mut self, submit: F) -> Result<SaveOutcome>
    where
        F: FnOnce(Vec<Row>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        self.edit.save(&self.columns, submit).await
    }

    pub fn cancel_edits(&mut self) {
        self.edit.cancel();
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn column(&self, field: &str) -> Result<&Column> {
        find_column(&self.columns, field).ok_or_else(|| {
            tracing::warn!(field, "unknown column");
            Error::UnknownColumn(field.to_string())
        })
    }

    fn set_options(&self, field: &str) -> Result<Vec<Value>> {
        filterable_column(&self.columns, field)?
            .set_options
            .clone()
            .ok_or_else(|| Error::InvalidConfig(format!("column '{field}' has no set options")))
    }

    fn ensure_editable(&self, field: &str) -> Result<()> {
        if self.column(field)?.editable {
            Ok(())
        } else {
            tracing::warn!(field, "edit rejected on read-only column");
            Err(Error::ColumnNotEditable(field.to_string()))
        }
    }

    /// Sort, page or filters changed: the selection no longer lines up.
    fn filters_changed(&mut self) {
        self.selection.reset();
        if self.mode == DataMode::Local {
            self.recompute();
        } else {
            self.pagination.clamp();
        }
        self.notify();
    }

    fn recompute(&mut self) {
        let result = pipeline::run(&self.data, &self.filter_state(), &self.columns);
        self.pagination.set_count(result.count);
        self.pagination.clamp();
        self.visible = result.rows;
        self.sync_selection();
    }

    fn load_server_rows(&mut self, rows: Vec<Row>, count: usize) {
        self.visible = rows;
        self.pagination.set_count(count);
        self.pagination.clamp();
        self.sync_selection();
    }

    fn sync_selection(&mut self) {
        match &self.is_selectable {
            Some(predicate) => self.selection.sync(&self.visible, |row| predicate(row)),
            None => self.selection.sync(&self.visible, |_| true),
        }
    }

    fn notify(&mut self) {
        let state = self.filter_state();
        if let Some(listener) = self.on_filter.as_mut() {
            listener(&state);
        }
    }
}

fn row_at(rows: &[Row], index: RowIndex) -> Result<&Row> {
    rows.get(index).ok_or(Error::RowOutOfRange {
        index,
        len: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Datatype;
    use crate::condition::Operation;
    use crate::sort::SortDirection;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn rows(n: i64) -> Vec<Row> {
        (1..=n)
            .filter_map(|i| {
                json!({"id": i, "name": format!("row {i}"), "score": i % 7, "locked": i % 10 == 0})
                    .as_object()
                    .cloned()
            })
            .collect()
    }

    fn config() -> TableConfig {
        TableConfig::new(vec![
            Column::new("id", Datatype::Number).read_only(),
            Column::new("name", Datatype::String),
            Column::new("score", Datatype::Number).with_set_options([0, 1, 2, 3, 4, 5, 6]),
            Column::new("locked", Datatype::Boolean).unsortable(),
        ])
    }

    fn table(n: i64) -> Table {
        Table::new(config(), rows(n)).unwrap()
    }

    fn ids(table: &Table) -> Vec<i64> {
        table
            .rows()
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .collect()
    }

    #[test]
    fn initial_view_is_first_page() {
        let t = table(120);
        assert_eq!(t.count(), 120);
        assert_eq!(t.rows().len(), 50);
        assert_eq!(t.last_page_number(), 3);
        assert_eq!(t.range_label(), (1, 50));
    }

    #[test]
    fn sort_then_page() {
        let mut t = table(120);
        t.on_sort("id", false).unwrap();
        t.on_sort("id", false).unwrap();
        assert_eq!(ids(&t)[0], 120);

        t.last_page();
        assert_eq!(t.page().current_page, 3);
        assert_eq!(ids(&t).last(), Some(&1));
    }

    #[test]
    fn sort_rejects_unknown_and_unsortable() {
        let mut t = table(3);
        assert!(matches!(t.on_sort("nope", false), Err(Error::UnknownColumn(_))));
        assert!(matches!(t.on_sort("locked", false), Err(Error::InvalidConfig(_))));
    }

    fn equal(field: &str, value: &str) -> [(String, Option<Condition>); 1] {
        [(field.to_string(), Some(Condition::leaf(Operation::Equal, value)))]
    }

    #[test]
    fn filters_follow_column_schema() {
        let mut config = config();
        config.columns.push(Column {
            filterable: false,
            ..Column::new("note", Datatype::String)
        });
        let mut t = Table::new(config, rows(5)).unwrap();

        assert!(matches!(
            t.apply_condition_filter(equal("note", "1")),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            t.apply_condition_filter(equal("nope", "x")),
            Err(Error::UnknownColumn(_))
        ));
        assert!(matches!(
            t.apply_condition_filter([(
                "score".to_string(),
                Some(Condition::leaf(Operation::IsTrue, "")),
            )]),
            Err(Error::InvalidCondition { .. })
        ));
        assert!(matches!(
            t.apply_condition_filter([(
                "id".to_string(),
                Some(Condition::leaf(Operation::GreaterThan, "1").or(Operation::Contains, "5")),
            )]),
            Err(Error::InvalidCondition { .. })
        ));
        assert!(matches!(
            t.apply_set_filter([("note".to_string(), SetFilterEntry::new(["a"]))]),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            t.apply_set_filter([("nope".to_string(), SetFilterEntry::new(["a"]))]),
            Err(Error::UnknownColumn(_))
        ));

        assert!(t.condition_filter().is_empty());
        assert_eq!(t.count(), 5);
        assert!(t.set_filter().get("note").is_none());
    }

    #[test]
    fn rejected_update_applies_nothing() {
        let mut t = table(5);
        let update = [
            ("id".to_string(), Some(Condition::leaf(Operation::Equal, "1"))),
            ("nope".to_string(), Some(Condition::leaf(Operation::Equal, "1"))),
        ];
        assert!(t.apply_condition_filter(update).is_err());
        assert!(t.condition_filter().is_empty());
        assert_eq!(t.count(), 5);
    }

    #[test]
    fn snapshot_with_unknown_field_is_rejected() {
        let mut t = table(5);
        let snapshot = FilterSnapshot::new(FilterState {
            condition_filter: ConditionFilter::new()
                .with("nope", Condition::leaf(Operation::Equal, "1")),
            ..t.filter_state()
        });
        assert!(matches!(t.set_filters(snapshot), Err(Error::UnknownColumn(_))));
        assert!(t.condition_filter().is_empty());
    }

    #[test]
    fn filtering_clamps_page() {
        let mut t = table(120);
        t.last_page();
        t.apply_condition_filter([(
            "id".to_string(),
            Some(Condition::leaf(Operation::LessThanOrEqual, "10")),
        )])
        .unwrap();
        assert_eq!(t.count(), 10);
        assert_eq!(t.page().current_page, 1);
        assert_eq!(ids(&t), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn set_filter_toggles() {
        let mut t = table(70);
        assert!(!t.has_set_filter("score"));

        t.toggle_set_option("score", json!(0)).unwrap();
        assert!(t.has_set_filter("score"));
        assert_eq!(t.count(), 60);

        t.toggle_set_all("score").unwrap();
        assert_eq!(t.count(), 70);
        t.toggle_set_all("score").unwrap();
        assert_eq!(t.count(), 0);

        assert!(matches!(
            t.toggle_set_option("name", json!("x")),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn listener_sees_every_change() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut t = table(120).on_filter_change(move |state| {
            sink.lock().unwrap().push(state.page.current_page);
        });

        t.next_page();
        t.on_sort("name", false).unwrap();
        t.go_to_page(3);

        assert_eq!(*seen.lock().unwrap(), vec![2, 2, 3]);
    }

    #[test]
    fn selection_uses_predicate_and_clears_on_sort() {
        let mut t = table(12)
            .with_selectable(|row| row.get("locked") != Some(&json!(true)));
        assert!(t.selection().is_disabled(9));

        let state = t.select_all(true);
        assert_eq!(state.selected_rows.len(), 11);
        assert_eq!(t.selected_rows().len(), 11);

        t.on_sort("id", false).unwrap();
        assert!(t.selection().selected_rows().is_empty());
    }

    #[test]
    fn edit_rejects_read_only_column() {
        let mut t = table(3);
        assert_eq!(
            t.on_change(0, "id", json!(9)),
            Err(Error::ColumnNotEditable("id".into()))
        );
        assert!(matches!(
            t.on_change(5, "name", json!("x")),
            Err(Error::RowOutOfRange { index: 5, len: 3 })
        ));
    }

    #[test]
    fn cell_value_prefers_pending_edit() {
        let mut t = table(3);
        t.on_change(1, "name", json!("renamed")).unwrap();
        assert_eq!(t.cell_value(1, "name"), Some(&json!("renamed")));
        assert_eq!(t.cell_value(0, "name"), Some(&json!("row 1")));
        assert!(t.is_field_dirty(1, "name"));
    }

    #[test]
    fn reset_round_trip() {
        let config = config()
            .with_sort_order(SortOrder::new().with("score", SortDirection::Desc, 1))
            .with_page(Page {
                current_page: 2,
                rows_per_page: vec![10, 20],
                current_rows_per_page: 10,
            });
        let mut t = Table::new(config, rows(100)).unwrap();
        let initial = t.filter_state();

        t.on_sort("name", true).unwrap();
        t.on_change_rows_per_page(20).unwrap();
        t.toggle_set_option("score", json!(3)).unwrap();
        t.apply_condition_filter([(
            "name".to_string(),
            Some(Condition::leaf(Operation::Contains, "1")),
        )])
        .unwrap();

        assert_eq!(t.reset(true), initial);

        let cleared = t.reset(false);
        assert!(cleared.sort_order.is_empty());
        assert!(cleared.condition_filter.is_empty());
        assert_eq!(cleared.page, Page::default());
        assert!(cleared.set_filter.get("score").is_some_and(|e| e.is_all));
    }

    #[test]
    fn server_side_tracks_without_recomputing() {
        let config = config().server_side(500);
        let mut t = Table::new(config, rows(50)).unwrap();
        assert_eq!(t.mode(), DataMode::ServerSide);
        assert_eq!(t.count(), 500);

        t.on_sort("id", false).unwrap();
        // Row order is the host's business.
        assert_eq!(ids(&t)[0], 1);

        t.last_page();
        assert_eq!(t.page().current_page, 10);

        t.set_server_data(rows(5), 5).unwrap();
        assert_eq!(t.page().current_page, 1);
        assert!(t.set_data(rows(1)).is_err());
    }

    #[test]
    fn filters_snapshot_round_trip() {
        let mut t = table(100);
        t.on_sort("score", false).unwrap();
        t.next_page();
        let saved = t.get_filters();

        t.reset(false);
        let restored = t.set_filters(saved.clone()).unwrap();
        assert_eq!(restored, saved.state);
        assert_eq!(t.page().current_page, 2);
    }

    #[test]
    fn omit_columns() {
        let mut t = table(1);
        t.set_column_omitted("locked", true).unwrap();
        let visible: Vec<&str> = t.visible_columns().map(|c| c.field.as_str()).collect();
        assert_eq!(visible, vec!["id", "name", "score"]);
        assert!(t.set_column_omitted("nope", true).is_err());
    }
}
