//! The query pipeline.
//!
//! Visible rows are recomputed from scratch on every change, in a fixed
//! order: set filter, condition filter, sort, then the page window. The
//! count reported is the number of rows left after filtering, before
//! paging.

use crate::{
    column::Column,
    condition::ConditionFilter,
    pagination::{last_page, Page},
    set_filter::SetFilter,
    sort::SortOrder,
    Row,
};
use serde::{Deserialize, Serialize};

/// Where filtering, sorting and paging happen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataMode {
    /// The engine runs the pipeline over the full row set.
    #[default]
    Local,
    /// The host computes the visible slice; the engine only tracks and
    /// publishes the filter state.
    ServerSide,
}

/// The composed filter descriptor handed to the host after every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub page: Page,
    #[serde(default)]
    pub condition_filter: ConditionFilter,
    #[serde(default)]
    pub set_filter: SetFilter,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Rows on the current page
    pub rows: Vec<Row>,
    /// Rows passing both filters
    pub count: usize,
    /// Page actually shown, after clamping to the last page
    pub current_page: usize,
}

/// Whether a row passes the set filter and then the condition filter.
pub fn passes(row: &Row, state: &FilterState, columns: &[Column]) -> bool {
    state.set_filter.matches(row, columns) && state.condition_filter.matches(row, columns)
}

/// Filter and sort without paging.
pub fn filter_and_sort<'a>(rows: &'a [Row], state: &FilterState, columns: &[Column]) -> Vec<&'a Row> {
    let mut filtered: Vec<&Row> = rows
        .iter()
        .filter(|row| passes(row, state, columns))
        .collect();
    state.sort_order.sort(&mut filtered);
    filtered
}

/// Run the whole pipeline.
///
/// A current page past the end of the filtered rows is clamped to the last
/// page rather than producing an empty window.
pub fn run(rows: &[Row], state: &FilterState, columns: &[Column]) -> QueryResult {
    let sorted = filter_and_sort(rows, state, columns);
    let count = sorted.len();

    let page = Page {
        current_page: state
            .page
            .current_page
            .clamp(1, last_page(count, state.page.current_rows_per_page)),
        ..state.page.clone()
    };
    let window = page.window(count);
    let visible: Vec<Row> = sorted[window].iter().map(|row| (*row).clone()).collect();

    tracing::debug!(
        input = rows.len(),
        filtered = count,
        visible = visible.len(),
        page = page.current_page,
        "pipeline recomputed"
    );

    QueryResult {
        rows: visible,
        count,
        current_page: page.current_page,
    }
}
