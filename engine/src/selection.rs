//! Row selection for bulk actions.
//!
//! Selection is keyed by position in the visible row list. Disabled rows
//! are derived from the host's selectability predicate every time the rows
//! change and are never selected.

use crate::{error::Result, Error, Row, RowIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Predicate deciding whether a row may be selected.
pub type SelectablePredicate = Box<dyn Fn(&Row) -> bool + Send + Sync>;

/// Indices of rows the predicate rejects.
pub fn disabled_indices<F>(rows: &[Row], is_selectable: F) -> BTreeSet<RowIndex>
where
    F: Fn(&Row) -> bool,
{
    rows.iter()
        .enumerate()
        .filter(|(_, row)| !is_selectable(row))
        .map(|(i, _)| i)
        .collect()
}

/// Published selection state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub is_all_selected: bool,
    pub selected_rows: Vec<RowIndex>,
}

/// Tracks selected and disabled rows.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    row_count: usize,
    selected: BTreeSet<RowIndex>,
    disabled: BTreeSet<RowIndex>,
    is_all_selected: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive disabled rows for a new row list. Selected indices that
    /// fell out of range or became disabled are dropped.
    pub fn sync<F>(&mut self, rows: &[Row], is_selectable: F)
    where
        F: Fn(&Row) -> bool,
    {
        self.row_count = rows.len();
        self.disabled = disabled_indices(rows, is_selectable);
        let (row_count, disabled) = (self.row_count, &self.disabled);
        self.selected
            .retain(|i| *i < row_count && !disabled.contains(i));
    }

    /// Select every enabled row, or clear the selection.
    pub fn select_all(&mut self, select: bool) -> SelectionState {
        self.is_all_selected = select;
        self.selected = if select {
            (0..self.row_count)
                .filter(|i| !self.disabled.contains(i))
                .collect()
        } else {
            BTreeSet::new()
        };
        self.state()
    }

    /// Check or uncheck one row. Any individual change clears
    /// `is_all_selected`.
    pub fn on_select_row(&mut self, checked: bool, index: RowIndex) -> Result<SelectionState> {
        if index >= self.row_count {
            return Err(Error::RowOutOfRange {
                index,
                len: self.row_count,
            });
        }
        if checked {
            if self.disabled.contains(&index) {
                return Err(Error::RowNotSelectable(index));
            }
            self.selected.insert(index);
        } else {
            self.selected.remove(&index);
        }
        self.is_all_selected = false;
        Ok(self.state())
    }

    pub fn reset(&mut self) -> SelectionState {
        self.select_all(false)
    }

    pub fn is_selected(&self, index: RowIndex) -> bool {
        self.selected.contains(&index)
    }

    pub fn is_disabled(&self, index: RowIndex) -> bool {
        self.disabled.contains(&index)
    }

    pub fn is_all_selected(&self) -> bool {
        self.is_all_selected
    }

    /// Selected indices in ascending order.
    pub fn selected_rows(&self) -> Vec<RowIndex> {
        self.selected.iter().copied().collect()
    }

    pub fn disabled_rows(&self) -> Vec<RowIndex> {
        self.disabled.iter().copied().collect()
    }

    pub fn state(&self) -> SelectionState {
        SelectionState {
            is_all_selected: self.is_all_selected,
            selected_rows: self.selected_rows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        [json!({"id": 1, "locked": false}), json!({"id": 2, "locked": true}), json!({"id": 3, "locked": false})]
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect()
    }

    fn unlocked(row: &Row) -> bool {
        row.get("locked") != Some(&json!(true))
    }

    fn selection() -> Selection {
        let mut s = Selection::new();
        s.sync(&rows(), unlocked);
        s
    }

    #[test]
    fn disabled_rows_are_derived() {
        assert_eq!(disabled_indices(&rows(), unlocked), BTreeSet::from([1]));
        assert!(selection().is_disabled(1));
    }

    #[test]
    fn select_all_skips_disabled() {
        let mut s = selection();
        let state = s.select_all(true);
        assert_eq!(state.selected_rows, vec![0, 2]);
        assert!(state.is_all_selected);

        let state = s.select_all(false);
        assert!(state.selected_rows.is_empty());
        assert!(!state.is_all_selected);
    }

    #[test]
    fn individual_change_clears_all_flag() {
        let mut s = selection();
        s.select_all(true);
        let state = s.on_select_row(false, 2).unwrap();
        assert_eq!(state.selected_rows, vec![0]);
        assert!(!state.is_all_selected);

        s.select_all(true);
        let state = s.on_select_row(true, 0).unwrap();
        assert!(!state.is_all_selected);
    }

    #[test]
    fn cannot_select_disabled_or_missing_rows() {
        let mut s = selection();
        assert_eq!(s.on_select_row(true, 1), Err(Error::RowNotSelectable(1)));
        assert_eq!(
            s.on_select_row(true, 9),
            Err(Error::RowOutOfRange { index: 9, len: 3 })
        );
        // Unchecking a disabled row is harmless.
        assert!(s.on_select_row(false, 1).is_ok());
    }

    #[test]
    fn sync_prunes_stale_selection() {
        let mut s = selection();
        s.on_select_row(true, 2).unwrap();

        let shorter: Vec<Row> = rows().into_iter().take(2).collect();
        s.sync(&shorter, unlocked);
        assert!(s.selected_rows().is_empty());
    }
}
