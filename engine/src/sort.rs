//! Multi-column sorting.
//!
//! The sort order maps fields to a direction and an `orderIndex`. Rows are
//! compared field by field in ascending `orderIndex` order; the first field
//! that tells the rows apart decides. Fully tied rows keep their relative
//! order.

use crate::{value::natural_cmp, FieldName, Row};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Sort settings for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortEntry {
    #[serde(rename = "sortDirection", alias = "direction")]
    pub direction: SortDirection,
    /// Precedence rank, 1 is highest
    pub order_index: u32,
}

impl SortEntry {
    pub fn new(direction: SortDirection, order_index: u32) -> Self {
        Self {
            direction,
            order_index,
        }
    }
}

/// Sort settings by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortOrder(BTreeMap<FieldName, SortEntry>);

impl SortOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<FieldName>, direction: SortDirection, order_index: u32) -> Self {
        self.0
            .insert(field.into(), SortEntry::new(direction, order_index));
        self
    }

    pub fn get(&self, field: &str) -> Option<&SortEntry> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// More than one field participates.
    pub fn is_multi_sort(&self) -> bool {
        self.0.len() > 1
    }

    /// Entries ordered by precedence. Equal indices fall back to field name.
    pub fn by_precedence(&self) -> Vec<(&FieldName, &SortEntry)> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|(fa, a), (fb, b)| a.order_index.cmp(&b.order_index).then(fa.cmp(fb)));
        entries
    }

    /// Compare two rows under this order.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        compare_by(&self.precedence(), a, b)
    }

    /// Stable in-place sort of owned or borrowed rows.
    pub fn sort<R: Borrow<Row>>(&self, rows: &mut [R]) {
        if self.0.is_empty() {
            return;
        }
        let precedence = self.precedence();
        rows.sort_by(|a, b| compare_by(&precedence, a.borrow(), b.borrow()));
    }

    fn precedence(&self) -> Vec<(FieldName, SortDirection)> {
        self.by_precedence()
            .into_iter()
            .map(|(f, e)| (f.clone(), e.direction))
            .collect()
    }

    /// Smallest positive index not held by a field other than `field`.
    fn next_order_index(&self, field: &str) -> u32 {
        let taken: Vec<u32> = self
            .0
            .iter()
            .filter(|(f, _)| f.as_str() != field)
            .map(|(_, e)| e.order_index)
            .collect();
        (1..).find(|i| !taken.contains(i)).unwrap_or(1)
    }
}

fn compare_by(precedence: &[(FieldName, SortDirection)], a: &Row, b: &Row) -> Ordering {
    for (field, direction) in precedence {
        let ord = direction.apply(natural_cmp(a.get(field), b.get(field)));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Tracks the active sort order and its initial snapshot.
#[derive(Debug, Clone, Default)]
pub struct SortEngine {
    order: SortOrder,
    initial: SortOrder,
}

impl SortEngine {
    pub fn new(initial: SortOrder) -> Self {
        Self {
            order: initial.clone(),
            initial,
        }
    }

    pub fn sort_order(&self) -> &SortOrder {
        &self.order
    }

    pub fn initial(&self) -> &SortOrder {
        &self.initial
    }

    /// Sort by a field.
    ///
    /// Without `multi` the order is replaced by this field alone. With
    /// `multi` existing entries are kept and the field takes the lowest free
    /// index. Either way the direction flips when the field was already
    /// ascending and is ascending otherwise.
    pub fn on_sort(&mut self, field: &str, multi: bool) -> &SortOrder {
        let direction = self
            .order
            .get(field)
            .map_or(SortDirection::Asc, |entry| entry.direction.toggled());

        if multi {
            let order_index = self.order.next_order_index(field);
            self.order
                .0
                .insert(field.to_string(), SortEntry::new(direction, order_index));
        } else {
            self.order = SortOrder::new().with(field, direction, 1);
        }

        tracing::debug!(field, ?direction, multi, "sort order changed");
        &self.order
    }

    /// Clear to empty, or restore the initial snapshot.
    pub fn reset(&mut self, use_initial: bool) -> &SortOrder {
        self.order = if use_initial {
            self.initial.clone()
        } else {
            SortOrder::default()
        };
        &self.order
    }

    /// Replace the active order wholesale.
    pub fn restore(&mut self, order: SortOrder) {
        self.order = order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: serde_json::Value) -> Vec<Row> {
        values
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_object().cloned()).collect())
            .unwrap_or_default()
    }

    fn names(rows: &[Row]) -> Vec<&str> {
        rows.iter()
            .filter_map(|r| r.get("name").and_then(|v| v.as_str()))
            .collect()
    }

    #[test]
    fn single_sort_toggles_direction() {
        let mut engine = SortEngine::default();

        engine.on_sort("age", false);
        assert_eq!(
            engine.sort_order().get("age"),
            Some(&SortEntry::new(SortDirection::Asc, 1))
        );

        engine.on_sort("age", false);
        assert_eq!(engine.sort_order().get("age").unwrap().direction, SortDirection::Desc);

        engine.on_sort("age", false);
        assert_eq!(engine.sort_order().get("age").unwrap().direction, SortDirection::Asc);
    }

    #[test]
    fn single_sort_replaces_other_fields() {
        let mut engine = SortEngine::default();
        engine.on_sort("age", false);
        engine.on_sort("name", false);

        assert_eq!(engine.sort_order().len(), 1);
        assert_eq!(
            engine.sort_order().get("name"),
            Some(&SortEntry::new(SortDirection::Asc, 1))
        );
    }

    #[test]
    fn multi_sort_assigns_lowest_free_index() {
        let mut engine = SortEngine::default();
        engine.on_sort("age", false);
        engine.on_sort("name", true);
        engine.on_sort("city", true);

        assert_eq!(engine.sort_order().get("age").unwrap().order_index, 1);
        assert_eq!(engine.sort_order().get("name").unwrap().order_index, 2);
        assert_eq!(engine.sort_order().get("city").unwrap().order_index, 3);

        // Re-clicking keeps the field's own slot.
        engine.on_sort("name", true);
        let name = engine.sort_order().get("name").unwrap();
        assert_eq!(name.order_index, 2);
        assert_eq!(name.direction, SortDirection::Desc);
        assert!(engine.sort_order().is_multi_sort());
    }

    #[test]
    fn multi_sort_fills_gaps() {
        let mut engine = SortEngine::new(
            SortOrder::new()
                .with("a", SortDirection::Asc, 1)
                .with("b", SortDirection::Asc, 3),
        );
        engine.on_sort("c", true);
        assert_eq!(engine.sort_order().get("c").unwrap().order_index, 2);
    }

    #[test]
    fn tie_break_by_order_index() {
        let order = SortOrder::new()
            .with("age", SortDirection::Asc, 1)
            .with("name", SortDirection::Asc, 2);
        let mut data = rows(json!([
            {"name": "Cleo", "age": 30},
            {"name": "Abe", "age": 30},
            {"name": "Bea", "age": 20},
        ]));

        order.sort(&mut data);
        assert_eq!(names(&data), vec!["Bea", "Abe", "Cleo"]);
    }

    #[test]
    fn precedence_follows_index_not_field_name() {
        // "age" sorts before "name" alphabetically but ranks second here.
        let order = SortOrder::new()
            .with("name", SortDirection::Desc, 1)
            .with("age", SortDirection::Asc, 2);
        let mut data = rows(json!([
            {"name": "Abe", "age": 1},
            {"name": "Cleo", "age": 3},
            {"name": "Cleo", "age": 2},
        ]));

        order.sort(&mut data);
        let ages: Vec<i64> = data.iter().filter_map(|r| r["age"].as_i64()).collect();
        assert_eq!(ages, vec![2, 3, 1]);
    }

    #[test]
    fn ties_keep_input_order() {
        let order = SortOrder::new().with("group", SortDirection::Asc, 1);
        let mut data = rows(json!([
            {"name": "first", "group": 1},
            {"name": "second", "group": 1},
            {"name": "third", "group": 0},
        ]));

        order.sort(&mut data);
        assert_eq!(names(&data), vec!["third", "first", "second"]);
    }

    #[test]
    fn compare_descending() {
        let order = SortOrder::new().with("age", SortDirection::Desc, 1);
        let a = rows(json!([{"age": 1}, {"age": 2}]));
        assert_eq!(order.compare(&a[0], &a[1]), Ordering::Greater);
    }

    #[test]
    fn reset_round_trip() {
        let initial = SortOrder::new().with("age", SortDirection::Desc, 1);
        let mut engine = SortEngine::new(initial.clone());
        engine.on_sort("name", false);
        engine.on_sort("city", true);

        assert_eq!(engine.reset(true), &initial);
        assert!(engine.reset(false).is_empty());
    }

    #[test]
    fn wire_format() {
        let order = SortOrder::new().with("age", SortDirection::Desc, 1);
        assert_eq!(
            serde_json::to_value(&order).unwrap(),
            json!({"age": {"sortDirection": "desc", "orderIndex": 1}})
        );
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn to_rows(pairs: &[(i64, i64)]) -> Vec<Row> {
            pairs
                .iter()
                .enumerate()
                .filter_map(|(i, (a, b))| json!({"seq": i, "a": a, "b": b}).as_object().cloned())
                .collect()
        }

        proptest! {
            #[test]
            fn prop_sorted_output_is_ordered(
                pairs in proptest::collection::vec((0i64..5, -20i64..20), 0..60),
                desc in any::<bool>(),
            ) {
                let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
                let order = SortOrder::new()
                    .with("a", direction, 1)
                    .with("b", SortDirection::Asc, 2);
                let mut data = to_rows(&pairs);
                order.sort(&mut data);

                prop_assert_eq!(data.len(), pairs.len());
                for w in data.windows(2) {
                    prop_assert_ne!(order.compare(&w[0], &w[1]), Ordering::Greater);
                    // Full ties keep input order.
                    if order.compare(&w[0], &w[1]) == Ordering::Equal {
                        prop_assert!(w[0]["seq"].as_u64() < w[1]["seq"].as_u64());
                    }
                }
            }

            #[test]
            fn prop_multi_sort_indices_unique(fields in proptest::collection::vec(0usize..6, 1..30)) {
                let names = ["a", "b", "c", "d", "e", "f"];
                let mut engine = SortEngine::default();
                for f in fields {
                    engine.on_sort(names[f], true);
                }
                let mut indices: Vec<u32> = engine
                    .sort_order()
                    .by_precedence()
                    .iter()
                    .map(|(_, e)| e.order_index)
                    .collect();
                let before = indices.len();
                indices.dedup();
                prop_assert_eq!(indices.len(), before);
                prop_assert!(indices.iter().all(|i| *i >= 1));
            }
        }
    }
}
