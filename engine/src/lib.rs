//! # Gridline Engine
//!
//! The state engine behind a data table: filtering, sorting, paging,
//! selection and in-place editing over rows of JSON values.
//!
//! The crate has no rendering and no IO. A host feeds it rows and user
//! actions, and reads back the visible rows plus the state it needs to
//! draw controls.
//!
//! ## Core Concepts
//!
//! ### Query pipeline
//!
//! Visible rows are recomputed on every change in a fixed order:
//! [`SetFilter`] (allow-lists of discrete values), [`ConditionFilter`]
//! (comparison operators with one optional `and`/`or` join), [`SortOrder`]
//! (multi-column, precedence by `orderIndex`) and finally the [`Page`]
//! window. In server-side mode the engine only tracks these four pieces
//! and publishes them as a [`FilterState`].
//!
//! ### Selection
//!
//! [`Selection`] tracks checked rows by position. Rows rejected by the
//! host's selectability predicate are disabled and never selected.
//!
//! ### Editing
//!
//! [`EditEngine`] keeps pending cell edits per row, runs per-field and
//! catch-all validators, and guards the submission so only one save is in
//! flight at a time.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridline_engine::{Column, Condition, Datatype, Operation, Table, TableConfig};
//! use serde_json::json;
//!
//! // 1. Describe the columns
//! let config = TableConfig::new(vec![
//!     Column::new("id", Datatype::Number).read_only(),
//!     Column::new("name", Datatype::String),
//!     Column::new("age", Datatype::Number),
//! ]);
//!
//! // 2. Load rows
//! let rows = [
//!     json!({"id": 1, "name": "Alice", "age": 34}),
//!     json!({"id": 2, "name": "Bob", "age": 27}),
//!     json!({"id": 3, "name": "Cleo", "age": 41}),
//! ]
//! .iter()
//! .filter_map(|v| v.as_object().cloned())
//! .collect();
//! let mut table = Table::new(config, rows).unwrap();
//!
//! // 3. Filter and sort
//! table.apply_condition_filter([(
//!     "age".to_string(),
//!     Some(Condition::leaf(Operation::GreaterThan, "30")),
//! )])
//! .unwrap();
//! table.on_sort("age", false).unwrap();
//!
//! let names: Vec<_> = table.rows().iter().map(|r| r["name"].clone()).collect();
//! assert_eq!(names, vec![json!("Alice"), json!("Cleo")]);
//! assert_eq!(table.count(), 2);
//! ```
//!
//! ## Persistence
//!
//! Use [`Table::get_filters`] and [`Table::set_filters`] with
//! [`FilterSnapshot`] to save and restore a view. Snapshots serialize to
//! JSON with deterministic ordering.
//!
//! ## Logging
//!
//! The engine emits [`tracing`] events and never installs a subscriber.

pub mod column;
pub mod condition;
pub mod config;
pub mod edit;
pub mod error;
pub mod pagination;
pub mod pipeline;
pub mod selection;
pub mod set_filter;
pub mod snapshot;
pub mod sort;
pub mod table;
pub mod value;

// Re-export main types at crate root
pub use column::{find_column, Column, ColumnConfig, Datatype, InputKind};
pub use condition::{
    Condition, ConditionFilter, ConditionFilterEngine, Leaf, Operation, OperationValue,
};
pub use config::TableConfig;
pub use edit::{
    EditEngine, EditPhase, FieldError, SaveOutcome, SaveStart, ValidationContext,
    ValidationErrors, Validator, Validators, CATCH_ALL_VALIDATOR,
};
pub use error::Error;
pub use pagination::{last_page, Page, Pagination, DEFAULT_ROWS_PER_PAGE};
pub use pipeline::{DataMode, FilterState, QueryResult};
pub use selection::{disabled_indices, Selection, SelectionState};
pub use set_filter::{SetFilter, SetFilterEngine, SetFilterEntry};
pub use snapshot::{FilterSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use sort::{SortDirection, SortEngine, SortEntry, SortOrder};
pub use table::{FilterListener, Table};

/// Type aliases for clarity
pub type Row = serde_json::Map<String, serde_json::Value>;
pub type FieldName = String;
/// A row's unique identifier, as text
pub type RowId = String;
/// Position in the visible row list
pub type RowIndex = usize;
