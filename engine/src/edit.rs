//! In-place cell editing.
//!
//! Pending edits are kept per row (keyed by the row's unique identifier)
//! next to a copy of the row as it was when editing started. Saving runs
//! the validators over every dirty row and, when nothing is rejected, hands
//! the changed fields to the host's submission function.
//!
//! # Life cycle
//!
//! ```text
//! Idle -> Editing -> begin_save -> Saving -> finish_save(Ok)  -> Idle
//!                        |                -> finish_save(Err) -> Editing (error kept)
//!                        +-> validation errors -> Editing (errors shown)
//! ```
//!
//! Only one save can be in flight: `begin_save` fails with
//! [`Error::SaveInProgress`] until `finish_save` or `cancel` runs, and
//! edits are refused in the meantime.

use crate::{column::Column, error::Result, value::is_falsy, Error, FieldName, Row, RowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;

/// Key under which a catch-all validator is registered.
pub const CATCH_ALL_VALIDATOR: &str = "*";

/// Pending edits by row.
pub type DirtyRows = BTreeMap<RowId, Row>;

/// Validation failures by row, then by field.
pub type ValidationErrors = BTreeMap<RowId, BTreeMap<FieldName, FieldError>>;

/// A rejected value and the validator's message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub value: Value,
    pub error: String,
}

/// Everything a validator gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Value being validated
    pub value: &'a Value,
    pub field: &'a str,
    /// All pending changes of the row
    pub changes: &'a Row,
    pub columns: &'a [Column],
    /// The row before editing
    pub original: &'a Row,
}

/// Returns an error message, or `None` when the value is acceptable.
pub type Validator = Box<dyn Fn(&ValidationContext<'_>) -> Option<String> + Send + Sync>;

/// Per-field validators plus an optional catch-all.
#[derive(Default)]
pub struct Validators {
    by_field: HashMap<FieldName, Validator>,
    catch_all: Option<Validator>,
}

impl Validators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator under a field name, or under
    /// [`CATCH_ALL_VALIDATOR`] for the catch-all.
    pub fn insert<F>(&mut self, key: impl Into<FieldName>, validator: F) -> &mut Self
    where
        F: Fn(&ValidationContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        let key = key.into();
        if key == CATCH_ALL_VALIDATOR {
            self.catch_all = Some(Box::new(validator));
        } else {
            self.by_field.insert(key, Box::new(validator));
        }
        self
    }

    pub fn with_field<F>(mut self, field: impl Into<FieldName>, validator: F) -> Self
    where
        F: Fn(&ValidationContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.insert(field, validator);
        self
    }

    pub fn with_catch_all<F>(mut self, validator: F) -> Self
    where
        F: Fn(&ValidationContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.catch_all = Some(Box::new(validator));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty() && self.catch_all.is_none()
    }

    fn field(&self, field: &str, ctx: &ValidationContext<'_>) -> Option<String> {
        self.by_field.get(field).and_then(|v| v(ctx))
    }

    fn catch_all(&self, ctx: &ValidationContext<'_>) -> Option<String> {
        self.catch_all.as_ref().and_then(|v| v(ctx))
    }
}

impl std::fmt::Debug for Validators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<_> = self.by_field.keys().collect();
        fields.sort();
        f.debug_struct("Validators")
            .field("fields", &fields)
            .field("catch_all", &self.catch_all.is_some())
            .finish()
    }
}

/// Where the edit cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditPhase {
    Idle,
    Editing,
    Saving,
}

/// What `begin_save` decided.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStart {
    NothingToSave,
    /// Validation rejected this many fields; nothing was submitted
    Invalid { errors: usize },
    /// Rows to hand to the host, each holding the identifier and the
    /// changed fields only
    Submit(Vec<Row>),
}

/// How a save ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    NothingToSave,
    Invalid { errors: usize },
    Saved { rows: usize },
}

/// Tracks pending edits, validation errors and the save cycle.
#[derive(Debug)]
pub struct EditEngine {
    unique_row_identifier: FieldName,
    dirty: DirtyRows,
    originals: BTreeMap<RowId, Row>,
    validation_errors: ValidationErrors,
    validators: Validators,
    saving: bool,
    submit_error: Option<String>,
}

impl Default for EditEngine {
    fn default() -> Self {
        Self::new("id")
    }
}

impl EditEngine {
    pub fn new(unique_row_identifier: impl Into<FieldName>) -> Self {
        Self {
            unique_row_identifier: unique_row_identifier.into(),
            dirty: DirtyRows::new(),
            originals: BTreeMap::new(),
            validation_errors: ValidationErrors::new(),
            validators: Validators::new(),
            saving: false,
            submit_error: None,
        }
    }

    pub fn with_validators(mut self, validators: Validators) -> Self {
        self.validators = validators;
        self
    }

    pub fn set_validators(&mut self, validators: Validators) {
        self.validators = validators;
    }

    pub fn unique_row_identifier(&self) -> &str {
        &self.unique_row_identifier
    }

    /// The row's identifier as a map key.
    pub fn row_id(&self, row: &Row) -> Result<RowId> {
        let value = row.get(&self.unique_row_identifier);
        if is_falsy(value) {
            tracing::warn!(
                field = %self.unique_row_identifier,
                "row has no usable unique identifier"
            );
            return Err(Error::MissingRowIdentifier {
                field: self.unique_row_identifier.clone(),
            });
        }
        Ok(match value {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        })
    }

    /// Start editing a field, or cancel its edit. Cancelling drops that
    /// field's pending value and validation error; other fields of the row
    /// keep theirs.
    pub fn on_edit(&mut self, row: &Row, field: &str, cancel: bool) -> Result<()> {
        self.ensure_not_saving()?;
        let id = self.row_id(row)?;

        if cancel {
            self.discard_field(&id, field);
            return Ok(());
        }

        self.originals.entry(id.clone()).or_insert_with(|| row.clone());
        let current = row.get(field).cloned().unwrap_or(Value::Null);
        self.dirty
            .entry(id)
            .or_default()
            .entry(field.to_string())
            .or_insert(current);
        Ok(())
    }

    /// Record a pending value for a field.
    pub fn on_change(&mut self, row: &Row, field: &str, value: Value) -> Result<()> {
        self.ensure_not_saving()?;
        let id = self.row_id(row)?;

        let corrected = self
            .validation_errors
            .get(&id)
            .and_then(|errors| errors.get(field))
            .is_some_and(|err| err.value != value);
        if corrected {
            self.remove_error(&id, field);
        }

        self.originals.entry(id.clone()).or_insert_with(|| row.clone());
        self.dirty
            .entry(id)
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    /// Whether any row has pending edits.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Whether one field of a row has a pending edit.
    pub fn is_field_dirty(&self, row: &Row, field: &str) -> bool {
        self.dirty_value(row, field).is_some()
    }

    /// Pending value of a field, if any.
    pub fn dirty_value(&self, row: &Row, field: &str) -> Option<&Value> {
        let id = self.row_id(row).ok()?;
        self.dirty.get(&id)?.get(field)
    }

    /// Value the user should see: the pending edit, else the value a
    /// validator rejected.
    pub fn shown_value(&self, row: &Row, field: &str) -> Option<&Value> {
        self.dirty_value(row, field)
            .or_else(|| self.validation_error(row, field).map(|err| &err.value))
    }

    pub fn dirty_rows(&self) -> &DirtyRows {
        &self.dirty
    }

    pub fn validation_errors(&self) -> &ValidationErrors {
        &self.validation_errors
    }

    pub fn validation_error(&self, row: &Row, field: &str) -> Option<&FieldError> {
        let id = self.row_id(row).ok()?;
        self.validation_errors.get(&id)?.get(field)
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Message of the last rejected submission.
    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn phase(&self) -> EditPhase {
        if self.saving {
            EditPhase::Saving
        } else if self.is_dirty() {
            EditPhase::Editing
        } else {
            EditPhase::Idle
        }
    }

    /// Validate pending edits and, when they pass, enter the saving phase
    /// and return the rows to submit.
    ///
    /// Rejected values are kept in the validation errors only, so a field
    /// the user never touched does not become a pending edit.
    pub fn begin_save(&mut self, columns: &[Column]) -> Result<SaveStart> {
        self.ensure_not_saving()?;
        self.validation_errors.clear();
        self.submit_error = None;

        if self.dirty.is_empty() {
            return Ok(SaveStart::NothingToSave);
        }

        let errors = self.validate(columns);
        if !errors.is_empty() {
            let count = errors.values().map(BTreeMap::len).sum();
            tracing::warn!(rows = errors.len(), fields = count, "save blocked by validation");
            self.validation_errors = errors;
            return Ok(SaveStart::Invalid { errors: count });
        }

        let rows = self.submission_rows();
        self.saving = true;
        tracing::info!(rows = rows.len(), "submitting changes");
        Ok(SaveStart::Submit(rows))
    }

    /// Apply the host's submission result. Success clears every pending
    /// edit; failure keeps them for a retry and surfaces the host's
    /// message unchanged.
    pub fn finish_save(&mut self, result: std::result::Result<(), String>) -> Result<SaveOutcome> {
        if !self.saving {
            return Err(Error::NoSaveInProgress);
        }
        self.saving = false;

        match result {
            Ok(()) => {
                let rows = self.dirty.len();
                self.dirty.clear();
                self.originals.clear();
                self.validation_errors.clear();
                tracing::info!(rows, "changes saved");
                Ok(SaveOutcome::Saved { rows })
            }
            Err(message) => {
                tracing::warn!(error = %message, "submission rejected");
                self.submit_error = Some(message.clone());
                Err(Error::Submission(message))
            }
        }
    }

    /// Validate, submit through `submit` and apply its result.
    pub async fn save<F, Fut, T, E>(&mut self, columns: &[Column], submit: F) -> Result<SaveOutcome>
    where
        F: FnOnce(Vec<Row>) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let rows = match self.begin_save(columns)? {
            SaveStart::NothingToSave => return Ok(SaveOutcome::NothingToSave),
            SaveStart::Invalid { errors } => return Ok(SaveOutcome::Invalid { errors }),
            SaveStart::Submit(rows) => rows,
        };
        let result = submit(rows).await.map(|_| ()).map_err(|e| e.to_string());
        self.finish_save(result)
    }

    /// Drop every pending edit, error and the saving flag.
    pub fn cancel(&mut self) {
        self.dirty.clear();
        self.originals.clear();
        self.validation_errors.clear();
        self.saving = false;
        self.submit_error = None;
    }

    fn ensure_not_saving(&self) -> Result<()> {
        if self.saving {
            Err(Error::SaveInProgress)
        } else {
            Ok(())
        }
    }

    fn validate(&self, columns: &[Column]) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let empty = Row::new();

        for (id, changes) in &self.dirty {
            let original = self.originals.get(id).unwrap_or(&empty);
            let mut row_errors = BTreeMap::new();

            for (field, value) in changes {
                let ctx = ValidationContext {
                    value,
                    field,
                    changes,
                    columns,
                    original,
                };
                let message = self
                    .validators
                    .field(field, &ctx)
                    .or_else(|| self.validators.catch_all(&ctx));
                if let Some(error) = message {
                    row_errors.insert(field.clone(), FieldError { value: value.clone(), error });
                }
            }

            // Untouched fields still go through the catch-all, which is
            // where cross-field rules live.
            for (field, value) in original {
                if changes.contains_key(field) || row_errors.contains_key(field) {
                    continue;
                }
                let ctx = ValidationContext {
                    value,
                    field,
                    changes,
                    columns,
                    original,
                };
                if let Some(error) = self.validators.catch_all(&ctx) {
                    row_errors.insert(field.clone(), FieldError { value: value.clone(), error });
                }
            }

            if !row_errors.is_empty() {
                errors.insert(id.clone(), row_errors);
            }
        }
        errors
    }

    fn submission_rows(&self) -> Vec<Row> {
        self.dirty
            .iter()
            .map(|(id, changes)| {
                let mut row = Row::new();
                let id_value = self
                    .originals
                    .get(id)
                    .and_then(|original| original.get(&self.unique_row_identifier))
                    .cloned()
                    .unwrap_or_else(|| Value::String(id.clone()));
                row.insert(self.unique_row_identifier.clone(), id_value);
                row.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
                row
            })
            .collect()
    }

    fn discard_field(&mut self, id: &str, field: &str) {
        if let Some(changes) = self.dirty.get_mut(id) {
            changes.remove(field);
            if changes.is_empty() {
                self.dirty.remove(id);
                self.originals.remove(id);
            }
        }
        self.remove_error(id, field);
    }

    fn remove_error(&mut self, id: &str, field: &str) {
        if let Some(errors) = self.validation_errors.get_mut(id) {
            errors.remove(field);
            if errors.is_empty() {
                self.validation_errors.remove(id);
            }
        }
    }
}
