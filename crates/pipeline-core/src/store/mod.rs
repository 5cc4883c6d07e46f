//! Record store boundary.
//!
//! Records are JSON objects kept in four named tables. Every product
//! transition goes through [`RecordStore::update_if`], which applies a patch
//! only when the stored record still matches a guard, so two actors racing
//! on the same product cannot both succeed.

mod db;

pub use db::RedbStore;

use crate::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

pub type RecordId = u64;
pub type Record = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Products,
    Users,
    Bottles,
    AiDrafts,
}

impl Table {
    pub fn all() -> &'static [Table] {
        &[Table::Products, Table::Users, Table::Bottles, Table::AiDrafts]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Table::Products => "products",
            Table::Users => "users",
            Table::Bottles => "bottles",
            Table::AiDrafts => "ai_drafts",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    IsNull(String),
}

impl Condition {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Condition::Eq(field, value) => record.get(field) == Some(value),
            Condition::IsNull(field) => record.get(field).map_or(true, Value::is_null),
        }
    }
}

/// Conjunction of conditions. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn is_null(mut self, field: &str) -> Self {
        self.conditions.push(Condition::IsNull(field.to_string()));
        self
    }

    /// `eq` when `value` is present, `is_null` otherwise.
    pub fn eq_or_null<V: Into<Value>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self.is_null(field),
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

pub trait RecordStore: Send + Sync {
    /// All records in `table` matching `filter`, in id order.
    fn get(&self, table: Table, filter: &Filter) -> Result<Vec<Record>>;

    fn get_by_id(&self, table: Table, id: RecordId) -> Result<Option<Record>>;

    /// Insert a record, assigning the next id from the table's sequence when
    /// the record carries none. Returns the stored record.
    fn insert(&self, table: Table, record: Record) -> Result<Record>;

    /// Insert `record` unless a record matching `existing` is already stored.
    /// The look-up and the insert share one write. Returns the stored record
    /// and whether it was newly inserted.
    fn insert_unless(
        &self,
        table: Table,
        existing: &Filter,
        record: Record,
    ) -> Result<(Record, bool)>;

    /// Shallow-merge `patch` into the record. The `id` field is never
    /// overwritten.
    fn update(&self, table: Table, id: RecordId, patch: Record) -> Result<Record> {
        self.update_if(table, id, &Filter::all(), patch)?.ok_or_else(|| {
            PipelineError::storage(table.as_str(), "update", "write was not applied")
        })
    }

    /// Apply `patch` only if the stored record matches `guard` at write time.
    /// Returns `Ok(None)` when the guard no longer holds.
    fn update_if(
        &self,
        table: Table,
        id: RecordId,
        guard: &Filter,
        patch: Record,
    ) -> Result<Option<Record>>;

    fn delete(&self, table: Table, id: RecordId) -> Result<bool>;
}

/// Merge `patch` into `record`, leaving `id` untouched.
pub(crate) fn merge(record: &mut Record, patch: Record) {
    for (key, value) in patch {
        if key != "id" {
            record.insert(key, value);
        }
    }
}

pub fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(PipelineError::Validation(format!(
            "expected a JSON object record, got {other}"
        ))),
    }
}

pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}
