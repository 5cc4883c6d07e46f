//! redb-backed [`RecordStore`].
//!
//! # Table design
//!
//! One redb table per named table, keyed by the `u64` record id, holding the
//! JSON-encoded record. A `sequences` table maps a table name to the last id
//! handed out. redb serialises write transactions, so a read-check-write
//! inside one write transaction is a compare-and-swap.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde_json::Value;

use crate::error::{PipelineError, Result};

use super::{merge, Filter, Record, RecordId, RecordStore, Table};

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

/// Key: table name. Value: last id handed out.
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

fn definition(table: Table) -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(table.as_str())
}

fn storage_err<E: std::fmt::Display>(
    table: Table,
    op: &'static str,
) -> impl FnOnce(E) -> PipelineError {
    move |e| PipelineError::storage(table.as_str(), op, e)
}

fn decode(table: Table, bytes: &[u8]) -> Result<Record> {
    serde_json::from_slice(bytes).map_err(storage_err(table, "decode"))
}

/// Assign an id from the table's sequence (unless the record names one) and
/// write the record inside `wt`.
fn insert_in(wt: &WriteTransaction, table: Table, mut record: Record) -> Result<Record> {
    let requested = record.get("id").and_then(Value::as_u64).filter(|id| *id > 0);
    let mut seq = wt
        .open_table(SEQUENCES)
        .map_err(storage_err(table, "insert"))?;
    let last = seq
        .get(table.as_str())
        .map_err(storage_err(table, "insert"))?
        .map(|g| g.value())
        .unwrap_or(0);
    let id = requested.unwrap_or(last + 1);
    seq.insert(table.as_str(), last.max(id))
        .map_err(storage_err(table, "insert"))?;

    let mut t = wt
        .open_table(definition(table))
        .map_err(storage_err(table, "insert"))?;
    let exists = t.get(id).map_err(storage_err(table, "insert"))?.is_some();
    if exists {
        return Err(PipelineError::storage(
            table.as_str(),
            "insert",
            format!("duplicate id {id}"),
        ));
    }
    record.insert("id".to_string(), Value::from(id));
    let bytes = serde_json::to_vec(&record).map_err(storage_err(table, "encode"))?;
    t.insert(id, bytes.as_slice())
        .map_err(storage_err(table, "insert"))?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`, creating every table up front.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path)
            .map_err(|e| PipelineError::storage("database", "open", e))?;
        let wt = db
            .begin_write()
            .map_err(|e| PipelineError::storage("database", "open", e))?;
        for table in Table::all() {
            wt.open_table(definition(*table))
                .map_err(storage_err(*table, "open"))?;
        }
        wt.open_table(SEQUENCES)
            .map_err(|e| PipelineError::storage("sequences", "open", e))?;
        wt.commit()
            .map_err(|e| PipelineError::storage("database", "open", e))?;
        Ok(Self { db })
    }
}

impl RecordStore for RedbStore {
    fn get(&self, table: Table, filter: &Filter) -> Result<Vec<Record>> {
        let rt = self.db.begin_read().map_err(storage_err(table, "get"))?;
        let t = rt
            .open_table(definition(table))
            .map_err(storage_err(table, "get"))?;
        let mut out = Vec::new();
        for entry in t.iter().map_err(storage_err(table, "get"))? {
            let (_, value) = entry.map_err(storage_err(table, "get"))?;
            let record = decode(table, value.value())?;
            if filter.matches(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn get_by_id(&self, table: Table, id: RecordId) -> Result<Option<Record>> {
        let rt = self.db.begin_read().map_err(storage_err(table, "get"))?;
        let t = rt
            .open_table(definition(table))
            .map_err(storage_err(table, "get"))?;
        match t.get(id).map_err(storage_err(table, "get"))? {
            Some(value) => Ok(Some(decode(table, value.value())?)),
            None => Ok(None),
        }
    }

    fn insert(&self, table: Table, record: Record) -> Result<Record> {
        let wt = self.db.begin_write().map_err(storage_err(table, "insert"))?;
        let record = insert_in(&wt, table, record)?;
        wt.commit().map_err(storage_err(table, "insert"))?;
        Ok(record)
    }

    fn insert_unless(
        &self,
        table: Table,
        existing: &Filter,
        record: Record,
    ) -> Result<(Record, bool)> {
        let wt = self.db.begin_write().map_err(storage_err(table, "insert"))?;
        let found = {
            let t = wt
                .open_table(definition(table))
                .map_err(storage_err(table, "insert"))?;
            let mut found = None;
            for entry in t.iter().map_err(storage_err(table, "insert"))? {
                let (_, value) = entry.map_err(storage_err(table, "insert"))?;
                let stored = decode(table, value.value())?;
                if existing.matches(&stored) {
                    found = Some(stored);
                    break;
                }
            }
            found
        };
        if let Some(stored) = found {
            wt.abort().map_err(storage_err(table, "insert"))?;
            return Ok((stored, false));
        }
        let record = insert_in(&wt, table, record)?;
        wt.commit().map_err(storage_err(table, "insert"))?;
        Ok((record, true))
    }

    fn update_if(
        &self,
        table: Table,
        id: RecordId,
        guard: &Filter,
        patch: Record,
    ) -> Result<Option<Record>> {
        let wt = self.db.begin_write().map_err(storage_err(table, "update"))?;
        let updated = {
            let mut t = wt
                .open_table(definition(table))
                .map_err(storage_err(table, "update"))?;
            let current = match t.get(id).map_err(storage_err(table, "update"))? {
                Some(value) => decode(table, value.value())?,
                None => {
                    return Err(PipelineError::RecordNotFound {
                        table: table.as_str().to_string(),
                        id,
                    })
                }
            };
            if guard.matches(&current) {
                let mut record = current;
                merge(&mut record, patch);
                let bytes = serde_json::to_vec(&record).map_err(storage_err(table, "encode"))?;
                t.insert(id, bytes.as_slice())
                    .map_err(storage_err(table, "update"))?;
                Some(record)
            } else {
                None
            }
        };
        if updated.is_some() {
            wt.commit().map_err(storage_err(table, "update"))?;
        } else {
            wt.abort().map_err(storage_err(table, "update"))?;
        }
        Ok(updated)
    }

    fn delete(&self, table: Table, id: RecordId) -> Result<bool> {
        let wt = self.db.begin_write().map_err(storage_err(table, "delete"))?;
        let mut t = wt
            .open_table(definition(table))
            .map_err(storage_err(table, "delete"))?;
        let removed = t
            .remove(id)
            .map_err(storage_err(table, "delete"))?
            .is_some();
        drop(t);
        wt.commit().map_err(storage_err(table, "delete"))?;
        Ok(removed)
    }
}
