use crate::error::{PipelineError, Result};
use crate::store::{from_record, to_record, Filter, RecordId, RecordStore, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entry in the bottle library developers pick packaging from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bottle {
    #[serde(default)]
    pub id: RecordId,
    pub name: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl Bottle {
    pub fn create(store: &dyn RecordStore, name: &str, image_url: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(PipelineError::Validation("bottle name is required".to_string()));
        }
        if image_url.trim().is_empty() {
            return Err(PipelineError::Validation(
                "bottle image is required".to_string(),
            ));
        }
        let mut record = to_record(&Bottle {
            id: 0,
            name: name.trim().to_string(),
            image_url: image_url.trim().to_string(),
            created_at: Utc::now(),
        })?;
        record.remove("id");
        from_record(store.insert(Table::Bottles, record)?)
    }

    pub fn load(store: &dyn RecordStore, id: RecordId) -> Result<Self> {
        match store.get_by_id(Table::Bottles, id)? {
            Some(record) => from_record(record),
            None => Err(PipelineError::BottleNotFound(id)),
        }
    }

    pub fn list(store: &dyn RecordStore) -> Result<Vec<Self>> {
        store
            .get(Table::Bottles, &Filter::all())?
            .into_iter()
            .map(from_record)
            .collect()
    }
}
