use crate::error::{PipelineError, Result};
use crate::store::{from_record, to_record, Filter, RecordId, RecordStore, Table};
use crate::types::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = RecordId;

/// An already-authenticated actor. Every operation that changes a record
/// takes the acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn create(store: &dyn RecordStore, name: &str, role: Role) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PipelineError::Validation("user name is required".to_string()));
        }
        let mut record = to_record(&User {
            id: 0,
            name: name.to_string(),
            role,
            created_at: Utc::now(),
        })?;
        record.remove("id");
        let user: User = from_record(store.insert(Table::Users, record)?)?;
        tracing::info!(user = user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub fn load(store: &dyn RecordStore, id: UserId) -> Result<Self> {
        match store.get_by_id(Table::Users, id)? {
            Some(record) => from_record(record),
            None => Err(PipelineError::UserNotFound(id)),
        }
    }

    pub fn list(store: &dyn RecordStore) -> Result<Vec<Self>> {
        store
            .get(Table::Users, &Filter::all())?
            .into_iter()
            .map(from_record)
            .collect()
    }

    /// Fail with `PermissionDenied` unless the user holds one of `roles`.
    pub fn require(&self, roles: &[Role], action: &str) -> Result<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(PipelineError::PermissionDenied {
                role: self.role.to_string(),
                action: action.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RedbStore;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, RedbStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn create_and_load() {
        let (_dir, store) = open_tmp();
        let user = User::create(&store, "  Lin  ", Role::Designer).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "Lin");
        assert_eq!(User::load(&store, 1).unwrap(), user);
    }

    #[test]
    fn blank_name_is_rejected() {
        let (_dir, store) = open_tmp();
        let err = User::create(&store, " ", Role::Admin).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn load_missing_user() {
        let (_dir, store) = open_tmp();
        assert!(matches!(
            User::load(&store, 9),
            Err(PipelineError::UserNotFound(9))
        ));
    }

    #[test]
    fn require_checks_role() {
        let (_dir, store) = open_tmp();
        let user = User::create(&store, "Wei", Role::Content).unwrap();
        assert!(user.require(&[Role::Content, Role::Admin], "claim").is_ok());
        let err = user.require(&[Role::Admin], "review designs").unwrap_err();
        assert_eq!(err.kind(), "permission_denied");
    }

    #[test]
    fn list_returns_all_users() {
        let (_dir, store) = open_tmp();
        User::create(&store, "a", Role::Admin).unwrap();
        User::create(&store, "b", Role::Developer).unwrap();
        let names: Vec<String> = User::list(&store).unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
