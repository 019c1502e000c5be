use rusqlite::{Connection, OptionalExtension};

use flowsync_core::{FieldMap, FieldValue, FlowId, FlowRecord, Patch};

use crate::error::StorageError;
use crate::traits::FlowStore;

const TOUCH_SQL: &str =
    "UPDATE flows SET updated_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER) WHERE flow_id = ?1";

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Number of stored records.
    pub fn flow_count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM flows", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn read_locked(conn: &Connection, identifier: &FlowId) -> Result<Option<bool>, StorageError> {
        let locked = conn
            .query_row(
                "SELECT locked FROM flows WHERE flow_id = ?1",
                rusqlite::params![identifier.as_str()],
                |row| row.get::<_, bool>(0),
            )
            .optional()?;
        Ok(locked)
    }

    fn read_fields(conn: &Connection, identifier: &FlowId) -> Result<FieldMap, StorageError> {
        let mut stmt =
            conn.prepare("SELECT field_key, value FROM flow_fields WHERE flow_id = ?1")?;
        let rows = stmt.query_map(rusqlite::params![identifier.as_str()], |row| {
            let key: String = row.get(0)?;
            let val_bytes: Vec<u8> = row.get(1)?;
            Ok((key, val_bytes))
        })?;

        let mut fields = FieldMap::new();
        for row in rows {
            let (key, val_bytes) = row?;
            let value = FieldValue::from_msgpack(&val_bytes)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            fields.insert(key, value);
        }
        Ok(fields)
    }

    fn reread(&self, identifier: &FlowId) -> Result<FlowRecord, StorageError> {
        self.read(identifier)?
            .ok_or_else(|| StorageError::NotFound(identifier.to_string()))
    }
}

fn upsert_field(
    tx: &rusqlite::Transaction,
    identifier: &FlowId,
    key: &str,
    value: &FieldValue,
) -> Result<(), StorageError> {
    if value.is_null() {
        tx.execute(
            "DELETE FROM flow_fields WHERE flow_id = ?1 AND field_key = ?2",
            rusqlite::params![identifier.as_str(), key],
        )?;
        return Ok(());
    }
    let bytes = value
        .to_msgpack()
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    tx.execute(
        "INSERT INTO flow_fields (flow_id, field_key, value) VALUES (?1, ?2, ?3)
         ON CONFLICT (flow_id, field_key) DO UPDATE SET value = excluded.value",
        rusqlite::params![identifier.as_str(), key, bytes],
    )?;
    Ok(())
}

impl FlowStore for SqliteStorage {
    fn read(&self, identifier: &FlowId) -> Result<Option<FlowRecord>, StorageError> {
        let Some(locked) = Self::read_locked(&self.conn, identifier)? else {
            return Ok(None);
        };
        let fields = Self::read_fields(&self.conn, identifier)?;
        Ok(Some(FlowRecord {
            identifier: identifier.clone(),
            locked,
            fields,
        }))
    }

    fn insert(&mut self, record: &FlowRecord) -> Result<FlowRecord, StorageError> {
        let tx = self.conn.transaction()?;
        let result = tx.execute(
            "INSERT INTO flows (flow_id, locked) VALUES (?1, ?2)",
            rusqlite::params![record.identifier.as_str(), record.locked],
        );
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StorageError::Conflict {
                    identifier: record.identifier.to_string(),
                    reason: "identifier already exists".into(),
                });
            }
            Err(e) => return Err(StorageError::Sqlite(e)),
        }
        for (key, value) in &record.fields {
            upsert_field(&tx, &record.identifier, key, value)?;
        }
        tx.commit()?;
        self.reread(&record.identifier)
    }

    fn write_patch(
        &mut self,
        identifier: &FlowId,
        patch: &Patch,
    ) -> Result<FlowRecord, StorageError> {
        let tx = self.conn.transaction()?;
        match Self::read_locked(&tx, identifier)? {
            None => return Err(StorageError::NotFound(identifier.to_string())),
            Some(true) => {
                return Err(StorageError::Conflict {
                    identifier: identifier.to_string(),
                    reason: "record is locked".into(),
                });
            }
            Some(false) => {}
        }
        for (key, value) in patch.iter() {
            upsert_field(&tx, identifier, key, value)?;
        }
        tx.execute(TOUCH_SQL, rusqlite::params![identifier.as_str()])?;
        tx.commit()?;
        self.reread(identifier)
    }

    fn write_lock(
        &mut self,
        identifier: &FlowId,
        desired: bool,
    ) -> Result<FlowRecord, StorageError> {
        let changed = self.conn.execute(
            "UPDATE flows SET locked = ?1 WHERE flow_id = ?2",
            rusqlite::params![desired, identifier.as_str()],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(identifier.to_string()));
        }
        self.conn
            .execute(TOUCH_SQL, rusqlite::params![identifier.as_str()])?;
        self.reread(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> FlowRecord {
        FlowRecord::new(FlowId::parse("cam-1").unwrap())
            .with_field("display_name", "Cam1")
            .with_field("group_port_a", 5004_i64)
    }

    #[test]
    fn insert_then_read() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let stored = storage.insert(&camera()).unwrap();
        assert_eq!(stored, camera());
        assert_eq!(storage.flow_count().unwrap(), 1);
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage.insert(&camera()).unwrap();
        assert!(matches!(
            storage.insert(&camera()),
            Err(StorageError::Conflict { .. })
        ));
    }

    #[test]
    fn null_in_patch_removes_field() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let id = storage.insert(&camera()).unwrap().identifier;

        let mut patch = Patch::new();
        patch.try_insert("group_port_a", FieldValue::Null).unwrap();
        patch.try_insert("note", FieldValue::Text("moved".into())).unwrap();
        let updated = storage.write_patch(&id, &patch).unwrap();

        assert!(updated.get("group_port_a").is_none());
        assert_eq!(updated.get("note"), Some(&FieldValue::Text("moved".into())));
        assert_eq!(updated.get("display_name"), Some(&FieldValue::Text("Cam1".into())));
    }

    #[test]
    fn locked_record_refuses_patch() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let id = storage.insert(&camera()).unwrap().identifier;
        assert!(storage.write_lock(&id, true).unwrap().locked);

        let mut patch = Patch::new();
        patch.try_insert("note", FieldValue::Text("x".into())).unwrap();
        assert!(matches!(
            storage.write_patch(&id, &patch),
            Err(StorageError::Conflict { .. })
        ));
        assert!(storage.read(&id).unwrap().unwrap().get("note").is_none());
    }

    #[test]
    fn unknown_identifier() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let id = FlowId::parse("missing").unwrap();
        assert!(storage.read(&id).unwrap().is_none());
        assert!(matches!(
            storage.write_patch(&id, &Patch::new()),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.write_lock(&id, true),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.db");
        let path = path.to_str().unwrap();
        {
            let mut storage = SqliteStorage::open(path).unwrap();
            storage.insert(&camera()).unwrap();
        }
        let storage = SqliteStorage::open(path).unwrap();
        let record = storage.read(&FlowId::parse("cam-1").unwrap()).unwrap().unwrap();
        assert_eq!(record, camera());
    }
}
