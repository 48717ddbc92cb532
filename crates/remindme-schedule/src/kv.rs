use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::db::init_db;
use crate::error::{Result, ScheduleError};

/// String-keyed persistence shared by the schedule store and the
/// notification settings.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed store. The connection is guarded by a mutex, so one
/// instance can be shared across tasks behind an `Arc`.
pub struct SqliteKeyValueStore {
    db: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScheduleError::Storage(format!("{}: {e}", parent.display())))?;
        }
        debug!(path = %path.display(), "opening key/value store");
        Self::new(Connection::open(path)?)
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| ScheduleError::Storage("connection lock poisoned".to_string()))
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let db = self.conn()?;
        let value = db
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let db = self.conn()?;
        let now = chrono::Utc::now().to_rfc3339();
        db.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
             updated_at = excluded.updated_at",
            rusqlite::params![key, value, now],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let db = self.conn()?;
        db.execute("DELETE FROM kv_store WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
    }
}

/// Process-local store, used in tests and as a fallback when no database
/// path is writable.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| ScheduleError::Storage("store lock poisoned".to_string()))
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// Read and decode a JSON value. A stored value that no longer decodes is
/// treated as absent.
pub fn load_json<T: DeserializeOwned>(kv: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = kv.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "ignoring malformed stored value");
            Ok(None)
        }
    }
}

pub fn store_json<T: Serialize + ?Sized>(kv: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    kv.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite() -> SqliteKeyValueStore {
        SqliteKeyValueStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn exercise(kv: &dyn KeyValueStore) {
        assert_eq!(kv.get("missing").unwrap(), None);
        kv.set("k", "one").unwrap();
        kv.set("k", "two").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("two"));
        kv.remove("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
        kv.remove("k").unwrap();
    }

    #[test]
    fn sqlite_store_upserts_and_removes() {
        exercise(&sqlite());
    }

    #[test]
    fn memory_store_upserts_and_removes() {
        exercise(&InMemoryKeyValueStore::new());
    }

    #[test]
    fn init_db_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
    }

    #[test]
    fn malformed_json_reads_as_absent() {
        let kv = sqlite();
        kv.set("numbers", "{not json").unwrap();
        let value: Option<Vec<u32>> = load_json(&kv, "numbers").unwrap();
        assert_eq!(value, None);

        store_json(&kv, "numbers", &vec![1u32, 2, 3]).unwrap();
        let value: Option<Vec<u32>> = load_json(&kv, "numbers").unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }
}
