use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Response {
    pub(crate) id: i64,
    pub(crate) trigger_id: i64,
    pub(crate) text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Trigger {
    pub(crate) id: i64,
    pub(crate) value: String,
    pub(crate) responses: Vec<Response>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ContentItem {
    pub(crate) id: i64,
    pub(crate) text: String,
}

#[cfg_attr(test, mockall::automock)]
pub(crate) trait TriggerStore: Send + Sync {
    /// All triggers with their responses, ordered by id.
    fn list_all(&self) -> Result<Vec<Trigger>, AppError>;
    fn create(&self, value: &str) -> Result<Trigger, AppError>;
    fn delete(&self, id: i64) -> Result<(), AppError>;
    fn responses_for(&self, trigger_id: i64) -> Result<Vec<Response>, AppError>;
    fn add_response(&self, trigger_id: i64, text: &str) -> Result<Response, AppError>;
    fn delete_response(&self, id: i64) -> Result<(), AppError>;
}

#[cfg_attr(test, mockall::automock)]
pub(crate) trait ContentStore: Send + Sync {
    /// One uniformly random item, or `None` when the store is empty.
    fn random_item(&self) -> Result<Option<ContentItem>, AppError>;
    fn list(&self) -> Result<Vec<ContentItem>, AppError>;
    fn add(&self, text: &str) -> Result<ContentItem, AppError>;
    fn delete(&self, id: i64) -> Result<(), AppError>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS triggers (
        id INTEGER PRIMARY KEY,
        value TEXT NOT NULL UNIQUE,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS responses (
        id INTEGER PRIMARY KEY,
        trigger_id INTEGER NOT NULL REFERENCES triggers(id) ON DELETE CASCADE,
        text TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_responses_trigger ON responses(trigger_id);
    CREATE TABLE IF NOT EXISTS content_items (
        id INTEGER PRIMARY KEY,
        text TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );";

/// SQLite-backed implementation of both stores.
pub(crate) struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub(crate) fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self, AppError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Other("store connection lock poisoned".to_string()))
    }
}

fn require_text(kind: &str, text: &str) -> Result<String, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{kind} must not be empty")));
    }
    Ok(text.to_string())
}

fn trigger_exists(conn: &Connection, id: i64) -> Result<bool, AppError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM triggers WHERE id = ?1",
            rusqlite::params![id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

impl TriggerStore for SqliteStore {
    fn list_all(&self) -> Result<Vec<Trigger>, AppError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT id, value FROM triggers ORDER BY id")?;
        let mut triggers: Vec<Trigger> = stmt
            .query_map([], |row| {
                Ok(Trigger {
                    id: row.get(0)?,
                    value: row.get(1)?,
                    responses: Vec::new(),
                })
            })?
            .collect::<Result<_, _>>()?;

        let mut stmt =
            conn.prepare("SELECT id, trigger_id, text FROM responses ORDER BY trigger_id, id")?;
        let mut by_trigger: HashMap<i64, Vec<Response>> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok(Response {
                id: row.get(0)?,
                trigger_id: row.get(1)?,
                text: row.get(2)?,
            })
        })?;
        for row in rows {
            let response = row?;
            by_trigger
                .entry(response.trigger_id)
                .or_default()
                .push(response);
        }

        for trigger in &mut triggers {
            if let Some(responses) = by_trigger.remove(&trigger.id) {
                trigger.responses = responses;
            }
        }
        Ok(triggers)
    }

    fn create(&self, value: &str) -> Result<Trigger, AppError> {
        let value = require_text("trigger value", value)?;
        let conn = self.conn()?;
        match conn.execute(
            "INSERT INTO triggers (value, created_at) VALUES (?1, ?2)",
            rusqlite::params![value, crate::helpers::epoch_now()],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(AppError::Duplicate(value));
            }
            Err(e) => return Err(e.into()),
        }
        let id = conn.last_insert_rowid();
        debug!(trigger_id = id, value = %value, "Trigger created");
        Ok(Trigger {
            id,
            value,
            responses: Vec::new(),
        })
    }

    fn delete(&self, id: i64) -> Result<(), AppError> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM triggers WHERE id = ?1", rusqlite::params![id])?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("trigger {id}")));
        }
        Ok(())
    }

    fn responses_for(&self, trigger_id: i64) -> Result<Vec<Response>, AppError> {
        let conn = self.conn()?;
        if !trigger_exists(&conn, trigger_id)? {
            return Err(AppError::NotFound(format!("trigger {trigger_id}")));
        }
        let mut stmt =
            conn.prepare("SELECT id, trigger_id, text FROM responses WHERE trigger_id = ?1 ORDER BY id")?;
        let responses = stmt
            .query_map(rusqlite::params![trigger_id], |row| {
                Ok(Response {
                    id: row.get(0)?,
                    trigger_id: row.get(1)?,
                    text: row.get(2)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(responses)
    }

    fn add_response(&self, trigger_id: i64, text: &str) -> Result<Response, AppError> {
        let text = require_text("response text", text)?;
        let conn = self.conn()?;
        if !trigger_exists(&conn, trigger_id)? {
            return Err(AppError::NotFound(format!("trigger {trigger_id}")));
        }
        conn.execute(
            "INSERT INTO responses (trigger_id, text, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![trigger_id, text, crate::helpers::epoch_now()],
        )?;
        Ok(Response {
            id: conn.last_insert_rowid(),
            trigger_id,
            text,
        })
    }

    fn delete_response(&self, id: i64) -> Result<(), AppError> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM responses WHERE id = ?1", rusqlite::params![id])?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("response {id}")));
        }
        Ok(())
    }
}

impl ContentStore for SqliteStore {
    fn random_item(&self) -> Result<Option<ContentItem>, AppError> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                "SELECT id, text FROM content_items ORDER BY RANDOM() LIMIT 1",
                [],
                |row| {
                    Ok(ContentItem {
                        id: row.get(0)?,
                        text: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(item)
    }

    fn list(&self) -> Result<Vec<ContentItem>, AppError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, text FROM content_items ORDER BY id")?;
        let items = stmt
            .query_map([], |row| {
                Ok(ContentItem {
                    id: row.get(0)?,
                    text: row.get(1)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(items)
    }

    fn add(&self, text: &str) -> Result<ContentItem, AppError> {
        let text = require_text("content text", text)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO content_items (text, created_at) VALUES (?1, ?2)",
            rusqlite::params![text, crate::helpers::epoch_now()],
        )?;
        Ok(ContentItem {
            id: conn.last_insert_rowid(),
            text,
        })
    }

    fn delete(&self, id: i64) -> Result<(), AppError> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM content_items WHERE id = ?1",
            rusqlite::params![id],
        )?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("content item {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_list_triggers_in_id_order() {
        let store = store();
        let a = store.create("Привет").unwrap();
        let b = store.create("погода").unwrap();
        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a.id);
        assert_eq!(all[1].id, b.id);
        assert_eq!(all[0].value, "Привет", "storage case is preserved");
        assert!(all[1].responses.is_empty());
    }

    #[test]
    fn test_create_duplicate_value_rejected() {
        let store = store();
        store.create("привет").unwrap();
        let err = store.create("привет").unwrap_err();
        assert!(matches!(err, AppError::Duplicate(_)), "got: {err}");
    }

    #[test]
    fn test_create_empty_value_rejected() {
        let store = store();
        let err = store.create("   ").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_create_keeps_surrounding_spaces() {
        let store = store();
        let t = store.create(" да ").unwrap();
        assert_eq!(t.value, " да ");
        assert_eq!(store.list_all().unwrap()[0].value, " да ");
    }

    #[test]
    fn test_list_all_embeds_responses() {
        let store = store();
        let t = store.create("привет").unwrap();
        let other = store.create("пока").unwrap();
        store.add_response(t.id, "Здравствуйте!").unwrap();
        store.add_response(t.id, "Привет!").unwrap();
        store.add_response(other.id, "До встречи").unwrap();

        let all = store.list_all().unwrap();
        let texts: Vec<&str> = all[0].responses.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["Здравствуйте!", "Привет!"]);
        assert_eq!(all[1].responses.len(), 1);
        assert!(all[0].responses.iter().all(|r| r.trigger_id == t.id));
    }

    #[test]
    fn test_add_response_to_missing_trigger() {
        let store = store();
        let err = store.add_response(999, "orphan").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_delete_trigger_cascades_responses() {
        let store = store();
        let t = store.create("привет").unwrap();
        let r = store.add_response(t.id, "Привет!").unwrap();
        TriggerStore::delete(&store, t.id).unwrap();
        assert!(store.list_all().unwrap().is_empty());
        let err = store.delete_response(r.id).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)), "response should be gone");
    }

    #[test]
    fn test_delete_missing_trigger() {
        let store = store();
        assert!(matches!(
            TriggerStore::delete(&store, 42).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_delete_response_leaves_siblings() {
        let store = store();
        let t = store.create("привет").unwrap();
        let first = store.add_response(t.id, "one").unwrap();
        store.add_response(t.id, "two").unwrap();
        store.delete_response(first.id).unwrap();
        let remaining = store.responses_for(t.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "two");
    }

    #[test]
    fn test_responses_for_missing_trigger() {
        let store = store();
        assert!(matches!(
            store.responses_for(5).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_random_item_empty_store() {
        let store = store();
        assert_eq!(store.random_item().unwrap(), None);
    }

    #[test]
    fn test_random_item_returns_stored_item() {
        let store = store();
        store.add("Колобок повесился").unwrap();
        store.add("Штирлиц шёл по лесу").unwrap();
        let item = store.random_item().unwrap().unwrap();
        let all = store.list().unwrap();
        assert!(all.contains(&item));
    }

    #[test]
    fn test_content_add_list_delete() {
        let store = store();
        let item = store.add("joke").unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        ContentStore::delete(&store, item.id).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(
            ContentStore::delete(&store, item.id).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_content_add_empty_rejected() {
        let store = store();
        assert!(matches!(
            store.add("").unwrap_err(),
            AppError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_open_on_disk_creates_parent_dir() {
        let dir = std::env::temp_dir().join(format!("jokebot_store_{}", std::process::id()));
        let path = dir.join("nested").join("bot.db");
        let store = SqliteStore::open(&path).unwrap();
        store.create("hello").unwrap();
        drop(store);
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.list_all().unwrap().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
