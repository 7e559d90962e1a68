// Settings Repository
// Key-value access to the settings table

use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::utils::database::Database;

/// Repository for key-value settings
#[derive(Clone)]
pub struct SettingsRepository {
    db: Database,
}

impl SettingsRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a raw setting value
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, String> {
        self.db.with_connection(|conn| {
            let result = conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            );

            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(format!("Failed to get setting: {}", e)),
            }
        })
    }

    /// Get a setting stored as JSON
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, String> {
        match self.get_raw(key)? {
            Some(value) => serde_json::from_str(&value)
                .map(Some)
                .map_err(|e| format!("Failed to parse setting '{}': {}", key, e)),
            None => Ok(None),
        }
    }

    /// Store a setting as JSON, replacing any previous value
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), String> {
        let json = to_json(key, value)?;
        self.db.with_connection(|conn| upsert(conn, key, &json))
    }

    /// Store several settings in one transaction; none are written on failure
    pub fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), String> {
        let rows = entries
            .iter()
            .map(|(key, value)| to_json(key, value).map(|json| (*key, json)))
            .collect::<Result<Vec<_>, String>>()?;

        self.db.with_transaction(|conn| {
            for (key, json) in &rows {
                upsert(conn, key, json)?;
            }
            Ok(())
        })
    }

    /// Delete a setting. Returns false when the key was absent.
    pub fn delete(&self, key: &str) -> Result<bool, String> {
        self.db.with_connection(|conn| {
            let rows_affected = conn
                .execute("DELETE FROM settings WHERE key = ?1", params![key])
                .map_err(|e| format!("Failed to delete setting: {}", e))?;
            Ok(rows_affected > 0)
        })
    }

    /// Delete several settings in one transaction, returning how many existed
    pub fn delete_many(&self, keys: &[&str]) -> Result<usize, String> {
        self.db.with_transaction(|conn| {
            let mut removed = 0;
            for key in keys {
                removed += conn
                    .execute("DELETE FROM settings WHERE key = ?1", params![key])
                    .map_err(|e| format!("Failed to delete setting: {}", e))?;
            }
            Ok(removed)
        })
    }
}

fn to_json<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, String> {
    serde_json::to_string(value)
        .map_err(|e| format!("Failed to serialize setting '{}': {}", key, e))
}

fn upsert(conn: &Connection, key: &str, json: &str) -> Result<(), String> {
    conn.execute(
        r#"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?1, ?2, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        params![key, json],
    )
    .map_err(|e| format!("Failed to save setting: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup_repo() -> SettingsRepository {
        SettingsRepository::new(Database::new_in_memory().unwrap())
    }

    #[test]
    fn test_set_get_overwrite() {
        let repo = setup_repo();
        assert!(repo.get::<Value>("k").unwrap().is_none());

        repo.set("k", &json!({"a": 1})).unwrap();
        repo.set("k", &json!({"a": 2})).unwrap();
        assert_eq!(repo.get::<Value>("k").unwrap(), Some(json!({"a": 2})));
    }

    #[test]
    fn test_delete() {
        let repo = setup_repo();
        repo.set("k", &"v").unwrap();
        assert!(repo.delete("k").unwrap());
        assert!(!repo.delete("k").unwrap());
        assert!(repo.get_raw("k").unwrap().is_none());
    }

    #[test]
    fn test_get_invalid_json() {
        let repo = setup_repo();
        repo.db
            .with_connection(|conn| {
                conn.execute("INSERT INTO settings (key, value) VALUES ('bad', 'not json')", [])
                    .map_err(|e| e.to_string())
            })
            .unwrap();
        let err = repo.get::<Value>("bad").unwrap_err();
        assert!(err.contains("Failed to parse setting 'bad'"));
    }

    #[test]
    fn test_set_many_and_delete_many() {
        let repo = setup_repo();
        repo.set_many(&[("a", json!(1)), ("b", json!("two"))]).unwrap();
        assert_eq!(repo.get::<Value>("a").unwrap(), Some(json!(1)));
        assert_eq!(repo.get::<String>("b").unwrap().as_deref(), Some("two"));

        assert_eq!(repo.delete_many(&["a", "b", "missing"]).unwrap(), 2);
        assert_eq!(repo.delete_many(&["a", "b"]).unwrap(), 0);
    }

    #[test]
    fn test_set_many_rolls_back_on_failure() {
        let repo = setup_repo();
        repo.db
            .with_connection(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_b BEFORE INSERT ON settings WHEN NEW.key = 'b'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )
                .map_err(|e| e.to_string())
            })
            .unwrap();

        let err = repo.set_many(&[("a", json!(1)), ("b", json!(2))]).unwrap_err();
        assert!(err.contains("Failed to save setting"));
        assert!(repo.get_raw("a").unwrap().is_none());
    }
}
