use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn get_value(&self, key: &str) -> Result<Option<Entry>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT key, value, updated_at FROM kv WHERE key = ?1",
            params![key],
            |row| {
                let updated: i64 = row.get(2)?;
                Ok(Entry {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    updated_at: Utc
                        .timestamp_opt(updated, 0)
                        .single()
                        .unwrap_or_else(Utc::now),
                })
            },
        )
        .optional()
        .with_context(|| format!("storage: read key {key}"))
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            bail!("storage: key required");
        }
        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO kv (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value = excluded.value,
  updated_at = excluded.updated_at
"#,
            params![key, value, Utc::now().timestamp()],
        )
        .with_context(|| format!("storage: write key {key}"))?;
        Ok(())
    }

    pub fn delete_value(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let removed = conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .with_context(|| format!("storage: delete key {key}"))?;
        Ok(removed > 0)
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    for (idx, sql) in migrations().iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)
            .with_context(|| format!("storage: apply migration {version}"))?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, Utc::now().timestamp()],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![
        r#"
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
    ]
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tube-tui").join("state.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_at(path: PathBuf) -> Store {
        Store::open(Options { path: Some(path) }).unwrap()
    }

    #[test]
    fn open_creates_database_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");
        let store = open_at(path.clone());
        assert!(path.exists());
        store.close().unwrap();
    }

    #[test]
    fn values_round_trip_and_overwrite() {
        let dir = tempdir().unwrap();
        let store = open_at(dir.path().join("state.db"));

        assert!(store.get_value("user").unwrap().is_none());
        store.set_value("user", "first").unwrap();
        store.set_value("user", "second").unwrap();
        let entry = store.get_value("user").unwrap().unwrap();
        assert_eq!(entry.key, "user");
        assert_eq!(entry.value, "second");

        assert!(store.delete_value("user").unwrap());
        assert!(!store.delete_value("user").unwrap());
        assert!(store.get_value("user").unwrap().is_none());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.db");
        let store = open_at(path.clone());
        store.set_value("user", "kept").unwrap();
        store.close().unwrap();

        let reopened = open_at(path);
        assert_eq!(reopened.get_value("user").unwrap().unwrap().value, "kept");
    }

    #[test]
    fn empty_key_is_rejected() {
        let dir = tempdir().unwrap();
        let store = open_at(dir.path().join("state.db"));
        assert!(store.set_value("", "x").is_err());
    }
}
