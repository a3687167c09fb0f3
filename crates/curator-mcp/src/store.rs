//! SQLite-backed durable store
//!
//! Three tables: account profiles keyed by lower-cased name, trend
//! snapshots keyed by `YYYY-MM-DD`, and an append-only operational log.
//! Each call opens its own connection; SQLite serializes writers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use curator_core::{account_key, Account, TrendRecord, TrendSnapshot};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::error::Result;

/// One operational log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub datetime: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
        };
        store.init_db()?;

        tracing::info!(path = %store.db_path.display(), "Store initialized");
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(conn)
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                name TEXT PRIMARY KEY,
                profile TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS trends (
                date TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                datetime TEXT NOT NULL,
                type TEXT NOT NULL,
                message TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_logs_name ON logs(name, id);
            "#,
        )?;
        Ok(())
    }

    // ---- Profiles ----

    /// Insert or replace an account profile.
    pub fn write_account(&self, account: &Account) -> Result<()> {
        let json = serde_json::to_string(account)?;
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO profiles (name, profile) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET profile = excluded.profile
            "#,
            params![account_key(&account.name), json],
        )?;
        Ok(())
    }

    pub fn read_account(&self, name: &str) -> Result<Option<Account>> {
        let conn = self.connect()?;
        let row: Option<String> = conn
            .query_row(
                "SELECT profile FROM profiles WHERE name = ?1",
                params![account_key(name)],
                |row| row.get(0),
            )
            .optional()?;

        match row {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    // ---- Trends ----

    /// Persist the records of a snapshot as a topic -> record mapping.
    pub fn write_trends(&self, snapshot: &TrendSnapshot) -> Result<()> {
        let json = serde_json::to_string(&snapshot.records)?;
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO trends (date, data) VALUES (?1, ?2)
            ON CONFLICT(date) DO UPDATE SET data = excluded.data
            "#,
            params![snapshot.date, json],
        )?;
        Ok(())
    }

    pub fn read_trends(&self, date: &str) -> Result<Option<TrendSnapshot>> {
        let conn = self.connect()?;
        let row: Option<String> = conn
            .query_row(
                "SELECT data FROM trends WHERE date = ?1",
                params![date],
                |row| row.get(0),
            )
            .optional()?;

        match row {
            Some(json) => {
                let records: BTreeMap<String, TrendRecord> = serde_json::from_str(&json)?;
                Ok(Some(TrendSnapshot {
                    date: date.to_string(),
                    records,
                }))
            }
            None => Ok(None),
        }
    }

    // ---- Logs ----

    pub fn write_log(&self, name: &str, kind: &str, message: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO logs (name, datetime, type, message) VALUES (?1, ?2, ?3, ?4)",
            params![account_key(name), Utc::now().to_rfc3339(), kind, message],
        )?;
        Ok(())
    }

    /// The most recent `last_n` entries for an account, oldest first.
    pub fn read_log(&self, name: &str, last_n: usize) -> Result<Vec<LogEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT datetime, type, message FROM logs
            WHERE name = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![account_key(name), last_n as i64], |row| {
            let datetime: String = row.get(0)?;
            Ok((datetime, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (datetime, kind, message) = row?;
            let datetime = DateTime::parse_from_rfc3339(&datetime)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_default();
            entries.push(LogEntry {
                datetime,
                kind,
                message,
            });
        }
        entries.reverse();
        Ok(entries)
    }
}
