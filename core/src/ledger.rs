// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Local record of which calls have already been pushed to the calendar.

use std::collections::HashSet;
use std::path::Path;

use jiff::Timestamp;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// A call that has been synced, as stored in the ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncedCallRecord {
    pub call_unique_id: String,
    pub remote_event_id: String,
    /// RFC 3339 UTC.
    pub synced_at: String,
}

/// SQLite-backed sync state: the synced-call set plus a string KV table.
#[derive(Debug, Clone)]
pub struct SyncLedger {
    pool: SqlitePool,
}

impl SyncLedger {
    /// Opens the ledger database, creating the file when missing.
    /// `None` opens an in-memory database.
    pub async fn open(path: Option<&Path>) -> Result<Self, sqlx::Error> {
        let options = match path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "opening sync ledger");
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir).map_err(sqlx::Error::Io)?;
                }
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
            }
            None => {
                tracing::debug!("opening in-memory sync ledger");
                SqliteConnectOptions::new().in_memory(true)
            }
        };

        // A single connection keeps in-memory databases coherent.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Creates the schema. Safe to call on every run.
    pub async fn initialize(&self) -> Result<(), sqlx::Error> {
        const SQL: &str = "\
CREATE TABLE IF NOT EXISTS synced_calls (
    call_unique_id  TEXT PRIMARY KEY,
    remote_event_id TEXT NOT NULL,
    synced_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_synced_calls_event
    ON synced_calls (remote_event_id);
CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";
        sqlx::raw_sql(SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn is_synced(&self, call_unique_id: &str) -> Result<bool, sqlx::Error> {
        const SQL: &str = "SELECT 1 FROM synced_calls WHERE call_unique_id = ?;";

        let row: Option<(i64,)> = sqlx::query_as(SQL)
            .bind(call_unique_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn synced_call_ids(&self) -> Result<HashSet<String>, sqlx::Error> {
        const SQL: &str = "SELECT call_unique_id FROM synced_calls;";

        let rows: Vec<(String,)> = sqlx::query_as(SQL).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Records a synced call, replacing the event id on re-sync.
    pub async fn mark_synced(
        &self,
        call_unique_id: &str,
        remote_event_id: &str,
    ) -> Result<(), sqlx::Error> {
        const SQL: &str = "\
INSERT INTO synced_calls (call_unique_id, remote_event_id, synced_at)
VALUES (?, ?, ?)
ON CONFLICT(call_unique_id) DO UPDATE SET
    remote_event_id = excluded.remote_event_id,
    synced_at       = excluded.synced_at;
";

        sqlx::query(SQL)
            .bind(call_unique_id)
            .bind(remote_event_id)
            .bind(Timestamp::now().to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_synced(
        &self,
        call_unique_id: &str,
    ) -> Result<Option<SyncedCallRecord>, sqlx::Error> {
        const SQL: &str = "\
SELECT call_unique_id, remote_event_id, synced_at
FROM synced_calls
WHERE call_unique_id = ?;
";

        sqlx::query_as(SQL)
            .bind(call_unique_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Returns whether a row was actually removed.
    pub async fn remove_synced(&self, call_unique_id: &str) -> Result<bool, sqlx::Error> {
        const SQL: &str = "DELETE FROM synced_calls WHERE call_unique_id = ?;";

        let result = sqlx::query(SQL)
            .bind(call_unique_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_synced(&self) -> Result<i64, sqlx::Error> {
        const SQL: &str = "SELECT COUNT(*) FROM synced_calls;";

        let row: (i64,) = sqlx::query_as(SQL).fetch_one(&self.pool).await?;
        Ok(row.0)
    }

    /// Empties the synced set, returning how many rows were dropped.
    pub async fn clear_all_synced(&self) -> Result<i64, sqlx::Error> {
        const SQL: &str = "DELETE FROM synced_calls;";

        let result = sqlx::query(SQL).execute(&self.pool).await?;
        Ok(result.rows_affected() as i64)
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        const SQL: &str = "SELECT value FROM settings WHERE key = ?;";

        let row: Option<(String,)> = sqlx::query_as(SQL)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        const SQL: &str = "\
INSERT INTO settings (key, value)
VALUES (?, ?)
ON CONFLICT(key) DO UPDATE SET value = excluded.value;
";

        sqlx::query(SQL)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_setting(&self, key: &str) -> Result<bool, sqlx::Error> {
        const SQL: &str = "DELETE FROM settings WHERE key = ?;";

        let result = sqlx::query(SQL).bind(key).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ledger() -> SyncLedger {
        let ledger = SyncLedger::open(None).await.unwrap();
        ledger.initialize().await.unwrap();
        ledger
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let ledger = ledger().await;
        ledger.initialize().await.unwrap();
        assert_eq!(ledger.count_synced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_and_query_roundtrip() {
        let ledger = ledger().await;
        assert!(!ledger.is_synced("call-1").await.unwrap());

        ledger.mark_synced("call-1", "evt-1").await.unwrap();
        assert!(ledger.is_synced("call-1").await.unwrap());

        let record = ledger.get_synced("call-1").await.unwrap().unwrap();
        assert_eq!(record.remote_event_id, "evt-1");
        assert!(record.synced_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn mark_synced_upserts_event_id() {
        let ledger = ledger().await;
        ledger.mark_synced("call-1", "evt-old").await.unwrap();
        ledger.mark_synced("call-1", "evt-new").await.unwrap();

        assert_eq!(ledger.count_synced().await.unwrap(), 1);
        let record = ledger.get_synced("call-1").await.unwrap().unwrap();
        assert_eq!(record.remote_event_id, "evt-new");
    }

    #[tokio::test]
    async fn synced_call_ids_returns_full_set() {
        let ledger = ledger().await;
        ledger.mark_synced("a", "e1").await.unwrap();
        ledger.mark_synced("b", "e2").await.unwrap();

        let ids = ledger.synced_call_ids().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("a") && ids.contains("b"));
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let ledger = ledger().await;
        ledger.mark_synced("a", "e1").await.unwrap();
        ledger.mark_synced("b", "e2").await.unwrap();

        assert!(ledger.remove_synced("a").await.unwrap());
        assert!(!ledger.remove_synced("a").await.unwrap());
        assert_eq!(ledger.clear_all_synced().await.unwrap(), 1);
        assert_eq!(ledger.count_synced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn settings_roundtrip() {
        let ledger = ledger().await;
        assert_eq!(ledger.get_setting("initial_sync_done").await.unwrap(), None);

        ledger.set_setting("initial_sync_done", "true").await.unwrap();
        ledger.set_setting("initial_sync_done", "false").await.unwrap();
        assert_eq!(
            ledger.get_setting("initial_sync_done").await.unwrap().as_deref(),
            Some("false")
        );

        assert!(ledger.delete_setting("initial_sync_done").await.unwrap());
        assert!(!ledger.delete_setting("initial_sync_done").await.unwrap());
    }

    #[tokio::test]
    async fn on_disk_ledger_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("callsync.db");

        {
            let ledger = SyncLedger::open(Some(&path)).await.unwrap();
            ledger.initialize().await.unwrap();
            ledger.mark_synced("call-1", "evt-1").await.unwrap();
        }

        let ledger = SyncLedger::open(Some(&path)).await.unwrap();
        ledger.initialize().await.unwrap();
        assert!(ledger.is_synced("call-1").await.unwrap());
    }
}
