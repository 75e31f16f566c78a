// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Read-only access to the macOS call-history store.
//!
//! `CallHistory.storedata` is a Core Data SQLite file owned by the OS. It is
//! only readable with Full Disk Access, so open failures are mapped to a
//! distinct permission error the CLI can explain.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::ConnectOptions;

use crate::types::CallRecord;

/// Seconds between the Unix epoch and the Core Data epoch (2001-01-01 UTC).
const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// Calls younger than this may still be in progress and are skipped.
pub const DEFAULT_MIN_AGE_SECONDS: i64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum CallHistoryError {
    #[error("call history database not found at {0}")]
    NotFound(PathBuf),
    #[error("Cannot read call history. Full Disk Access permission is required.")]
    PermissionDenied,
    #[error("call history query failed: {0}")]
    Db(#[from] sqlx::Error),
}

/// Where call records come from.
#[async_trait]
pub trait CallSource: Send + Sync {
    /// The backing store is present on this machine.
    fn source_exists(&self) -> bool;

    /// The store can actually be opened and queried.
    async fn is_readable(&self) -> bool;

    /// Reads calls, oldest first, one record per unique id.
    ///
    /// `since` bounds the window from below; `min_age_seconds` excludes
    /// calls too recent to be finished.
    async fn read_calls(
        &self,
        since: Option<Timestamp>,
        answered_only: bool,
        min_age_seconds: i64,
    ) -> Result<Vec<CallRecord>, CallHistoryError>;

    /// Total records in the store, unfiltered.
    async fn count_calls(&self) -> Result<i64, CallHistoryError>;
}

/// The real call-history store.
#[derive(Debug, Clone)]
pub struct CallHistory {
    path: PathBuf,
}

impl CallHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> Result<SqliteConnection, CallHistoryError> {
        if !self.path.exists() {
            return Err(CallHistoryError::NotFound(self.path.clone()));
        }

        SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true)
            .connect()
            .await
            .map_err(map_open_error)
    }
}

/// Open failures on an existing file are almost always the sandbox denying
/// access, which SQLite reports as "unable to open database file".
fn map_open_error(e: sqlx::Error) -> CallHistoryError {
    match &e {
        sqlx::Error::Io(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            CallHistoryError::PermissionDenied
        }
        sqlx::Error::Database(db) if db.message().contains("unable to open database") => {
            CallHistoryError::PermissionDenied
        }
        _ => CallHistoryError::Db(e),
    }
}

#[async_trait]
impl CallSource for CallHistory {
    fn source_exists(&self) -> bool {
        self.path.exists()
    }

    async fn is_readable(&self) -> bool {
        let Ok(mut conn) = self.connect().await else {
            return false;
        };
        sqlx::query("SELECT 1 FROM ZCALLRECORD LIMIT 1;")
            .fetch_optional(&mut conn)
            .await
            .is_ok()
    }

    async fn read_calls(
        &self,
        since: Option<Timestamp>,
        answered_only: bool,
        min_age_seconds: i64,
    ) -> Result<Vec<CallRecord>, CallHistoryError> {
        let mut conn = self.connect().await?;

        let mut sql = "\
SELECT ZUNIQUE_ID, CAST(ZADDRESS AS TEXT), ZDATE, ZDURATION, ZANSWERED, ZORIGINATED
FROM ZCALLRECORD
WHERE ZDATE <= ?
"
        .to_string();
        if since.is_some() {
            sql += "  AND ZDATE > ?\n";
        }
        if answered_only {
            sql += "  AND (ZANSWERED = 1 OR (ZORIGINATED = 1 AND ZDURATION > 5))\n";
        }
        sql += "GROUP BY ZUNIQUE_ID ORDER BY ZDATE ASC;";

        let cutoff = to_apple_seconds(Timestamp::now()) - min_age_seconds as f64;
        let mut query = sqlx::query_as::<
            _,
            (
                Option<String>,
                Option<String>,
                f64,
                Option<f64>,
                Option<i64>,
                Option<i64>,
            ),
        >(&sql)
        .bind(cutoff);
        if let Some(since) = since {
            query = query.bind(to_apple_seconds(since));
        }

        let rows = query.fetch_all(&mut conn).await?;
        let calls = rows
            .into_iter()
            .filter_map(|(unique_id, address, date, duration, answered, originated)| {
                let unique_id = unique_id?;
                Some(CallRecord {
                    unique_id,
                    phone_number: address.unwrap_or_default(),
                    contact_name: None,
                    timestamp: from_apple_seconds(date),
                    duration_seconds: (duration.unwrap_or(0.0).max(0.0)) as i64,
                    is_answered: answered == Some(1),
                    is_outgoing: originated == Some(1),
                })
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = calls.len(), answered_only, "read call history");
        Ok(calls)
    }

    async fn count_calls(&self) -> Result<i64, CallHistoryError> {
        let mut conn = self.connect().await?;
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ZCALLRECORD;")
            .fetch_one(&mut conn)
            .await?;
        Ok(row.0)
    }
}

fn to_apple_seconds(ts: Timestamp) -> f64 {
    (ts.as_second() - APPLE_EPOCH_OFFSET) as f64
}

fn from_apple_seconds(secs: f64) -> Timestamp {
    let unix = secs as i64 + APPLE_EPOCH_OFFSET;
    Timestamp::from_second(unix).unwrap_or(Timestamp::UNIX_EPOCH)
}
