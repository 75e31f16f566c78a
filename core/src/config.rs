// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Paths to the local stores, all optional in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// The macOS call-history store.
    pub call_db_path: Option<PathBuf>,
    /// The sync ledger database.
    pub ledger_path: Option<PathBuf>,
    /// AddressBook `Sources` directory or a single `.abcddb` file.
    pub address_book_path: Option<PathBuf>,
    /// Seconds a call must be old before it is synced.
    pub min_call_age_seconds: Option<i64>,
}

impl CoreConfig {
    pub fn call_db_path(&self) -> PathBuf {
        self.call_db_path.clone().unwrap_or_else(|| {
            home()
                .join("Library/Application Support/CallHistoryDB/CallHistory.storedata")
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| home().join("Library/Application Support/callsync/callsync.db"))
    }

    pub fn address_book_path(&self) -> PathBuf {
        self.address_book_path
            .clone()
            .unwrap_or_else(|| home().join("Library/Application Support/AddressBook/Sources"))
    }

    pub fn min_call_age_seconds(&self) -> i64 {
        self.min_call_age_seconds
            .unwrap_or(crate::call_history::DEFAULT_MIN_AGE_SECONDS)
    }
}

fn home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_win_over_defaults() {
        let config = CoreConfig {
            call_db_path: Some(PathBuf::from("/tmp/calls.db")),
            ..CoreConfig::default()
        };
        assert_eq!(config.call_db_path(), PathBuf::from("/tmp/calls.db"));
        assert!(config
            .ledger_path()
            .ends_with("Application Support/callsync/callsync.db"));
    }

    #[test]
    fn min_age_defaults_to_two_minutes() {
        assert_eq!(CoreConfig::default().min_call_age_seconds(), 120);
        let config = CoreConfig {
            min_call_age_seconds: Some(0),
            ..CoreConfig::default()
        };
        assert_eq!(config.min_call_age_seconds(), 0);
    }
}
