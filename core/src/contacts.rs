// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Phone-number to contact-name resolution.
//!
//! Lookup failures never fail a sync; an unavailable directory just means
//! events are titled with the raw number.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::ConnectOptions;
use tokio::sync::OnceCell;

/// Matching key length. Numbers are compared by their trailing digits so
/// that `+1 (555) 123-4567` and `5551234567` resolve to the same contact.
const SUFFIX_DIGITS: usize = 10;

const ADDRESS_BOOK_DB: &str = "AddressBook-v22.abcddb";

/// Maps phone numbers to display names.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolves one number. `None` when unknown.
    async fn resolve(&self, phone_number: &str) -> Option<String>;

    /// Resolves many numbers in one pass; unknown numbers are absent from
    /// the result.
    async fn resolve_bulk(&self, phone_numbers: &[String]) -> HashMap<String, String>;

    /// The directory is present and readable.
    async fn is_authorized(&self) -> bool;
}

/// Resolver over the macOS AddressBook SQLite stores.
///
/// The whole directory is loaded once per process and cached; contact
/// edits are picked up on the next run.
#[derive(Debug)]
pub struct AddressBookResolver {
    path: PathBuf,
    cache: OnceCell<HashMap<String, String>>,
}

impl AddressBookResolver {
    /// `path` is either one `.abcddb` file or the AddressBook `Sources`
    /// directory containing per-account subdirectories.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    fn database_files(&self) -> Vec<PathBuf> {
        if self.path.is_file() {
            return vec![self.path.clone()];
        }

        let mut files = Vec::new();
        let direct = self.path.join(ADDRESS_BOOK_DB);
        if direct.is_file() {
            files.push(direct);
        }
        if let Ok(entries) = std::fs::read_dir(&self.path) {
            for entry in entries.flatten() {
                let candidate = entry.path().join(ADDRESS_BOOK_DB);
                if candidate.is_file() {
                    files.push(candidate);
                }
            }
        }
        files
    }

    async fn contacts(&self) -> &HashMap<String, String> {
        self.cache
            .get_or_init(|| async {
                let mut map = HashMap::new();
                for file in self.database_files() {
                    match load_contacts(&file).await {
                        Ok(entries) => {
                            tracing::debug!(
                                path = %file.display(),
                                count = entries.len(),
                                "loaded address book"
                            );
                            map.extend(entries);
                        }
                        Err(e) => {
                            tracing::warn!(path = %file.display(), error = %e, "skipping address book");
                        }
                    }
                }
                map
            })
            .await
    }
}

async fn load_contacts(path: &Path) -> Result<Vec<(String, String)>, sqlx::Error> {
    const SQL: &str = "\
SELECT r.ZFIRSTNAME, r.ZLASTNAME, r.ZORGANIZATION, CAST(p.ZFULLNUMBER AS TEXT)
FROM ZABCDPHONENUMBER p
JOIN ZABCDRECORD r ON p.ZOWNER = r.Z_PK;
";

    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .connect()
        .await?;

    let rows: Vec<(Option<String>, Option<String>, Option<String>, Option<String>)> =
        sqlx::query_as(SQL).fetch_all(&mut conn).await?;

    let mut entries = Vec::new();
    for (first, last, organization, number) in rows {
        let Some(number) = number else { continue };
        let key = match_key(&number);
        if key.is_empty() {
            continue;
        }

        let name = [first.as_deref(), last.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let name = if name.is_empty() {
            organization.unwrap_or_default()
        } else {
            name
        };
        if !name.is_empty() {
            entries.push((key, name));
        }
    }
    Ok(entries)
}

#[async_trait]
impl NameResolver for AddressBookResolver {
    async fn resolve(&self, phone_number: &str) -> Option<String> {
        let key = match_key(phone_number);
        if key.is_empty() {
            return None;
        }
        self.contacts().await.get(&key).cloned()
    }

    async fn resolve_bulk(&self, phone_numbers: &[String]) -> HashMap<String, String> {
        let contacts = self.contacts().await;
        phone_numbers
            .iter()
            .filter_map(|number| {
                contacts
                    .get(&match_key(number))
                    .map(|name| (number.clone(), name.clone()))
            })
            .collect()
    }

    async fn is_authorized(&self) -> bool {
        for file in self.database_files() {
            if load_contacts(&file).await.is_ok() {
                return true;
            }
        }
        false
    }
}

/// Resolver used when no contact directory is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

#[async_trait]
impl NameResolver for NullResolver {
    async fn resolve(&self, _phone_number: &str) -> Option<String> {
        None
    }

    async fn resolve_bulk(&self, _phone_numbers: &[String]) -> HashMap<String, String> {
        HashMap::new()
    }

    async fn is_authorized(&self) -> bool {
        false
    }
}

/// Digits-only form of a phone number.
pub fn normalize_phone(number: &str) -> String {
    number.chars().filter(char::is_ascii_digit).collect()
}

/// Trailing digits used as the lookup key.
fn match_key(number: &str) -> String {
    let digits = normalize_phone(number);
    let start = digits.len().saturating_sub(SUFFIX_DIGITS);
    digits[start..].to_string()
}
