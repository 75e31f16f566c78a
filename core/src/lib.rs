// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

mod call_history;
mod config;
mod contacts;
mod gateway;
mod ledger;
mod sync;
mod types;

pub use crate::call_history::{
    CallHistory, CallHistoryError, CallSource, DEFAULT_MIN_AGE_SECONDS,
};
pub use crate::config::CoreConfig;
pub use crate::contacts::{normalize_phone, AddressBookResolver, NameResolver, NullResolver};
pub use crate::gateway::{CalendarGateway, EventOutcome, ProgressFn};
pub use crate::ledger::{SyncLedger, SyncedCallRecord};
pub use crate::sync::{
    SyncOptions, SyncResult, SyncService, SyncStatus, FIRST_SYNC_WINDOW_DAYS,
    SETTING_CALENDAR_ID, SETTING_CALENDAR_NAME, SETTING_INITIAL_SYNC_DONE,
    SETTING_SYNC_ALL_HISTORY,
};
pub use crate::types::CallRecord;
