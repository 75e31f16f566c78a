// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Google Calendar gateway for synced call events.
//!
//! Wraps the Calendar v3 REST API: calendar discovery/creation guarded by an
//! ownership marker, single and batched event creation carrying an
//! idempotency tag per call, pagination-aware listing and deletion, and an
//! OAuth2 credential store backed by the OS keyring.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    unsafe_code,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro
)]

mod auth;
mod batch;
mod client;
mod config;
mod error;
mod event;
mod http;

pub use crate::auth::{Authenticator, OAuthConfig, StoredTokens, TokenStore};
pub use crate::batch::{BatchPart, BatchPartResponse};
pub use crate::client::{EventOutcome, GcalClient, ProgressFn, BATCH_LIMIT, CALENDAR_MARKER};
pub use crate::config::GcalConfig;
pub use crate::error::GcalError;
pub use crate::event::{CallEvent, INCOMING_ARROW, OUTGOING_ARROW};
