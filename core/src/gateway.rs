// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use callsync_gcal::{CallEvent, GcalClient, GcalError};
use jiff::Timestamp;

use crate::types::CallRecord;

pub use callsync_gcal::{EventOutcome, ProgressFn};

/// The remote calendar as the orchestrator sees it.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Never errors; `false` without a usable credential.
    fn is_authenticated(&self) -> bool;

    /// Resolves (finding or creating) the tracking calendar.
    async fn calendar_id(&self) -> Result<String, GcalError>;

    /// Creates one event, returning its remote id.
    async fn create_event(&self, call: &CallRecord) -> Result<String, GcalError>;

    /// Creates many events; outcomes in input order, per-call failures
    /// reported rather than aborting.
    async fn create_events_batch(
        &self,
        calls: &[CallRecord],
        on_progress: Option<&ProgressFn>,
    ) -> Result<Vec<EventOutcome>, GcalError>;

    /// Call ids already present on the calendar within the window, mapped
    /// to their event ids.
    async fn list_synced_event_tags(
        &self,
        time_min: Option<&Timestamp>,
        time_max: Option<&Timestamp>,
    ) -> Result<HashMap<String, String>, GcalError>;
}

fn to_event(call: &CallRecord) -> CallEvent {
    CallEvent {
        unique_id: call.unique_id.clone(),
        phone_number: call.phone_number.clone(),
        display_name: call.display_name().to_string(),
        timestamp: call.timestamp,
        duration_seconds: call.duration_seconds,
        is_outgoing: call.is_outgoing,
    }
}

#[async_trait]
impl CalendarGateway for GcalClient {
    fn is_authenticated(&self) -> bool {
        GcalClient::is_authenticated(self)
    }

    async fn calendar_id(&self) -> Result<String, GcalError> {
        GcalClient::calendar_id(self).await
    }

    async fn create_event(&self, call: &CallRecord) -> Result<String, GcalError> {
        GcalClient::create_event(self, &to_event(call)).await
    }

    async fn create_events_batch(
        &self,
        calls: &[CallRecord],
        on_progress: Option<&ProgressFn>,
    ) -> Result<Vec<EventOutcome>, GcalError> {
        let events: Vec<CallEvent> = calls.iter().map(to_event).collect();
        GcalClient::create_events_batch(self, &events, on_progress).await
    }

    async fn list_synced_event_tags(
        &self,
        time_min: Option<&Timestamp>,
        time_max: Option<&Timestamp>,
    ) -> Result<HashMap<String, String>, GcalError> {
        GcalClient::list_synced_event_tags(self, time_min, time_max).await
    }
}
