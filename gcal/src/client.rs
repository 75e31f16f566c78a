// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use jiff::Timestamp;
use reqwest::Method;
use tokio::sync::Mutex;

use crate::auth::Authenticator;
use crate::batch::{build_batch_body, parse_batch_response, response_boundary, BatchPart};
use crate::config::GcalConfig;
use crate::error::GcalError;
use crate::event::CallEvent;
use crate::http::HttpClient;

pub use crate::batch::BATCH_LIMIT;

/// Marker placed in the description of calendars this tool created.
/// A same-named calendar without it is treated as foreign and never touched.
pub const CALENDAR_MARKER: &str = "callsync:managed";

/// Page size for event listings.
const PAGE_SIZE: usize = 2500;

/// Upper bound on delete passes in [`GcalClient::clear_calendar`].
const MAX_CLEAR_PASSES: usize = 10;

/// Progress callback, called with (completed, total).
pub type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Per-event result of a batch insert.
#[derive(Debug, Clone)]
pub struct EventOutcome {
    /// The call's stable identifier.
    pub unique_id: String,
    /// Remote id of the created event, present on success.
    pub event_id: Option<String>,
    /// `None` on success.
    pub error: Option<String>,
}

impl EventOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Google Calendar v3 client scoped to the configured call-tracking calendar.
#[derive(Debug)]
pub struct GcalClient {
    http: HttpClient,
    auth: Authenticator,
    config: GcalConfig,
    // Resolved once per process; calendar ids are stable.
    calendar_id: Mutex<Option<String>>,
}

impl GcalClient {
    pub fn new(config: GcalConfig, auth: Authenticator) -> Result<Self, GcalError> {
        let http = HttpClient::new(&config)?;
        Ok(Self {
            http,
            auth,
            config,
            calendar_id: Mutex::new(None),
        })
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    pub fn calendar_name(&self) -> &str {
        &self.config.calendar_name
    }

    /// Returns the id of the tracking calendar, finding or creating it on
    /// first use.
    ///
    /// Fails with [`GcalError::ForeignCalendar`] when a calendar with the
    /// configured name exists but was not created by this tool.
    pub async fn calendar_id(&self) -> Result<String, GcalError> {
        let mut cached = self.calendar_id.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let id = match self.find_calendar().await? {
            Some(id) => id,
            None => self.create_calendar().await?,
        };
        *cached = Some(id.clone());
        Ok(id)
    }

    async fn find_calendar(&self) -> Result<Option<String>, GcalError> {
        let token = self.auth.access_token().await?;
        let mut page_token: Option<String> = None;

        loop {
            let mut path = "/calendar/v3/users/me/calendarList?maxResults=250".to_string();
            if let Some(ref t) = page_token {
                path.push_str(&format!("&pageToken={t}"));
            }

            let request = self.http.request(Method::GET, &path, &token);
            let body: serde_json::Value = self.http.execute(request).await?.json().await?;

            for item in body["items"].as_array().unwrap_or(&Vec::new()) {
                if item["summary"].as_str() != Some(self.config.calendar_name.as_str()) {
                    continue;
                }
                let description = item["description"].as_str().unwrap_or_default();
                if !description.contains(CALENDAR_MARKER) {
                    return Err(GcalError::ForeignCalendar(self.config.calendar_name.clone()));
                }
                let id = item["id"]
                    .as_str()
                    .ok_or_else(|| GcalError::InvalidResponse("calendar without id".to_string()))?;
                tracing::debug!(calendar_id = id, "found tracking calendar");
                return Ok(Some(id.to_string()));
            }

            match body["nextPageToken"].as_str() {
                Some(t) => page_token = Some(t.to_string()),
                None => return Ok(None),
            }
        }
    }

    async fn create_calendar(&self) -> Result<String, GcalError> {
        let token = self.auth.access_token().await?;
        let payload = serde_json::json!({
            "summary": self.config.calendar_name,
            "description": format!("Call history synced by callsync. {CALENDAR_MARKER}"),
            "timeZone": "UTC",
        });

        let request = self
            .http
            .request(Method::POST, "/calendar/v3/calendars", &token)
            .json(&payload);
        let body: serde_json::Value = self.http.execute(request).await?.json().await?;

        let id = body["id"]
            .as_str()
            .ok_or_else(|| GcalError::InvalidResponse("created calendar without id".to_string()))?;
        tracing::info!(calendar_id = id, name = %self.config.calendar_name, "created tracking calendar");
        Ok(id.to_string())
    }

    /// Inserts a single event, returning its Google event id.
    pub async fn create_event(&self, event: &CallEvent) -> Result<String, GcalError> {
        let calendar_id = self.calendar_id().await?;
        let token = self.auth.access_token().await?;

        let path = format!("/calendar/v3/calendars/{calendar_id}/events");
        let request = self
            .http
            .request(Method::POST, &path, &token)
            .json(&event.to_json());
        let body: serde_json::Value = self.http.execute(request).await?.json().await?;

        body["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| GcalError::InvalidResponse("created event without id".to_string()))
    }

    /// Inserts many events via the batch endpoint, 50 per request.
    ///
    /// A failed batch request marks every event in that chunk as failed and
    /// the remaining chunks are still attempted. Outcomes come back in input
    /// order.
    pub async fn create_events_batch(
        &self,
        events: &[CallEvent],
        progress: Option<&ProgressFn>,
    ) -> Result<Vec<EventOutcome>, GcalError> {
        let calendar_id = self.calendar_id().await?;
        let path = format!("/calendar/v3/calendars/{calendar_id}/events");
        let total = events.len();
        let mut outcomes = Vec::with_capacity(total);

        for chunk in events.chunks(BATCH_LIMIT) {
            let parts: Vec<BatchPart> = chunk
                .iter()
                .map(|e| BatchPart::post(path.clone(), e.to_json().to_string()))
                .collect();

            match self.send_batch(&parts).await {
                Ok(responses) => {
                    for (event, response) in chunk.iter().zip(responses) {
                        let event_id = response.is_success().then(|| {
                            serde_json::from_str::<serde_json::Value>(&response.body)
                                .ok()
                                .and_then(|v| v["id"].as_str().map(String::from))
                        });
                        outcomes.push(EventOutcome {
                            unique_id: event.unique_id.clone(),
                            event_id: event_id.flatten(),
                            error: (!response.is_success()).then(|| response.error_message()),
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, size = chunk.len(), "batch request failed");
                    for event in chunk {
                        outcomes.push(EventOutcome {
                            unique_id: event.unique_id.clone(),
                            event_id: None,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }

            if let Some(cb) = progress {
                cb(outcomes.len(), total);
            }
        }

        Ok(outcomes)
    }

    async fn send_batch(
        &self,
        parts: &[BatchPart],
    ) -> Result<Vec<crate::batch::BatchPartResponse>, GcalError> {
        let token = self.auth.access_token().await?;
        let (body, boundary) = build_batch_body(parts);

        let request = self
            .http
            .request(Method::POST, "/batch/calendar/v3", &token)
            .header(
                "Content-Type",
                format!("multipart/mixed; boundary={boundary}"),
            )
            .body(body);

        let response = self.http.execute(request).await?;
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let response_body = response.text().await?;

        let boundary = response_boundary(&content_type)?;
        parse_batch_response(&response_body, &boundary, parts.len())
    }

    /// Deletes one event. Returns `false` when the event was already gone.
    pub async fn delete_event(&self, event_id: &str) -> Result<bool, GcalError> {
        let calendar_id = self.calendar_id().await?;
        let token = self.auth.access_token().await?;

        let path = format!("/calendar/v3/calendars/{calendar_id}/events/{event_id}");
        let request = self.http.request(Method::DELETE, &path, &token);
        match self.http.execute(request).await {
            Ok(_) => Ok(true),
            Err(GcalError::Api { status: 404 | 410, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Deletes every event on the tracking calendar, returning how many were
    /// removed. Re-lists after each pass until a one-item probe comes back
    /// empty, since listings lag behind deletes.
    pub async fn clear_calendar(&self, progress: Option<&ProgressFn>) -> Result<usize, GcalError> {
        let calendar_id = self.calendar_id().await?;
        let path = format!("/calendar/v3/calendars/{calendar_id}/events");
        let mut deleted = 0usize;

        for pass in 0..MAX_CLEAR_PASSES {
            let ids = self.list_event_ids(&calendar_id).await?;
            if ids.is_empty() {
                break;
            }
            if pass > 0 {
                tracing::debug!(pass, remaining = ids.len(), "clearing leftover events");
            }

            let total = ids.len();
            let mut done = 0usize;
            for chunk in ids.chunks(BATCH_LIMIT) {
                let parts: Vec<BatchPart> = chunk
                    .iter()
                    .map(|id| BatchPart::delete(format!("{path}/{id}")))
                    .collect();
                for response in self.send_batch(&parts).await? {
                    // 404/410 means some other client got there first.
                    if response.is_success() || matches!(response.status, 404 | 410) {
                        deleted += 1;
                    }
                }
                done += chunk.len();
                if let Some(cb) = progress {
                    cb(done, total);
                }
            }

            if !self.has_any_event(&calendar_id).await? {
                break;
            }
        }

        tracing::info!(deleted, "cleared tracking calendar");
        Ok(deleted)
    }

    async fn has_any_event(&self, calendar_id: &str) -> Result<bool, GcalError> {
        let token = self.auth.access_token().await?;
        let path = format!("/calendar/v3/calendars/{calendar_id}/events?maxResults=1");
        let request = self.http.request(Method::GET, &path, &token);
        let body: serde_json::Value = self.http.execute(request).await?.json().await?;
        Ok(body["items"].as_array().is_some_and(|items| !items.is_empty()))
    }

    async fn list_event_ids(&self, calendar_id: &str) -> Result<Vec<String>, GcalError> {
        let mut ids = Vec::new();
        self.for_each_event_page(calendar_id, &[], |items| {
            ids.extend(
                items
                    .iter()
                    .filter_map(|item| item["id"].as_str().map(String::from)),
            );
        })
        .await?;
        Ok(ids)
    }

    /// Maps the call identifiers embedded in events within the window to
    /// their event ids. Used to recognize calls another device already
    /// synced.
    pub async fn list_synced_event_tags(
        &self,
        time_min: Option<&Timestamp>,
        time_max: Option<&Timestamp>,
    ) -> Result<HashMap<String, String>, GcalError> {
        let calendar_id = self.calendar_id().await?;

        let mut params = Vec::new();
        if let Some(t) = time_min {
            params.push(format!("timeMin={t}"));
        }
        if let Some(t) = time_max {
            params.push(format!("timeMax={t}"));
        }

        let mut tags = HashMap::new();
        self.for_each_event_page(&calendar_id, &params, |items| {
            for item in items {
                let Some(call_id) = item
                    .pointer("/extendedProperties/private/callUniqueId")
                    .and_then(|v| v.as_str())
                else {
                    continue;
                };
                if let Some(event_id) = item["id"].as_str() {
                    tags.insert(call_id.to_string(), event_id.to_string());
                }
            }
        })
        .await?;
        Ok(tags)
    }

    async fn for_each_event_page<F>(
        &self,
        calendar_id: &str,
        params: &[String],
        mut f: F,
    ) -> Result<(), GcalError>
    where
        F: FnMut(&[serde_json::Value]),
    {
        let token = self.auth.access_token().await?;
        let mut page_token: Option<String> = None;

        loop {
            let mut path =
                format!("/calendar/v3/calendars/{calendar_id}/events?maxResults={PAGE_SIZE}");
            for param in params {
                path.push('&');
                path.push_str(param);
            }
            if let Some(ref t) = page_token {
                path.push_str(&format!("&pageToken={t}"));
            }

            let request = self.http.request(Method::GET, &path, &token);
            let body: serde_json::Value = self.http.execute(request).await?.json().await?;

            if let Some(items) = body["items"].as_array() {
                f(items);
            }

            match body["nextPageToken"].as_str() {
                Some(t) => page_token = Some(t.to_string()),
                None => return Ok(()),
            }
        }
    }
}
