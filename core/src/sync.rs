// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! The sync pipeline: read calls, drop what is already on the calendar,
//! push the rest, and record what was pushed.

use std::collections::HashSet;
use std::fmt;

use jiff::{SignedDuration, Timestamp};

use crate::call_history::{CallHistoryError, CallSource, DEFAULT_MIN_AGE_SECONDS};
use crate::contacts::NameResolver;
use crate::gateway::{CalendarGateway, ProgressFn};
use crate::ledger::SyncLedger;
use crate::types::CallRecord;

pub const SETTING_INITIAL_SYNC_DONE: &str = "initial_sync_done";
pub const SETTING_SYNC_ALL_HISTORY: &str = "sync_all_history";
pub const SETTING_CALENDAR_ID: &str = "calendar_id";
pub const SETTING_CALENDAR_NAME: &str = "calendar_name";

/// Lookback window for the very first sync.
pub const FIRST_SYNC_WINDOW_DAYS: i64 = 30;

/// Knobs for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Report what would be synced without touching the calendar.
    pub dry_run: bool,
    /// Only answered calls (including short outgoing ones).
    pub answered_only: bool,
    /// Ignore the first-sync window for this run.
    pub sync_all_history: bool,
    /// Use the batch endpoint when more than one call is pending.
    pub use_batch: bool,
    /// Explicit lower bound; overrides the window policy.
    pub since: Option<Timestamp>,
    /// Skip calls younger than this.
    pub min_age_seconds: i64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            answered_only: true,
            sync_all_history: false,
            use_batch: true,
            since: None,
            min_age_seconds: DEFAULT_MIN_AGE_SECONDS,
        }
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub success: bool,
    pub calls_synced: usize,
    pub calls_skipped: usize,
    pub errors: Vec<String>,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
}

impl SyncResult {
    fn new(started_at: Timestamp) -> Self {
        Self {
            success: true,
            calls_synced: 0,
            calls_skipped: 0,
            errors: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }

    fn failed(started_at: Timestamp, errors: Vec<String>) -> Self {
        Self {
            success: false,
            calls_synced: 0,
            calls_skipped: 0,
            errors,
            started_at,
            finished_at: Timestamp::now(),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        self.finished_at
            .duration_since(self.started_at)
            .as_secs_f64()
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sync {}: {} synced, {} skipped, {} errors in {:.1}s",
            if self.success { "succeeded" } else { "failed" },
            self.calls_synced,
            self.calls_skipped,
            self.errors.len(),
            self.duration_seconds(),
        )
    }
}

/// Snapshot of the tool's health for the `status` command.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub call_db_accessible: bool,
    pub authenticated: bool,
    pub synced_calls: i64,
    pub total_calls: i64,
}

/// Logs a failed best-effort step and carries on.
fn best_effort<T, E: fmt::Display>(op: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(op, error = %e, "best-effort step failed");
            None
        }
    }
}

/// Orchestrates one sync run over its four collaborators.
pub struct SyncService {
    source: Box<dyn CallSource>,
    ledger: SyncLedger,
    gateway: Box<dyn CalendarGateway>,
    resolver: Box<dyn NameResolver>,
}

impl SyncService {
    pub fn new(
        source: Box<dyn CallSource>,
        ledger: SyncLedger,
        gateway: Box<dyn CalendarGateway>,
        resolver: Box<dyn NameResolver>,
    ) -> Self {
        Self {
            source,
            ledger,
            gateway,
            resolver,
        }
    }

    pub fn ledger(&self) -> &SyncLedger {
        &self.ledger
    }

    /// Runs the pipeline once. Per-call failures are accumulated in the
    /// result; only missing prerequisites or an unavailable ledger abort.
    pub async fn sync(&self, options: &SyncOptions, on_progress: Option<&ProgressFn>) -> SyncResult {
        let started_at = Timestamp::now();
        tracing::info!(dry_run = options.dry_run, "starting sync");

        if let Err(e) = self.ledger.initialize().await {
            return SyncResult::failed(started_at, vec![format!("Sync database unavailable: {e}")]);
        }

        let problems = self.check_prerequisites().await;
        if !problems.is_empty() {
            return SyncResult::failed(started_at, problems);
        }

        self.handle_calendar_drift().await;

        let since = match options.since {
            Some(since) => Some(since),
            None => self.window_start(options).await,
        };

        let synced_ids = match self.ledger.synced_call_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                return SyncResult::failed(
                    started_at,
                    vec![format!("Sync database unavailable: {e}")],
                );
            }
        };

        let candidates = match self
            .source
            .read_calls(since, options.answered_only, options.min_age_seconds)
            .await
        {
            Ok(calls) => calls,
            Err(e @ CallHistoryError::PermissionDenied) => {
                return SyncResult::failed(started_at, vec![e.to_string()]);
            }
            Err(e) => {
                return SyncResult::failed(
                    started_at,
                    vec![format!("Failed to read call history: {e}")],
                );
            }
        };

        let mut result = SyncResult::new(started_at);
        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        for call in candidates {
            if synced_ids.contains(&call.unique_id) || !seen.insert(call.unique_id.clone()) {
                result.calls_skipped += 1;
            } else {
                pending.push(call);
            }
        }

        if !options.dry_run {
            pending = self.adopt_remote_events(pending, &mut result).await;
        }

        if pending.is_empty() {
            tracing::info!(skipped = result.calls_skipped, "nothing to sync");
            self.finish_initial_sync().await;
            result.finished_at = Timestamp::now();
            return result;
        }

        if options.dry_run {
            tracing::info!(count = pending.len(), "dry run, not creating events");
            result.calls_synced = pending.len();
            result.finished_at = Timestamp::now();
            return result;
        }

        self.resolve_names(&mut pending).await;

        if options.use_batch && pending.len() > 1 {
            self.sync_batched(&pending, &mut result, on_progress).await;
        } else {
            self.sync_sequential(&pending, &mut result, on_progress)
                .await;
        }

        self.finish_initial_sync().await;
        result.success = result.errors.is_empty();
        result.finished_at = Timestamp::now();
        tracing::info!(
            synced = result.calls_synced,
            skipped = result.calls_skipped,
            errors = result.errors.len(),
            "sync finished"
        );
        result
    }

    /// All the reasons a sync cannot run right now, user-facing.
    pub async fn check_prerequisites(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !self.source.source_exists() {
            problems.push("Call history database not found.".to_string());
        } else if !self.source.is_readable().await {
            problems.push(CallHistoryError::PermissionDenied.to_string());
        }

        if !self.gateway.is_authenticated() {
            problems.push("Not authenticated with Google Calendar.".to_string());
        }

        problems
    }

    pub async fn sync_status(&self) -> SyncStatus {
        let synced_calls = best_effort("init ledger", self.ledger.initialize().await)
            .map(|_| ())
            .and(best_effort("count synced", self.ledger.count_synced().await))
            .unwrap_or(0);
        let call_db_accessible = self.source.source_exists() && self.source.is_readable().await;
        let total_calls = if call_db_accessible {
            best_effort("count calls", self.source.count_calls().await).unwrap_or(0)
        } else {
            0
        };

        SyncStatus {
            call_db_accessible,
            authenticated: self.gateway.is_authenticated(),
            synced_calls,
            total_calls,
        }
    }

    pub async fn set_sync_all_history(&self, enabled: bool) -> Result<(), sqlx::Error> {
        self.ledger.initialize().await?;
        self.ledger
            .set_setting(SETTING_SYNC_ALL_HISTORY, if enabled { "true" } else { "false" })
            .await
    }

    /// A changed calendar id means the old events are gone; forget them so
    /// they get re-created on the new calendar.
    async fn handle_calendar_drift(&self) {
        let Some(current) = best_effort("resolve calendar", self.gateway.calendar_id().await)
        else {
            return;
        };

        let stored = best_effort(
            "read calendar setting",
            self.ledger.get_setting(SETTING_CALENDAR_ID).await,
        )
        .flatten();

        if stored.as_deref() == Some(current.as_str()) {
            return;
        }
        if let Some(old) = stored {
            tracing::warn!(old, new = current, "calendar changed, resetting synced state");
            best_effort("reset synced state", self.ledger.clear_all_synced().await);
        }
        best_effort(
            "store calendar id",
            self.ledger.set_setting(SETTING_CALENDAR_ID, &current).await,
        );
    }

    async fn window_start(&self, options: &SyncOptions) -> Option<Timestamp> {
        let sync_all = options.sync_all_history || self.setting_is_true(SETTING_SYNC_ALL_HISTORY).await;
        let initial_done = self.setting_is_true(SETTING_INITIAL_SYNC_DONE).await;
        if sync_all || initial_done {
            None
        } else {
            let window = SignedDuration::from_hours(24 * FIRST_SYNC_WINDOW_DAYS);
            Some(Timestamp::now().saturating_sub(window).unwrap_or(Timestamp::MIN))
        }
    }

    async fn setting_is_true(&self, key: &str) -> bool {
        best_effort("read setting", self.ledger.get_setting(key).await)
            .flatten()
            .as_deref()
            == Some("true")
    }

    /// Calls another device already pushed are adopted into the ledger
    /// instead of being re-created. Best-effort; on failure everything
    /// stays pending.
    async fn adopt_remote_events(
        &self,
        pending: Vec<CallRecord>,
        result: &mut SyncResult,
    ) -> Vec<CallRecord> {
        if pending.is_empty() {
            return pending;
        }

        let time_min = pending.iter().map(|c| c.timestamp).min();
        let time_max = pending
            .iter()
            .map(|c| c.timestamp)
            .max()
            .map(|t| {
                t.saturating_add(SignedDuration::from_hours(24))
                    .unwrap_or(Timestamp::MAX)
            });

        let Some(tags) = best_effort(
            "list remote events",
            self.gateway
                .list_synced_event_tags(time_min.as_ref(), time_max.as_ref())
                .await,
        ) else {
            return pending;
        };

        let mut remaining = Vec::with_capacity(pending.len());
        for call in pending {
            match tags.get(&call.unique_id) {
                Some(event_id) => {
                    tracing::debug!(call = call.unique_id, "adopting event synced elsewhere");
                    best_effort(
                        "adopt remote event",
                        self.ledger.mark_synced(&call.unique_id, event_id).await,
                    );
                    result.calls_skipped += 1;
                }
                None => remaining.push(call),
            }
        }
        remaining
    }

    async fn resolve_names(&self, pending: &mut [CallRecord]) {
        let numbers: Vec<String> = pending
            .iter()
            .map(|c| c.phone_number.clone())
            .filter(|n| !n.is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if numbers.is_empty() {
            return;
        }

        let resolved = self.resolver.resolve_bulk(&numbers).await;
        for call in pending.iter_mut() {
            if let Some(name) = resolved.get(&call.phone_number) {
                call.contact_name = Some(name.clone());
            }
        }
    }

    async fn sync_batched(
        &self,
        pending: &[CallRecord],
        result: &mut SyncResult,
        on_progress: Option<&ProgressFn>,
    ) {
        match self.gateway.create_events_batch(pending, on_progress).await {
            Ok(outcomes) => {
                for (call, outcome) in pending.iter().zip(outcomes) {
                    match outcome.error {
                        None => {
                            let event_id = outcome.event_id.unwrap_or_default();
                            if !self.record_synced(&call.unique_id, &event_id, result).await {
                                return;
                            }
                            result.calls_synced += 1;
                        }
                        Some(reason) => {
                            result
                                .errors
                                .push(format!("Failed to sync call {}: {reason}", call.unique_id));
                        }
                    }
                }
            }
            Err(e) => {
                result
                    .errors
                    .push(format!("Failed to sync calls: {e}"));
            }
        }
    }

    async fn sync_sequential(
        &self,
        pending: &[CallRecord],
        result: &mut SyncResult,
        on_progress: Option<&ProgressFn>,
    ) {
        let total = pending.len();
        for (done, call) in pending.iter().enumerate() {
            match self.gateway.create_event(call).await {
                Ok(event_id) => {
                    if !self.record_synced(&call.unique_id, &event_id, result).await {
                        return;
                    }
                    result.calls_synced += 1;
                }
                Err(e) => {
                    result
                        .errors
                        .push(format!("Failed to sync call {}: {e}", call.unique_id));
                }
            }
            if let Some(cb) = on_progress {
                cb(done + 1, total);
            }
        }
    }

    /// Stores proof-of-sync for a created event. A write failure here
    /// means the next run cannot tell the call was synced, so it is
    /// reported as an error and the remaining creates are abandoned.
    /// The events already on the calendar carry the idempotency tag and
    /// get adopted back into the ledger on the next run.
    async fn record_synced(&self, call_id: &str, event_id: &str, result: &mut SyncResult) -> bool {
        match self.ledger.mark_synced(call_id, event_id).await {
            Ok(()) => true,
            Err(e) => {
                result
                    .errors
                    .push(format!("Failed to record synced call {call_id}: {e}"));
                false
            }
        }
    }

    async fn finish_initial_sync(&self) {
        best_effort(
            "mark initial sync done",
            self.ledger.set_setting(SETTING_INITIAL_SYNC_DONE, "true").await,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::NullResolver;
    use crate::gateway::EventOutcome;
    use async_trait::async_trait;
    use callsync_gcal::GcalError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn call(id: &str, unix: i64) -> CallRecord {
        CallRecord {
            unique_id: id.to_string(),
            phone_number: "+15551234567".to_string(),
            contact_name: None,
            timestamp: Timestamp::from_second(unix).unwrap(),
            duration_seconds: 60,
            is_answered: true,
            is_outgoing: false,
        }
    }

    #[derive(Default)]
    struct FakeSource {
        calls: Vec<CallRecord>,
        missing: bool,
        unreadable: bool,
        last_since: Arc<Mutex<Option<Option<Timestamp>>>>,
    }

    #[async_trait]
    impl CallSource for FakeSource {
        fn source_exists(&self) -> bool {
            !self.missing
        }
        async fn is_readable(&self) -> bool {
            !self.missing && !self.unreadable
        }
        async fn read_calls(
            &self,
            since: Option<Timestamp>,
            _answered_only: bool,
            _min_age_seconds: i64,
        ) -> Result<Vec<CallRecord>, CallHistoryError> {
            *self.last_since.lock().unwrap() = Some(since);
            Ok(self
                .calls
                .iter()
                .filter(|c| since.is_none_or(|s| c.timestamp > s))
                .cloned()
                .collect())
        }
        async fn count_calls(&self) -> Result<i64, CallHistoryError> {
            Ok(self.calls.len() as i64)
        }
    }

    #[derive(Default)]
    struct FakeGateway {
        unauthenticated: bool,
        calendar: String,
        remote_tags: HashMap<String, String>,
        fail_ids: Vec<String>,
        created: Mutex<Vec<String>>,
    }

    impl FakeGateway {
        fn with_calendar(id: &str) -> Self {
            Self {
                calendar: id.to_string(),
                ..Self::default()
            }
        }
        fn created(&self) -> Vec<String> {
            self.created.lock().unwrap().clone()
        }
        fn outcome(&self, call: &CallRecord) -> Result<String, String> {
            if self.fail_ids.contains(&call.unique_id) {
                Err("quota exceeded".to_string())
            } else {
                self.created.lock().unwrap().push(call.unique_id.clone());
                Ok(format!("evt-{}", call.unique_id))
            }
        }
    }

    #[async_trait]
    impl CalendarGateway for FakeGateway {
        fn is_authenticated(&self) -> bool {
            !self.unauthenticated
        }
        async fn calendar_id(&self) -> Result<String, GcalError> {
            Ok(self.calendar.clone())
        }
        async fn create_event(&self, call: &CallRecord) -> Result<String, GcalError> {
            self.outcome(call).map_err(GcalError::Batch)
        }
        async fn create_events_batch(
            &self,
            calls: &[CallRecord],
            _on_progress: Option<&ProgressFn>,
        ) -> Result<Vec<EventOutcome>, GcalError> {
            Ok(calls
                .iter()
                .map(|call| match self.outcome(call) {
                    Ok(event_id) => EventOutcome {
                        unique_id: call.unique_id.clone(),
                        event_id: Some(event_id),
                        error: None,
                    },
                    Err(reason) => EventOutcome {
                        unique_id: call.unique_id.clone(),
                        event_id: None,
                        error: Some(reason),
                    },
                })
                .collect())
        }
        async fn list_synced_event_tags(
            &self,
            _time_min: Option<&Timestamp>,
            _time_max: Option<&Timestamp>,
        ) -> Result<HashMap<String, String>, GcalError> {
            Ok(self.remote_tags.clone())
        }
    }

    struct FixedResolver(HashMap<String, String>);

    #[async_trait]
    impl NameResolver for FixedResolver {
        async fn resolve(&self, phone_number: &str) -> Option<String> {
            self.0.get(phone_number).cloned()
        }
        async fn resolve_bulk(&self, phone_numbers: &[String]) -> HashMap<String, String> {
            phone_numbers
                .iter()
                .filter_map(|n| self.0.get(n).map(|v| (n.clone(), v.clone())))
                .collect()
        }
        async fn is_authorized(&self) -> bool {
            true
        }
    }

    async fn service(source: FakeSource, gateway: FakeGateway) -> SyncService {
        let ledger = SyncLedger::open(None).await.unwrap();
        SyncService::new(
            Box::new(source),
            ledger,
            Box::new(gateway),
            Box::new(NullResolver),
        )
    }

    fn options() -> SyncOptions {
        SyncOptions {
            min_age_seconds: 0,
            ..SyncOptions::default()
        }
    }

    fn recent(offset: i64) -> i64 {
        Timestamp::now().as_second() - 3600 + offset
    }

    #[tokio::test]
    async fn syncs_new_calls_and_is_idempotent() {
        let source = FakeSource {
            calls: vec![call("a", recent(0)), call("b", recent(10))],
            ..FakeSource::default()
        };
        let service = service(source, FakeGateway::with_calendar("cal-1")).await;

        let first = service.sync(&options(), None).await;
        assert!(first.success);
        assert_eq!(first.calls_synced, 2);
        assert_eq!(first.calls_skipped, 0);
        assert!(service.ledger.is_synced("a").await.unwrap());

        let second = service.sync(&options(), None).await;
        assert!(second.success);
        assert_eq!(second.calls_synced, 0);
        assert_eq!(second.calls_skipped, 2);
    }

    #[tokio::test]
    async fn prerequisites_accumulate_and_abort() {
        let source = FakeSource {
            missing: true,
            ..FakeSource::default()
        };
        let gateway = FakeGateway {
            unauthenticated: true,
            ..FakeGateway::default()
        };
        let service = service(source, gateway).await;

        let result = service.sync(&options(), None).await;
        assert!(!result.success);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("not found"));
        assert_eq!(result.errors[1], "Not authenticated with Google Calendar.");
    }

    #[tokio::test]
    async fn unreadable_source_names_full_disk_access() {
        let source = FakeSource {
            unreadable: true,
            ..FakeSource::default()
        };
        let service = service(source, FakeGateway::with_calendar("cal-1")).await;

        let problems = service.check_prerequisites().await;
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("Full Disk Access"));
    }

    #[tokio::test]
    async fn duplicate_source_rows_first_occurrence_wins() {
        let mut dup = call("a", recent(30));
        dup.duration_seconds = 999;
        let source = FakeSource {
            calls: vec![call("a", recent(0)), dup],
            ..FakeSource::default()
        };
        let gateway = FakeGateway::with_calendar("cal-1");
        let service = service(source, gateway).await;

        let result = service.sync(&options(), None).await;
        assert!(result.success);
        assert_eq!(result.calls_synced, 1);
        assert_eq!(result.calls_skipped, 1);
    }

    #[tokio::test]
    async fn per_call_failures_do_not_abort_the_rest() {
        let source = FakeSource {
            calls: vec![call("good", recent(0)), call("bad", recent(10))],
            ..FakeSource::default()
        };
        let gateway = FakeGateway {
            calendar: "cal-1".to_string(),
            fail_ids: vec!["bad".to_string()],
            ..FakeGateway::default()
        };
        let service = service(source, gateway).await;

        let result = service.sync(&options(), None).await;
        assert!(!result.success);
        assert_eq!(result.calls_synced, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Failed to sync call bad:"));
        assert!(service.ledger.is_synced("good").await.unwrap());
        assert!(!service.ledger.is_synced("bad").await.unwrap());
    }

    #[tokio::test]
    async fn ledger_write_failure_after_create_fails_the_run() {
        let source = FakeSource {
            calls: vec![call("a", recent(0)), call("b", recent(10))],
            ..FakeSource::default()
        };
        let service = service(source, FakeGateway::with_calendar("cal-1")).await;
        service.ledger.initialize().await.unwrap();

        // Strip the primary key so the proof-of-sync upsert always fails.
        sqlx::raw_sql(
            "DROP TABLE synced_calls;
             CREATE TABLE synced_calls (
                 call_unique_id TEXT NOT NULL,
                 remote_event_id TEXT NOT NULL,
                 synced_at TEXT NOT NULL
             );",
        )
        .execute(service.ledger.pool())
        .await
        .unwrap();

        let result = service.sync(&options(), None).await;
        assert!(!result.success);
        assert_eq!(result.calls_synced, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("Failed to record synced call a:"));
        assert_eq!(service.ledger.count_synced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn calendar_drift_resets_synced_state() {
        let source = FakeSource {
            calls: vec![call("a", recent(0))],
            ..FakeSource::default()
        };
        let service = service(source, FakeGateway::with_calendar("cal-new")).await;

        service.ledger.initialize().await.unwrap();
        service.ledger.mark_synced("stale", "evt-stale").await.unwrap();
        service
            .ledger
            .set_setting(SETTING_CALENDAR_ID, "cal-old")
            .await
            .unwrap();

        let result = service.sync(&options(), None).await;
        assert!(result.success);
        assert!(!service.ledger.is_synced("stale").await.unwrap());
        assert_eq!(
            service.ledger.get_setting(SETTING_CALENDAR_ID).await.unwrap().as_deref(),
            Some("cal-new")
        );
        // The stale call re-syncs next run because the remote events are gone.
        assert_eq!(result.calls_synced, 1);
    }

    #[tokio::test]
    async fn first_run_uses_thirty_day_window_then_widens() {
        let source = FakeSource::default();
        let since_log = source.last_since.clone();
        let service = service(source, FakeGateway::with_calendar("cal-1")).await;

        service.sync(&options(), None).await;
        let first_since = since_log.lock().unwrap().take().unwrap();
        let expected = Timestamp::now().as_second() - FIRST_SYNC_WINDOW_DAYS * 24 * 3600;
        let got = first_since.expect("first run must be windowed").as_second();
        assert!((got - expected).abs() < 60, "got window start {got}");

        assert_eq!(
            service
                .ledger
                .get_setting(SETTING_INITIAL_SYNC_DONE)
                .await
                .unwrap()
                .as_deref(),
            Some("true")
        );

        service.sync(&options(), None).await;
        let second_since = since_log.lock().unwrap().take().unwrap();
        assert!(second_since.is_none(), "later runs are unbounded");
    }

    #[tokio::test]
    async fn sync_all_history_removes_the_window() {
        let old_call = call("ancient", Timestamp::now().as_second() - 90 * 24 * 3600);
        let source = FakeSource {
            calls: vec![old_call],
            ..FakeSource::default()
        };
        let service = service(source, FakeGateway::with_calendar("cal-1")).await;

        // Windowed first run misses the 90-day-old call.
        let first = service.sync(&options(), None).await;
        assert_eq!(first.calls_synced, 0);

        service.ledger.clear_all_synced().await.unwrap();
        service
            .ledger
            .delete_setting(SETTING_INITIAL_SYNC_DONE)
            .await
            .unwrap();

        let all = SyncOptions {
            sync_all_history: true,
            ..options()
        };
        let second = service.sync(&all, None).await;
        assert_eq!(second.calls_synced, 1);
    }

    #[tokio::test]
    async fn explicit_since_overrides_the_window() {
        let t = recent(0);
        let source = FakeSource {
            calls: vec![call("before", t - 600), call("after", t)],
            ..FakeSource::default()
        };
        let service = service(source, FakeGateway::with_calendar("cal-1")).await;

        let opts = SyncOptions {
            since: Some(Timestamp::from_second(t - 300).unwrap()),
            ..options()
        };
        let result = service.sync(&opts, None).await;
        assert_eq!(result.calls_synced, 1);
    }

    #[tokio::test]
    async fn dry_run_creates_nothing() {
        let source = FakeSource {
            calls: vec![call("a", recent(0))],
            ..FakeSource::default()
        };
        let gateway = FakeGateway::with_calendar("cal-1");
        let service = service(source, gateway).await;

        let opts = SyncOptions {
            dry_run: true,
            ..options()
        };
        let result = service.sync(&opts, None).await;
        assert!(result.success);
        assert_eq!(result.calls_synced, 1);
        assert!(!service.ledger.is_synced("a").await.unwrap());
    }

    #[tokio::test]
    async fn dry_run_skips_remote_adoption() {
        let source = FakeSource {
            calls: vec![call("theirs", recent(0))],
            ..FakeSource::default()
        };
        let gateway = FakeGateway {
            calendar: "cal-1".to_string(),
            remote_tags: HashMap::from([("theirs".to_string(), "evt-remote".to_string())]),
            ..FakeGateway::default()
        };
        let service = service(source, gateway).await;

        let opts = SyncOptions {
            dry_run: true,
            ..options()
        };
        let result = service.sync(&opts, None).await;
        assert!(result.success);
        assert_eq!(result.calls_synced, 1);
        assert_eq!(service.ledger.count_synced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn adopts_events_synced_by_another_device() {
        let source = FakeSource {
            calls: vec![call("mine", recent(0)), call("theirs", recent(10))],
            ..FakeSource::default()
        };
        let gateway = FakeGateway {
            calendar: "cal-1".to_string(),
            remote_tags: HashMap::from([("theirs".to_string(), "evt-remote".to_string())]),
            ..FakeGateway::default()
        };
        let service = service(source, gateway).await;

        let result = service.sync(&options(), None).await;
        assert!(result.success);
        assert_eq!(result.calls_synced, 1);
        assert_eq!(result.calls_skipped, 1);

        let adopted = service.ledger.get_synced("theirs").await.unwrap().unwrap();
        assert_eq!(adopted.remote_event_id, "evt-remote");
    }

    #[tokio::test]
    async fn bulk_name_resolution_feeds_event_creation() {
        let source = FakeSource {
            calls: vec![call("a", recent(0))],
            ..FakeSource::default()
        };
        let ledger = SyncLedger::open(None).await.unwrap();
        let resolver = FixedResolver(HashMap::from([(
            "+15551234567".to_string(),
            "John Doe".to_string(),
        )]));
        let gateway = FakeGateway::with_calendar("cal-1");
        let service = SyncService::new(
            Box::new(source),
            ledger,
            Box::new(gateway),
            Box::new(resolver),
        );

        let result = service.sync(&options(), None).await;
        assert!(result.success);
        assert_eq!(result.calls_synced, 1);
    }

    #[tokio::test]
    async fn progress_reported_per_record_in_sequential_mode() {
        let source = FakeSource {
            calls: vec![call("a", recent(0)), call("b", recent(10))],
            ..FakeSource::default()
        };
        let service = service(source, FakeGateway::with_calendar("cal-1")).await;

        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let progress: ProgressFn = Box::new(move |done, total| {
            seen_clone.lock().unwrap().push((done, total));
        });

        let opts = SyncOptions {
            use_batch: false,
            ..options()
        };
        service.sync(&opts, Some(&progress)).await;
        assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 2)]);
    }

    #[tokio::test]
    async fn status_reports_counts_and_health() {
        let source = FakeSource {
            calls: vec![call("a", recent(0)), call("b", recent(10))],
            ..FakeSource::default()
        };
        let service = service(source, FakeGateway::with_calendar("cal-1")).await;
        service.sync(&options(), None).await;

        let status = service.sync_status().await;
        assert!(status.call_db_accessible);
        assert!(status.authenticated);
        assert_eq!(status.synced_calls, 2);
        assert_eq!(status.total_calls, 2);
    }

    #[tokio::test]
    async fn result_display_format() {
        let mut result = SyncResult::new(Timestamp::from_second(1_700_000_000).unwrap());
        result.calls_synced = 3;
        result.calls_skipped = 1;
        result.finished_at = Timestamp::from_second(1_700_000_001).unwrap();
        assert_eq!(
            result.to_string(),
            "Sync succeeded: 3 synced, 1 skipped, 0 errors in 1.0s"
        );
    }

    #[tokio::test]
    async fn set_sync_all_history_persists() {
        let service = service(FakeSource::default(), FakeGateway::with_calendar("c")).await;
        service.set_sync_all_history(true).await.unwrap();
        assert_eq!(
            service
                .ledger
                .get_setting(SETTING_SYNC_ALL_HISTORY)
                .await
                .unwrap()
                .as_deref(),
            Some("true")
        );
    }
}
