// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Deterministic mapping from a call to a Calendar event body.

use jiff::{SignedDuration, Timestamp};

/// Summary prefix for outgoing calls.
pub const OUTGOING_ARROW: &str = "↗";

/// Summary prefix for incoming calls.
pub const INCOMING_ARROW: &str = "↙";

/// Calls shorter than a minute still get a one-minute event so they remain
/// visible in month/week views.
const MIN_EVENT_SECONDS: i64 = 60;

/// One call, already name-resolved, ready to become a calendar event.
#[derive(Debug, Clone)]
pub struct CallEvent {
    /// Stable call identifier; embedded in the event as an idempotency tag.
    pub unique_id: String,
    /// Raw phone number, may be empty.
    pub phone_number: String,
    /// Best available name: resolved contact, source-provided name, or number.
    pub display_name: String,
    /// Call start, UTC.
    pub timestamp: Timestamp,
    /// Call duration in seconds, non-negative.
    pub duration_seconds: i64,
    /// Direction flag.
    pub is_outgoing: bool,
}

impl CallEvent {
    /// Event title, e.g. `↙ John Doe [5min]`.
    pub fn summary(&self) -> String {
        let arrow = if self.is_outgoing {
            OUTGOING_ARROW
        } else {
            INCOMING_ARROW
        };
        format!(
            "{arrow} {} [{}]",
            self.display_name,
            duration_label(self.duration_seconds)
        )
    }

    /// Newline-joined detail lines shown in the event body.
    pub fn description(&self) -> String {
        let direction = if self.is_outgoing {
            "Outgoing"
        } else {
            "Incoming"
        };
        let mut lines = vec![
            format!("Direction: {direction}"),
            format!("Duration: {}", humanize_duration(self.duration_seconds)),
        ];
        if !self.phone_number.is_empty() {
            lines.push(format!("Number: {}", self.phone_number));
        }
        lines.join("\n")
    }

    /// Event end: start plus duration, floored at one minute.
    pub fn end(&self) -> Timestamp {
        self.timestamp
            .saturating_add(SignedDuration::from_secs(
                self.duration_seconds.max(MIN_EVENT_SECONDS),
            ))
            .unwrap_or(Timestamp::MAX)
    }

    /// Full insert body for the Calendar API.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "summary": self.summary(),
            "description": self.description(),
            "start": {
                "dateTime": self.timestamp.to_string(),
                "timeZone": "UTC",
            },
            "end": {
                "dateTime": self.end().to_string(),
                "timeZone": "UTC",
            },
            "extendedProperties": {
                "private": {
                    "callUniqueId": self.unique_id,
                }
            },
        })
    }
}

/// Compact duration tag for the title: `5min`, `1h`, `1h 30m`.
///
/// Rounded to the nearest minute, never below one.
fn duration_label(seconds: i64) -> String {
    let minutes = ((seconds as f64 / 60.0).round() as i64).max(1);
    if minutes >= 60 {
        let h = minutes / 60;
        let m = minutes % 60;
        if m == 0 {
            format!("{h}h")
        } else {
            format!("{h}h {m}m")
        }
    } else {
        format!("{minutes}min")
    }
}

/// Spelled-out duration for the description: `5 minutes`, `1 hour 2 seconds`.
pub fn humanize_duration(seconds: i64) -> String {
    if seconds == 0 {
        return "0 seconds".to_string();
    }

    let (minutes, secs) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours} hour{}", if hours != 1 { "s" } else { "" }));
    }
    if minutes > 0 {
        parts.push(format!(
            "{minutes} minute{}",
            if minutes != 1 { "s" } else { "" }
        ));
    }
    if secs > 0 {
        parts.push(format!("{secs} second{}", if secs != 1 { "s" } else { "" }));
    }
    parts.join(" ")
}
