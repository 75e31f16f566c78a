// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use jiff::Timestamp;

/// One call lifted out of the macOS call-history store.
///
/// Transient per sync run; never persisted by this tool.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    /// Stable identifier assigned by the OS (`ZUNIQUE_ID`).
    pub unique_id: String,
    /// Raw number as stored, may be empty for withheld callers.
    pub phone_number: String,
    /// Resolved contact name, when the directory knows the number.
    pub contact_name: Option<String>,
    /// Call start, UTC.
    pub timestamp: Timestamp,
    /// Non-negative; zero for unanswered calls.
    pub duration_seconds: i64,
    pub is_answered: bool,
    pub is_outgoing: bool,
}

impl CallRecord {
    pub fn direction(&self) -> &'static str {
        if self.is_outgoing { "Outgoing" } else { "Incoming" }
    }

    /// Contact name when known, then the number, then `"Unknown"`.
    pub fn display_name(&self) -> &str {
        match self.contact_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !self.phone_number.is_empty() => &self.phone_number,
            _ => "Unknown",
        }
    }

    /// Human duration, e.g. `"1 hour 2 minutes 3 seconds"`.
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_seconds.max(0);
        if secs == 0 {
            return "0 seconds".to_string();
        }

        let (hours, rem) = (secs / 3600, secs % 3600);
        let (minutes, seconds) = (rem / 60, rem % 60);

        let mut parts = Vec::new();
        for (value, unit) in [(hours, "hour"), (minutes, "minute"), (seconds, "second")] {
            match value {
                0 => {}
                1 => parts.push(format!("1 {unit}")),
                n => parts.push(format!("{n} {unit}s")),
            }
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CallRecord {
        CallRecord {
            unique_id: "abc".to_string(),
            phone_number: "+15551234567".to_string(),
            contact_name: None,
            timestamp: Timestamp::from_second(1_705_314_600).unwrap(),
            duration_seconds: 0,
            is_answered: true,
            is_outgoing: false,
        }
    }

    #[test]
    fn direction_labels() {
        let mut r = record();
        assert_eq!(r.direction(), "Incoming");
        r.is_outgoing = true;
        assert_eq!(r.direction(), "Outgoing");
    }

    #[test]
    fn display_name_prefers_contact() {
        let mut r = record();
        assert_eq!(r.display_name(), "+15551234567");

        r.contact_name = Some("John Doe".to_string());
        assert_eq!(r.display_name(), "John Doe");

        r.contact_name = Some(String::new());
        r.phone_number = String::new();
        assert_eq!(r.display_name(), "Unknown");
    }

    #[test]
    fn duration_formatted_zero() {
        assert_eq!(record().duration_formatted(), "0 seconds");
    }

    #[test]
    fn duration_formatted_composite() {
        let mut r = record();
        r.duration_seconds = 3723;
        assert_eq!(r.duration_formatted(), "1 hour 2 minutes 3 seconds");

        r.duration_seconds = 120;
        assert_eq!(r.duration_formatted(), "2 minutes");

        r.duration_seconds = 1;
        assert_eq!(r.duration_formatted(), "1 second");
    }
}
