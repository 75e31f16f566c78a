// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

/// Google Calendar gateway errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GcalError {
    /// Transport-level failure before any HTTP status was obtained.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-2xx response from the Calendar API.
    #[error("Calendar API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the API.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// No usable credential, or the token endpoint rejected us.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A calendar with the configured name exists but was not created by
    /// this tool; it is never reused or modified.
    #[error("Calendar \"{0}\" exists but is not managed by callsync; rename it or pick another calendar name")]
    ForeignCalendar(String),

    /// Response body did not have the expected shape.
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    /// Malformed multipart batch payload.
    #[error("Batch error: {0}")]
    Batch(String),
}

impl From<reqwest::Error> for GcalError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<serde_json::Error> for GcalError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse(e.to_string())
    }
}
