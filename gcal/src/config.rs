// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

/// Google Calendar gateway configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct GcalConfig {
    /// Name of the dedicated calendar that holds synced call events.
    #[serde(default = "default_calendar_name")]
    pub calendar_name: String,

    /// OAuth client id of the installed application.
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret. Optional for PKCE/desktop clients.
    #[serde(default)]
    pub client_secret: String,

    /// Base URL of the Calendar API. Overridable for tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_calendar_name() -> String {
    "Call Tracking".to_string()
}

fn default_base_url() -> String {
    "https://www.googleapis.com".to_string()
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("callsync-gcal/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for GcalConfig {
    fn default() -> Self {
        Self {
            calendar_name: default_calendar_name(),
            client_id: String::new(),
            client_secret: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}
