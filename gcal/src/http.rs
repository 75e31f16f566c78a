// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};

use crate::config::GcalConfig;
use crate::error::GcalError;

/// Thin wrapper over [`reqwest::Client`] that prefixes the API base URL,
/// attaches the bearer token, and maps non-success statuses to [`GcalError`].
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: &GcalConfig) -> Result<Self, GcalError> {
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            inner,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.inner.request(method, url).bearer_auth(token)
    }

    /// Sends the request and turns any non-2xx status into an error,
    /// pulling the human-readable message out of the JSON error body when
    /// one is present.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, GcalError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }
}

pub(crate) fn api_error(status: StatusCode, body: &str) -> GcalError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.chars().take(200).collect()
            }
        });

    GcalError::Api {
        status: status.as_u16(),
        message,
    }
}
