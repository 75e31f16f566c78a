// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Wire format for the Calendar batch endpoint.
//!
//! A batch request is `multipart/mixed`; each part carries one serialized
//! HTTP request tagged with a `Content-ID` so responses, which may arrive in
//! any order, can be matched back to their inputs.

use crate::error::GcalError;

/// Calls per batch request. Google caps a batch at 50 items.
pub const BATCH_LIMIT: usize = 50;

/// One inner request of a batch.
#[derive(Debug, Clone)]
pub struct BatchPart {
    /// HTTP method of the inner request.
    pub method: String,
    /// Path relative to the API host, e.g. `/calendar/v3/calendars/{id}/events`.
    pub path: String,
    /// JSON body, empty for DELETE parts.
    pub body: String,
}

impl BatchPart {
    pub fn post(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            path: path.into(),
            body: body.into(),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: "DELETE".to_string(),
            path: path.into(),
            body: String::new(),
        }
    }
}

/// Status and body of one inner response, in input order.
#[derive(Debug, Clone)]
pub struct BatchPartResponse {
    pub status: u16,
    pub body: String,
}

impl BatchPartResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Error message from the part body, or the status code as text.
    pub fn error_message(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }
}

/// Serializes the parts into a `multipart/mixed` body.
///
/// Returns the body and the boundary to put in the request `Content-Type`.
pub fn build_batch_body(parts: &[BatchPart]) -> (String, String) {
    let boundary = format!("batch_{}", uuid::Uuid::new_v4().simple());
    let mut body = String::new();

    for (idx, part) in parts.iter().enumerate() {
        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str(&format!("Content-ID: <item:{idx}>\r\n\r\n"));
        body.push_str(&format!("{} {}\r\n", part.method, part.path));
        if part.body.is_empty() {
            body.push_str("\r\n");
        } else {
            body.push_str("Content-Type: application/json\r\n");
            body.push_str(&format!("Content-Length: {}\r\n\r\n", part.body.len()));
            body.push_str(&part.body);
            body.push_str("\r\n");
        }
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    (body, boundary)
}

/// Extracts the boundary token from a response `Content-Type` header.
pub fn response_boundary(content_type: &str) -> Result<String, GcalError> {
    content_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("boundary="))
        .map(|b| b.trim_matches('"').to_string())
        .next()
        .ok_or_else(|| {
            GcalError::Batch(format!("no boundary in response content type: {content_type}"))
        })
}

/// Parses a `multipart/mixed` batch response into per-part results, ordered
/// to match the request parts.
///
/// Parts the server did not answer come back as status 0 entries so the
/// caller can treat them as failures.
pub fn parse_batch_response(
    body: &str,
    boundary: &str,
    expected: usize,
) -> Result<Vec<BatchPartResponse>, GcalError> {
    let mut results = vec![
        BatchPartResponse {
            status: 0,
            body: String::new(),
        };
        expected
    ];

    let delimiter = format!("--{boundary}");
    for section in body.split(&delimiter) {
        let section = section.trim_start_matches(['\r', '\n']);
        if section.is_empty() || section.starts_with("--") {
            continue;
        }
        let Some((idx, response)) = parse_part(section) else {
            continue;
        };
        if idx < expected {
            results[idx] = response;
        }
    }

    if results.iter().any(|r| r.status == 0) {
        tracing::warn!("batch response is missing one or more parts");
    }
    Ok(results)
}

/// Parses one multipart section: outer part headers, then the serialized
/// HTTP response.
fn parse_part(section: &str) -> Option<(usize, BatchPartResponse)> {
    let (outer_headers, inner) = split_headers(section)?;

    let idx = outer_headers
        .lines()
        .find_map(|line| line.strip_prefix("Content-ID:"))
        .and_then(|id| {
            let id = id.trim();
            id.strip_prefix("<response-item:")
                .or_else(|| id.strip_prefix("<item:"))?
                .strip_suffix('>')?
                .parse::<usize>()
                .ok()
        })?;

    let (status_and_headers, payload) = split_headers(inner).unwrap_or((inner, ""));
    let status = status_and_headers
        .lines()
        .next()?
        .split_whitespace()
        .nth(1)?
        .parse::<u16>()
        .ok()?;

    Some((
        idx,
        BatchPartResponse {
            status,
            body: payload.trim().to_string(),
        },
    ))
}

/// Splits a header block from the text that follows the first blank line.
fn split_headers(text: &str) -> Option<(&str, &str)> {
    text.split_once("\r\n\r\n")
        .or_else(|| text.split_once("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_body_contains_each_part() {
        let parts = vec![
            BatchPart::post("/calendar/v3/calendars/c1/events", r#"{"summary":"x"}"#),
            BatchPart::delete("/calendar/v3/calendars/c1/events/e9"),
        ];
        let (body, boundary) = build_batch_body(&parts);

        assert!(boundary.starts_with("batch_"));
        assert_eq!(body.matches(&format!("--{boundary}")).count(), 3);
        assert!(body.contains("Content-ID: <item:0>"));
        assert!(body.contains("Content-ID: <item:1>"));
        assert!(body.contains("POST /calendar/v3/calendars/c1/events"));
        assert!(body.contains(r#"{"summary":"x"}"#));
        assert!(body.contains("DELETE /calendar/v3/calendars/c1/events/e9"));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn boundary_from_content_type() {
        let ct = "multipart/mixed; boundary=batch_abc123";
        assert_eq!(response_boundary(ct).unwrap(), "batch_abc123");

        let quoted = r#"multipart/mixed; boundary="batch_q""#;
        assert_eq!(response_boundary(quoted).unwrap(), "batch_q");

        assert!(response_boundary("application/json").is_err());
    }

    fn sample_response(boundary: &str) -> String {
        format!(
            "--{b}\r\n\
             Content-Type: application/http\r\n\
             Content-ID: <response-item:1>\r\n\
             \r\n\
             HTTP/1.1 403 Forbidden\r\n\
             Content-Type: application/json\r\n\
             \r\n\
             {{\"error\":{{\"message\":\"Rate limit exceeded\"}}}}\r\n\
             --{b}\r\n\
             Content-Type: application/http\r\n\
             Content-ID: <response-item:0>\r\n\
             \r\n\
             HTTP/1.1 200 OK\r\n\
             Content-Type: application/json\r\n\
             \r\n\
             {{\"id\":\"evt1\"}}\r\n\
             --{b}--\r\n",
            b = boundary
        )
    }

    #[test]
    fn parse_matches_out_of_order_parts_by_content_id() {
        let body = sample_response("batch_xyz");
        let results = parse_batch_response(&body, "batch_xyz", 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, 200);
        assert!(results[0].body.contains("evt1"));
        assert_eq!(results[1].status, 403);
        assert!(!results[1].is_success());
        assert_eq!(results[1].error_message(), "Rate limit exceeded");
    }

    #[test]
    fn missing_part_reported_as_failure() {
        let body = sample_response("batch_xyz");
        let results = parse_batch_response(&body, "batch_xyz", 3).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[2].status, 0);
        assert!(!results[2].is_success());
        assert_eq!(results[2].error_message(), "HTTP 0");
    }

    #[test]
    fn error_message_falls_back_to_status() {
        let resp = BatchPartResponse {
            status: 500,
            body: "not json".to_string(),
        };
        assert_eq!(resp.error_message(), "HTTP 500");
    }
}
