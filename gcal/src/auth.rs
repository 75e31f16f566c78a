// SPDX-FileCopyrightText: 2026 callsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! OAuth2 authorization-code flow for a desktop app.
//!
//! The browser is pointed at Google's consent page, a loopback listener
//! receives the redirect, and the resulting token blob lands in the OS
//! keyring. Construction never touches the keyring; credentials are loaded
//! lazily on first use so UI/CLI startup stays fast.

use std::io::{Read, Write};
use std::net::TcpListener;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::GcalError;

const KEYRING_SERVICE: &str = "callsync";
const KEYRING_USERNAME: &str = "google_oauth";

/// Refresh this many seconds before the recorded expiry.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// OAuth token blob as persisted in the secret store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTokens {
    /// Short-lived bearer token.
    pub access_token: String,
    /// Long-lived token used to mint new access tokens.
    pub refresh_token: Option<String>,
    /// Unix timestamp after which `access_token` is stale.
    pub expires_at: Option<i64>,
    /// Usually `Bearer`.
    pub token_type: String,
    /// Space-separated granted scopes.
    pub scope: Option<String>,
}

impl StoredTokens {
    fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(exp) => now > exp - EXPIRY_BUFFER_SECS,
            None => false,
        }
    }
}

/// Where the serialized token blob lives.
///
/// The default is the OS keyring; tests substitute an in-memory store.
pub trait TokenStore: Send + Sync {
    /// Load the serialized blob, `None` when nothing is stored.
    fn load(&self) -> Result<Option<String>, GcalError>;
    /// Persist the serialized blob, replacing any previous value.
    fn save(&self, blob: &str) -> Result<(), GcalError>;
    /// Remove the stored blob. Not an error when absent.
    fn clear(&self) -> Result<(), GcalError>;
}

impl std::fmt::Debug for dyn TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenStore")
    }
}

/// OS keyring token store.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyringStore;

impl TokenStore for KeyringStore {
    fn load(&self) -> Result<Option<String>, GcalError> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
            .map_err(|e| GcalError::Auth(e.to_string()))?;
        match entry.get_password() {
            Ok(blob) => Ok(Some(blob)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(GcalError::Auth(e.to_string())),
        }
    }

    fn save(&self, blob: &str) -> Result<(), GcalError> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
            .map_err(|e| GcalError::Auth(e.to_string()))?;
        entry
            .set_password(blob)
            .map_err(|e| GcalError::Auth(e.to_string()))
    }

    fn clear(&self) -> Result<(), GcalError> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
            .map_err(|e| GcalError::Auth(e.to_string()))?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(GcalError::Auth(e.to_string())),
        }
    }
}

/// OAuth endpoints and client identity.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret; may be empty for desktop/PKCE clients.
    pub client_secret: String,
    /// Authorization endpoint.
    pub auth_url: String,
    /// Token endpoint.
    pub token_url: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Loopback port for the redirect listener.
    pub redirect_port: u16,
}

impl OAuthConfig {
    /// Google Calendar defaults for the given client identity.
    pub fn google(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/calendar".to_string()],
            redirect_port: 18923,
        }
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.redirect_port)
    }

    fn consent_url(&self) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencode(&self.client_id),
            urlencode(&self.redirect_uri()),
            urlencode(&scopes),
        )
    }
}

/// Manages the OAuth credential lifecycle for the gateway.
#[derive(Debug)]
pub struct Authenticator {
    config: OAuthConfig,
    store: Box<dyn TokenStore>,
    http: reqwest::Client,
}

impl Authenticator {
    /// Creates an authenticator. Does not touch the token store.
    pub fn new(config: OAuthConfig) -> Self {
        Self::with_store(config, Box::new(KeyringStore))
    }

    /// Creates an authenticator with a custom token store.
    pub fn with_store(config: OAuthConfig, store: Box<dyn TokenStore>) -> Self {
        Self {
            config,
            store,
            http: reqwest::Client::new(),
        }
    }

    /// True when a usable credential is stored. Never errors.
    pub fn is_authenticated(&self) -> bool {
        match self.load_tokens() {
            Some(tokens) => {
                !tokens.is_expired(Timestamp::now().as_second()) || tokens.refresh_token.is_some()
            }
            None => false,
        }
    }

    /// Returns a valid access token, refreshing a stale one first.
    pub async fn access_token(&self) -> Result<String, GcalError> {
        let tokens = self
            .load_tokens()
            .ok_or_else(|| GcalError::Auth("not authenticated".to_string()))?;

        if !tokens.is_expired(Timestamp::now().as_second()) {
            return Ok(tokens.access_token);
        }

        let refresh = tokens
            .refresh_token
            .as_deref()
            .ok_or_else(|| GcalError::Auth("access token expired and no refresh token".to_string()))?;

        tracing::debug!("access token expired, refreshing");
        let refreshed = self.refresh(refresh).await?;
        Ok(refreshed.access_token)
    }

    /// Runs the full consent flow: opens the browser, waits for the loopback
    /// redirect, exchanges the code, and persists the tokens.
    ///
    /// Blocks the calling task until the browser redirect arrives.
    pub async fn authorize(&self) -> Result<(), GcalError> {
        if self.config.client_id.is_empty() {
            return Err(GcalError::Auth(
                "client_id not configured; set it in config.toml".to_string(),
            ));
        }

        let url = self.config.consent_url();
        tracing::info!("opening browser for Google consent");
        open::that(&url).map_err(|e| GcalError::Auth(format!("failed to open browser: {e}")))?;

        let port = self.config.redirect_port;
        let code = tokio::task::spawn_blocking(move || wait_for_code(port))
            .await
            .map_err(|e| GcalError::Auth(format!("callback listener task failed: {e}")))??;
        let tokens = self.exchange(&code).await?;
        self.persist(&tokens)?;
        tracing::info!("authentication succeeded");
        Ok(())
    }

    /// Removes the stored credential.
    pub fn logout(&self) -> Result<(), GcalError> {
        self.store.clear()
    }

    fn load_tokens(&self) -> Option<StoredTokens> {
        match self.store.load() {
            Ok(Some(blob)) => serde_json::from_str(&blob).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load credentials");
                None
            }
        }
    }

    fn persist(&self, tokens: &StoredTokens) -> Result<(), GcalError> {
        let blob = serde_json::to_string(tokens)?;
        self.store.save(&blob)
    }

    async fn exchange(&self, code: &str) -> Result<StoredTokens, GcalError> {
        let redirect_uri = self.config.redirect_uri();
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        self.token_request(&params, None).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredTokens, GcalError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        self.token_request(&params, Some(refresh_token)).await
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        prior_refresh: Option<&str>,
    ) -> Result<StoredTokens, GcalError> {
        let body: serde_json::Value = self
            .http
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = body.get("error") {
            return Err(GcalError::Auth(format!("token endpoint: {err}")));
        }

        let expires_at = body
            .get("expires_in")
            .and_then(serde_json::Value::as_i64)
            .map(|secs| Timestamp::now().as_second() + secs);

        let tokens = StoredTokens {
            access_token: body["access_token"].as_str().unwrap_or_default().to_string(),
            refresh_token: body
                .get("refresh_token")
                .and_then(|v| v.as_str())
                .map(String::from)
                // Google omits the refresh token on refresh; keep the old one.
                .or_else(|| prior_refresh.map(String::from)),
            expires_at,
            token_type: body["token_type"].as_str().unwrap_or("Bearer").to_string(),
            scope: body.get("scope").and_then(|v| v.as_str()).map(String::from),
        };

        if tokens.access_token.is_empty() {
            return Err(GcalError::Auth("token endpoint returned no access token".to_string()));
        }

        self.persist(&tokens)?;
        Ok(tokens)
    }
}

/// Accepts one loopback connection and pulls the `code` query parameter out
/// of the redirect request.
fn wait_for_code(port: u16) -> Result<String, GcalError> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}"))
        .map_err(|e| GcalError::Auth(format!("failed to bind loopback port {port}: {e}")))?;

    let (mut stream, _) = listener
        .accept()
        .map_err(|e| GcalError::Auth(format!("loopback accept failed: {e}")))?;

    let mut buf = [0u8; 4096];
    let n = stream
        .read(&mut buf)
        .map_err(|e| GcalError::Auth(format!("loopback read failed: {e}")))?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let code = extract_code(&request)
        .ok_or_else(|| GcalError::Auth("no authorization code in callback".to_string()))?;

    let response = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n\
        <html><body><h2>Authentication successful!</h2>\
        <p>You can close this tab.</p></body></html>";
    let _ = stream.write_all(response.as_bytes());

    Ok(code)
}

fn extract_code(request: &str) -> Option<String> {
    let first_line = request.lines().next()?;
    let path = first_line.split_whitespace().nth(1)?;
    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_key_only(s)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore(Mutex<Option<String>>);

    impl TokenStore for MemoryStore {
        fn load(&self) -> Result<Option<String>, GcalError> {
            Ok(self.0.lock().unwrap().clone())
        }
        fn save(&self, blob: &str) -> Result<(), GcalError> {
            *self.0.lock().unwrap() = Some(blob.to_string());
            Ok(())
        }
        fn clear(&self) -> Result<(), GcalError> {
            *self.0.lock().unwrap() = None;
            Ok(())
        }
    }

    fn auth_with(blob: Option<&str>) -> Authenticator {
        let store = MemoryStore(Mutex::new(blob.map(String::from)));
        Authenticator::with_store(OAuthConfig::google("id", "secret"), Box::new(store))
    }

    #[test]
    fn unauthenticated_without_tokens() {
        assert!(!auth_with(None).is_authenticated());
    }

    #[test]
    fn authenticated_with_fresh_token() {
        let blob = format!(
            r#"{{"access_token":"t","refresh_token":null,"expires_at":{},"token_type":"Bearer","scope":null}}"#,
            Timestamp::now().as_second() + 3600
        );
        assert!(auth_with(Some(&blob)).is_authenticated());
    }

    #[test]
    fn expired_token_without_refresh_is_unusable() {
        let blob = format!(
            r#"{{"access_token":"t","refresh_token":null,"expires_at":{},"token_type":"Bearer","scope":null}}"#,
            Timestamp::now().as_second() - 10
        );
        assert!(!auth_with(Some(&blob)).is_authenticated());
    }

    #[test]
    fn expired_token_with_refresh_is_usable() {
        let blob = format!(
            r#"{{"access_token":"t","refresh_token":"r","expires_at":{},"token_type":"Bearer","scope":null}}"#,
            Timestamp::now().as_second() - 10
        );
        assert!(auth_with(Some(&blob)).is_authenticated());
    }

    #[test]
    fn garbage_blob_is_unusable() {
        assert!(!auth_with(Some("not json")).is_authenticated());
    }

    #[test]
    fn logout_clears_store() {
        let auth = auth_with(Some(r#"{"access_token":"t","refresh_token":"r","expires_at":null,"token_type":"Bearer","scope":null}"#));
        assert!(auth.is_authenticated());
        auth.logout().unwrap();
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn extracts_code_from_callback_request() {
        let request = "GET /callback?code=abc123&scope=calendar HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(extract_code(request).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_code_yields_none() {
        let request = "GET /callback?error=access_denied HTTP/1.1\r\n\r\n";
        assert_eq!(extract_code(request), None);
    }

    #[tokio::test]
    async fn access_token_errors_without_credentials() {
        let err = auth_with(None).access_token().await.unwrap_err();
        assert!(matches!(err, GcalError::Auth(_)));
    }

    #[tokio::test]
    async fn loopback_listener_returns_the_code() {
        let port = 48231;
        let wait = tokio::task::spawn_blocking(move || wait_for_code(port));

        let mut stream = loop {
            match std::net::TcpStream::connect(("127.0.0.1", port)) {
                Ok(s) => break s,
                Err(_) => std::thread::sleep(std::time::Duration::from_millis(10)),
            }
        };
        stream
            .write_all(b"GET /callback?code=abc123&scope=calendar HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(response.contains("Authentication successful"));

        assert_eq!(wait.await.unwrap().unwrap(), "abc123");
    }
}
