//! OAuth 2.0 PKCE flow implementation for Google APIs.
//!
//! This module implements the Authorization Code flow with PKCE (Proof Key for
//! Code Exchange) extension, using a loopback redirect for desktop applications.
//!
//! # Flow Overview
//!
//! 1. Generate a cryptographic code verifier and its SHA-256 challenge
//! 2. Start a local HTTP server on the configured (or an OS-assigned) port
//! 3. Build the authorization URL with the challenge
//! 4. Open the user's browser to Google's consent page
//! 5. User grants permission; Google redirects to our local server
//! 6. Extract the authorization code from the redirect
//! 7. Exchange the code (with verifier) for access and refresh tokens
//!
//! Refreshing goes through the token endpoint recorded in the credential,
//! with the client the credential was issued to.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::Url;

use crate::credential::Credential;
use crate::error::{ProviderError, ProviderResult};
use crate::flow::{AuthorizationFlow, BoxFuture};

use super::PROVIDER_NAME;
use super::config::{ClientRegistration, GoogleConfig};

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

const CALLBACK_PATH: &str = "/callback";

/// How long one loopback connection may stay silent before it is dropped.
/// Browsers open idle preconnects that would otherwise stall the accept loop.
const CONNECTION_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a URL for the user. The default launches the system browser.
pub type UrlOpener = fn(&str) -> io::Result<()>;

fn open_in_browser(url: &str) -> io::Result<()> {
    open::that(url)
}

/// The Google authorization flow: interactive consent plus refresh.
#[derive(Debug, Clone)]
pub struct GoogleOAuthFlow {
    config: GoogleConfig,
    http_client: reqwest::Client,
    open_url: UrlOpener,
}

impl GoogleOAuthFlow {
    /// Creates a flow for the given configuration.
    ///
    /// The client registration is not read until a flow needs it.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        let http_client = config.http_client().map_err(|e| {
            ProviderError::authentication(format!("failed to create HTTP client: {}", e))
                .with_source(e)
        })?;

        Ok(Self {
            config,
            http_client,
            open_url: open_in_browser,
        })
    }

    /// Replaces the browser launcher.
    pub fn with_url_opener(mut self, open_url: UrlOpener) -> Self {
        self.open_url = open_url;
        self
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Runs the interactive consent flow.
    ///
    /// # Errors
    ///
    /// Returns an authentication error if:
    /// - The client registration is missing or invalid
    /// - No port is available in the configured range
    /// - The user denies authorization or the callback is malformed
    /// - Token exchange fails
    async fn run_authorization(&self, scopes: &[String]) -> ProviderResult<Credential> {
        let registration = self.config.registration.resolve()?;
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(self.config.loopback_port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH);

        let auth_url = pkce.build_auth_url(
            &self.config.auth_url,
            &registration.client_id,
            &redirect_uri,
            scopes,
        )?;

        info!("starting OAuth flow, opening browser...");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = (self.open_url)(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        }

        let callback = tokio::task::spawn_blocking(move || {
            Self::wait_for_callback(listener, CONNECTION_READ_TIMEOUT)
        })
            .await
            .map_err(|e| {
                ProviderError::authentication(format!("callback listener failed: {}", e))
                    .with_source(e)
            })??;

        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            )
            .with_provider(PROVIDER_NAME));
        }

        info!("received authorization code, exchanging for tokens...");

        self.exchange_code(
            &registration,
            &callback.code,
            &pkce.verifier,
            &redirect_uri,
            scopes,
        )
        .await
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        registration: &ClientRegistration,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<Credential> {
        let params = [
            ("client_id", registration.client_id.as_str()),
            ("client_secret", registration.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let token = self
            .post_token_request(&self.config.token_url, &params, "token exchange")
            .await?;

        let granted = token.granted_scopes().unwrap_or_else(|| scopes.to_vec());
        if token.refresh_token.is_none() {
            warn!("token endpoint did not return a refresh token");
        }

        info!("successfully obtained tokens");
        Ok(
            Credential::new(token.access_token, token.refresh_token, token.expires_in, granted)
                .with_client(
                    &registration.client_id,
                    &registration.client_secret,
                    &self.config.token_url,
                ),
        )
    }

    /// Redeems the refresh token of `credential`.
    async fn run_refresh(&self, credential: &Credential) -> ProviderResult<Credential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::authentication("credential has no refresh token"))?;

        let registration = match (&credential.client_id, &credential.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() => ClientRegistration::new(id, secret),
            _ => {
                debug!("credential carries no client, using the configured registration");
                self.config.registration.resolve()?
            }
        };
        let token_uri = credential
            .token_uri
            .clone()
            .unwrap_or_else(|| self.config.token_url.clone());

        let params = [
            ("client_id", registration.client_id.as_str()),
            ("client_secret", registration.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token = self
            .post_token_request(&token_uri, &params, "token refresh")
            .await?;

        let granted = token.granted_scopes();
        let mut renewed = credential
            .clone()
            .with_client(registration.client_id, registration.client_secret, token_uri);
        renewed.apply_refresh(
            token.access_token,
            token.expires_in,
            token.refresh_token,
            granted,
        );

        info!("successfully refreshed access token");
        Ok(renewed)
    }

    /// Posts a form to the token endpoint and parses the token response.
    async fn post_token_request(
        &self,
        url: &str,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        debug!(endpoint = %url, "{} request", what);

        let response = self
            .http_client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::authentication(format!("{} request failed: {}", what, e))
                    .with_provider(PROVIDER_NAME)
                    .with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::authentication(format!("failed to read {} response: {}", what, e))
                .with_provider(PROVIDER_NAME)
                .with_source(e)
        })?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                what, status, body
            ))
            .with_provider(PROVIDER_NAME));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::authentication(format!("invalid {} response: {}", what, e))
                .with_provider(PROVIDER_NAME)
                .with_source(e)
        })
    }

    /// Binds a TCP listener on the first available port in the given range.
    ///
    /// Port `0` asks the OS for a free port.
    fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) else {
                continue;
            };
            let bound = listener.local_addr().map_err(|e| {
                ProviderError::authentication(format!("failed to read loopback address: {}", e))
            })?;
            debug!("bound loopback server on port {}", bound.port());
            return Ok((listener, bound.port()));
        }
        Err(ProviderError::authentication(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    /// Blocks until the OAuth callback arrives.
    ///
    /// There is no overall deadline; only each connection's first line is
    /// bounded by `read_timeout`.
    fn wait_for_callback(
        listener: TcpListener,
        read_timeout: Duration,
    ) -> ProviderResult<AuthorizationCallback> {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Some(result) = Self::handle_callback(stream, read_timeout) {
                        return result;
                    }
                }
                Err(e) => warn!("failed to accept connection: {}", e),
            }
        }
        Err(ProviderError::authentication("loopback listener closed"))
    }

    /// Handles one HTTP request on the callback server.
    ///
    /// Returns `None` for requests that are not the OAuth callback, including
    /// connections that send nothing within `read_timeout`.
    fn handle_callback(
        mut stream: TcpStream,
        read_timeout: Duration,
    ) -> Option<ProviderResult<AuthorizationCallback>> {
        if let Err(e) = stream.set_read_timeout(Some(read_timeout)) {
            warn!("failed to set loopback read timeout: {}", e);
            return None;
        }

        let mut request_line = String::new();
        match BufReader::new(&stream).read_line(&mut request_line) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => {
                debug!("dropping silent loopback connection: {}", e);
                return None;
            }
        }

        // GET /callback?code=...&state=... HTTP/1.1
        let mut parts = request_line.split_whitespace();
        if parts.next() != Some("GET") {
            return None;
        }
        let target = parts.next()?;
        let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
        if url.path() != CALLBACK_PATH {
            debug!("ignoring loopback request for {}", url.path());
            return None;
        }

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        let response = if error.is_some() || code.is_none() {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization Failed</h1>\
            <p>You can close this window.</p></body></html>"
        } else {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization Successful</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        };

        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();

        if let Some(error) = error {
            return Some(Err(ProviderError::authentication(format!(
                "authorization denied: {}",
                error
            ))
            .with_provider(PROVIDER_NAME)));
        }

        Some(match code {
            Some(code) => Ok(AuthorizationCallback {
                code,
                state: state.unwrap_or_default(),
            }),
            None => Err(ProviderError::authentication(
                "missing authorization code in callback",
            )),
        })
    }
}

impl AuthorizationFlow for GoogleOAuthFlow {
    fn authorize<'a>(&'a self, scopes: &'a [String]) -> BoxFuture<'a, ProviderResult<Credential>> {
        Box::pin(self.run_authorization(scopes))
    }

    fn refresh<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> BoxFuture<'a, ProviderResult<Credential>> {
        Box::pin(self.run_refresh(credential))
    }
}

#[derive(Debug)]
struct AuthorizationCallback {
    code: String,
    state: String,
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        let state = Self::generate_state();

        Self {
            verifier,
            challenge,
            state,
        }
    }

    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    fn generate_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Builds the authorization URL on top of `auth_endpoint`.
    pub fn build_auth_url(
        &self,
        auth_endpoint: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<String> {
        let scope = scopes.join(" ");
        let url = Url::parse_with_params(
            auth_endpoint,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", self.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", self.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| {
            ProviderError::authentication(format!("invalid authorization endpoint: {}", e))
        })?;
        Ok(url.into())
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Space-separated granted scopes.
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    fn granted_scopes(&self) -> Option<Vec<String>> {
        let scopes: Vec<String> = self
            .scope
            .as_deref()?
            .split_whitespace()
            .map(String::from)
            .collect();
        (!scopes.is_empty()).then_some(scopes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Read;
    use std::thread;

    use chrono::{Duration, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::google::config::RegistrationSource;

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar";
    const READ_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(200);

    fn registration() -> ClientRegistration {
        ClientRegistration::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    fn flow_for(server: &MockServer) -> GoogleOAuthFlow {
        let config = GoogleConfig::new(RegistrationSource::Inline(registration()))
            .with_oauth_endpoints(
                format!("{}/auth", server.uri()),
                format!("{}/token", server.uri()),
            );
        GoogleOAuthFlow::new(config).unwrap()
    }

    fn query(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Plays the browser: follows the redirect with a code and the given state.
    fn send_callback(redirect_uri: &str, query: &str) -> String {
        let url = Url::parse(redirect_uri).unwrap();
        let mut stream =
            TcpStream::connect(("127.0.0.1", url.port().unwrap())).unwrap();
        write!(
            stream,
            "GET {}?{} HTTP/1.1\r\nHost: localhost\r\n\r\n",
            url.path(),
            query
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn consenting_browser(auth_url: &str) -> io::Result<()> {
        let params = query(auth_url);
        let redirect_uri = params["redirect_uri"].clone();
        let state = params["state"].clone();
        thread::spawn(move || send_callback(&redirect_uri, &format!("code=test-code&state={state}")));
        Ok(())
    }

    fn forging_browser(auth_url: &str) -> io::Result<()> {
        let redirect_uri = query(auth_url)["redirect_uri"].clone();
        thread::spawn(move || send_callback(&redirect_uri, "code=test-code&state=forged"));
        Ok(())
    }

    #[test]
    fn pkce_verifier_length() {
        let flow = PkceFlow::new();
        // Base64 encoding of 32 bytes = 43 characters (no padding)
        assert_eq!(flow.verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_is_deterministic() {
        let verifier = "test-verifier-string";
        assert_eq!(
            PkceFlow::compute_challenge(verifier),
            PkceFlow::compute_challenge(verifier)
        );
    }

    #[test]
    fn pkce_values_are_random() {
        let flow1 = PkceFlow::new();
        let flow2 = PkceFlow::new();
        assert_ne!(flow1.challenge, flow2.challenge);
        assert_ne!(flow1.state, flow2.state);
    }

    #[test]
    fn auth_url_carries_pkce_and_offline_access() {
        let flow = PkceFlow::new();
        let url = flow
            .build_auth_url(
                "https://accounts.google.com/o/oauth2/v2/auth",
                "test-client.apps.googleusercontent.com",
                "http://127.0.0.1:8080/callback",
                &[SCOPE.to_string(), "openid".to_string()],
            )
            .unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        let params = query(&url);
        assert_eq!(params["client_id"], "test-client.apps.googleusercontent.com");
        assert_eq!(params["redirect_uri"], "http://127.0.0.1:8080/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], format!("{SCOPE} openid"));
        assert_eq!(params["code_challenge"], flow.challenge);
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["state"], flow.state);
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
    }

    #[test]
    fn auth_url_rejects_invalid_endpoint() {
        let err = PkceFlow::new()
            .build_auth_url("not a url", "id", "http://127.0.0.1/callback", &[])
            .unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn os_assigned_loopback_port() {
        let (listener, port) = GoogleOAuthFlow::bind_loopback_server((0, 0)).unwrap();
        assert_ne!(port, 0);
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }

    #[test]
    fn callback_yields_code_and_state() {
        let (listener, port) = GoogleOAuthFlow::bind_loopback_server((0, 0)).unwrap();
        let browser = thread::spawn(move || {
            send_callback(
                &format!("http://127.0.0.1:{port}/callback"),
                "code=4%2F0abc&state=xyz&scope=calendar",
            )
        });

        let callback = GoogleOAuthFlow::wait_for_callback(listener, READ_TIMEOUT).unwrap();

        assert_eq!(callback.code, "4/0abc");
        assert_eq!(callback.state, "xyz");
        assert!(browser.join().unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[test]
    fn callback_ignores_other_paths() {
        let (listener, port) = GoogleOAuthFlow::bind_loopback_server((0, 0)).unwrap();
        let browser = thread::spawn(move || {
            let mut favicon = TcpStream::connect(("127.0.0.1", port)).unwrap();
            favicon
                .write_all(b"GET /favicon.ico HTTP/1.1\r\n\r\n")
                .unwrap();
            drop(favicon);
            send_callback(&format!("http://127.0.0.1:{port}/callback"), "code=c&state=s")
        });

        let callback = GoogleOAuthFlow::wait_for_callback(listener, READ_TIMEOUT).unwrap();

        assert_eq!(callback.code, "c");
        browser.join().unwrap();
    }

    #[test]
    fn callback_survives_idle_preconnect() {
        let (listener, port) = GoogleOAuthFlow::bind_loopback_server((0, 0)).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let result = GoogleOAuthFlow::wait_for_callback(listener, READ_TIMEOUT);
            let _ = tx.send(result);
        });

        // Connects first and never writes
        let idle = TcpStream::connect(("127.0.0.1", port)).unwrap();
        thread::sleep(std::time::Duration::from_millis(50));
        let response =
            send_callback(&format!("http://127.0.0.1:{port}/callback"), "code=c&state=s");

        let callback = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("callback server stalled behind an idle connection")
            .unwrap();
        assert_eq!(callback.code, "c");
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        drop(idle);
    }

    #[test]
    fn callback_error_is_authentication_failure() {
        let (listener, port) = GoogleOAuthFlow::bind_loopback_server((0, 0)).unwrap();
        let browser = thread::spawn(move || {
            send_callback(
                &format!("http://127.0.0.1:{port}/callback"),
                "error=access_denied&state=s",
            )
        });

        let err = GoogleOAuthFlow::wait_for_callback(listener, READ_TIMEOUT).unwrap_err();

        assert!(err.is_authentication());
        assert!(err.message().contains("access_denied"));
        assert!(browser.join().unwrap().starts_with("HTTP/1.1 400"));
    }

    #[test]
    fn callback_without_code_is_authentication_failure() {
        let (listener, port) = GoogleOAuthFlow::bind_loopback_server((0, 0)).unwrap();
        let browser = thread::spawn(move || {
            send_callback(&format!("http://127.0.0.1:{port}/callback"), "state=s")
        });

        let err = GoogleOAuthFlow::wait_for_callback(listener, READ_TIMEOUT).unwrap_err();
        assert!(err.is_authentication());
        browser.join().unwrap();
    }

    #[tokio::test]
    async fn interactive_flow_exchanges_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=test-code"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.fresh",
                "refresh_token": "1//refresh",
                "expires_in": 3599,
                "scope": SCOPE,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let flow = flow_for(&server).with_url_opener(consenting_browser);
        let cred = flow.authorize(&[SCOPE.to_string()]).await.unwrap();

        assert_eq!(cred.access_token, "ya29.fresh");
        assert_eq!(cred.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(cred.scopes, vec![SCOPE.to_string()]);
        assert_eq!(
            cred.client_id.as_deref(),
            Some("test-client.apps.googleusercontent.com")
        );
        assert_eq!(cred.token_uri, Some(format!("{}/token", server.uri())));
        assert!(cred.is_valid());
    }

    #[tokio::test]
    async fn interactive_flow_rejects_state_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let flow = flow_for(&server).with_url_opener(forging_browser);
        let err = flow.authorize(&[SCOPE.to_string()]).await.unwrap_err();

        assert!(err.is_authentication());
        assert!(err.message().contains("state mismatch"));
    }

    #[tokio::test]
    async fn interactive_flow_requires_registration() {
        let config = GoogleConfig::new(RegistrationSource::File(
            "/nonexistent/credentials.json".into(),
        ));
        let flow = GoogleOAuthFlow::new(config)
            .unwrap()
            .with_url_opener(|_| panic!("browser must not open"));

        let err = flow.authorize(&[SCOPE.to_string()]).await.unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn exchange_falls_back_to_requested_scopes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.fresh",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let flow = flow_for(&server);
        let cred = flow
            .exchange_code(
                &registration(),
                "code",
                "verifier",
                "http://127.0.0.1:1/callback",
                &[SCOPE.to_string()],
            )
            .await
            .unwrap();

        assert_eq!(cred.scopes, vec![SCOPE.to_string()]);
        assert!(cred.refresh_token.is_none());
    }

    #[tokio::test]
    async fn exchange_failure_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let err = flow_for(&server)
            .exchange_code(&registration(), "bad", "v", "http://127.0.0.1:1/callback", &[])
            .await
            .unwrap_err();

        assert!(err.is_authentication());
        assert!(err.message().contains("invalid_grant"));
        assert_eq!(err.provider(), Some("google"));
    }

    fn stale_credential(server: &MockServer) -> Credential {
        let mut cred = Credential::new(
            "ya29.stale",
            Some("1//refresh".to_string()),
            None,
            vec![SCOPE.to_string()],
        )
        .with_client("stored-client", "stored-secret", format!("{}/token", server.uri()));
        cred.expires_at = Some(Utc::now() - Duration::minutes(1));
        cred
    }

    #[tokio::test]
    async fn refresh_uses_stored_client_and_keeps_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_id=stored-client"))
            .and(body_string_contains("refresh_token=1%2F%2Frefresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.renewed",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stale = stale_credential(&server);
        let renewed = flow_for(&server).refresh(&stale).await.unwrap();

        assert_eq!(renewed.access_token, "ya29.renewed");
        assert_eq!(renewed.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(renewed.scopes, vec![SCOPE.to_string()]);
        assert_eq!(renewed.client_id.as_deref(), Some("stored-client"));
        assert!(renewed.is_valid());
        assert_eq!(stale.access_token, "ya29.stale");
    }

    #[tokio::test]
    async fn refresh_takes_rotated_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.renewed",
                "refresh_token": "1//rotated",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        let renewed = flow_for(&server)
            .refresh(&stale_credential(&server))
            .await
            .unwrap();
        assert_eq!(renewed.refresh_token.as_deref(), Some("1//rotated"));
    }

    #[tokio::test]
    async fn refresh_without_stored_client_uses_registration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "client_id=test-client.apps.googleusercontent.com",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.renewed",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cred = Credential::new("", Some("1//refresh".to_string()), None, vec![]);
        let renewed = flow_for(&server).refresh(&cred).await.unwrap();

        assert_eq!(renewed.access_token, "ya29.renewed");
        assert_eq!(renewed.token_uri, Some(format!("{}/token", server.uri())));
    }

    #[tokio::test]
    async fn rejected_refresh_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = flow_for(&server)
            .refresh(&stale_credential(&server))
            .await
            .unwrap_err();

        assert!(err.is_authentication());
        assert!(err.message().contains("token refresh failed"));
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_is_authentication_error() {
        let flow = GoogleOAuthFlow::new(GoogleConfig::new(RegistrationSource::Inline(
            registration(),
        )))
        .unwrap();
        let mut cred = Credential::new("", Some("1//refresh".to_string()), None, vec![]);
        // Nothing listens on port 9 locally
        cred.token_uri = Some("http://127.0.0.1:9/token".to_string());

        let err = flow.refresh(&cred).await.unwrap_err();
        assert!(err.is_authentication());
    }

    #[tokio::test]
    async fn refresh_requires_refresh_token() {
        let server = MockServer::start().await;
        let cred = Credential::new("ya29.stale", None, Some(-60), vec![]);

        let err = flow_for(&server).refresh(&cred).await.unwrap_err();
        assert!(err.is_authentication());
    }
}
