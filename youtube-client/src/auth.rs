//! Installed-application authorization for the YouTube Data API.
//!
//! Credentials come from a `client_secret.json` downloaded from the Google
//! console. The granted token is cached next to the settings and refreshed
//! on demand; a fresh grant needs an operator at the console once.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clip_core::{log_channels, CoreError, HostingError};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const UPLOAD_SCOPE: &str = "https://www.googleapis.com/auth/youtube.upload";
pub const CREDENTIALS_CONSOLE_URL: &str = "https://console.developers.google.com/apis/credentials";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_REDIRECT_URI: &str = "http://localhost";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecretFile {
    pub installed: Option<ClientSecretEntry>,
    pub web: Option<ClientSecretEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecretEntry {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub auth_uri: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

impl ClientSecretFile {
    pub fn parse(json: &str) -> Result<ClientSecretEntry, CoreError> {
        let file: ClientSecretFile = serde_json::from_str(json)?;
        file.installed.or(file.web).ok_or_else(|| {
            HostingError::AuthorizationFailed {
                reason: "client secret has neither an \"installed\" nor a \"web\" section"
                    .to_string(),
            }
            .into()
        })
    }

    pub async fn load(path: &Path) -> Result<ClientSecretEntry, CoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(json) => Self::parse(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HostingError::MissingClientSecret {
                    path: path.display().to_string(),
                }
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Token as cached on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Utc::now() + ChronoDuration::seconds(EXPIRY_MARGIN_SECS) >= at,
            None => false,
        }
    }

    /// Google omits the refresh token on refresh responses; `previous` keeps it.
    fn from_response(response: &BasicTokenResponse, previous: Option<&str>) -> Self {
        let expires_at = response.expires_in().and_then(|d| {
            ChronoDuration::from_std(d)
                .ok()
                .map(|d| Utc::now() + d)
        });
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| previous.map(str::to_string)),
            expires_at,
        }
    }
}

/// Pulls the authorization code out of whatever the operator pasted: either
/// the full redirected URL or the bare code.
pub fn parse_authorization_input(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match url::Url::parse(input) {
        Ok(parsed) => parsed
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned()),
        Err(_) => Some(input.to_string()),
    }
}

fn authorization_failed(reason: impl std::fmt::Display) -> CoreError {
    HostingError::AuthorizationFailed {
        reason: reason.to_string(),
    }
    .into()
}

pub struct YouTubeAuth {
    oauth: BasicClient,
    token_path: PathBuf,
    token: Mutex<Option<StoredToken>>,
}

impl YouTubeAuth {
    pub fn new(secret: &ClientSecretEntry, token_path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(
            secret
                .auth_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
        )
        .map_err(authorization_failed)?;
        let token_url = TokenUrl::new(
            secret
                .token_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        )
        .map_err(authorization_failed)?;
        let redirect = secret
            .redirect_uris
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

        let oauth = BasicClient::new(
            ClientId::new(secret.client_id.clone()),
            secret.client_secret.clone().map(ClientSecret::new),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(RedirectUrl::new(redirect).map_err(authorization_failed)?);

        Ok(Self {
            oauth,
            token_path: token_path.into(),
            token: Mutex::new(None),
        })
    }

    pub async fn from_files(
        client_secret_path: &Path,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self, CoreError> {
        let secret = ClientSecretFile::load(client_secret_path).await?;
        Self::new(&secret, token_path)
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// Returns the authorization URL and the verifier to redeem its code with.
    pub fn authorization_url(&self) -> (url::Url, PkceCodeVerifier) {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf) = self
            .oauth
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(UPLOAD_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(challenge)
            .url();
        (auth_url, verifier)
    }

    /// Startup authorization: cached token, refreshed token, or an operator grant.
    pub async fn authorize(&self) -> Result<(), CoreError> {
        if let Some(cached) = self.load_cached().await {
            if !cached.is_expired() {
                info!(target: log_channels::YOUTUBE, "Using cached YouTube token");
                *self.token.lock().await = Some(cached);
                return Ok(());
            }
            if let Some(refresh) = cached.refresh_token.clone() {
                match self.refresh(&refresh).await {
                    Ok(token) => {
                        *self.token.lock().await = Some(token);
                        return Ok(());
                    }
                    Err(e) => warn!(
                        target: log_channels::YOUTUBE,
                        "Cached YouTube token could not be refreshed: {}", e
                    ),
                }
            }
        }

        let token = self.interactive_grant().await?;
        *self.token.lock().await = Some(token);
        Ok(())
    }

    /// A valid access token, refreshing the cached one when it has expired.
    pub async fn access_token(&self) -> Result<String, CoreError> {
        let mut guard = self.token.lock().await;
        let current = guard
            .clone()
            .ok_or_else(|| authorization_failed("YouTube account has not been authorized"))?;
        if !current.is_expired() {
            return Ok(current.access_token);
        }

        let refresh = current
            .refresh_token
            .as_deref()
            .ok_or_else(|| authorization_failed("token expired and no refresh token is cached"))?;
        let token = self.refresh(refresh).await?;
        let access = token.access_token.clone();
        *guard = Some(token);
        Ok(access)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredToken, CoreError> {
        debug!(target: log_channels::YOUTUBE, "Refreshing YouTube access token");
        let response = self
            .oauth
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(authorization_failed)?;
        let token = StoredToken::from_response(&response, Some(refresh_token));
        self.store(&token).await?;
        Ok(token)
    }

    async fn interactive_grant(&self) -> Result<StoredToken, CoreError> {
        let (auth_url, verifier) = self.authorization_url();
        println!("Authorize this application for YouTube uploads by visiting:\n");
        println!("{}\n", auth_url);
        println!("Then paste the URL you were redirected to (or just the code):");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;
        let code = parse_authorization_input(&line)
            .ok_or_else(|| authorization_failed("no authorization code was entered"))?;

        let response = self
            .oauth
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(verifier)
            .request_async(async_http_client)
            .await
            .map_err(authorization_failed)?;

        let token = StoredToken::from_response(&response, None);
        self.store(&token).await?;
        info!(target: log_channels::YOUTUBE, "YouTube authorization granted");
        Ok(token)
    }

    async fn load_cached(&self) -> Option<StoredToken> {
        let json = tokio::fs::read_to_string(&self.token_path).await.ok()?;
        match serde_json::from_str(&json) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(
                    target: log_channels::YOUTUBE,
                    "Ignoring unreadable token cache {}: {}",
                    self.token_path.display(),
                    e
                );
                None
            }
        }
    }

    async fn store(&self, token: &StoredToken) -> Result<(), CoreError> {
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.token_path, json).await?;
        Ok(())
    }
}
