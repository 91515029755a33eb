pub mod api;


use async_trait::async_trait;
use clip_core::{
    log_channels, Community, CoreError, ForumClient, ForumPost, RedditAccount, RedditApiError,
};
use serde::Deserialize;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub use api::{RedditApiClient, REDDIT_API_BASE};

pub const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Tokens are renewed this long before they actually expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl From<&RedditAccount> for RedditCredentials {
    fn from(account: &RedditAccount) -> Self {
        Self {
            username: account.username.clone(),
            password: account.password.clone(),
            client_id: account.client_id.clone(),
            client_secret: account.client_secret.clone(),
            user_agent: account.user_agent.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

#[derive(Debug, Clone)]
pub enum AuthState {
    NotAuthenticated,
    Authenticated { token: RedditToken },
    TokenExpired,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Script-app client for one bot account.
pub struct RedditClient {
    credentials: RedditCredentials,
    api_client: RedditApiClient,
    token_url: String,
    auth_state: RwLock<AuthState>,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self, CoreError> {
        Self::with_endpoints(credentials, REDDIT_API_BASE, TOKEN_URL)
    }

    pub fn with_endpoints(
        credentials: RedditCredentials,
        api_base: &str,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let api_client = RedditApiClient::with_base_url(credentials.user_agent.clone(), api_base)?;
        Ok(Self {
            credentials,
            api_client,
            token_url: token_url.to_string(),
            auth_state: RwLock::new(AuthState::NotAuthenticated),
        })
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub async fn get_auth_state(&self) -> AuthState {
        self.auth_state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(
            &*self.auth_state.read().await,
            AuthState::Authenticated { token } if !token.is_expired()
        )
    }

    /// Password grant against the token endpoint.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        info!(
            target: log_channels::SESSION,
            "Authenticating as u/{}", self.credentials.username
        );

        let form = [
            ("grant_type", "password"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];
        let response = self
            .api_client
            .http_client()
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(self
                .reject(format!("token endpoint answered {}", status))
                .await);
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse token response: {}", e),
            })
        })?;

        let access_token = match (body.access_token, body.error) {
            (_, Some(error)) => return Err(self.reject(error).await),
            (Some(token), None) => token,
            (None, None) => return Err(self.reject("no access token issued".to_string()).await),
        };

        let token = RedditToken {
            access_token,
            expires_at: SystemTime::now() + Duration::from_secs(body.expires_in.unwrap_or(3600)),
        };
        *self.auth_state.write().await = AuthState::Authenticated { token };
        info!(target: log_channels::SESSION, "Reddit authentication succeeded");
        Ok(())
    }

    async fn reject(&self, reason: String) -> CoreError {
        *self.auth_state.write().await = AuthState::NotAuthenticated;
        CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason })
    }

    async fn access_token(&self) -> Result<String, CoreError> {
        {
            let mut state = self.auth_state.write().await;
            match &*state {
                AuthState::Authenticated { token } if !token.is_expired() => {
                    return Ok(token.access_token.clone());
                }
                AuthState::Authenticated { .. } => {
                    debug!(target: log_channels::SESSION, "Reddit token expired");
                    *state = AuthState::TokenExpired;
                }
                _ => {}
            }
        }

        self.authenticate().await?;
        match &*self.auth_state.read().await {
            AuthState::Authenticated { token } => Ok(token.access_token.clone()),
            _ => Err(CoreError::RedditApi(RedditApiError::InvalidToken)),
        }
    }

    /// Runs `op` with a valid token, re-authenticating once if the token is rejected.
    async fn with_token<T, F, Fut>(&self, op: F) -> Result<T, CoreError>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let token = self.access_token().await?;
        match op(token).await {
            Err(CoreError::RedditApi(RedditApiError::InvalidToken)) => {
                warn!(
                    target: log_channels::SESSION,
                    "Reddit rejected the access token, re-authenticating"
                );
                *self.auth_state.write().await = AuthState::TokenExpired;
                let token = self.access_token().await?;
                op(token).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl ForumClient for RedditClient {
    async fn get_community(&self, name: &str) -> Result<Community, CoreError> {
        self.with_token(|token| async move {
            self.api_client.get_subreddit_info(&token, name).await
        })
        .await
    }

    async fn list_recent(
        &self,
        community: &Community,
        limit: u32,
    ) -> Result<Vec<ForumPost>, CoreError> {
        self.with_token(|token| async move {
            self.api_client
                .get_subreddit_posts(&token, &community.name, "new", limit)
                .await
        })
        .await
    }

    async fn list_trending(
        &self,
        community: &Community,
        limit: u32,
    ) -> Result<Vec<ForumPost>, CoreError> {
        self.with_token(|token| async move {
            self.api_client
                .get_subreddit_posts(&token, &community.name, "rising", limit)
                .await
        })
        .await
    }

    async fn comment_on(&self, post_id: &str, text: &str) -> Result<(), CoreError> {
        self.with_token(|token| async move {
            // Re-fetch first so deleted posts surface as PostNotFound
            let post = self.api_client.get_post(&token, post_id).await?;
            self.api_client.submit_comment(&token, &post.id, text).await
        })
        .await?;

        info!(
            target: log_channels::SESSION,
            "Commented on post {}", post_id
        );
        Ok(())
    }
}
