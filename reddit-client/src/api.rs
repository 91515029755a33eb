use clip_core::{log_channels, Community, CoreError, ForumPost, RedditApiError};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    pub subreddit: String,
    #[serde(default)]
    pub url: String,
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub over_18: bool,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub is_self: bool,
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubredditData {
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subscribers: Option<u64>,
    #[serde(default)]
    pub over18: bool,
}

/// Reply to `POST /api/comment` with `api_type=json`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentResponse {
    pub json: CommentResponseBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentResponseBody {
    #[serde(default)]
    pub errors: Vec<Vec<serde_json::Value>>,
}

impl CommentResponse {
    /// Joins the API-level error tuples into one message, if there are any.
    pub fn error_message(&self) -> Option<String> {
        if self.json.errors.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .json
            .errors
            .iter()
            .map(|tuple| {
                tuple
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(": ")
            })
            .collect();
        Some(parts.join("; "))
    }
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    user_agent: String,
    base_url: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_base_url(user_agent, REDDIT_API_BASE)
    }

    /// Client for an API host other than `oauth.reddit.com`.
    pub fn with_base_url(user_agent: String, base_url: impl Into<String>) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            user_agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request_builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if let Some(fields) = form {
            request_builder = request_builder.form(fields);
        }

        debug!(target: log_channels::SESSION, "Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    target: log_channels::ERRORS,
                    "Network error for {} {}: {}", method, endpoint, e
                );
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        warn!(
            target: log_channels::ERRORS,
            "Request failed with status: {} for {}", status, endpoint
        );
        Err(match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after })
            }
            401 => CoreError::RedditApi(RedditApiError::InvalidToken),
            403 => CoreError::RedditApi(RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            }),
            404 => CoreError::NotFound {
                resource: endpoint.to_string(),
            },
            code if status.is_server_error() => {
                CoreError::RedditApi(RedditApiError::ServerError { status_code: code })
            }
            code => CoreError::RequestFailed {
                message: format!("{} {}", method, endpoint),
                status_code: Some(code),
            },
        })
    }

    pub async fn get_subreddit_info(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<Community, CoreError> {
        let endpoint = format!("/r/{}/about", subreddit);
        let not_found = || {
            CoreError::RedditApi(RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            })
        };

        let response = match self
            .make_request(Method::GET, &endpoint, access_token, None, None)
            .await
        {
            Ok(response) => response,
            Err(CoreError::NotFound { .. }) => return Err(not_found()),
            Err(e) => return Err(e),
        };

        // Unknown names answer with a search listing instead of a t5 thing
        let thing: RedditListingChild<serde_json::Value> =
            response.json().await.map_err(|e| {
                error!(target: log_channels::ERRORS, "Failed to parse subreddit info: {}", e);
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Failed to parse info for r/{}", subreddit),
                })
            })?;
        parse_subreddit_thing(thing).ok_or_else(not_found)
    }

    /// `sort` is a listing name such as `new` or `rising`.
    pub async fn get_subreddit_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        sort: &str,
        limit: u32,
    ) -> Result<Vec<ForumPost>, CoreError> {
        let endpoint = format!("/r/{}/{}", subreddit, sort);
        let limit_str = limit.to_string();
        let params = [("limit", limit_str.as_str()), ("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params[..]), None)
            .await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!(target: log_channels::ERRORS, "Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse {} posts for r/{}", sort, subreddit),
            })
        })?;

        info!(
            target: log_channels::SESSION,
            "Retrieved {} {} posts from r/{}",
            listing.data.children.len(),
            sort,
            subreddit
        );
        Ok(listing_into_posts(listing, limit))
    }

    /// Fetches one post by its base-36 id.
    pub async fn get_post(&self, access_token: &str, post_id: &str) -> Result<ForumPost, CoreError> {
        let fullname = fullname(post_id);
        let params = [("id", fullname.as_str()), ("raw_json", "1")];

        let response = self
            .make_request(Method::GET, "/api/info", access_token, Some(&params[..]), None)
            .await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!(target: log_channels::ERRORS, "Failed to parse post {}: {}", post_id, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse post {}", post_id),
            })
        })?;

        listing
            .data
            .children
            .into_iter()
            .next()
            .map(|child| child.data.into())
            .ok_or_else(|| {
                CoreError::RedditApi(RedditApiError::PostNotFound {
                    post_id: post_id.to_string(),
                })
            })
    }

    pub async fn submit_comment(
        &self,
        access_token: &str,
        post_id: &str,
        text: &str,
    ) -> Result<(), CoreError> {
        let fullname = fullname(post_id);
        let form = [
            ("api_type", "json"),
            ("thing_id", fullname.as_str()),
            ("text", text),
        ];

        let response = self
            .make_request(Method::POST, "/api/comment", access_token, None, Some(&form[..]))
            .await?;

        let reply: CommentResponse = response.json().await.map_err(|e| {
            error!(target: log_channels::ERRORS, "Failed to parse comment reply: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse comment reply for {}", post_id),
            })
        })?;

        if let Some(reason) = reply.error_message() {
            return Err(CoreError::RedditApi(RedditApiError::CommentRejected {
                post_id: post_id.to_string(),
                reason,
            }));
        }
        Ok(())
    }
}

/// `abc123` becomes `t3_abc123`; already-prefixed ids pass through.
pub fn fullname(post_id: &str) -> String {
    if post_id.starts_with("t3_") {
        post_id.to_string()
    } else {
        format!("t3_{}", post_id)
    }
}

pub fn parse_subreddit_thing(thing: RedditListingChild<serde_json::Value>) -> Option<Community> {
    if thing.kind != "t5" {
        return None;
    }
    let data: RedditSubredditData = serde_json::from_value(thing.data).ok()?;
    Some(Community {
        name: data.display_name,
        title: data.title,
        subscribers: data.subscribers.unwrap_or(0),
    })
}

pub fn listing_into_posts(listing: RedditListing<RedditPostData>, limit: u32) -> Vec<ForumPost> {
    listing
        .data
        .children
        .into_iter()
        .filter(|child| child.kind == "t3")
        .take(limit as usize)
        .map(|child| child.data.into())
        .collect()
}

impl From<RedditPostData> for ForumPost {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            id: post_data.id,
            title: post_data.title,
            body: post_data.selftext,
            url: post_data.url,
            permalink: format!("https://www.reddit.com{}", post_data.permalink),
            score: post_data.score,
            is_self: post_data.is_self,
            community: post_data.subreddit,
            created_utc: post_data.created_utc as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_creation() {
        let client = RedditApiClient::new("test-user-agent/1.0".to_string()).unwrap();
        assert_eq!(client.user_agent(), "test-user-agent/1.0");
    }

    #[test]
    fn test_fullname() {
        assert_eq!(fullname("abc123"), "t3_abc123");
        assert_eq!(fullname("t3_abc123"), "t3_abc123");
    }

    #[test]
    fn test_reddit_post_conversion() {
        let post_data = RedditPostData {
            id: "test123".to_string(),
            title: "Test Post".to_string(),
            selftext: "https://clips.twitch.tv/Abc".to_string(),
            author: "test_user".to_string(),
            subreddit: "LivestreamFail".to_string(),
            url: "https://www.reddit.com/r/LivestreamFail/comments/test123/test_post/".to_string(),
            permalink: "/r/LivestreamFail/comments/test123/test_post/".to_string(),
            created_utc: 1640995200.0,
            score: 42,
            num_comments: 5,
            over_18: false,
            stickied: false,
            is_self: true,
            domain: "self.LivestreamFail".to_string(),
        };

        let post: ForumPost = post_data.into();
        assert_eq!(post.id, "test123");
        assert_eq!(post.body, "https://clips.twitch.tv/Abc");
        assert_eq!(
            post.permalink,
            "https://www.reddit.com/r/LivestreamFail/comments/test123/test_post/"
        );
        assert_eq!(post.score, 42);
        assert!(post.is_self);
        assert_eq!(post.created_utc, 1640995200);
    }
}
