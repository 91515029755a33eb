use crate::error::*;
use crate::log_channels;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!(target: log_channels::ERRORS, "CoreError: {}", self);
        match self {
            CoreError::RedditApi(e) => {
                error!(target: log_channels::ERRORS, "Reddit API error details: {:?}", e);
            }
            CoreError::Hosting(e) => {
                error!(target: log_channels::ERRORS, "Hosting error details: {:?}", e);
            }
            CoreError::Fetch(e) => {
                error!(target: log_channels::ERRORS, "Fetch error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!(target: log_channels::ERRORS, "Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(target: log_channels::SESSION, "CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::RedditApi(e) => e.is_retryable(),
            CoreError::Hosting(e) => e.is_retryable(),
            CoreError::Fetch(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            CoreError::RequestFailed { status_code, .. } => {
                matches!(status_code, Some(429) | Some(500..=599))
            }
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            CoreError::Fetch(e) => e.retry_after(),
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Hosting(e) => e.user_friendly_message(),
            CoreError::Fetch(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            CoreError::NotFound { resource } => format!("Could not find: {}", resource),
            CoreError::RequestFailed { message, .. } => {
                format!("Request failed: {}", message)
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API".to_string(),
            CoreError::Hosting(_) => "HOSTING".to_string(),
            CoreError::Fetch(_) => "FETCH".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::NotFound { .. } => "NOT_FOUND".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
            CoreError::RequestFailed { .. } => "REQUEST_FAILED".to_string(),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn log_error(&self) -> &Self {
        error!(target: log_channels::ERRORS, "RedditApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(target: log_channels::SESSION, "RedditApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            RedditApiError::RateLimitExceeded { .. } => true,
            RedditApiError::RequestTimeout => true,
            RedditApiError::ServerError { status_code } => *status_code >= 500,
            // Freshly submitted posts are not always visible to /api/info yet.
            RedditApiError::PostNotFound { .. } => true,
            RedditApiError::InvalidResponse { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => {
                "Reddit authentication failed. Please check your credentials.".to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => format!(
                "Access denied to {}. The bot account may not have permission.",
                resource
            ),
            RedditApiError::SubredditNotFound { subreddit } => {
                format!("Subreddit '{}' not found or is private.", subreddit)
            }
            RedditApiError::PostNotFound { post_id } => {
                format!("Post '{}' could not be found.", post_id)
            }
            RedditApiError::CommentRejected { reason, .. } => {
                format!("Reddit rejected the comment: {}", reason)
            }
            RedditApiError::InvalidToken => {
                "Reddit authentication token is invalid. It will be re-acquired.".to_string()
            }
            RedditApiError::RequestTimeout => "Request to Reddit timed out.".to_string(),
            _ => "Reddit API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED".to_string(),
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT".to_string(),
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN".to_string(),
            RedditApiError::SubredditNotFound { .. } => "REDDIT_SUBREDDIT_NOT_FOUND".to_string(),
            RedditApiError::PostNotFound { .. } => "REDDIT_POST_NOT_FOUND".to_string(),
            RedditApiError::CommentRejected { .. } => "REDDIT_COMMENT_REJECTED".to_string(),
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN".to_string(),
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT".to_string(),
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE".to_string(),
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR".to_string(),
        }
    }
}

impl ErrorExt for HostingError {
    fn log_error(&self) -> &Self {
        error!(target: log_channels::ERRORS, "HostingError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(target: log_channels::YOUTUBE, "HostingError (warning): {}", self);
        self
    }

    // Publish failures are final for a candidate; the session never retries them.
    fn is_retryable(&self) -> bool {
        false
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            HostingError::MissingClientSecret { path } => format!(
                "Missing {}. Create a YouTube API project at \
                 https://console.developers.google.com/apis/credentials and place the \
                 OAuth client secret file there.",
                path
            ),
            HostingError::AuthorizationFailed { .. } => {
                "YouTube authorization failed. Please authorize the application again.".to_string()
            }
            HostingError::UploadRejected { reason, .. } => {
                format!("YouTube rejected the upload: {}", reason)
            }
            HostingError::UploadInterrupted { bytes_sent, .. } => {
                format!("Upload stopped after {} bytes.", bytes_sent)
            }
            HostingError::QuotaExceeded => {
                "YouTube upload quota exhausted for today.".to_string()
            }
            HostingError::InvalidResponse { .. } => {
                "YouTube returned an unexpected response.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            HostingError::MissingClientSecret { .. } => "HOSTING_MISSING_SECRET".to_string(),
            HostingError::AuthorizationFailed { .. } => "HOSTING_AUTH_FAILED".to_string(),
            HostingError::UploadRejected { .. } => "HOSTING_UPLOAD_REJECTED".to_string(),
            HostingError::UploadInterrupted { .. } => "HOSTING_UPLOAD_INTERRUPTED".to_string(),
            HostingError::QuotaExceeded => "HOSTING_QUOTA_EXCEEDED".to_string(),
            HostingError::InvalidResponse { .. } => "HOSTING_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for FetchError {
    fn log_error(&self) -> &Self {
        error!(target: log_channels::ERRORS, "FetchError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(target: log_channels::SESSION, "FetchError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } | FetchError::HttpStatus { .. } => true,
            FetchError::MarkupChanged { .. } | FetchError::VerificationFailed { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        if self.is_retryable() {
            Some(Duration::from_millis(1500))
        } else {
            None
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            FetchError::Transport { url, .. } => format!("Could not reach {}.", url),
            FetchError::HttpStatus { url, status_code } => {
                format!("{} answered with HTTP {}.", url, status_code)
            }
            FetchError::MarkupChanged { .. } => {
                "The clip page layout changed; the media URL could not be found.".to_string()
            }
            FetchError::VerificationFailed { path } => {
                format!("Downloaded clip {} is missing or incomplete.", path)
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            FetchError::Transport { .. } => "FETCH_TRANSPORT".to_string(),
            FetchError::HttpStatus { .. } => "FETCH_HTTP_STATUS".to_string(),
            FetchError::MarkupChanged { .. } => "FETCH_MARKUP_CHANGED".to_string(),
            FetchError::VerificationFailed { .. } => "FETCH_VERIFICATION_FAILED".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!(target: log_channels::ERRORS, "ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!(target: log_channels::SESSION, "ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false // Config errors need the operator to edit the settings file
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::Scaffolded { path } => format!(
                "Settings file has been written at {}. Fill it in and restart.",
                path
            ),
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is incomplete: {}", reason)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
            ConfigError::Serialize(_) => {
                "Default configuration could not be written.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::Scaffolded { .. } => "CONFIG_SCAFFOLDED".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
            ConfigError::Serialize(_) => "CONFIG_SERIALIZE_ERROR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!(target: log_channels::ERRORS, "Error code: {}", error.error_code());
        if error.is_retryable() {
            if let Some(retry_after) = error.retry_after() {
                info!(
                    target: log_channels::ERRORS,
                    "Error is retryable. Suggested retry after: {:?}", retry_after
                );
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        error.log_warn();
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
