//! Collaborator seams the session loop drives.

use crate::error::CoreError;
use crate::types::{Community, ForumPost, PublishRequest, PublishedVideo};
use async_trait::async_trait;
use std::path::PathBuf;

/// Discussion forum access.
#[async_trait]
pub trait ForumClient: Send + Sync {
    async fn get_community(&self, name: &str) -> Result<Community, CoreError>;

    /// Most recent posts, newest first.
    async fn list_recent(&self, community: &Community, limit: u32)
        -> Result<Vec<ForumPost>, CoreError>;

    /// Trending posts.
    async fn list_trending(
        &self,
        community: &Community,
        limit: u32,
    ) -> Result<Vec<ForumPost>, CoreError>;

    /// Posts `text` as a top-level comment under `post_id`.
    async fn comment_on(&self, post_id: &str, text: &str) -> Result<(), CoreError>;
}

/// Turns a clip page into a local video file.
#[async_trait]
pub trait ClipSource: Send + Sync {
    async fn resolve_media_url(&self, clip_page_url: &str) -> Result<String, CoreError>;

    async fn download(&self, media_url: &str) -> Result<PathBuf, CoreError>;
}

/// Video hosting platform. Returns only once the upload has settled.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedVideo, CoreError>;
}
