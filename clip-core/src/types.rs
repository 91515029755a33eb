use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A post as fetched from a community listing. Only `id` outlives the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ForumPost {
    pub id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub permalink: String,
    pub score: i64,
    pub is_self: bool,
    pub community: String,
    pub created_utc: i64,
}

/// Handle for a community that resolved successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct Community {
    pub name: String,
    pub title: String,
    pub subscribers: u64,
}

/// A post matched to a clip page, queued for download and publish.
#[derive(Debug, Clone)]
pub struct ClipCandidate {
    pub post: ForumPost,
    pub clip_url: String,
    pub local_file: Option<PathBuf>,
}

impl ClipCandidate {
    pub fn new(post: ForumPost, clip_url: String) -> Self {
        Self {
            post,
            clip_url,
            local_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        };
        f.write_str(value)
    }
}

/// Everything the publisher needs for one upload.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub file_path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVideo {
    pub video_id: String,
}

impl PublishedVideo {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }
}

/// Progress notifications emitted while an upload is in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadProgress {
    Started { total_bytes: u64 },
    Uploading { bytes_sent: u64, total_bytes: u64 },
    Completed { video_id: String },
    Failed { reason: String },
}
