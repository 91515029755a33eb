//! In-memory collaborators for driving whole session cycles.

#![allow(dead_code)]

use async_trait::async_trait;
use background_service::{Session, SessionOptions, SessionTiming};
use clip_core::{
    ClipSource, Community, CoreError, FetchError, ForumClient, ForumPost, HostingError,
    PublishRequest, PublishedVideo, Publisher, RedditApiError, Visibility,
};
use dedup_store::DedupStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub fn post(id: &str, url: &str) -> ForumPost {
    ForumPost {
        id: id.to_string(),
        title: format!("Post {}", id),
        body: String::new(),
        url: url.to_string(),
        permalink: format!("https://www.reddit.com/r/example/comments/{}/", id),
        score: 10,
        is_self: false,
        community: "example".to_string(),
        created_utc: 1_700_000_000,
    }
}

pub fn self_post(id: &str, body: &str) -> ForumPost {
    ForumPost {
        body: body.to_string(),
        is_self: true,
        url: format!("https://www.reddit.com/r/example/comments/{}/", id),
        ..post(id, "")
    }
}

#[derive(Default)]
pub struct MockForum {
    recent: Mutex<HashMap<String, Vec<ForumPost>>>,
    trending: Mutex<HashMap<String, Vec<ForumPost>>>,
    /// Lookups of these communities always fail with a retryable error
    unreachable: Mutex<Vec<String>>,
    lookups: AtomicU32,
    /// Number of comment attempts that fail before one succeeds
    comment_failures: AtomicU32,
    comment_attempts: AtomicU32,
    comments: Mutex<Vec<(String, String)>>,
    panic_on_lookup: bool,
}

impl MockForum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panicking() -> Self {
        Self {
            panic_on_lookup: true,
            ..Self::default()
        }
    }

    pub fn set_recent(&self, community: &str, posts: Vec<ForumPost>) {
        self.recent
            .lock()
            .unwrap()
            .insert(community.to_string(), posts);
    }

    pub fn set_trending(&self, community: &str, posts: Vec<ForumPost>) {
        self.trending
            .lock()
            .unwrap()
            .insert(community.to_string(), posts);
    }

    pub fn make_unreachable(&self, community: &str) {
        self.unreachable.lock().unwrap().push(community.to_string());
    }

    pub fn fail_comments(&self, times: u32) {
        self.comment_failures.store(times, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn comment_attempts(&self) -> u32 {
        self.comment_attempts.load(Ordering::SeqCst)
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.comments.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForumClient for MockForum {
    async fn get_community(&self, name: &str) -> Result<Community, CoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_lookup {
            panic!("forum client blew up");
        }
        if self.unreachable.lock().unwrap().iter().any(|n| n == name) {
            return Err(RedditApiError::ServerError { status_code: 503 }.into());
        }
        Ok(Community {
            name: name.to_string(),
            title: name.to_string(),
            subscribers: 1,
        })
    }

    async fn list_recent(&self, community: &Community, limit: u32) -> Result<Vec<ForumPost>, CoreError> {
        let posts = self.recent.lock().unwrap().get(&community.name).cloned().unwrap_or_default();
        Ok(posts.into_iter().take(limit as usize).collect())
    }

    async fn list_trending(
        &self,
        community: &Community,
        limit: u32,
    ) -> Result<Vec<ForumPost>, CoreError> {
        let posts = self.trending.lock().unwrap().get(&community.name).cloned().unwrap_or_default();
        Ok(posts.into_iter().take(limit as usize).collect())
    }

    async fn comment_on(&self, post_id: &str, text: &str) -> Result<(), CoreError> {
        self.comment_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.comment_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.comment_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RedditApiError::PostNotFound {
                post_id: post_id.to_string(),
            }
            .into());
        }
        self.comments
            .lock()
            .unwrap()
            .push((post_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Resolves every clip page to a media URL and "downloads" it into a real file.
pub struct MockClips {
    dir: PathBuf,
    resolved: Mutex<Vec<String>>,
    downloads: AtomicU32,
    broken_pages: Mutex<Vec<String>>,
}

impl MockClips {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            resolved: Mutex::new(Vec::new()),
            downloads: AtomicU32::new(0),
            broken_pages: Mutex::new(Vec::new()),
        }
    }

    pub fn break_page(&self, clip_url: &str) {
        self.broken_pages.lock().unwrap().push(clip_url.to_string());
    }

    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClipSource for MockClips {
    async fn resolve_media_url(&self, clip_page_url: &str) -> Result<String, CoreError> {
        if self.broken_pages.lock().unwrap().iter().any(|u| u == clip_page_url) {
            return Err(FetchError::MarkupChanged {
                url: clip_page_url.to_string(),
            }
            .into());
        }
        self.resolved.lock().unwrap().push(clip_page_url.to_string());
        Ok(format!("{}-1280x720.mp4", clip_page_url))
    }

    async fn download(&self, _media_url: &str) -> Result<PathBuf, CoreError> {
        let n = self.downloads.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("{}.mp4", n));
        tokio::fs::write(&path, b"mp4").await?;
        Ok(path)
    }
}

#[derive(Default)]
pub struct MockPublisher {
    requests: Mutex<Vec<PublishRequest>>,
    fail: bool,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<PublishRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedVideo, CoreError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if self.fail {
            return Err(HostingError::UploadRejected {
                status_code: 400,
                reason: "invalid video".to_string(),
            }
            .into());
        }
        Ok(PublishedVideo {
            video_id: format!("video{}", n),
        })
    }
}

pub struct TestFixture {
    pub forum: Arc<MockForum>,
    pub clips: Arc<MockClips>,
    pub publisher: Arc<MockPublisher>,
    pub dir: PathBuf,
    pub store_path: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_mocks(MockForum::new(), MockPublisher::new())
    }

    pub fn with_mocks(forum: MockForum, publisher: MockPublisher) -> Self {
        let dir = std::env::temp_dir().join(format!("test_session_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self {
            forum: Arc::new(forum),
            clips: Arc::new(MockClips::new(dir.clone())),
            publisher: Arc::new(publisher),
            store_path: dir.join("checked_posts.json"),
            dir,
        }
    }

    pub fn options(communities: &[&str]) -> SessionOptions {
        SessionOptions {
            communities: communities.iter().map(|c| c.to_string()).collect(),
            min_score: None,
            cleanup_clips: false,
            comment_footer: "^^I ^^am ^^a ^^bot.".to_string(),
            tags: vec!["twitch".to_string()],
            category_id: "20".to_string(),
            visibility: Visibility::Public,
        }
    }

    pub async fn session(&self, options: SessionOptions) -> Session {
        let store = DedupStore::load(&self.store_path).await.unwrap();
        Session::new(
            self.forum.clone(),
            self.clips.clone(),
            self.publisher.clone(),
            store,
            options,
        )
        .with_timing(SessionTiming::immediate())
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}
