//! One pass of the republishing pipeline, and the loop that repeats it.
//!
//! A cycle scans every configured community, marking each unseen post in the
//! dedup store before anything else happens to it, and queues the posts that
//! link a clip. The queue is then worked through serially: resolve, download,
//! publish, and comment back on the source post once the video is live.

use clip_core::{
    clip_reference_for, log_channels, ClipCandidate, ClipSource, Community, CoreError,
    ErrorReporter, ForumClient, ForumPost, PublishRequest, PublishedVideo, Publisher,
    RetryExecutor, RetryPolicy, Settings, Visibility,
};
use dedup_store::DedupStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Delays, attempt counts and listing sizes of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTiming {
    pub community_retry: RetryPolicy,
    pub comment_retry: RetryPolicy,
    /// Pause after each community so the forum API is not hit in bursts
    pub community_pause: Duration,
    /// Minimum wall time between the start of two publish phases
    pub cycle_floor: Duration,
    pub recent_limit: u32,
    pub trending_limit: u32,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            community_retry: RetryPolicy::community_lookup(),
            comment_retry: RetryPolicy::comment(),
            community_pause: Duration::from_secs(2),
            cycle_floor: Duration::from_secs(15 * 60),
            recent_limit: 30,
            trending_limit: 15,
        }
    }
}

impl SessionTiming {
    /// Same attempt counts and limits, no waiting anywhere.
    pub fn immediate() -> Self {
        let defaults = Self::default();
        Self {
            community_retry: RetryPolicy::immediate(defaults.community_retry.max_attempts),
            comment_retry: RetryPolicy::immediate(defaults.comment_retry.max_attempts),
            community_pause: Duration::ZERO,
            cycle_floor: Duration::ZERO,
            ..defaults
        }
    }
}

/// What the operator configured for selection and publishing.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub communities: Vec<String>,
    pub min_score: Option<i64>,
    pub cleanup_clips: bool,
    pub comment_footer: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub visibility: Visibility,
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            communities: settings.communities.clone(),
            min_score: settings.min_score,
            cleanup_clips: settings.cleanup_clips,
            comment_footer: settings.comment_footer.clone(),
            tags: settings.youtube.tags.clone(),
            category_id: settings.youtube.category_id.clone(),
            visibility: settings.youtube.privacy,
        }
    }
}

/// Counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub communities_scanned: usize,
    pub communities_skipped: usize,
    pub posts_examined: usize,
    pub posts_already_seen: usize,
    pub candidates_queued: usize,
    pub published: Vec<String>,
    pub publish_failures: usize,
    pub fetch_failures: usize,
    pub comments_posted: usize,
    pub comment_failures: usize,
    /// Lookup attempts made this cycle, retries included
    pub lookup_attempts: u64,
    /// Comment attempts made this cycle, retries included
    pub comment_attempts: u64,
    pub processing_time: Duration,
    pub pacing: Duration,
}

/// Time left until the cycle floor; zero once processing already took longer.
pub fn pacing_delay(cycle_floor: Duration, processing: Duration) -> Duration {
    cycle_floor.saturating_sub(processing)
}

pub fn comment_text(video: &PublishedVideo, footer: &str) -> String {
    format!("YouTube mirror: {}\n\n---\n\n{}", video.watch_url(), footer)
}

/// Everything one worker needs. The dedup store is owned here and only
/// touched from the worker task.
pub struct Session {
    forum: Arc<dyn ForumClient>,
    clips: Arc<dyn ClipSource>,
    publisher: Arc<dyn Publisher>,
    store: DedupStore,
    options: SessionOptions,
    timing: SessionTiming,
    lookup_retry: RetryExecutor,
    comment_retry: RetryExecutor,
    reporter: ErrorReporter,
}

impl Session {
    pub fn new(
        forum: Arc<dyn ForumClient>,
        clips: Arc<dyn ClipSource>,
        publisher: Arc<dyn Publisher>,
        store: DedupStore,
        options: SessionOptions,
    ) -> Self {
        let timing = SessionTiming::default();
        Self {
            forum,
            clips,
            publisher,
            store,
            options,
            lookup_retry: RetryExecutor::new(timing.community_retry.clone()),
            comment_retry: RetryExecutor::new(timing.comment_retry.clone()),
            timing,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn with_timing(mut self, timing: SessionTiming) -> Self {
        self.lookup_retry = RetryExecutor::new(timing.community_retry.clone());
        self.comment_retry = RetryExecutor::new(timing.comment_retry.clone());
        self.timing = timing;
        self
    }

    pub fn store(&self) -> &DedupStore {
        &self.store
    }

    pub fn timing(&self) -> &SessionTiming {
        &self.timing
    }

    /// Repeats cycles until `stop` flips to true or its sender goes away.
    /// The flag is looked at between cycles and during the pacing sleep only.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        info!(
            target: log_channels::SESSION,
            "Session started for {} communities",
            self.options.communities.len()
        );

        while !*stop.borrow() {
            let report = self.run_cycle().await;
            info!(
                target: log_channels::SESSION,
                "Cycle done: {} posts examined, {} queued, {} published, {} comments \
                 ({} lookup and {} comment attempts), next cycle in {:?}",
                report.posts_examined,
                report.candidates_queued,
                report.published.len(),
                report.comments_posted,
                report.lookup_attempts,
                report.comment_attempts,
                report.pacing
            );

            if report.pacing.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                _ = sleep(report.pacing) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(target: log_channels::SESSION, "Session stopped");
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        self.lookup_retry.reset_metrics();
        self.comment_retry.reset_metrics();

        let queue = self.discover(&mut report).await;
        report.candidates_queued = queue.len();

        let started = Instant::now();
        self.process_queue(queue, &mut report).await;
        self.persist_store().await;
        report.processing_time = started.elapsed();
        report.pacing = pacing_delay(self.timing.cycle_floor, report.processing_time);
        report.lookup_attempts = self.lookup_retry.get_metrics().total_attempts;
        report.comment_attempts = self.comment_retry.get_metrics().total_attempts;

        report
    }

    /// Scans every configured community and returns this cycle's queue.
    pub async fn discover(&mut self, report: &mut CycleReport) -> Vec<ClipCandidate> {
        let mut queue = Vec::new();
        let communities = self.options.communities.clone();

        for (index, name) in communities.iter().enumerate() {
            match self.lookup_community(name).await {
                Some(community) => {
                    report.communities_scanned += 1;
                    self.scan_community(&community, &mut queue, report).await;
                }
                None => report.communities_skipped += 1,
            }

            self.persist_store().await;
            let last = index + 1 == communities.len();
            if !last && !self.timing.community_pause.is_zero() {
                sleep(self.timing.community_pause).await;
            }
        }

        queue
    }

    async fn lookup_community(&self, name: &str) -> Option<Community> {
        let forum = &self.forum;
        let operation = format!("community lookup r/{}", name);

        match self
            .lookup_retry
            .execute(&operation, |_| forum.get_community(name))
            .await
        {
            Ok(community) => Some(community),
            Err(e) => {
                warn!(
                    target: log_channels::SESSION,
                    "Skipping r/{} this cycle", name
                );
                self.reporter.report_error(&e);
                None
            }
        }
    }

    async fn scan_community(
        &mut self,
        community: &Community,
        queue: &mut Vec<ClipCandidate>,
        report: &mut CycleReport,
    ) {
        let recent = self
            .list_posts(community, "new", self.timing.recent_limit)
            .await;
        let trending = self
            .list_posts(community, "rising", self.timing.trending_limit)
            .await;

        let mut fetched = HashSet::new();
        for post in recent.into_iter().chain(trending) {
            if !fetched.insert(post.id.clone()) {
                continue;
            }
            if self.store.contains(&post.id) {
                report.posts_already_seen += 1;
                continue;
            }

            // Marked before anything can fail for it: a post is examined at most once
            self.store.add(post.id.clone());
            report.posts_examined += 1;

            if let Some(candidate) = self.select(post) {
                debug!(
                    target: log_channels::SESSION,
                    "Queued post {} with clip {}", candidate.post.id, candidate.clip_url
                );
                queue.push(candidate);
            }
        }
    }

    async fn list_posts(&self, community: &Community, view: &str, limit: u32) -> Vec<ForumPost> {
        let result = match view {
            "rising" => self.forum.list_trending(community, limit).await,
            _ => self.forum.list_recent(community, limit).await,
        };
        result.unwrap_or_else(|e| {
            warn!(
                target: log_channels::SESSION,
                "Could not list {} posts of r/{}", view, community.name
            );
            self.reporter.report_warning(&e);
            Vec::new()
        })
    }

    fn select(&self, post: ForumPost) -> Option<ClipCandidate> {
        if let Some(min_score) = self.options.min_score {
            if post.score < min_score {
                return None;
            }
        }
        let clip_url = clip_reference_for(&post)?;
        Some(ClipCandidate::new(post, clip_url))
    }

    /// Works through the queue one candidate at a time.
    pub async fn process_queue(&mut self, queue: Vec<ClipCandidate>, report: &mut CycleReport) {
        for candidate in queue {
            self.process_candidate(candidate, report).await;
        }
    }

    async fn process_candidate(&self, mut candidate: ClipCandidate, report: &mut CycleReport) {
        let post_id = candidate.post.id.clone();

        let local_file = match self.fetch_clip(&candidate.clip_url).await {
            Ok(path) => path,
            Err(e) => {
                report.fetch_failures += 1;
                warn!(
                    target: log_channels::SESSION,
                    "Dropping post {}: clip {} could not be fetched", post_id, candidate.clip_url
                );
                self.reporter.report_error(&e);
                return;
            }
        };

        let request = PublishRequest {
            file_path: local_file.clone(),
            title: candidate.post.title.clone(),
            description: candidate.post.permalink.clone(),
            tags: self.options.tags.clone(),
            category_id: self.options.category_id.clone(),
            visibility: self.options.visibility,
        };
        candidate.local_file = Some(local_file);

        let video = match self.publisher.publish(&request).await {
            Ok(video) => video,
            Err(e) => {
                report.publish_failures += 1;
                warn!(
                    target: log_channels::SESSION,
                    "Publishing post {} failed, it will not be retried", post_id
                );
                self.reporter.report_error(&e);
                return;
            }
        };
        info!(
            target: log_channels::SESSION,
            "Published post {} as {}", post_id, video.watch_url()
        );
        report.published.push(video.video_id.clone());

        match self.post_back_reference(&post_id, &video).await {
            Ok(()) => report.comments_posted += 1,
            Err(e) => {
                report.comment_failures += 1;
                self.reporter.report_error(&e);
            }
        }

        if self.options.cleanup_clips {
            self.remove_local_file(&candidate).await;
        }
    }

    async fn remove_local_file(&self, candidate: &ClipCandidate) {
        let Some(path) = &candidate.local_file else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(
                target: log_channels::SESSION,
                "Could not remove {}: {}",
                path.display(),
                e
            );
        }
    }

    async fn fetch_clip(&self, clip_url: &str) -> Result<std::path::PathBuf, CoreError> {
        let media_url = self.clips.resolve_media_url(clip_url).await?;
        self.clips.download(&media_url).await
    }

    async fn post_back_reference(&self, post_id: &str, video: &PublishedVideo) -> Result<(), CoreError> {
        let forum = &self.forum;
        let text = comment_text(video, &self.options.comment_footer);

        self.comment_retry
            .execute("back-reference comment", |_| forum.comment_on(post_id, &text))
            .await
    }

    async fn persist_store(&mut self) {
        if let Err(e) = self.store.persist().await {
            warn!(
                target: log_channels::SESSION,
                "Could not persist {}", self.store.path().display()
            );
            self.reporter.report_error(&e);
        }
    }
}
