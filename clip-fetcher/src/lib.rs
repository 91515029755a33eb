pub mod downloader;
pub mod http;
pub mod resolver;


use async_trait::async_trait;
use clip_core::{log_channels, ClipSource, CoreError, RetryExecutor, RetryMetrics, RetryPolicy};
use std::path::PathBuf;
use tracing::debug;

pub use downloader::Downloader;
pub use http::{BrowserHttp, HttpSource, BROWSER_USER_AGENT};
pub use resolver::{extract_media_url, resolve_direct_media_url};

/// Resolver and downloader over one HTTP source.
pub struct ClipFetcher<H: HttpSource = BrowserHttp> {
    http: H,
    clips_dir: PathBuf,
    download_retry: RetryExecutor,
}

impl ClipFetcher<BrowserHttp> {
    pub fn new(clips_dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        Ok(Self::with_source(
            BrowserHttp::new()?,
            clips_dir,
            RetryPolicy::download(),
        ))
    }
}

impl<H: HttpSource> ClipFetcher<H> {
    pub fn with_source(http: H, clips_dir: impl Into<PathBuf>, download_policy: RetryPolicy) -> Self {
        Self {
            http,
            clips_dir: clips_dir.into(),
            download_retry: RetryExecutor::new(download_policy),
        }
    }

    pub fn clips_dir(&self) -> &std::path::Path {
        &self.clips_dir
    }

    /// Attempt counts over every download since startup.
    pub fn download_metrics(&self) -> RetryMetrics {
        self.download_retry.get_metrics()
    }
}

#[async_trait]
impl<H: HttpSource> ClipSource for ClipFetcher<H> {
    async fn resolve_media_url(&self, clip_page_url: &str) -> Result<String, CoreError> {
        resolve_direct_media_url(&self.http, clip_page_url).await
    }

    async fn download(&self, media_url: &str) -> Result<PathBuf, CoreError> {
        let result = Downloader::new(&self.http, &self.clips_dir, &self.download_retry)
            .download(media_url)
            .await;

        let metrics = self.download_metrics();
        debug!(
            target: log_channels::SESSION,
            "Downloads so far: {} succeeded, {} failed, {} retries",
            metrics.successful_operations,
            metrics.failed_operations,
            metrics.total_retries
        );
        result
    }
}
