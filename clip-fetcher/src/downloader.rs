use crate::http::HttpSource;
use chrono::Utc;
use clip_core::{log_channels, CoreError, FetchError, RetryExecutor};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Fetches media URLs into timestamp-named `.mp4` files under one directory.
pub struct Downloader<'a> {
    http: &'a dyn HttpSource,
    clips_dir: &'a Path,
    retry: &'a RetryExecutor,
}

impl<'a> Downloader<'a> {
    pub fn new(http: &'a dyn HttpSource, clips_dir: &'a Path, retry: &'a RetryExecutor) -> Self {
        Self {
            http,
            clips_dir,
            retry,
        }
    }

    /// Transport failures are retried; a file that cannot be written or is
    /// missing afterwards ends the call without further attempts.
    pub async fn download(&self, url: &str) -> Result<PathBuf, CoreError> {
        let result = self
            .retry
            .execute("download", |attempt| self.attempt(url, attempt))
            .await;

        match &result {
            Ok(path) => info!(
                target: log_channels::SESSION,
                "Downloaded {} to {}",
                url,
                path.display()
            ),
            Err(e) => error!(
                target: log_channels::ERRORS,
                "Giving up on download of {}: {}", url, e
            ),
        }
        result
    }

    async fn attempt(&self, url: &str, attempt: u32) -> Result<PathBuf, CoreError> {
        let body = self.http.get_bytes(url).await.map_err(|e| {
            warn!(
                target: log_channels::ERRORS,
                "Download attempt {} for {} failed: {}", attempt, url, e
            );
            e
        })?;

        let path = self.clips_dir.join(clip_file_name());
        if let Err(e) = tokio::fs::write(&path, &body).await {
            warn!(
                target: log_channels::ERRORS,
                "Could not write {}: {}",
                path.display(),
                e
            );
            return Err(verification_failed(&path));
        }

        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(path),
            _ => Err(verification_failed(&path)),
        }
    }
}

fn verification_failed(path: &Path) -> CoreError {
    FetchError::VerificationFailed {
        path: path.display().to_string(),
    }
    .into()
}

/// Current UTC time in nanoseconds, e.g. `1700000000123456789.mp4`.
pub fn clip_file_name() -> String {
    let now = Utc::now();
    let stamp = now
        .timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000));
    format!("{}.mp4", stamp)
}
