pub mod auth;
pub mod metadata;
pub mod upload;

use async_trait::async_trait;
use clip_core::{
    log_channels, CoreError, PublishRequest, PublishedVideo, Publisher, UploadProgress,
};
use reqwest::{redirect, Client};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub use auth::{ClientSecretFile, StoredToken, YouTubeAuth, CREDENTIALS_CONSOLE_URL};
pub use metadata::{sanitize_title, VideoMetadata};
pub use upload::ResumableUpload;

const PROGRESS_BUFFER: usize = 32;

pub struct YouTubePublisher {
    auth: YouTubeAuth,
    http: Client,
}

impl YouTubePublisher {
    pub fn new(auth: YouTubeAuth) -> Result<Self, CoreError> {
        // A 308 means "resume", never a redirect to follow
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self { auth, http })
    }

    pub fn auth(&self) -> &YouTubeAuth {
        &self.auth
    }
}

/// Drains upload progress into the `youtube` log channel until the sender is dropped.
pub async fn log_progress(mut events: mpsc::Receiver<UploadProgress>) {
    let mut last_percent = None;
    while let Some(event) = events.recv().await {
        match event {
            UploadProgress::Started { total_bytes } => {
                info!(target: log_channels::YOUTUBE, "Upload started: {} bytes", total_bytes);
            }
            UploadProgress::Uploading {
                bytes_sent,
                total_bytes,
            } => {
                let percent = bytes_sent.saturating_mul(100) / total_bytes.max(1);
                if last_percent != Some(percent) {
                    info!(
                        target: log_channels::YOUTUBE,
                        "{} of {} bytes sent ({}%)", bytes_sent, total_bytes, percent
                    );
                    last_percent = Some(percent);
                }
            }
            UploadProgress::Completed { video_id } => {
                info!(target: log_channels::YOUTUBE, "Upload completed: {}", video_id);
            }
            UploadProgress::Failed { reason } => {
                warn!(target: log_channels::YOUTUBE, "Upload failed: {}", reason);
            }
        }
    }
}

#[async_trait]
impl Publisher for YouTubePublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedVideo, CoreError> {
        let access_token = self.auth.access_token().await?;
        let metadata = VideoMetadata::from(request);
        info!(
            target: log_channels::YOUTUBE,
            "Uploading {} as \"{}\"",
            request.file_path.display(),
            metadata.snippet.title
        );

        let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
        let upload = ResumableUpload::new(&self.http, &access_token, tx);
        let (result, ()) = tokio::join!(
            upload.run(&request.file_path, &metadata),
            log_progress(rx)
        );
        result
    }
}
