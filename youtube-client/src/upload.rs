//! Resumable upload protocol of the YouTube Data API v3.

use crate::metadata::VideoMetadata;
use clip_core::{log_channels, CoreError, HostingError, PublishedVideo, UploadProgress};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::io::SeekFrom;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/youtube/v3/videos?uploadType=resumable&part=snippet,status";

/// Must stay a multiple of 256 KiB.
pub const CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Consecutive 308 answers without progress tolerated before giving up.
const MAX_STALLS: u32 = 3;

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    reason: String,
}

/// `Content-Range` value for the chunk starting at `start`.
pub fn content_range(start: u64, chunk_len: u64, total: u64) -> String {
    if chunk_len == 0 {
        format!("bytes */{}", total)
    } else {
        format!("bytes {}-{}/{}", start, start + chunk_len - 1, total)
    }
}

/// Offset to resume from after a `308`, from its `Range` header
/// (`bytes=0-4194303` means 4194304 bytes are stored).
pub fn resume_offset(range: Option<&str>) -> u64 {
    range
        .and_then(|r| r.rsplit('-').next())
        .and_then(|end| end.trim().parse::<u64>().ok())
        .map(|end| end + 1)
        .unwrap_or(0)
}

/// Maps an error answer to the platform-reported cause.
pub fn classify_failure(status: StatusCode, body: &str) -> HostingError {
    let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
    let quota = parsed.as_ref().map_or(false, |b| {
        b.error
            .errors
            .iter()
            .any(|e| e.reason == "quotaExceeded" || e.reason == "uploadLimitExceeded")
    });
    if quota {
        return HostingError::QuotaExceeded;
    }

    let reason = match parsed {
        Some(b) if !b.error.message.is_empty() => b.error.message,
        _ if body.trim().is_empty() => status.to_string(),
        _ => body.trim().to_string(),
    };
    HostingError::UploadRejected {
        status_code: status.as_u16(),
        reason,
    }
}

pub struct ResumableUpload<'a> {
    http: &'a Client,
    access_token: &'a str,
    endpoint: &'a str,
    progress: mpsc::Sender<UploadProgress>,
}

impl<'a> ResumableUpload<'a> {
    pub fn new(
        http: &'a Client,
        access_token: &'a str,
        progress: mpsc::Sender<UploadProgress>,
    ) -> Self {
        Self {
            http,
            access_token,
            endpoint: UPLOAD_URL,
            progress,
        }
    }

    /// Opens the upload session somewhere other than [`UPLOAD_URL`].
    pub fn with_endpoint(mut self, endpoint: &'a str) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Uploads `path` and reports the terminal outcome on the progress channel too.
    pub async fn run(self, path: &Path, metadata: &VideoMetadata) -> Result<PublishedVideo, CoreError> {
        let result = self.upload(path, metadata).await;
        let event = match &result {
            Ok(video) => UploadProgress::Completed {
                video_id: video.video_id.clone(),
            },
            Err(e) => UploadProgress::Failed {
                reason: e.to_string(),
            },
        };
        self.report(event).await;
        result
    }

    async fn upload(&self, path: &Path, metadata: &VideoMetadata) -> Result<PublishedVideo, CoreError> {
        let mut file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        if total == 0 {
            return Err(CoreError::InvalidInput {
                message: format!("{} is empty", path.display()),
            });
        }

        let session_url = self.start_session(metadata, total).await?;
        self.report(UploadProgress::Started { total_bytes: total }).await;

        let mut offset = 0u64;
        let mut stalls = 0u32;
        loop {
            let chunk_len = CHUNK_SIZE.min(total - offset);
            let mut chunk = Vec::with_capacity(chunk_len as usize);
            file.seek(SeekFrom::Start(offset)).await?;
            (&mut file).take(chunk_len).read_to_end(&mut chunk).await?;

            let response = self
                .http
                .put(&session_url)
                .bearer_auth(self.access_token)
                .header(header::CONTENT_LENGTH, chunk.len())
                .header(header::CONTENT_RANGE, content_range(offset, chunk_len, total))
                .body(chunk)
                .send()
                .await
                .map_err(|e| HostingError::UploadInterrupted {
                    bytes_sent: offset,
                    reason: e.to_string(),
                })?;

            let status = response.status();
            if status == StatusCode::OK || status == StatusCode::CREATED {
                let video: VideoResource = response.json().await.map_err(|e| {
                    HostingError::InvalidResponse {
                        details: format!("upload finished without a video resource: {}", e),
                    }
                })?;
                return Ok(PublishedVideo { video_id: video.id });
            }

            if status != StatusCode::PERMANENT_REDIRECT {
                let body = response.text().await.unwrap_or_default();
                return Err(classify_failure(status, &body).into());
            }

            let range = response
                .headers()
                .get(header::RANGE)
                .and_then(|v| v.to_str().ok());
            let next = resume_offset(range);
            if next <= offset {
                stalls += 1;
                warn!(
                    target: log_channels::YOUTUBE,
                    "Upload made no progress at byte {} ({}/{})", offset, stalls, MAX_STALLS
                );
                if stalls >= MAX_STALLS {
                    return Err(HostingError::UploadInterrupted {
                        bytes_sent: offset,
                        reason: "server stopped accepting data".to_string(),
                    }
                    .into());
                }
            } else {
                stalls = 0;
            }
            offset = next.min(total);
            self.report(UploadProgress::Uploading {
                bytes_sent: offset,
                total_bytes: total,
            })
            .await;
        }
    }

    async fn start_session(&self, metadata: &VideoMetadata, total: u64) -> Result<String, CoreError> {
        let response = self
            .http
            .post(self.endpoint)
            .bearer_auth(self.access_token)
            .header("X-Upload-Content-Length", total)
            .header("X-Upload-Content-Type", "video/mp4")
            .json(metadata)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body).into());
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| HostingError::InvalidResponse {
                details: "upload session answer had no Location header".to_string(),
            })?;
        debug!(target: log_channels::YOUTUBE, "Opened upload session for {} bytes", total);
        Ok(location)
    }

    async fn report(&self, event: UploadProgress) {
        // The logger may already be gone; progress is best effort.
        let _ = self.progress.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Snippet, Status};
    use reqwest::redirect;
    use std::path::PathBuf;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CLIP: &[u8] = b"0123456789";

    fn metadata() -> VideoMetadata {
        VideoMetadata {
            snippet: Snippet {
                title: "Streamer falls off chair".to_string(),
                description: "https://www.reddit.com/r/LivestreamFail/comments/abc/".to_string(),
                tags: vec!["clip".to_string()],
                category_id: "20".to_string(),
            },
            status: Status {
                privacy_status: "unlisted".to_string(),
            },
        }
    }

    fn clip_file() -> PathBuf {
        let path = std::env::temp_dir().join(format!("test_upload_{}.mp4", uuid::Uuid::new_v4()));
        std::fs::write(&path, CLIP).unwrap();
        path
    }

    fn client() -> Client {
        Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .unwrap()
    }

    /// Session start answers with a resumable session URI on the same server.
    async fn mount_session(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header_eq("x-upload-content-length", "10"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("location", format!("{}/session/1", server.uri()).as_str()),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    async fn upload(server: &MockServer, file: &Path) -> (Result<PublishedVideo, CoreError>, Vec<UploadProgress>) {
        let http = client();
        let endpoint = format!("{}/upload?uploadType=resumable", server.uri());
        let (tx, mut rx) = mpsc::channel(16);

        let result = ResumableUpload::new(&http, "ya29.token", tx)
            .with_endpoint(&endpoint)
            .run(file, &metadata())
            .await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }

    #[test]
    fn test_content_range() {
        assert_eq!(content_range(0, 4, 10), "bytes 0-3/10");
        assert_eq!(content_range(8, 2, 10), "bytes 8-9/10");
        assert_eq!(content_range(0, 0, 0), "bytes */0");
    }

    #[test]
    fn test_resume_offset() {
        assert_eq!(resume_offset(Some("bytes=0-4194303")), 4_194_304);
        assert_eq!(resume_offset(Some("garbage")), 0);
        assert_eq!(resume_offset(None), 0);
    }

    #[test]
    fn test_classify_quota() {
        let body = r#"{"error":{"code":403,"message":"quota","errors":[{"reason":"quotaExceeded"}]}}"#;
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, body),
            HostingError::QuotaExceeded
        ));
    }

    #[test]
    fn test_classify_rejection() {
        let body = r#"{"error":{"code":400,"message":"Invalid category","errors":[{"reason":"invalidCategoryId"}]}}"#;
        match classify_failure(StatusCode::BAD_REQUEST, body) {
            HostingError::UploadRejected {
                status_code,
                reason,
            } => {
                assert_eq!(status_code, 400);
                assert_eq!(reason, "Invalid category");
            }
            other => panic!("unexpected failure: {:?}", other),
        }

        match classify_failure(StatusCode::BAD_GATEWAY, "") {
            HostingError::UploadRejected { reason, .. } => assert_eq!(reason, "502 Bad Gateway"),
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resumes_from_range_after_308() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .and(header_eq("content-range", "bytes 0-9/10"))
            .respond_with(ResponseTemplate::new(308).insert_header("range", "bytes=0-3"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .and(header_eq("content-range", "bytes 4-9/10"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "kind": "youtube#video",
                "id": "dQw4w9WgXcQ"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = clip_file();
        let (result, events) = upload(&server, &file).await;
        assert_eq!(result.unwrap().video_id, "dQw4w9WgXcQ");

        assert!(matches!(events[0], UploadProgress::Started { total_bytes: 10 }));
        assert!(events.iter().any(|e| matches!(
            e,
            UploadProgress::Uploading {
                bytes_sent: 4,
                total_bytes: 10
            }
        )));
        assert!(matches!(
            events.last(),
            Some(UploadProgress::Completed { video_id }) if video_id == "dQw4w9WgXcQ"
        ));

        std::fs::remove_file(&file).ok();
    }

    #[tokio::test]
    async fn test_gives_up_when_server_stops_accepting() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        // No Range header: nothing stored yet, every time
        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .respond_with(ResponseTemplate::new(308))
            .expect(u64::from(MAX_STALLS))
            .mount(&server)
            .await;

        let file = clip_file();
        let (result, events) = upload(&server, &file).await;
        assert!(matches!(
            result,
            Err(CoreError::Hosting(HostingError::UploadInterrupted { bytes_sent: 0, .. }))
        ));
        assert!(matches!(events.last(), Some(UploadProgress::Failed { .. })));

        std::fs::remove_file(&file).ok();
    }

    #[tokio::test]
    async fn test_quota_answer_on_session_start() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {
                    "code": 403,
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [{"reason": "quotaExceeded"}]
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let file = clip_file();
        let (result, _) = upload(&server, &file).await;
        assert!(matches!(
            result,
            Err(CoreError::Hosting(HostingError::QuotaExceeded))
        ));

        std::fs::remove_file(&file).ok();
    }

    #[tokio::test]
    async fn test_rejected_chunk_reports_platform_message() {
        let server = MockServer::start().await;
        mount_session(&server).await;
        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "Invalid category", "errors": [{"reason": "invalidCategoryId"}]}
            })))
            .mount(&server)
            .await;

        let file = clip_file();
        let (result, _) = upload(&server, &file).await;
        match result {
            Err(CoreError::Hosting(HostingError::UploadRejected {
                status_code,
                reason,
            })) => {
                assert_eq!(status_code, 400);
                assert_eq!(reason, "Invalid category");
            }
            other => panic!("expected a rejected upload, got {:?}", other),
        }

        std::fs::remove_file(&file).ok();
    }
}
