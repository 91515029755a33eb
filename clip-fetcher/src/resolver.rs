//! Direct media URL resolution for clip pages.
//!
//! The clip host embeds a preview image reference in the page data; the
//! full-resolution video sits next to it under a predictable name. This is the
//! only place that knows the page layout.

use crate::http::HttpSource;
use clip_core::{log_channels, CoreError, FetchError};
use tracing::{debug, warn};

/// Delimiter pairs around the preview image reference, tried in order.
const PREVIEW_DELIMITERS: &[(&str, &str)] = &[
    ("\"thumbnailUrl\":\"", "\""),
    ("<meta property=\"og:image\" content=\"", "\""),
];

const PREVIEW_SUFFIX: &str = "preview.jpg";
const VIDEO_SUFFIX: &str = "1280x720.mp4";

/// Returns the text between the first `start` and the next `end` after it.
pub fn string_between<'a>(source: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = source.find(start)? + start.len();
    let len = source[from..].find(end)?;
    Some(&source[from..from + len])
}

/// Derives the direct video URL from a clip page body.
pub fn extract_media_url(page: &str) -> Option<String> {
    let preview = PREVIEW_DELIMITERS
        .iter()
        .find_map(|(start, end)| string_between(page, start, end))?;

    let preview = preview.replace('\\', "");
    let stem = preview.strip_suffix(PREVIEW_SUFFIX)?;
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}{}", stem, VIDEO_SUFFIX))
}

/// Fetches the clip page and extracts the direct media URL. No retries here.
pub async fn resolve_direct_media_url(
    http: &dyn HttpSource,
    clip_page_url: &str,
) -> Result<String, CoreError> {
    let page = http.get_text(clip_page_url).await.map_err(|e| {
        warn!(
            target: log_channels::SESSION,
            "Could not fetch clip page {}: {}", clip_page_url, e
        );
        e
    })?;

    match extract_media_url(&page) {
        Some(media_url) => {
            debug!(
                target: log_channels::SESSION,
                "Resolved {} to {}", clip_page_url, media_url
            );
            Ok(media_url)
        }
        None => Err(FetchError::MarkupChanged {
            url: clip_page_url.to_string(),
        }
        .into()),
    }
}
