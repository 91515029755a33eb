//! Clip link extraction.

use crate::types::ForumPost;
use once_cell::sync::Lazy;
use regex_lite::Regex;

static CLIP_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://(?:[a-z0-9-]+\.)?clips\.twitch\.tv/[^\s)\]"'<>]+"#)
        .expect("clip URL pattern is valid")
});

/// Returns the first clip-hosting URL found in `text`.
pub fn find_clip_reference(text: &str) -> Option<&str> {
    CLIP_URL.find(text).map(|m| m.as_str())
}

/// Looks at the post's link first, then at the body of a self post.
pub fn clip_reference_for(post: &ForumPost) -> Option<String> {
    if let Some(url) = find_clip_reference(&post.url) {
        return Some(url.to_string());
    }
    if post.is_self {
        return find_clip_reference(&post.body).map(str::to_string);
    }
    None
}
