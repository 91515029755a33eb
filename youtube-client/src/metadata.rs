use clip_core::PublishRequest;
use serde::Serialize;

pub const MAX_TITLE_CHARS: usize = 100;
pub const FALLBACK_TITLE: &str = "Untitled clip";

/// The platform refuses angle brackets and titles over 100 characters.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title.chars().filter(|c| *c != '<' && *c != '>').collect();
    let truncated: String = cleaned.trim().chars().take(MAX_TITLE_CHARS).collect();
    let truncated = truncated.trim_end();
    if truncated.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        truncated.to_string()
    }
}

/// `videos.insert` resource body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VideoMetadata {
    pub snippet: Snippet,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub privacy_status: String,
}

impl From<&PublishRequest> for VideoMetadata {
    fn from(request: &PublishRequest) -> Self {
        Self {
            snippet: Snippet {
                title: sanitize_title(&request.title),
                description: request.description.clone(),
                tags: request.tags.clone(),
                category_id: request.category_id.clone(),
            },
            status: Status {
                privacy_status: request.visibility.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clip_core::Visibility;
    use std::path::PathBuf;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("  <b>Big</b> play  "), "bBig/b play");
        assert_eq!(sanitize_title("<<>>"), FALLBACK_TITLE);
        assert_eq!(sanitize_title(""), FALLBACK_TITLE);

        let long = "é".repeat(150);
        assert_eq!(sanitize_title(&long).chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_metadata_serialization() {
        let request = PublishRequest {
            file_path: PathBuf::from("clips/1.mp4"),
            title: "Streamer > chat".to_string(),
            description: "https://www.reddit.com/r/LivestreamFail/comments/abc/".to_string(),
            tags: vec!["twitch".to_string()],
            category_id: "20".to_string(),
            visibility: Visibility::Unlisted,
        };

        let value = serde_json::to_value(VideoMetadata::from(&request)).unwrap();
        assert_eq!(value["snippet"]["title"], "Streamer  chat");
        assert_eq!(value["snippet"]["categoryId"], "20");
        assert_eq!(value["snippet"]["tags"][0], "twitch");
        assert_eq!(value["status"]["privacyStatus"], "unlisted");
    }
}
