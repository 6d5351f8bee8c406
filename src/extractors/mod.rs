use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Host fragment identifying full YouTube URLs (www., m., music. ...)
const PRIMARY_DOMAIN: &str = "youtube.com";

/// YouTube short-link host
const SHORT_LINK_DOMAIN: &str = "youtu.be";

/// Canonical identifier of a video on its platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video
    pub fn watch_url(&self) -> String {
        format!(
            "https://www.{}/watch?v={}",
            PRIMARY_DOMAIN,
            urlencoding::encode(&self.0)
        )
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the video identifier from a reference URL.
///
/// `youtube.com` hosts take the `v` query parameter, `youtu.be` takes the path
/// with surrounding slashes stripped. Anything else, including unparsable input,
/// yields `None`. No network access.
pub fn extract_video_id(reference: &str) -> Option<VideoId> {
    let parsed = Url::parse(reference.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();

    let id = if host.contains(PRIMARY_DOMAIN) {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?
    } else if host == SHORT_LINK_DOMAIN || host.ends_with(".youtu.be") {
        parsed.path().trim_matches('/').to_string()
    } else {
        return None;
    };

    if id.is_empty() {
        None
    } else {
        Some(VideoId(id))
    }
}
