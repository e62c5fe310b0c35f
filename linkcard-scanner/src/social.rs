// Short-form social posts are read through a JSON mirror instead of scraping markup

use crate::fetch::Fetcher;
use crate::metadata::UrlMetadata;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_SOCIAL_API_BASE: &str = "https://api.fxtwitter.com";
pub const SOCIAL_SITE_NAME: &str = "X (Twitter)";

const POST_HOSTS: &[&str] = &[
    "twitter.com",
    "www.twitter.com",
    "mobile.twitter.com",
    "x.com",
    "www.x.com",
    "mobile.x.com",
];

/// A `/<handle>/status/<id>` reference on a known post host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    pub handle: String,
    pub id: String,
}

pub fn parse_post_url(url: &str) -> Option<PostRef> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    if !POST_HOSTS.contains(&host.as_str()) {
        return None;
    }

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let handle = segments.next()?;
    if segments.next()? != "status" {
        return None;
    }
    let id = segments.next()?;

    let valid_handle = handle
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_handle || id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(PostRef {
        handle: handle.to_string(),
        id: id.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct PostEnvelope {
    tweet: Option<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    text: String,
    author: Author,
    media: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
    screen_name: String,
    avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Media {
    #[serde(default)]
    photos: Vec<Photo>,
    #[serde(default)]
    videos: Vec<Video>,
    external: Option<External>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    url: String,
}

#[derive(Debug, Deserialize)]
struct Video {
    thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct External {
    thumbnail_url: Option<String>,
}

/// Look the post up on the mirror API. Any failure degrades to the empty record.
pub async fn fetch_post(
    fetcher: &dyn Fetcher,
    api_base: &str,
    source_url: &str,
    post: &PostRef,
) -> UrlMetadata {
    let api_url = format!(
        "{}/{}/status/{}",
        api_base.trim_end_matches('/'),
        post.handle,
        post.id
    );
    debug!("Reading post {} through {}", post.id, api_url);

    let response = match fetcher
        .fetch(&api_url, Method::GET, &[("accept", "application/json")])
        .await
    {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            warn!("Post API returned {} for {}", response.status, source_url);
            return UrlMetadata::empty(source_url);
        }
        Err(e) => {
            warn!("Post API request failed for {}: {}", source_url, e);
            return UrlMetadata::empty(source_url);
        }
    };

    let post = match serde_json::from_str::<PostEnvelope>(&response.body) {
        Ok(PostEnvelope { tweet: Some(post) }) => post,
        Ok(_) => {
            warn!("Post API response for {} has no post object", source_url);
            return UrlMetadata::empty(source_url);
        }
        Err(e) => {
            warn!("Post API response for {} is not valid JSON: {}", source_url, e);
            return UrlMetadata::empty(source_url);
        }
    };

    map_post(source_url, post)
}

fn map_post(source_url: &str, post: Post) -> UrlMetadata {
    let media = post.media.unwrap_or_default();
    let cover_image = media
        .photos
        .first()
        .map(|p| p.url.clone())
        .or_else(|| media.videos.first().and_then(|v| v.thumbnail_url.clone()))
        .or_else(|| media.external.and_then(|e| e.thumbnail_url))
        .or_else(|| post.author.avatar_url.clone());

    let text = post.text.trim().to_string();
    let description = if text.is_empty() { None } else { Some(text.clone()) };

    UrlMetadata {
        url: source_url.to_string(),
        title: Some(format!("{} (@{})", post.author.name, post.author.screen_name)),
        description,
        cover_image,
        site_name: Some(SOCIAL_SITE_NAME.to_string()),
        favicon: post.author.avatar_url,
        text_content: text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_url_variants() {
        let post = parse_post_url("https://x.com/rustlang/status/1234567890").unwrap();
        assert_eq!(post.handle, "rustlang");
        assert_eq!(post.id, "1234567890");

        assert!(parse_post_url("https://twitter.com/rust_lang/status/42?s=20").is_some());
        assert!(parse_post_url("https://mobile.twitter.com/a/status/1/photo/1").is_some());
    }

    #[test]
    fn test_parse_post_url_rejects_other_shapes() {
        assert_eq!(parse_post_url("https://x.com/rustlang"), None);
        assert_eq!(parse_post_url("https://x.com/rustlang/likes/12"), None);
        assert_eq!(parse_post_url("https://x.com/rustlang/status/abc"), None);
        assert_eq!(parse_post_url("https://example.com/a/status/1"), None);
        assert_eq!(parse_post_url("not a url"), None);
    }

    #[test]
    fn test_cover_image_priority() {
        let json = r#"{
            "tweet": {
                "text": "hello",
                "author": {"name": "Ferris", "screen_name": "ferris", "avatar_url": "https://a/avatar.png"},
                "media": {
                    "videos": [{"thumbnail_url": "https://a/video.jpg"}],
                    "external": {"thumbnail_url": "https://a/card.jpg"}
                }
            }
        }"#;
        let envelope: PostEnvelope = serde_json::from_str(json).unwrap();
        let metadata = map_post("https://x.com/ferris/status/1", envelope.tweet.unwrap());

        assert_eq!(metadata.cover_image.as_deref(), Some("https://a/video.jpg"));
        assert_eq!(metadata.title.as_deref(), Some("Ferris (@ferris)"));
        assert_eq!(metadata.favicon.as_deref(), Some("https://a/avatar.png"));
        assert_eq!(metadata.description.as_deref(), Some("hello"));
        assert_eq!(metadata.text_content, "hello");
    }

    #[test]
    fn test_avatar_is_last_resort_cover() {
        let json = r#"{"tweet": {"text": "", "author": {"name": "N", "screen_name": "n", "avatar_url": "https://a/av.png"}}}"#;
        let envelope: PostEnvelope = serde_json::from_str(json).unwrap();
        let metadata = map_post("https://x.com/n/status/1", envelope.tweet.unwrap());

        assert_eq!(metadata.cover_image.as_deref(), Some("https://a/av.png"));
        assert_eq!(metadata.description, None);
    }
}
