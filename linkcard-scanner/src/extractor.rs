use crate::error::{Result, ScanError};
use crate::fetch::Fetcher;
use crate::metadata::UrlMetadata;
use crate::social::{self, DEFAULT_SOCIAL_API_BASE};
use reqwest::Method;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Cap on `text_content`, in characters.
pub const MAX_TEXT_LENGTH: usize = 10_000;
pub const TRUNCATION_MARKER: &str = "...";

/// Elements whose subtrees never count as page content.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside",
];

/// Landmark roles equivalent to the skipped elements.
const SKIPPED_ROLES: &[&str] = &["navigation", "banner", "contentinfo", "complementary"];

/// Elements that start a new line of text when rendered.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table",
    "td", "th", "tr", "ul",
];

const FAVICON_RELS: &[&str] = &["icon", "shortcut icon", "apple-touch-icon"];

/// Raw candidates read out of the markup, before any network validation.
///
/// Kept separate from `Html` so the parsed document never lives across an await.
#[derive(Debug, Default)]
struct PageCandidates {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    site_name: Option<String>,
    favicon: Option<String>,
    text_content: String,
}

/// Turns fetched pages into [`UrlMetadata`].
pub struct Extractor {
    fetcher: Arc<dyn Fetcher>,
    social_api_base: String,
}

impl Extractor {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            social_api_base: DEFAULT_SOCIAL_API_BASE.to_string(),
        }
    }

    pub fn with_social_api_base(mut self, base: impl Into<String>) -> Self {
        self.social_api_base = base.into();
        self
    }

    /// Fetch `url` and extract its metadata.
    ///
    /// Only a transport failure on the page fetch is an error; everything else
    /// degrades into a (possibly empty) record.
    pub async fn scrape(&self, url: &str) -> Result<UrlMetadata> {
        if !is_web_url(url) {
            return Err(ScanError::InvalidUrl(url.to_string()));
        }
        if let Some(post) = social::parse_post_url(url) {
            return Ok(
                social::fetch_post(self.fetcher.as_ref(), &self.social_api_base, url, &post).await,
            );
        }

        info!("Scraping {}", url);
        let response = self.fetcher.fetch(url, Method::GET, &[]).await?;
        if !response.is_success() {
            warn!("{} returned status {}", url, response.status);
            return Ok(UrlMetadata::empty(url));
        }
        if let Some(content_type) = &response.content_type
            && !is_markup(content_type)
        {
            warn!("{} is {}, not a web page", url, content_type);
            return Ok(UrlMetadata::empty(url));
        }

        Ok(self.extract(&response.body, url).await)
    }

    /// Derive metadata from raw page content. Never fails.
    pub async fn extract(&self, raw_content: &str, source_url: &str) -> UrlMetadata {
        if let Some(post) = social::parse_post_url(source_url) {
            return social::fetch_post(self.fetcher.as_ref(), &self.social_api_base, source_url, &post)
                .await;
        }

        let candidates = parse_candidates(raw_content, source_url);

        let cover_image = match candidates.image {
            Some(candidate) => {
                let resolved = resolve_url(&candidate, source_url);
                if self.image_exists(&resolved).await {
                    Some(resolved)
                } else {
                    debug!("Dropping unreachable cover image {}", resolved);
                    None
                }
            }
            None => None,
        };

        let favicon = candidates
            .favicon
            .map(|href| resolve_url(&href, source_url))
            .or_else(|| default_favicon(source_url));

        UrlMetadata {
            url: source_url.to_string(),
            title: candidates.title,
            description: candidates.description,
            cover_image,
            site_name: candidates.site_name,
            favicon,
            text_content: candidates.text_content,
        }
    }

    async fn image_exists(&self, url: &str) -> bool {
        match self.fetcher.fetch(url, Method::HEAD, &[]).await {
            Ok(response) => response.is_success(),
            Err(e) => {
                debug!("Image probe failed for {}: {}", url, e);
                false
            }
        }
    }
}

fn parse_candidates(raw_content: &str, source_url: &str) -> PageCandidates {
    let document = Html::parse_document(raw_content);
    debug!("Parsed markup for {} ({} bytes)", source_url, raw_content.len());

    PageCandidates {
        title: meta_content(&document, &["og:title"])
            .or_else(|| element_text(&document, "title")),
        description: meta_content(&document, &["og:description"])
            .or_else(|| named_meta(&document, "description")),
        image: meta_content(&document, &["og:image"])
            .or_else(|| meta_content(&document, &["twitter:image"])),
        site_name: meta_content(&document, &["og:site_name"]),
        favicon: favicon_href(&document),
        text_content: body_text(&document),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Social-preview tags show up under both `property` and `name`.
fn meta_content(document: &Html, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let css = format!(r#"meta[property="{key}"], meta[name="{key}"]"#);
        let sel = selector(&css)?;
        document
            .select(&sel)
            .filter_map(|el| el.value().attr("content"))
            .find_map(non_empty)
    })
}

fn named_meta(document: &Html, name: &str) -> Option<String> {
    let sel = selector(&format!(r#"meta[name="{name}"]"#))?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .find_map(non_empty)
}

fn element_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find_map(|text| non_empty(&text))
}

fn favicon_href(document: &Html) -> Option<String> {
    let sel = selector("link[rel][href]")?;
    FAVICON_RELS.iter().find_map(|wanted| {
        document
            .select(&sel)
            .filter(|el| {
                el.value()
                    .attr("rel")
                    .is_some_and(|rel| rel.trim().eq_ignore_ascii_case(wanted))
            })
            .filter_map(|el| el.value().attr("href"))
            .find_map(non_empty)
    })
}

fn body_text(document: &Html) -> String {
    let Some(sel) = selector("body") else {
        return String::new();
    };
    let Some(body) = document.select(&sel).next() else {
        return String::new();
    };

    let mut raw = String::new();
    collect_text(body, &mut raw);
    truncate_text(&collapse_whitespace(&raw))
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child)
            && !is_skipped(&child_element)
        {
            let block = BLOCK_ELEMENTS.contains(&child_element.value().name());
            if block {
                out.push(' ');
            }
            collect_text(child_element, out);
            if block {
                out.push(' ');
            }
        }
    }
}

fn is_skipped(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if SKIPPED_ELEMENTS.contains(&value.name()) {
        return true;
    }
    value
        .attr("role")
        .is_some_and(|role| SKIPPED_ROLES.contains(&role.trim().to_lowercase().as_str()))
}

/// True for absolute `http`/`https` URLs with a host.
pub fn is_web_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Content types worth parsing as a page.
fn is_markup(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.starts_with("text/") || content_type.contains("html") || content_type.contains("xml")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_text(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT_LENGTH {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_TEXT_LENGTH).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Resolve `candidate` against `base`. Protocol-relative and path-relative
/// forms are both handled; anything unparseable comes back unchanged.
pub fn resolve_url(candidate: &str, base: &str) -> String {
    match Url::parse(base).and_then(|base_url| base_url.join(candidate)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => candidate.to_string(),
    }
}

fn default_favicon(source_url: &str) -> Option<String> {
    let base = Url::parse(source_url).ok()?;
    if base.host_str().is_none() {
        return None;
    }
    base.join("/favicon.ico").ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_removed_and_whitespace_collapsed() {
        let html = "<html><body><script>var x = 1;</script><p>Hello   world</p></body></html>";
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(candidates.text_content, "Hello world");
    }

    #[test]
    fn test_block_elements_are_separated() {
        let html = "<html><body><h1>Title</h1><p>First.</p><ul><li>One</li><li>Two</li></ul></body></html>";
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(candidates.text_content, "Title First. One Two");
    }

    #[test]
    fn test_inline_elements_stay_joined() {
        let html = "<html><body><p>Hello <b>world</b>!<br>Next line</p></body></html>";
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(candidates.text_content, "Hello world! Next line");
    }

    #[test]
    fn test_is_markup() {
        assert!(is_markup("text/html; charset=utf-8"));
        assert!(is_markup("application/xhtml+xml"));
        assert!(is_markup("text/plain"));
        assert!(!is_markup("application/pdf"));
        assert!(!is_markup("image/png"));
    }

    #[test]
    fn test_is_web_url() {
        assert!(is_web_url("https://example.com/a"));
        assert!(is_web_url("http://127.0.0.1:8080"));
        assert!(!is_web_url("ftp://example.com"));
        assert!(!is_web_url("not a url"));
        assert!(!is_web_url("mailto:someone@example.com"));
    }

    #[test]
    fn test_landmarks_are_skipped() {
        let html = r#"<html><body>
            <header>Site header</header>
            <nav>Home | About</nav>
            <div role="navigation">Crumbs</div>
            <main><h1>Article</h1>
            <p>Body text.</p></main>
            <aside>Related</aside>
            <footer>Copyright</footer>
            <style>p { color: red; }</style>
        </body></html>"#;
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(candidates.text_content, "Article Body text.");
    }

    #[test]
    fn test_text_is_truncated_with_marker() {
        let long = "a".repeat(MAX_TEXT_LENGTH + 50);
        let html = format!("<html><body><p>{long}</p></body></html>");
        let candidates = parse_candidates(&html, "https://example.com");

        assert_eq!(
            candidates.text_content.chars().count(),
            MAX_TEXT_LENGTH + TRUNCATION_MARKER.len()
        );
        assert!(candidates.text_content.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_title_prefers_social_preview() {
        let html = r#"<html><head>
            <title>Plain Title</title>
            <meta property="og:title" content="Preview Title">
        </head><body></body></html>"#;
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(candidates.title.as_deref(), Some("Preview Title"));
    }

    #[test]
    fn test_title_falls_back_to_title_element() {
        let html = "<html><head><title>  Plain   Title </title></head><body></body></html>";
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(candidates.title.as_deref(), Some("Plain Title"));
    }

    #[test]
    fn test_description_falls_back_to_standard_meta() {
        let html = r#"<html><head><meta name="description" content="Standard description"></head></html>"#;
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(
            candidates.description.as_deref(),
            Some("Standard description")
        );
    }

    #[test]
    fn test_empty_preview_tag_is_skipped() {
        let html = r#"<html><head>
            <meta property="og:description" content="   ">
            <meta name="description" content="Fallback">
        </head></html>"#;
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(candidates.description.as_deref(), Some("Fallback"));
    }

    #[test]
    fn test_secondary_image_tag() {
        let html = r#"<html><head><meta name="twitter:image" content="/card.png"></head></html>"#;
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(candidates.image.as_deref(), Some("/card.png"));
    }

    #[test]
    fn test_favicon_priority() {
        let html = r#"<html><head>
            <link rel="apple-touch-icon" href="/apple.png">
            <link rel="shortcut icon" href="/shortcut.ico">
        </head></html>"#;
        let candidates = parse_candidates(html, "https://example.com");
        assert_eq!(candidates.favicon.as_deref(), Some("/shortcut.ico"));
    }

    #[test]
    fn test_missing_body_yields_empty_text() {
        let candidates = parse_candidates("", "https://example.com");
        assert_eq!(candidates.text_content, "");
        assert_eq!(candidates.title, None);
    }

    #[test]
    fn test_resolve_url_forms() {
        let base = "https://example.com/blog/post";
        assert_eq!(
            resolve_url("//cdn.example.com/a.png", base),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(resolve_url("/a.png", base), "https://example.com/a.png");
        assert_eq!(resolve_url("a.png", base), "https://example.com/blog/a.png");
        assert_eq!(
            resolve_url("https://other.org/x.png", base),
            "https://other.org/x.png"
        );
    }

    #[test]
    fn test_resolve_url_with_malformed_base_returns_candidate() {
        assert_eq!(resolve_url("/a.png", "not a url"), "/a.png");
    }

    #[test]
    fn test_default_favicon() {
        assert_eq!(
            default_favicon("https://example.com:8443/deep/page?q=1").as_deref(),
            Some("https://example.com:8443/favicon.ico")
        );
        assert_eq!(default_favicon("nonsense"), None);
    }
}
