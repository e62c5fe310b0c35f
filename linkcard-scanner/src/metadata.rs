use serde::{Deserialize, Serialize};

/// Normalized metadata for a single linked page.
///
/// Built fresh for every scrape and consumed once by the summary step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMetadata {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub site_name: Option<String>,
    pub favicon: Option<String>,
    pub text_content: String,
}

impl UrlMetadata {
    /// The degraded record: nothing but the source URL.
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Best label for the page, falling back to the URL itself.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }
}
