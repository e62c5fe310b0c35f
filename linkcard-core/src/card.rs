// Rendering of enriched link cards: standalone notes and inline canvas text

use chrono::{DateTime, Local};
use linkcard_scanner::UrlMetadata;
use url::Url;

/// Used when neither the provider nor the page supplies any summary text.
pub const PLACEHOLDER_SUMMARY: &str = "No summary available.";

const MAX_FILE_STEM: usize = 100;
const FORBIDDEN_FILENAME_CHARS: &[char] =
    &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '#', '^', '[', ']'];

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
/// A limit of zero disables truncation.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

/// Markdown card written straight into a canvas text node.
pub fn compose_inline_card(metadata: &UrlMetadata, summary: &str, max_description: usize) -> String {
    let mut sections = Vec::new();

    if let Some(cover) = &metadata.cover_image {
        sections.push(format!("![]({cover})"));
    }
    sections.push(format!(
        "## [{}]({})",
        escape_link_text(metadata.display_title()),
        metadata.url
    ));

    let summary = summary.trim();
    if !summary.is_empty() {
        sections.push(truncate_chars(summary, max_description));
    }
    if let Some(site) = &metadata.site_name {
        sections.push(format!("*{site}*"));
    }

    sections.join("\n\n")
}

/// File name for the note created for `metadata`, stripped of characters
/// that are illegal in file names or meaningful to wiki links.
pub fn note_file_name(metadata: &UrlMetadata) -> String {
    let fallback = Url::parse(&metadata.url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "Untitled link".to_string());

    let raw = metadata.title.as_deref().unwrap_or(&fallback);
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if FORBIDDEN_FILENAME_CHARS.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();
    let mut stem: String = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_FILE_STEM)
        .collect();
    stem = stem.trim().trim_start_matches('.').trim().to_string();

    if stem.is_empty() {
        stem = fallback;
    }
    format!("{stem}.md")
}

fn yaml_string(value: &str) -> String {
    // JSON string literals are valid YAML scalars
    serde_json::Value::String(value.to_string()).to_string()
}

/// Full note body: front matter, cover, heading, summary and source link.
pub fn compose_note(metadata: &UrlMetadata, summary: &str, created: DateTime<Local>) -> String {
    let mut front_matter = vec![
        format!("url: {}", yaml_string(&metadata.url)),
        format!("title: {}", yaml_string(metadata.display_title())),
    ];
    if let Some(site) = &metadata.site_name {
        front_matter.push(format!("site: {}", yaml_string(site)));
    }
    if let Some(cover) = &metadata.cover_image {
        front_matter.push(format!("image: {}", yaml_string(cover)));
    }
    if let Some(favicon) = &metadata.favicon {
        front_matter.push(format!("favicon: {}", yaml_string(favicon)));
    }
    front_matter.push(format!("created: {}", created.format("%Y-%m-%dT%H:%M:%S%:z")));

    let mut body = vec![format!("---\n{}\n---", front_matter.join("\n"))];
    if let Some(cover) = &metadata.cover_image {
        body.push(format!("![]({cover})"));
    }
    body.push(format!("# {}", metadata.display_title()));
    body.push(summary.trim().to_string());
    body.push(format!("[Open original]({})", metadata.url));

    let mut note = body.join("\n\n");
    note.push('\n');
    note
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata() -> UrlMetadata {
        UrlMetadata {
            url: "https://example.com/post".to_string(),
            title: Some("Crabs: A [Field] Guide".to_string()),
            description: Some("desc".to_string()),
            cover_image: Some("https://example.com/cover.png".to_string()),
            site_name: Some("Example".to_string()),
            favicon: None,
            text_content: String::new(),
        }
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef ghij", 7), "abcdef...");
        assert_eq!(truncate_chars("unbounded", 0), "unbounded");
        assert_eq!(truncate_chars("ééééé", 2), "éé...");
    }

    #[test]
    fn test_inline_card_layout() {
        let card = compose_inline_card(&metadata(), "A summary that is long", 9);
        let sections: Vec<&str> = card.split("\n\n").collect();
        assert_eq!(sections[0], "![](https://example.com/cover.png)");
        assert_eq!(
            sections[1],
            "## [Crabs: A \\[Field\\] Guide](https://example.com/post)"
        );
        assert_eq!(sections[2], "A summary...");
        assert_eq!(sections[3], "*Example*");
    }

    #[test]
    fn test_inline_card_without_optional_parts() {
        let bare = UrlMetadata::empty("https://example.com/");
        let card = compose_inline_card(&bare, "", 200);
        assert_eq!(card, "## [https://example.com/](https://example.com/)");
    }

    #[test]
    fn test_note_file_name_sanitized() {
        assert_eq!(note_file_name(&metadata()), "Crabs A Field Guide.md");

        let untitled = UrlMetadata::empty("https://docs.rs/serde");
        assert_eq!(note_file_name(&untitled), "docs.rs.md");

        let mut weird = UrlMetadata::empty("not a url");
        weird.title = Some("???".to_string());
        assert_eq!(note_file_name(&weird), "Untitled link.md");
    }

    #[test]
    fn test_note_contents() {
        let created = Local.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let note = compose_note(&metadata(), "Summary text.", created);

        assert!(note.starts_with("---\nurl: \"https://example.com/post\"\n"));
        assert!(note.contains("title: \"Crabs: A [Field] Guide\""));
        assert!(note.contains("image: \"https://example.com/cover.png\""));
        assert!(note.contains("created: 2026-10-18T09:30:00"));
        assert!(note.contains("# Crabs: A [Field] Guide\n\nSummary text."));
        assert!(note.ends_with("[Open original](https://example.com/post)\n"));
    }
}
