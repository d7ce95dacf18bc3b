//! Post and comment text rules.

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use super::error::DomainError;

pub const DISPLAY_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:short] [year], [hour]:[minute]");

/// Number of characters of a post shown as the page title on the detail view.
pub const TITLE_PREVIEW_CHARS: usize = 30;

/// Validate user supplied post text. Surrounding whitespace is dropped; empty text is rejected.
pub fn normalize_post_text(raw: &str) -> Result<String, DomainError> {
    normalize_text("text", raw)
}

/// Validate user supplied comment text with the same rules as posts.
pub fn normalize_comment_text(raw: &str) -> Result<String, DomainError> {
    normalize_text("comment", raw)
}

fn normalize_text(field: &'static str, raw: &str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "this field is required"));
    }
    Ok(trimmed.to_string())
}

/// First characters of the text, used as a short title.
pub fn title_preview(text: &str) -> String {
    let mut preview: String = text.chars().take(TITLE_PREVIEW_CHARS).collect();
    if text.chars().count() > TITLE_PREVIEW_CHARS {
        preview.push('…');
    }
    preview
}

pub fn display_time(value: OffsetDateTime) -> String {
    value
        .format(DISPLAY_TIME_FORMAT)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn blank_text_is_rejected() {
        let err = normalize_post_text("   \n\t ").expect_err("blank text rejected");
        assert_eq!(err.field(), Some("text"));

        let err = normalize_comment_text("").expect_err("empty comment rejected");
        assert_eq!(err.field(), Some("comment"));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let text = normalize_post_text("  hello world \n").expect("valid text");
        assert_eq!(text, "hello world");
    }

    #[test]
    fn title_preview_truncates_long_text() {
        assert_eq!(title_preview("short"), "short");

        let long = "x".repeat(45);
        let preview = title_preview(&long);
        assert_eq!(preview.chars().count(), TITLE_PREVIEW_CHARS + 1);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn display_time_is_human_readable() {
        let value = datetime!(2024-03-05 09:07 UTC);
        assert_eq!(display_time(value), "5 Mar 2024, 09:07");
    }
}
