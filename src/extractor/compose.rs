//! Metadata header and front-matter templating.

use chrono::{NaiveDate, Utc};
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::extractor::model::{ArticleMetadata, collapse_whitespace};

/// A first paragraph shorter than this is not a usable description.
pub const MIN_DESCRIPTION_CHARS: usize = 5;
/// Length of the whole-body fallback description.
pub const FALLBACK_DESCRIPTION_CHARS: usize = 30;
pub const MAX_DESCRIPTION_CHARS: usize = 150;
const ELLIPSIS: &str = "...";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(title|date|source|description)\}\}").unwrap());
static IMAGE_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static LINK_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static FORMATTING_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[#*_~`]").unwrap());

/// Prefix `body` with either the default metadata header or `template`
/// rendered for today's date.
pub fn compose(
    metadata: &ArticleMetadata,
    body: &str,
    source_url: &str,
    template: Option<&str>,
) -> String {
    match template {
        Some(template) => {
            apply_template(metadata, body, source_url, template, Utc::now().date_naive())
        }
        None => default_header(metadata, source_url) + body,
    }
}

pub fn default_header(metadata: &ArticleMetadata, source_url: &str) -> String {
    let mut header = format!("# {}\n\n", metadata.title);

    if let Some(author) = &metadata.author {
        header.push_str(&format!("> 作者：{}\n>\n", author));
    }
    if let Some(publish_time) = &metadata.publish_time {
        header.push_str(&format!("> 发布时间：{}\n>\n", publish_time));
    }

    header.push_str(&format!("> 原文链接：{}\n\n", source_url));
    header
}

/// Render `template` and prepend it to `body` minus any leading title line.
pub fn apply_template(
    metadata: &ArticleMetadata,
    body: &str,
    source_url: &str,
    template: &str,
    today: NaiveDate,
) -> String {
    let date = today.format("%Y-%m-%d").to_string();
    let description = describe(body, &metadata.title);

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| match &caps[1] {
        "title" => metadata.title.clone(),
        "date" => date.clone(),
        "source" => source_url.to_string(),
        _ => description.clone(),
    });

    format!("{}{}", rendered, strip_title_line(body))
}

/// First paragraph of `body` as plain text, for the `{{description}}` slot.
pub fn describe(body: &str, title: &str) -> String {
    let text = strip_title_line(body);
    let first_paragraph = text.trim_start().split("\n\n").next().unwrap_or_default();

    let mut description = plain_text(first_paragraph);

    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        description = leading(&plain_text(text), FALLBACK_DESCRIPTION_CHARS);
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        description = truncate(&description, MAX_DESCRIPTION_CHARS);
    }
    if description.is_empty() {
        description = title.to_string();
    }
    description
}

fn strip_title_line(body: &str) -> &str {
    let trimmed = body.trim_start();
    if trimmed.starts_with("# ") {
        match trimmed.split_once('\n') {
            Some((_, rest)) => rest.trim_start_matches('\n'),
            None => "",
        }
    } else {
        body
    }
}

fn plain_text(markdown: &str) -> String {
    let text = IMAGE_SYNTAX.replace_all(markdown, "$1");
    let text = LINK_SYNTAX.replace_all(&text, "$1");
    let text = FORMATTING_CHARS.replace_all(&text, "");
    collapse_whitespace(&text)
}

/// The first `count` characters, followed by `...` when anything was cut.
fn leading(text: &str, count: usize) -> String {
    let mut chars = text.chars();
    let mut out: String = chars.by_ref().take(count).collect();
    if chars.next().is_some() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// At most `max` characters, the last three replaced by `...` when cut.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
