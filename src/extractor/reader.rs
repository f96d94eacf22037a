use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

use crate::extractor::{
    model::{ArticleMetadata, DEFAULT_TITLE, Extraction, collapse_whitespace},
    tree::Node,
};

// Element ids the article renderer uses for each role.
const TITLE_SELECTOR: &str = "#activity-name";
const AUTHOR_SELECTOR: &str = "#js_name";
const PUBLISH_TIME_SELECTOR: &str = "#publish_time";
const CONTENT_SELECTOR: &str = "#js_content";
const OG_TITLE_SELECTOR: &str = "meta[property='og:title']";

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(TITLE_SELECTOR).unwrap());
static AUTHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse(AUTHOR_SELECTOR).unwrap());
static PUBLISH_TIME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(PUBLISH_TIME_SELECTOR).unwrap());
static CONTENT: LazyLock<Selector> = LazyLock::new(|| Selector::parse(CONTENT_SELECTOR).unwrap());
static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(OG_TITLE_SELECTOR).unwrap());

pub fn extract(html: &str) -> Extraction {
    let document = Html::parse_document(html);

    let metadata = ArticleMetadata {
        title: extract_title(&document),
        author: first_text(&document, &AUTHOR),
        publish_time: first_text(&document, &PUBLISH_TIME),
    };

    let content = document.select(&CONTENT).next().map(Node::from_element_ref);
    if content.is_none() {
        debug!("content root {} not found", CONTENT_SELECTOR);
    }

    Extraction { metadata, content }
}

fn extract_title(document: &Html) -> String {
    if let Some(title) = first_text(document, &TITLE) {
        return title;
    }

    document
        .select(&OG_TITLE)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// Collapsed text of the first match, `None` if missing or blank.
fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    let element = document.select(selector).next()?;
    let text = collapse_whitespace(&element.text().collect::<String>());
    if text.is_empty() { None } else { Some(text) }
}
