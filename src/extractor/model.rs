use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::extractor::tree::Node;

/// Shown when the page carries no usable title.
pub const DEFAULT_TITLE: &str = "Untitled WeChat Article";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub title: String,
    pub author: Option<String>,
    pub publish_time: Option<String>,
}

impl Default for ArticleMetadata {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            author: None,
            publish_time: None,
        }
    }
}

/// What the DOM extractor hands to the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub metadata: ArticleMetadata,
    /// `None` when the page has no content root.
    pub content: Option<Node>,
}

/// One image found in the article body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetReference {
    pub original_url: String,
    pub filename: String,
    pub ordinal: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub id: Uuid,
    pub title: String,
    pub author: Option<String>,
    pub publish_time: Option<String>,
    /// Metadata header followed by the body.
    pub markdown: String,
    /// Translated body on its own, used when a template replaces the header.
    #[serde(default)]
    pub body: String,
    pub assets: Vec<AssetReference>,
    pub source_url: String,
}

impl ConversionResult {
    pub fn metadata(&self) -> ArticleMetadata {
        ArticleMetadata {
            title: self.title.clone(),
            author: self.author.clone(),
            publish_time: self.publish_time.clone(),
        }
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
