pub mod assets;
pub mod compose;
pub mod markdown;
pub mod model;
pub mod reader;
pub mod tree;

#[cfg(test)]
mod tests;

pub use model::{ArticleMetadata, AssetReference, ConversionResult, DEFAULT_TITLE, Extraction};

use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::fetcher::types::PageResponse;

/// Run the synchronous half of the pipeline on an already fetched page.
pub fn extract(resp: &PageResponse, source_url: &str) -> ConversionResult {
    convert_html(&resp.body_utf8, &resp.url_final, source_url)
}

/// Extract, rewrite images, translate and compose. `base_url` resolves
/// relative image sources; `source_url` is what the header links back to.
pub fn convert_html(html: &str, base_url: &Url, source_url: &str) -> ConversionResult {
    // 1. Locate metadata and the content root
    let Extraction {
        metadata,
        mut content,
    } = reader::extract(html);

    // 2. Point images at ./images/ and collect the manifest
    let assets = match content.as_mut() {
        Some(root) => assets::rewrite(root, base_url),
        None => Vec::new(),
    };

    // 3. Translate the rewritten tree
    let body = content.as_ref().map(markdown::translate).unwrap_or_default();
    if body.is_empty() {
        debug!(source_url, "article body is empty");
    }

    // 4. Prepend the metadata header
    let markdown = compose::compose(&metadata, &body, source_url, None);

    ConversionResult {
        id: Uuid::new_v4(),
        title: metadata.title,
        author: metadata.author,
        publish_time: metadata.publish_time,
        markdown,
        body,
        assets,
        source_url: source_url.to_string(),
    }
}
