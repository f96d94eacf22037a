//! The full conversion pipeline: fetch, then everything in [`extractor`].

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    extractor::{self, ConversionResult},
    fetcher::{FetchError, fetch},
};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to fetch article: {0}")]
    FetchFailed(#[from] FetchError),
}

/// Convert one article. Nothing is returned unless every step succeeded.
#[instrument(skip_all, fields(url = %url))]
pub async fn convert(url: &str) -> Result<ConversionResult, ConvertError> {
    let page = fetch(url).await?;
    let result = extractor::extract(&page, url);

    info!(
        title = %result.title,
        assets = result.assets.len(),
        markdown_bytes = result.markdown.len(),
        "converted article"
    );
    Ok(result)
}

/// Convert articles one after another in submission order. A failure is
/// recorded for its URL and the batch carries on.
pub async fn convert_batch(urls: &[String]) -> Vec<(String, Result<ConversionResult, ConvertError>)> {
    let mut results = Vec::with_capacity(urls.len());
    for url in urls {
        let outcome = convert(url).await;
        if let Err(e) = &outcome {
            warn!(url = %url, error = %e, "batch item failed");
        }
        results.push((url.clone(), outcome));
    }
    results
}
