use async_trait::async_trait;

use crate::fetcher::{client::fetch_asset, errors::FetchError, types::AssetResponse};

/// Where packaging and publishing get image bytes from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn fetch_asset(&self, url: &str) -> Result<AssetResponse, FetchError>;
}

/// Fetches straight from the image host with the platform referer, the same
/// way the image proxy route does.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpAssetSource;

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch_asset(&self, url: &str) -> Result<AssetResponse, FetchError> {
        fetch_asset(url).await
    }
}
