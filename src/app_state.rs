use std::sync::Arc;

use crate::{
    config::Config,
    fetcher::{AssetSource, HttpAssetSource},
    publish::{GithubPublisher, PublishError},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub assets: Arc<dyn AssetSource>,
    pub publisher: Arc<GithubPublisher>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, PublishError> {
        let publisher = GithubPublisher::new(config.github_api_url())?;
        Ok(Self {
            config: Arc::new(config),
            assets: Arc::new(HttpAssetSource),
            publisher: Arc::new(publisher),
        })
    }

    /// Swap the image source, e.g. for a stub in tests.
    pub fn with_assets(mut self, assets: Arc<dyn AssetSource>) -> Self {
        self.assets = assets;
        self
    }
}
