use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{extractor::ConversionResult, publish::GithubConfig};

pub const MAX_URL_LEN: usize = 2048;
pub const MAX_BATCH_SIZE: usize = 20;

/// Shape check shared by every route that takes a URL.
pub fn validate_url(url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("URL is required".to_string());
    }
    if !url.starts_with("http") {
        return Err("URL must start with http:// or https://".to_string());
    }
    if url.len() > MAX_URL_LEN {
        return Err(format!("URL is longer than {} characters", MAX_URL_LEN));
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertRequest {
    pub url: String,
}

impl ConvertRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_url(&self.url)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchConvertRequest {
    pub urls: Vec<String>,
}

impl BatchConvertRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.urls.is_empty() {
            return Err("At least one URL is required".to_string());
        }
        if self.urls.len() > MAX_BATCH_SIZE {
            return Err(format!("At most {} URLs per batch", MAX_BATCH_SIZE));
        }
        self.urls.iter().try_for_each(|url| validate_url(url))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchItem {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ConversionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchConvertResponse {
    pub items: Vec<BatchItem>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImageProxyQuery {
    /// Image URL on the platform CDN.
    pub url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectSyncRequest {
    pub url: String,
    pub github_config: GithubConfig,
}

impl DirectSyncRequest {
    pub fn validate(&self, source_host: &str) -> Result<(), String> {
        validate_url(&self.url)?;
        if !self.url.contains(source_host) {
            return Err(format!("Only {} articles can be synced", source_host));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectSyncResponse {
    pub message: String,
    pub title: String,
    pub success: bool,
    pub pull_request: String,
    pub branch: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
