use once_cell::sync::Lazy;
use reqwest::{
    Client, ClientBuilder, Response,
    header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue, REFERER},
};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::fetcher::{
    errors::FetchError,
    pipeline::process_response,
    types::{AssetResponse, PageResponse},
};

const MAX_PAGE_SIZE: u64 = 5 * 1024 * 1024; // 5MB
const MAX_ASSET_SIZE: u64 = 20 * 1024 * 1024; // 20MB

/// The article host serves a stripped page (or nothing) to non-browser
/// clients, so we present as desktop Chrome.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Image CDNs check this for hot-link protection.
pub const PLATFORM_REFERER: &str = "https://mp.weixin.qq.com/";

const DEFAULT_ASSET_CONTENT_TYPE: &str = "image/jpeg";

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );

    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .user_agent(BROWSER_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .default_headers(headers)
        .build()
        .expect("Failed to build HTTP client")
});

pub fn get_client() -> &'static Client {
    &HTTP_CLIENT
}

fn check_status(response: &Response) -> Result<(), FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http { status });
    }
    Ok(())
}

fn check_declared_size(response: &Response, limit: u64) -> Result<(), FetchError> {
    if let Some(content_length) = response.content_length()
        && content_length > limit
    {
        return Err(FetchError::BodyTooLarge(content_length));
    }
    Ok(())
}

fn content_type_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(str::to_string)
}

/// Fetch an article page and decode it to UTF-8.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch(url: &str) -> Result<PageResponse, FetchError> {
    let parsed_url = url::Url::parse(url)?;

    let response = HTTP_CLIENT
        .get(parsed_url)
        .header(
            ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .send()
        .await
        .map_err(FetchError::from_reqwest_error)?;

    check_status(&response)?;
    check_declared_size(&response, MAX_PAGE_SIZE)?;

    let final_url = response.url().clone();
    let status = response.status();
    let content_type = content_type_of(&response).unwrap_or_else(|| "text/html".to_string());

    if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
        return Err(FetchError::UnsupportedContentType(content_type));
    }

    let body_bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::Io(e.to_string()))?;

    // Content-Length may be missing or wrong
    if body_bytes.len() as u64 > MAX_PAGE_SIZE {
        return Err(FetchError::BodyTooLarge(body_bytes.len() as u64));
    }

    debug!(status = %status, bytes = body_bytes.len(), "fetched page");
    Ok(process_response(final_url, status, &body_bytes, &content_type))
}

/// Fetch a single image with the platform referer so the CDN serves it.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_asset(url: &str) -> Result<AssetResponse, FetchError> {
    let parsed_url = url::Url::parse(url)?;

    let response = HTTP_CLIENT
        .get(parsed_url)
        .header(ACCEPT, "image/avif,image/webp,image/apng,image/*,*/*;q=0.8")
        .header(REFERER, PLATFORM_REFERER)
        .send()
        .await
        .map_err(FetchError::from_reqwest_error)?;

    check_status(&response)?;
    check_declared_size(&response, MAX_ASSET_SIZE)?;

    let content_type =
        content_type_of(&response).unwrap_or_else(|| DEFAULT_ASSET_CONTENT_TYPE.to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::Io(e.to_string()))?;

    if bytes.len() as u64 > MAX_ASSET_SIZE {
        return Err(FetchError::BodyTooLarge(bytes.len() as u64));
    }

    debug!(content_type = %content_type, bytes = bytes.len(), "fetched asset");
    Ok(AssetResponse {
        url: url.to_string(),
        content_type,
        bytes,
    })
}
