use bytes::Bytes;
use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use reqwest::StatusCode;
use url::Url;

/// A decoded HTML page.
#[derive(Debug)]
pub struct PageResponse {
    pub url_final: Url,
    pub status: StatusCode,
    pub content_type: String,
    pub body_utf8: String,
    pub encoding: &'static Encoding,
    pub fetched_at: DateTime<Utc>,
}

/// Raw bytes of a single image, as served by its host.
#[derive(Debug, Clone)]
pub struct AssetResponse {
    pub url: String,
    pub content_type: String,
    pub bytes: Bytes,
}
