use axum::{
    Json,
    extract::{Query, State},
    http::{
        HeaderName,
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::info;

use crate::{
    api::{
        dtos::{
            BatchConvertRequest, BatchConvertResponse, BatchItem, ConvertRequest,
            DirectSyncRequest, DirectSyncResponse, ErrorResponse, ImageProxyQuery, validate_url,
        },
        error::ApiError,
    },
    app_state::AppState,
    convert,
    extractor::ConversionResult,
    package::build_archive,
};

/// Images are content-addressed upstream and never change.
const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000";
const ZIP_CONTENT_TYPE: &str = "application/zip";
const FALLBACK_ARCHIVE_NAME: &str = "article.zip";
pub const SKIPPED_ASSETS_HEADER: &str = "x-skipped-assets";

#[utoipa::path(
    post,
    path = "/api/convert",
    tag = "convert",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Converted article", body = ConversionResult),
        (status = 400, description = "Invalid URL", body = ErrorResponse),
        (status = 502, description = "Article could not be fetched", body = ErrorResponse)
    )
)]
pub async fn convert_article(
    Json(payload): Json<ConvertRequest>,
) -> Result<Json<ConversionResult>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;
    let result = convert::convert(payload.url.trim()).await?;
    Ok(Json(result))
}

#[utoipa::path(
    post,
    path = "/api/convert/batch",
    tag = "convert",
    request_body = BatchConvertRequest,
    responses(
        (status = 200, description = "One item per URL, in request order", body = BatchConvertResponse),
        (status = 400, description = "Empty, oversized or invalid batch", body = ErrorResponse)
    )
)]
pub async fn convert_articles(
    Json(payload): Json<BatchConvertRequest>,
) -> Result<Json<BatchConvertResponse>, ApiError> {
    payload.validate().map_err(ApiError::BadRequest)?;

    let urls: Vec<String> = payload.urls.iter().map(|u| u.trim().to_string()).collect();
    let items = convert::convert_batch(&urls)
        .await
        .into_iter()
        .map(|(url, outcome)| match outcome {
            Ok(result) => BatchItem {
                url,
                result: Some(result),
                error: None,
            },
            Err(e) => BatchItem {
                url,
                result: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok(Json(BatchConvertResponse { items }))
}

#[utoipa::path(
    get,
    path = "/api/image-proxy",
    tag = "assets",
    params(ImageProxyQuery),
    responses(
        (status = 200, description = "Image bytes with the upstream content type"),
        (status = 400, description = "Invalid URL", body = ErrorResponse),
        (status = 502, description = "Image could not be fetched", body = ErrorResponse)
    )
)]
pub async fn image_proxy(
    State(state): State<AppState>,
    Query(query): Query<ImageProxyQuery>,
) -> Result<Response, ApiError> {
    validate_url(&query.url).map_err(ApiError::BadRequest)?;

    let asset = state
        .assets
        .fetch_asset(query.url.trim())
        .await
        .map_err(ApiError::AssetFetch)?;

    let headers = [
        (CONTENT_TYPE, asset.content_type),
        (CACHE_CONTROL, IMAGE_CACHE_CONTROL.to_string()),
    ];
    Ok((headers, asset.bytes).into_response())
}

#[utoipa::path(
    post,
    path = "/api/download",
    tag = "assets",
    request_body = ConversionResult,
    responses(
        (status = 200, description = "ZIP archive with the Markdown and images", content_type = "application/zip"),
        (status = 400, description = "Malformed manifest", body = ErrorResponse),
        (status = 500, description = "Archive could not be written", body = ErrorResponse)
    )
)]
pub async fn download_archive(
    State(state): State<AppState>,
    Json(result): Json<ConversionResult>,
) -> Result<Response, ApiError> {
    // Manifest entries become archive paths.
    if let Some(asset) = result
        .assets
        .iter()
        .find(|a| !is_plain_filename(&a.filename))
    {
        return Err(ApiError::BadRequest(format!(
            "Invalid asset filename {:?}",
            asset.filename
        )));
    }

    let archive = build_archive(
        &result,
        state.assets.clone(),
        state.config.asset_concurrency(),
    )
    .await?;
    info!(archive = %archive.filename, skipped = archive.skipped.len(), "serving archive");

    let headers = [
        (CONTENT_TYPE, ZIP_CONTENT_TYPE.to_string()),
        (CONTENT_DISPOSITION, content_disposition(&archive.filename)),
        (
            HeaderName::from_static(SKIPPED_ASSETS_HEADER),
            archive.skipped.len().to_string(),
        ),
    ];
    Ok((headers, archive.bytes).into_response())
}

#[utoipa::path(
    post,
    path = "/api/direct-sync",
    tag = "publish",
    request_body = DirectSyncRequest,
    responses(
        (status = 200, description = "Pull request opened", body = DirectSyncResponse),
        (status = 400, description = "Invalid URL or destination", body = ErrorResponse),
        (status = 401, description = "GitHub rejected the token", body = ErrorResponse),
        (status = 404, description = "Repository or branch not found", body = ErrorResponse),
        (status = 502, description = "Article or image could not be fetched", body = ErrorResponse)
    )
)]
pub async fn direct_sync(
    State(state): State<AppState>,
    Json(payload): Json<DirectSyncRequest>,
) -> Result<Json<DirectSyncResponse>, ApiError> {
    payload
        .validate(state.config.source_host())
        .map_err(ApiError::BadRequest)?;
    payload.github_config.validate()?;

    let result = convert::convert(payload.url.trim()).await?;
    let outcome = state
        .publisher
        .publish(&result, &payload.github_config, state.assets.as_ref())
        .await?;

    Ok(Json(DirectSyncResponse {
        message: "Article synced successfully".to_string(),
        title: result.title,
        success: true,
        pull_request: outcome.pull_request,
        branch: outcome.branch,
    }))
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

/// ASCII `filename` for old clients plus the exact UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let ascii = if ascii.trim_end_matches(".zip").trim_matches(['-', '_', '.']).is_empty() {
        FALLBACK_ARCHIVE_NAME.to_string()
    } else {
        ascii
    };

    if ascii == filename {
        format!("attachment; filename=\"{}\"", filename)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            utf8_percent_encode(filename, NON_ALPHANUMERIC)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        fetcher::{AssetResponse, FetchError, source::MockAssetSource},
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use bytes::Bytes;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn state_with(source: MockAssetSource) -> AppState {
        AppState::new(Config::default())
            .unwrap()
            .with_assets(Arc::new(source))
    }

    fn app(source: MockAssetSource) -> axum::Router {
        crate::api::router(state_with(source))
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn message_of(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        error.message
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("hello-world.zip"),
            "attachment; filename=\"hello-world.zip\""
        );
        assert_eq!(
            content_disposition("第一篇.zip"),
            "attachment; filename=\"article.zip\"; filename*=UTF-8''%E7%AC%AC%E4%B8%80%E7%AF%87%2Ezip"
        );
    }

    #[test]
    fn test_plain_filename() {
        assert!(is_plain_filename("abc.jpg"));
        assert!(!is_plain_filename("../abc.jpg"));
        assert!(!is_plain_filename("a\\b.jpg"));
        assert!(!is_plain_filename(""));
    }

    #[tokio::test]
    async fn test_convert_rejects_invalid_url() {
        let response = app(MockAssetSource::new())
            .oneshot(json_request("/api/convert", serde_json::json!({ "url": "not a url" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(message_of(response).await.contains("http"));
    }

    #[tokio::test]
    async fn test_batch_rejects_empty_list() {
        let response = app(MockAssetSource::new())
            .oneshot(json_request("/api/convert/batch", serde_json::json!({ "urls": [] })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_image_proxy_passes_bytes_through() {
        let mut source = MockAssetSource::new();
        source
            .expect_fetch_asset()
            .withf(|url: &str| url == "https://mmbiz.qpic.cn/a/640")
            .times(1)
            .returning(|url: &str| {
                Ok(AssetResponse {
                    url: url.to_string(),
                    content_type: "image/png".to_string(),
                    bytes: Bytes::from_static(b"\x89PNG"),
                })
            });

        let request = Request::builder()
            .uri("/api/image-proxy?url=https%3A%2F%2Fmmbiz.qpic.cn%2Fa%2F640")
            .body(Body::empty())
            .unwrap();
        let response = app(source).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
        assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=31536000");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_image_proxy_upstream_failure_is_bad_gateway() {
        let mut source = MockAssetSource::new();
        source.expect_fetch_asset().returning(|_: &str| {
            Err(FetchError::Http {
                status: StatusCode::FORBIDDEN,
            })
        });

        let request = Request::builder()
            .uri("/api/image-proxy?url=https%3A%2F%2Fmmbiz.qpic.cn%2Fa")
            .body(Body::empty())
            .unwrap();
        let response = app(source).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(message_of(response).await.contains("403"));
    }

    #[tokio::test]
    async fn test_download_reports_skipped_assets() {
        let mut source = MockAssetSource::new();
        source.expect_fetch_asset().returning(|_: &str| {
            Err(FetchError::Http {
                status: StatusCode::NOT_FOUND,
            })
        });

        let result = ConversionResult {
            id: Uuid::new_v4(),
            title: "hello world".to_string(),
            author: None,
            publish_time: None,
            markdown: "# hello world\n\n![](./images/a.jpg)".to_string(),
            body: String::new(),
            assets: vec![crate::extractor::AssetReference {
                original_url: "https://mmbiz.qpic.cn/a".to_string(),
                filename: "a.jpg".to_string(),
                ordinal: 1,
            }],
            source_url: "https://mp.weixin.qq.com/s/x".to_string(),
        };

        let response = app(source)
            .oneshot(json_request(
                "/api/download",
                serde_json::to_value(&result).unwrap(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/zip");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"hello-world.zip\""
        );
        assert_eq!(response.headers()[SKIPPED_ASSETS_HEADER], "1");
    }

    #[tokio::test]
    async fn test_download_rejects_path_like_filenames() {
        let body = serde_json::json!({
            "id": Uuid::new_v4(),
            "title": "t",
            "author": null,
            "publishTime": null,
            "markdown": "# t",
            "assets": [{ "originalUrl": "https://a/b", "filename": "../evil", "ordinal": 1 }],
            "sourceUrl": "https://mp.weixin.qq.com/s/x"
        });
        let response = app(MockAssetSource::new())
            .oneshot(json_request("/api/download", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_direct_sync_rejects_foreign_host() {
        let body = serde_json::json!({
            "url": "https://example.com/s/abc",
            "githubConfig": { "repo": "a/b", "token": "t" }
        });
        let response = app(MockAssetSource::new())
            .oneshot(json_request("/api/direct-sync", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(message_of(response).await.contains("mp.weixin.qq.com"));
    }

    #[tokio::test]
    async fn test_direct_sync_rejects_bad_repo_before_fetching() {
        let body = serde_json::json!({
            "url": "https://mp.weixin.qq.com/s/abc",
            "githubConfig": { "repo": "not-a-repo", "token": "t" }
        });
        let response = app(MockAssetSource::new())
            .oneshot(json_request("/api/direct-sync", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
