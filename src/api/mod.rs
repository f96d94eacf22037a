//! HTTP surface: conversion, image proxy, archive download and GitHub sync.

pub mod dtos;
pub mod error;
pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{app_state::AppState, health};

pub use error::ApiError;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        handlers::convert_article,
        handlers::convert_articles,
        handlers::image_proxy,
        handlers::download_archive,
        handlers::direct_sync,
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "convert", description = "Article to Markdown conversion"),
        (name = "assets", description = "Image proxy and ZIP download"),
        (name = "publish", description = "Pull requests against a GitHub repository")
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::health_check))
        .route("/api/convert", post(handlers::convert_article))
        .route("/api/convert/batch", post(handlers::convert_articles))
        .route("/api/image-proxy", get(handlers::image_proxy))
        .route("/api/download", post(handlers::download_archive))
        .route("/api/direct-sync", post(handlers::direct_sync))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(Config::default()).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "OK" }));
    }

    #[tokio::test]
    async fn test_openapi_document_lists_routes() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        for path in [
            "/healthz",
            "/api/convert",
            "/api/convert/batch",
            "/api/image-proxy",
            "/api/download",
            "/api/direct-sync",
        ] {
            assert!(json["paths"].get(path).is_some(), "{path} missing");
        }
    }
}
