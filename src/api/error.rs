use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::{
    api::dtos::ErrorResponse, convert::ConvertError, fetcher::FetchError, package::PackageError,
    publish::PublishError,
};

/// Everything a handler can fail with, rendered as `{"message": ...}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Convert(ConvertError),
    AssetFetch(FetchError),
    Package(PackageError),
    Publish(PublishError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Convert(_) | Self::AssetFetch(_) => StatusCode::BAD_GATEWAY,
            Self::Package(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Publish(e) => e.status(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Convert(e) => format!("Failed to convert article: {}", e),
            Self::AssetFetch(e) => format!("Failed to fetch image: {}", e),
            Self::Package(e) => format!("Failed to build archive: {}", e),
            Self::Publish(e) => format!("Failed to sync to GitHub: {}", e),
        }
    }
}

impl From<ConvertError> for ApiError {
    fn from(e: ConvertError) -> Self {
        Self::Convert(e)
    }
}

impl From<PackageError> for ApiError {
    fn from(e: PackageError) -> Self {
        Self::Package(e)
    }
}

impl From<PublishError> for ApiError {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(status = %status, "{}", message);
        }
        (status, Json(ErrorResponse { message })).into_response()
    }
}
