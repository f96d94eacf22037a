//! Publishing a converted article to a GitHub repository as a pull request.

pub mod errors;
pub mod github;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;

use crate::extractor::assets::IMAGES_DIR;

pub use errors::{PublishError, RemoteFailure};
pub use github::{GithubPublisher, PublishOutcome, render_markdown};

static REPO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").unwrap());

pub const DEFAULT_MARKDOWN_DIR: &str = "articles";
pub const DEFAULT_IMAGES_DIR: &str = IMAGES_DIR;

/// Where and how to publish, supplied per request.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GithubConfig {
    /// `owner/name`
    pub repo: String,
    pub token: String,
    /// Base branch for the pull request; the repository default when absent.
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub markdown_dir: Option<String>,
    #[serde(default)]
    pub images_dir: Option<String>,
    /// Front-matter template replacing the default metadata header.
    #[serde(default)]
    pub markdown_template: Option<String>,
}

impl GithubConfig {
    pub fn validate(&self) -> Result<(), PublishError> {
        if !REPO_ID.is_match(self.repo.trim()) {
            return Err(PublishError::InvalidDestination(format!(
                "repository must look like owner/name, got {:?}",
                self.repo
            )));
        }
        if self.token.trim().is_empty() {
            return Err(PublishError::InvalidDestination(
                "token is required".to_string(),
            ));
        }
        for dir in [self.markdown_dir(), self.images_dir()] {
            if dir.split('/').any(|segment| segment == "..") {
                return Err(PublishError::InvalidDestination(format!(
                    "directory {:?} leaves the repository",
                    dir
                )));
            }
        }
        Ok(())
    }

    pub fn markdown_dir(&self) -> String {
        non_empty_dir(self.markdown_dir.as_deref())
            .unwrap_or_else(|| DEFAULT_MARKDOWN_DIR.to_string())
    }

    pub fn images_dir(&self) -> String {
        non_empty_dir(self.images_dir.as_deref())
            .unwrap_or_else(|| DEFAULT_IMAGES_DIR.to_string())
    }

    pub fn template(&self) -> Option<&str> {
        self.markdown_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

fn non_empty_dir(dir: Option<&str>) -> Option<String> {
    dir.map(|d| d.trim().trim_matches('/').to_string())
        .filter(|d| !d.is_empty())
}
