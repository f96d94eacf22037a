use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{NaiveDate, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use rand::Rng;
use reqwest::{
    Client, ClientBuilder, Method, RequestBuilder,
    header::{ACCEPT, AUTHORIZATION},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::{
    extractor::{ConversionResult, assets::IMAGES_DIR, compose::apply_template},
    fetcher::AssetSource,
    package::repo_slug,
    publish::{
        GithubConfig,
        errors::{PublishError, RemoteFailure},
    },
};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("wechat-md/", env!("CARGO_PKG_VERSION"));

/// Characters escaped inside one path segment of a contents URL.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    /// Web URL of the opened pull request.
    pub pull_request: String,
    pub branch: String,
    pub markdown_path: String,
}

#[derive(Deserialize)]
struct Repository {
    default_branch: String,
}

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Deserialize)]
struct PullRequest {
    html_url: String,
}

#[derive(Deserialize)]
struct RemoteMessage {
    message: String,
}

#[derive(Deserialize)]
struct Ignored {}

#[derive(Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct PutContent<'a> {
    message: String,
    content: String,
    branch: &'a str,
}

#[derive(Serialize)]
struct CreatePull<'a> {
    title: String,
    head: &'a str,
    base: &'a str,
    body: String,
}

/// Talks to the GitHub REST API. One instance is shared by every request;
/// credentials come with each [`GithubConfig`].
#[derive(Debug, Clone)]
pub struct GithubPublisher {
    client: Client,
    api_url: String,
}

impl GithubPublisher {
    pub fn new(api_url: impl Into<String>) -> Result<Self, PublishError> {
        let client = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Branch off the base, upload the Markdown and every image, then open a
    /// pull request. The first failure stops everything after it.
    #[instrument(skip_all, fields(repo = %config.repo, title = %result.title))]
    pub async fn publish(
        &self,
        result: &ConversionResult,
        config: &GithubConfig,
        assets: &dyn AssetSource,
    ) -> Result<PublishOutcome, PublishError> {
        config.validate()?;
        let repo = config.repo.trim();
        let token = config.token.trim();

        let today = Utc::now().date_naive();
        let date = today.format("%Y-%m-%d").to_string();
        let slug = repo_slug(&result.title);
        let folder = format!("{}/{}-{}", config.markdown_dir(), date, slug);
        let markdown_path = format!("{}/{}.md", folder, slug);
        let markdown = render_markdown(result, config, today);

        let base = match config.branch.as_deref().map(str::trim) {
            Some(branch) if !branch.is_empty() => branch.to_string(),
            _ => self.default_branch(repo, token).await?,
        };
        let sha = self.head_sha(repo, token, &base).await?;

        let branch = branch_name(&date);
        self.create_branch(repo, token, &branch, &sha).await?;
        info!(branch = %branch, base = %base, "created branch");

        self.put_file(
            repo,
            token,
            &branch,
            &markdown_path,
            markdown.as_bytes(),
            format!("Add article: {}", result.title),
        )
        .await?;

        let images_dir = config.images_dir();
        for asset in &result.assets {
            let image = assets
                .fetch_asset(&asset.original_url)
                .await
                .map_err(|source| {
                    warn!(url = %asset.original_url, error = %source, "aborting publish");
                    PublishError::AssetFetch {
                        url: asset.original_url.clone(),
                        source,
                    }
                })?;

            let path = format!("{}/{}/{}", folder, images_dir, asset.filename);
            self.put_file(
                repo,
                token,
                &branch,
                &path,
                &image.bytes,
                format!("Add image {}", asset.filename),
            )
            .await?;
            debug!(path = %path, "uploaded image");
        }

        let pull_request = self
            .open_pull_request(repo, token, &branch, &base, result)
            .await?;
        info!(pull_request = %pull_request, "opened pull request");

        Ok(PublishOutcome {
            pull_request,
            branch,
            markdown_path,
        })
    }

    async fn default_branch(&self, repo: &str, token: &str) -> Result<String, PublishError> {
        let repository: Repository = send(self.request(Method::GET, repo, token, "")).await?;
        Ok(repository.default_branch)
    }

    async fn head_sha(&self, repo: &str, token: &str, branch: &str) -> Result<String, PublishError> {
        let path = format!("/git/refs/heads/{}", encode_path(branch));
        let head: GitRef = send(self.request(Method::GET, repo, token, &path)).await?;
        Ok(head.object.sha)
    }

    async fn create_branch(
        &self,
        repo: &str,
        token: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), PublishError> {
        let body = CreateRef {
            reference: format!("refs/heads/{}", branch),
            sha,
        };
        let _: Ignored = send(self.request(Method::POST, repo, token, "/git/refs").json(&body)).await?;
        Ok(())
    }

    async fn put_file(
        &self,
        repo: &str,
        token: &str,
        branch: &str,
        path: &str,
        bytes: &[u8],
        message: String,
    ) -> Result<(), PublishError> {
        let body = PutContent {
            message,
            content: STANDARD.encode(bytes),
            branch,
        };
        let path = format!("/contents/{}", encode_path(path));
        let _: Ignored = send(self.request(Method::PUT, repo, token, &path).json(&body)).await?;
        Ok(())
    }

    async fn open_pull_request(
        &self,
        repo: &str,
        token: &str,
        head: &str,
        base: &str,
        result: &ConversionResult,
    ) -> Result<String, PublishError> {
        let body = CreatePull {
            title: format!("Add article: {}", result.title),
            head,
            base,
            body: format!(
                "This PR adds a new article: {}\n\nSource: {}",
                result.title, result.source_url
            ),
        };
        let pull: PullRequest = send(self.request(Method::POST, repo, token, "/pulls").json(&body)).await?;
        Ok(pull.html_url)
    }

    fn request(&self, method: Method, repo: &str, token: &str, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/repos/{}{}", self.api_url, repo, path))
            .header(AUTHORIZATION, format!("token {}", token))
            .header(ACCEPT, GITHUB_ACCEPT)
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, PublishError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let message = match response.json::<RemoteMessage>().await {
            Ok(body) => body.message,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        warn!(status = %status, message = %message, "github rejected request");
        return Err(PublishError::Remote {
            status,
            message,
            classification: RemoteFailure::classify(status),
        });
    }

    Ok(response.json::<T>().await?)
}

/// The Markdown as it will be committed: template applied when one is set,
/// image links pointing at the configured images folder.
pub fn render_markdown(result: &ConversionResult, config: &GithubConfig, today: NaiveDate) -> String {
    let mut markdown = match config.template() {
        Some(template) => {
            // Results posted back by clients may predate the `body` field.
            let body = if result.body.is_empty() {
                result.markdown.as_str()
            } else {
                result.body.as_str()
            };
            apply_template(&result.metadata(), body, &result.source_url, template, today)
        }
        None => result.markdown.clone(),
    };

    let images_dir = config.images_dir();
    if images_dir != IMAGES_DIR {
        markdown = markdown.replace(
            &format!("./{}/", IMAGES_DIR),
            &format!("./{}/", images_dir),
        );
    }
    markdown
}

fn branch_name(date: &str) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("article-{}-{}", date, suffix)
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn result() -> ConversionResult {
        ConversionResult {
            id: Uuid::new_v4(),
            title: "Title".to_string(),
            author: None,
            publish_time: None,
            markdown: "# Title\n\n> 原文链接：https://s\n\n![](./images/a.jpg)\n\nSome body text".to_string(),
            body: "![](./images/a.jpg)\n\nSome body text".to_string(),
            assets: Vec::new(),
            source_url: "https://s".to_string(),
        }
    }

    fn config() -> GithubConfig {
        GithubConfig {
            repo: "a/b".to_string(),
            token: "t".to_string(),
            branch: None,
            markdown_dir: None,
            images_dir: None,
            markdown_template: None,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    #[test]
    fn test_render_without_template_keeps_markdown() {
        let r = result();
        assert_eq!(render_markdown(&r, &config(), day()), r.markdown);
    }

    #[test]
    fn test_render_with_template_uses_body() {
        let mut c = config();
        c.markdown_template = Some("---\ntitle: {{title}}\ndate: {{date}}\n---\n\n".to_string());
        assert_eq!(
            render_markdown(&result(), &c, day()),
            "---\ntitle: Title\ndate: 2024-01-02\n---\n\n![](./images/a.jpg)\n\nSome body text"
        );
    }

    #[test]
    fn test_render_with_template_falls_back_to_markdown() {
        let mut r = result();
        r.body.clear();
        let mut c = config();
        c.markdown_template = Some("[{{source}}]\n".to_string());
        let out = render_markdown(&r, &c, day());
        assert!(out.starts_with("[https://s]\n> 原文链接"));
    }

    #[test]
    fn test_render_rewrites_images_dir() {
        let mut c = config();
        c.images_dir = Some("assets/img".to_string());
        let out = render_markdown(&result(), &c, day());
        assert!(out.contains("![](./assets/img/a.jpg)"));
        assert!(!out.contains("./images/"));
    }

    #[test]
    fn test_branch_name() {
        let name = branch_name("2024-01-02");
        let suffix: u16 = name.strip_prefix("article-2024-01-02-").unwrap().parse().unwrap();
        assert!(suffix < 1000);
    }

    #[test]
    fn test_encode_path_keeps_separators() {
        assert_eq!(
            encode_path("articles/2024-01-02-中文 标题/a#b.md"),
            "articles/2024-01-02-%E4%B8%AD%E6%96%87%20%E6%A0%87%E9%A2%98/a%23b.md"
        );
    }
}
