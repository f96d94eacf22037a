//! ZIP packaging: `<slug>.md` next to an `images/` folder.

use pinyin::ToPinyin;
use regex::Regex;
use std::{
    io::{Cursor, Write},
    sync::{Arc, LazyLock},
};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{info, warn};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::{
    extractor::{AssetReference, ConversionResult, assets::IMAGES_DIR},
    fetcher::{AssetResponse, AssetSource, FetchError},
};

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static NON_ASCII_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").unwrap());
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

const FALLBACK_SLUG: &str = "article";

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("asset task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug)]
pub struct Archive {
    /// `<slug>.zip`
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Original URLs of assets that could not be fetched.
    pub skipped: Vec<String>,
}

/// File-name-safe form of a title. Word characters (any script) survive,
/// whitespace becomes `-`, everything else is removed.
pub fn slugify(title: &str) -> String {
    let cleaned = NON_WORD.replace_all(title, "");
    let slug = WHITESPACE.replace_all(cleaned.trim(), "-").to_string();
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// ASCII-only slug for repository paths. Han characters are spelled out in
/// toneless pinyin, one `-`-separated syllable each; anything else outside
/// ASCII word characters is removed.
pub fn repo_slug(title: &str) -> String {
    let mut spelled = String::with_capacity(title.len());
    for (c, syllable) in title.chars().zip(title.to_pinyin()) {
        match syllable {
            Some(syllable) => {
                spelled.push(' ');
                spelled.push_str(syllable.plain());
                spelled.push(' ');
            }
            None => spelled.push(c),
        }
    }

    let cleaned = NON_ASCII_WORD.replace_all(&spelled, "");
    let dashed = WHITESPACE.replace_all(cleaned.trim(), "-");
    let slug = DASHES.replace_all(&dashed, "-").trim_matches('-').to_string();
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Fetch every asset (in parallel, at most `concurrency` at a time) and zip
/// them up with the Markdown. Assets that fail are logged and left out.
pub async fn build_archive(
    result: &ConversionResult,
    source: Arc<dyn AssetSource>,
    concurrency: usize,
) -> Result<Archive, PackageError> {
    let fetched = fetch_all(&result.assets, source, concurrency).await?;

    let slug = slugify(&result.title);
    let mut skipped = Vec::new();
    let mut images = Vec::new();
    for (asset, outcome) in fetched {
        match outcome {
            Ok(response) => images.push((asset, response)),
            Err(e) => {
                warn!(url = %asset.original_url, error = %e, "skipping asset");
                skipped.push(asset.original_url);
            }
        }
    }

    let bytes = write_zip(&slug, &result.markdown, &images)?;
    info!(
        archive = %slug,
        images = images.len(),
        skipped = skipped.len(),
        bytes = bytes.len(),
        "built archive"
    );

    Ok(Archive {
        filename: format!("{}.zip", slug),
        bytes,
        skipped,
    })
}

type Fetched = (AssetReference, Result<AssetResponse, FetchError>);

async fn fetch_all(
    assets: &[AssetReference],
    source: Arc<dyn AssetSource>,
    concurrency: usize,
) -> Result<Vec<Fetched>, PackageError> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for asset in assets.iter().cloned() {
        let source = source.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = source.fetch_asset(&asset.original_url).await;
            (asset, outcome)
        });
    }

    let mut fetched = Vec::with_capacity(assets.len());
    while let Some(joined) = tasks.join_next().await {
        fetched.push(joined?);
    }
    fetched.sort_by_key(|(asset, _)| asset.ordinal);
    Ok(fetched)
}

fn write_zip(
    slug: &str,
    markdown: &str,
    images: &[(AssetReference, AssetResponse)],
) -> Result<Vec<u8>, PackageError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file(format!("{}.md", slug), options)?;
    zip.write_all(markdown.as_bytes())?;

    zip.add_directory(format!("{}/", IMAGES_DIR), options)?;
    for (asset, response) in images {
        zip.start_file(format!("{}/{}", IMAGES_DIR, asset.filename), options)?;
        zip.write_all(&response.bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}
