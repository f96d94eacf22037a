use anyhow::{Context, Result, bail};
use std::{path::PathBuf, sync::Arc};
use tracing::{error, info};
use wechat_md::{
    api::dtos::validate_url, config::Config, convert::convert_batch, fetcher::HttpAssetSource,
    package::build_archive,
};

const USAGE: &str = "usage: convert [--out DIR] URL...";

struct Args {
    out_dir: PathBuf,
    urls: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut out_dir = PathBuf::from(".");
    let mut urls = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--out" => {
                out_dir = args.next().map(PathBuf::from).context(USAGE)?;
            }
            "-h" | "--help" => bail!(USAGE),
            _ => urls.push(arg),
        }
    }

    if urls.is_empty() {
        bail!(USAGE);
    }
    for url in &urls {
        validate_url(url).map_err(|e| anyhow::anyhow!("{}: {}", url, e))?;
    }
    Ok(Args { out_dir, urls })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = parse_args()?;
    let config = Config::from_env()?;
    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    let assets = Arc::new(HttpAssetSource);
    let mut failed = 0;

    for (url, outcome) in convert_batch(&args.urls).await {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(url = %url, error = %e, "conversion failed");
                failed += 1;
                continue;
            }
        };

        let archive = build_archive(&result, assets.clone(), config.asset_concurrency()).await?;
        let path = args.out_dir.join(&archive.filename);
        tokio::fs::write(&path, &archive.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(
            url = %url,
            path = %path.display(),
            skipped = archive.skipped.len(),
            "wrote archive"
        );
    }

    if failed > 0 {
        bail!("{} of {} articles failed", failed, args.urls.len());
    }
    Ok(())
}
