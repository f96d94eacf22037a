use url::Url;
use uuid::Uuid;

use crate::extractor::{
    model::AssetReference,
    tree::{Element, Node},
};

/// The platform defers real images behind this attribute; it wins over `src`.
pub const LAZY_SRC_ATTR: &str = "data-src";
pub const DEFAULT_EXTENSION: &str = "jpg";
/// Directory the Markdown file expects its images in.
pub const IMAGES_DIR: &str = "images";

/// Walk the tree in document order, point every resolvable `img` at
/// `./images/<filename>`, and return the manifest.
pub fn rewrite(root: &mut Node, base_url: &Url) -> Vec<AssetReference> {
    let mut assets = Vec::new();
    visit(root, base_url, &mut assets);
    assets
}

fn visit(node: &mut Node, base_url: &Url, assets: &mut Vec<AssetReference>) {
    let Node::Element(el) = node else {
        return;
    };

    if el.tag == "img" {
        if let Some(asset) = rewrite_image(el, base_url, assets.len() + 1) {
            assets.push(asset);
        }
        return;
    }

    for child in &mut el.children {
        visit(child, base_url, assets);
    }
}

fn rewrite_image(img: &mut Element, base_url: &Url, ordinal: usize) -> Option<AssetReference> {
    let raw = img
        .non_empty_attr(LAZY_SRC_ATTR)
        .or_else(|| img.non_empty_attr("src"))?;
    let original_url = resolve_source(raw, base_url);
    let filename = format!("{}.{}", Uuid::new_v4(), extension_of(&original_url));

    img.set_attr("src", local_path(&filename));

    Some(AssetReference {
        original_url,
        filename,
        ordinal,
    })
}

/// Absolute sources are kept verbatim; relative and protocol-relative ones
/// are joined against the article URL.
fn resolve_source(raw: &str, base_url: &Url) -> String {
    if Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    base_url
        .join(raw)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Extension of the last path segment before any query or fragment.
pub fn extension_of(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or_default();

    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

pub fn local_path(filename: &str) -> String {
    format!("./{}/{}", IMAGES_DIR, filename)
}
