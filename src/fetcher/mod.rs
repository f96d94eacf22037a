pub mod client;
pub mod errors;
pub mod pipeline;
pub mod source;
pub mod types;

pub use client::{BROWSER_USER_AGENT, PLATFORM_REFERER, fetch, fetch_asset, get_client};
pub use errors::FetchError;
pub use source::{AssetSource, HttpAssetSource};
pub use types::{AssetResponse, PageResponse};
