use chrono::Utc;
use regex::Regex;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::fs;
use url::Url;

use crate::extractor::{DEFAULT_TITLE, extract};
use crate::fetcher::types::PageResponse;

const SOURCE_URL: &str = "https://mp.weixin.qq.com/s/abc";

fn create_test_response(html: String, url: &str) -> PageResponse {
    PageResponse {
        url_final: Url::parse(url).unwrap(),
        status: StatusCode::OK,
        content_type: "text/html; charset=utf-8".to_string(),
        body_utf8: html,
        encoding: encoding_rs::UTF_8,
        fetched_at: Utc::now(),
    }
}

fn image_refs(markdown: &str) -> Vec<String> {
    let re = Regex::new(r"!\[[^\]]*\]\(\./images/([^) ]+)").unwrap();
    re.captures_iter(markdown)
        .map(|c| c[1].to_string())
        .collect()
}

#[test]
fn test_convert_article() {
    let html = fs::read_to_string("src/extractor/tests/fixtures/article.html")
        .expect("Failed to read test fixture");

    let response = create_test_response(html, SOURCE_URL);
    let result = extract(&response, SOURCE_URL);

    assert_eq!(result.title, "Rust 异步编程入门");
    assert_eq!(result.author.as_deref(), Some("Rust 中文社区"));
    assert_eq!(result.publish_time.as_deref(), Some("2024-03-18 20:30"));
    assert_eq!(result.source_url, SOURCE_URL);

    assert!(result.markdown.starts_with(
        "# Rust 异步编程入门\n\n> 作者：Rust 中文社区\n>\n> 发布时间：2024-03-18 20:30\n>\n> 原文链接：https://mp.weixin.qq.com/s/abc\n\n"
    ));
    assert!(result.markdown.ends_with(&result.body));

    // Lazy-loaded sources win over the inline placeholder
    assert_eq!(result.assets.len(), 2);
    assert_eq!(
        result.assets[0].original_url,
        "https://mmbiz.qpic.cn/mmbiz_png/abc123/640?wx_fmt=png"
    );
    assert_eq!(
        result.assets[1].original_url,
        "https://mmbiz.qpic.cn/mmbiz_jpg/def456/0.jpeg?wx_fmt=jpeg"
    );
    assert_eq!(result.assets[0].ordinal, 1);
    assert_eq!(result.assets[1].ordinal, 2);
    assert!(result.assets[0].filename.ends_with(".jpg"));
    assert!(result.assets[1].filename.ends_with(".jpeg"));

    let body = &result.body;
    assert!(body.starts_with(&format!("![](./images/{})", result.assets[0].filename)));
    assert!(body.contains("## 为什么需要异步"));
    assert!(body.contains("**线程开销**会成为瓶颈。"));
    assert!(body.contains("* Future 是惰性的\n* 需要执行器驱动"));
    assert!(body.contains("> Async 不是银弹。"));
    assert!(body.contains("```\nasync fn hello() {\n    println!(\"hi\");\n}\n```"));
    assert!(body.contains(&format!(
        "![diagram](./images/{} \"执行流程\")",
        result.assets[1].filename
    )));
    assert!(body.ends_with("更多内容见 [官网](https://rust-lang.org)。"));

    assert!(!result.markdown.contains("data:image"));
    assert!(!result.markdown.contains('<'));
    assert!(!result.markdown.contains("msg_title"));
}

#[test]
fn test_every_image_reference_has_one_manifest_entry() {
    let html = fs::read_to_string("src/extractor/tests/fixtures/article.html")
        .expect("Failed to read test fixture");
    let result = extract(&create_test_response(html, SOURCE_URL), SOURCE_URL);

    let refs = image_refs(&result.markdown);
    assert_eq!(refs.len(), result.assets.len());

    let filenames: HashSet<_> = result.assets.iter().map(|a| a.filename.clone()).collect();
    assert_eq!(filenames.len(), result.assets.len());
    for filename in refs {
        assert_eq!(
            result.assets.iter().filter(|a| a.filename == filename).count(),
            1
        );
    }
}

#[test]
fn test_missing_content_root_keeps_header() {
    let html = fs::read_to_string("src/extractor/tests/fixtures/no_content.html")
        .expect("Failed to read test fixture");

    let result = extract(&create_test_response(html, SOURCE_URL), SOURCE_URL);

    assert_eq!(result.title, "该内容已被发布者删除");
    assert!(result.body.is_empty());
    assert!(result.assets.is_empty());
    assert_eq!(
        result.markdown,
        "# 该内容已被发布者删除\n\n> 原文链接：https://mp.weixin.qq.com/s/abc\n\n"
    );
}

#[test]
fn test_relative_images_resolve_against_final_url() {
    let html = r#"<h1 id="activity-name">T</h1><div id="js_content"><p><img src="/pic/a.png"></p></div>"#;
    let response = create_test_response(html.to_string(), "https://example.com/post/1");

    let result = extract(&response, "https://example.com/post/1");
    assert_eq!(result.assets[0].original_url, "https://example.com/pic/a.png");
    assert_eq!(
        result.body,
        format!("![](./images/{})", result.assets[0].filename)
    );
}

#[test]
fn test_malformed_html() {
    let html = "<html><body><div id=\"js_content\"><p>Unclosed <strong>bold<p>Next".to_string();
    let result = extract(&create_test_response(html, SOURCE_URL), SOURCE_URL);

    assert_eq!(result.title, DEFAULT_TITLE);
    assert!(result.body.contains("Unclosed **bold**"));
    assert!(result.body.contains("Next"));
}

#[test]
fn test_each_conversion_gets_a_fresh_id() {
    let html = "<div id=\"js_content\"><p>x</p></div>".to_string();
    let a = extract(&create_test_response(html.clone(), SOURCE_URL), SOURCE_URL);
    let b = extract(&create_test_response(html, SOURCE_URL), SOURCE_URL);
    assert_ne!(a.id, b.id);
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_extract_never_panics(html in ".*") {
            let response = create_test_response(html, SOURCE_URL);
            let _ = extract(&response, SOURCE_URL);
        }

        #[test]
        fn test_title_never_empty(title in "[^<>&]{0,40}") {
            let html = format!(r#"<h1 id="activity-name">{}</h1><div id="js_content"></div>"#, title);
            let result = extract(&create_test_response(html, SOURCE_URL), SOURCE_URL);
            prop_assert!(!result.title.is_empty());
            prop_assert!(result.markdown.starts_with("# "));
        }
    }
}
