#![no_main]

use libfuzzer_sys::fuzz_target;
use url::Url;

use wechat_md::extractor::convert_html;
use wechat_md::fetcher::pipeline::detect_encoding;

fuzz_target!(|data: &[u8]| {
    // Charset sniffing sees raw bytes, the extractor sees whatever they decode to
    let encoding = detect_encoding("text/html", data);
    let (html, _, _) = encoding.decode(data);

    let base = Url::parse("https://mp.weixin.qq.com/s/fuzz").unwrap();
    let result = convert_html(&html, &base, base.as_str());

    assert!(!result.title.is_empty());
    assert!(result.markdown.starts_with("# "));
    for (i, asset) in result.assets.iter().enumerate() {
        assert_eq!(asset.ordinal, i + 1);
    }
});
