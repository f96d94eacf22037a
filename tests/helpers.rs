use axum::Router;
use wechat_md::{api, app_state::AppState, config::Config};
use wiremock::MockServer;

/// Config pointing every upstream (article host, image CDN, GitHub) at the
/// mock server.
pub fn test_config(mock_server: &MockServer) -> Config {
    Config::new("127.0.0.1:0", "127.0.0.1", mock_server.uri(), 2)
}

pub fn test_app(mock_server: &MockServer) -> Router {
    let state = AppState::new(test_config(mock_server)).expect("Failed to build state");
    api::router(state)
}

pub fn article_html(image_base: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title></title></head>
<body>
  <h1 id="activity-name">Hello World</h1>
  <a id="js_name">Some Account</a>
  <em id="publish_time">2024-06-01</em>
  <div id="js_content">
    <p>First paragraph of the article.</p>
    <p><img data-src="{base}/img/1.png" src="data:image/gif;base64,R0lGOD"></p>
    <p>Last words.</p>
  </div>
</body>
</html>"#,
        base = image_base
    )
}
