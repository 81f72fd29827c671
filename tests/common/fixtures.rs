//! Configuration and asset fixtures

use std::time::Duration;

use chapter_harvest::config::{PollConfig, RetryConfig};
use chapter_harvest::{Config, RawAsset};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Smallest valid PNG header, enough to tell files apart
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Config with short deadlines and no spinner, for tests on the real clock
pub fn fast_config() -> Config {
    Config {
        poll: PollConfig {
            interval: Duration::from_millis(10),
            structural_timeout: Duration::from_millis(200),
            content_timeout: Duration::from_millis(300),
        },
        retry: RetryConfig {
            delay: Duration::from_millis(20),
            ..RetryConfig::default()
        },
        show_progress: false,
        ..Config::default()
    }
}

/// Default deadlines without the spinner, for paused-clock tests
pub fn quiet_config() -> Config {
    Config {
        show_progress: false,
        ..Config::default()
    }
}

/// An uploaded image as the editor renders it, with inline dimensions
pub fn uploaded(base: &str, name: &str) -> RawAsset {
    let src = format!("{base}/wp-content/uploads/{name}");
    RawAsset::with_markup(
        src.clone(),
        format!(r#"<img class="alignnone" src="{src}" alt="{name}" width="800" height="600" />"#),
    )
}

/// A theme image that must never be picked up
pub fn decorative(base: &str) -> RawAsset {
    let src = format!("{base}/theme/spacer.gif");
    RawAsset::with_markup(src.clone(), format!(r#"<img src="{src}">"#))
}

/// Serve `body` at `/wp-content/uploads/<name>`
pub async fn serve_upload(server: &MockServer, name: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/wp-content/uploads/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Answer `/wp-content/uploads/<name>` with `status` and no body
pub async fn fail_upload(server: &MockServer, name: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(format!("/wp-content/uploads/{name}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
