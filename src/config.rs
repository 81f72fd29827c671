//! Configuration types for chapter-harvest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Readiness polling cadence and deadlines
///
/// Two deadline tiers exist: the structural deadline guards reachability of an
/// expected page region and is fatal on expiry; the content deadline guards
/// asset discovery and means "no assets" on expiry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between two polls (default: 100 ms)
    #[serde(default = "default_poll_interval", with = "duration_ms_serde")]
    pub interval: Duration,

    /// Deadline for the chapter list and the content frame (default: 5 s)
    #[serde(default = "default_structural_timeout", with = "duration_ms_serde")]
    pub structural_timeout: Duration,

    /// Deadline for asset discovery inside a chapter (default: 10 s)
    #[serde(default = "default_content_timeout", with = "duration_ms_serde")]
    pub content_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            structural_timeout: default_structural_timeout(),
            content_timeout: default_content_timeout(),
        }
    }
}

/// Retry policy for stale element references
///
/// `max_attempts` counts the first try, so the default of 2 means
/// "retry exactly once".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 5 seconds)
    #[serde(default = "default_retry_delay", with = "duration_ms_serde")]
    pub delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0, a fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Upper bound for any single delay (default: 60 seconds)
    #[serde(default = "default_max_retry_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay: default_max_retry_delay(),
            jitter: false,
        }
    }
}

/// Asset fetching settings for the file sink
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcquireConfig {
    /// Maximum in-flight fetches within one chapter (default: 8)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Per-request timeout (default: 30 s)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with asset requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Graphics bundle layout
///
/// `heading` is a template with `{no}` and `{name}` placeholders.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkupConfig {
    /// Chapter heading template
    #[serde(default = "default_heading")]
    pub heading: String,

    /// Opening tag of the centering wrapper around each image
    #[serde(default = "default_wrapper_open")]
    pub wrapper_open: String,

    /// Closing tag of the centering wrapper
    #[serde(default = "default_wrapper_close")]
    pub wrapper_close: String,

    /// Marker appended after every chapter
    #[serde(default = "default_page_break")]
    pub page_break: String,

    /// Marker appended once after the last chapter; keeps the editor from
    /// truncating the final chapter on import
    #[serde(default = "default_trailer")]
    pub trailer: String,

    /// File name of the written bundle (default: "output.html")
    #[serde(default = "default_output_file")]
    pub output_file: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            heading: default_heading(),
            wrapper_open: default_wrapper_open(),
            wrapper_close: default_wrapper_close(),
            page_break: default_page_break(),
            trailer: default_trailer(),
            output_file: default_output_file(),
        }
    }
}

/// Where things live on the rendered editor pages
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// XPath of the chapter links on the book's chapter list page
    #[serde(default = "default_chapter_links")]
    pub chapter_links: String,

    /// `name` of the input holding the chapter title in its `value`
    #[serde(default = "default_title_field")]
    pub title_field: String,

    /// `id` of the iframe hosting the chapter body
    #[serde(default = "default_content_frame")]
    pub content_frame: String,

    /// XPath of image candidates inside the chapter body
    #[serde(default = "default_images")]
    pub images: String,

    /// Substring of `src` identifying user-uploaded images
    #[serde(default = "default_asset_marker")]
    pub asset_marker: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            chapter_links: default_chapter_links(),
            title_field: default_title_field(),
            content_frame: default_content_frame(),
            images: default_images(),
            asset_marker: default_asset_marker(),
        }
    }
}

/// WebDriver endpoint and browser session settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebDriverConfig {
    /// Base URL of the running driver (default: "http://localhost:9515", chromedriver)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Browser name requested in the session capabilities (default: "chrome")
    #[serde(default = "default_browser")]
    pub browser: String,

    /// Browser profile directory; reusing it keeps the login alive across runs
    #[serde(default = "default_profile_dir")]
    pub profile_dir: Option<String>,

    /// Timeout for a single WebDriver command (default: 60 s)
    #[serde(default = "default_command_timeout", with = "duration_ms_serde")]
    pub command_timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            browser: default_browser(),
            profile_dir: default_profile_dir(),
            command_timeout: default_command_timeout(),
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Polling cadence and deadlines
    #[serde(default)]
    pub poll: PollConfig,

    /// Stale reference retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// File sink settings
    #[serde(default)]
    pub acquire: AcquireConfig,

    /// Graphics bundle layout
    #[serde(default)]
    pub markup: MarkupConfig,

    /// Page selectors
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Browser session
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// Show the per-chapter spinner (default: true)
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Config {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll.interval.is_zero() {
            return Err(config_error("poll interval must be non-zero", "poll.interval"));
        }
        if self.poll.interval >= self.poll.structural_timeout {
            return Err(config_error(
                "poll interval must be shorter than the structural timeout",
                "poll.structural_timeout",
            ));
        }
        if self.poll.interval >= self.poll.content_timeout {
            return Err(config_error(
                "poll interval must be shorter than the content timeout",
                "poll.content_timeout",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(config_error(
                "at least one attempt is required",
                "retry.max_attempts",
            ));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(config_error(
                "backoff multiplier must be a finite number of at least 1.0",
                "retry.backoff_multiplier",
            ));
        }
        if self.retry.delay > self.retry.max_delay {
            return Err(config_error(
                "retry delay must not exceed the maximum delay",
                "retry.max_delay",
            ));
        }
        if self.acquire.max_concurrent_fetches == 0 {
            return Err(config_error(
                "concurrency must be at least 1",
                "acquire.max_concurrent_fetches",
            ));
        }
        if self.selectors.asset_marker.is_empty() {
            return Err(config_error(
                "asset marker must not be empty",
                "selectors.asset_marker",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_structural_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_content_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_max_retry_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("chapter-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_heading() -> String {
    r#"<h1 class="mce-root CDPAlignLeft CDPAlign">Chapter {no}: {name}</h1>"#.to_string()
}

fn default_wrapper_open() -> String {
    r#"<p class="CDPAlignCenter CDPAlign">"#.to_string()
}

fn default_wrapper_close() -> String {
    "</p>".to_string()
}

fn default_page_break() -> String {
    "<pagebreak/>".to_string()
}

fn default_trailer() -> String {
    "<p>Graphics Bundle Ends Here</p>".to_string()
}

fn default_output_file() -> String {
    "output.html".to_string()
}

fn default_chapter_links() -> String {
    "//tr[contains(@class, 'matter-type-chapter')]/td[2]/span[@class='cdp-organizer-chapter-title']/span/a"
        .to_string()
}

fn default_title_field() -> String {
    "post_title".to_string()
}

fn default_content_frame() -> String {
    "content_ifr".to_string()
}

fn default_images() -> String {
    "//img".to_string()
}

fn default_asset_marker() -> String {
    "upload".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:9515".to_string()
}

fn default_browser() -> String {
    "chrome".to_string()
}

fn default_profile_dir() -> Option<String> {
    Some("selenium".to_string())
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_true() -> bool {
    true
}

// Durations are written as integer milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
