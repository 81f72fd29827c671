//! [`DocumentSource`] over the W3C WebDriver protocol.
//!
//! Talks JSON over HTTP to a running driver (chromedriver, geckodriver). Only
//! the handful of endpoints the pipeline needs are used: new/delete session,
//! navigate, find elements, element property, switch frame.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value, json};

use crate::config::{Config, SelectorConfig, WebDriverConfig};
use crate::error::{Error, Result};
use crate::poller::Poller;
use crate::types::{AssetKind, NavigationEpoch, RawAsset, UnitRef};

use super::DocumentSource;

/// Key under which W3C drivers serialize web element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// A live browser session driven through a WebDriver endpoint
pub struct WebDriverSource {
    http: reqwest::Client,
    endpoint: String,
    session_id: String,
    selectors: SelectorConfig,
    poller: Poller,
    epoch: NavigationEpoch,
    closed: bool,
}

impl WebDriverSource {
    /// Start a new browser session.
    pub async fn connect(config: &Config) -> Result<Self> {
        let endpoint = config.webdriver.endpoint.trim_end_matches('/').to_string();
        url::Url::parse(&endpoint).map_err(|e| Error::InvalidUrl {
            url: endpoint.clone(),
            reason: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.webdriver.command_timeout)
            .build()?;

        let response = http
            .post(format!("{endpoint}/session"))
            .json(&session_capabilities(&config.webdriver))
            .send()
            .await?;
        let value = decode_response(response).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::WebDriver {
                code: "session not created".to_string(),
                message: "driver response carried no sessionId".to_string(),
            })?
            .to_string();

        tracing::info!(
            session_id = %session_id,
            browser = %config.webdriver.browser,
            "WebDriver session started"
        );

        Ok(Self {
            http,
            endpoint,
            session_id,
            selectors: config.selectors.clone(),
            poller: Poller::new(&config.poll),
            epoch: NavigationEpoch::default(),
            closed: false,
        })
    }

    /// Session id assigned by the driver
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Load `url` in the browser (used for the initial visit before login).
    pub async fn open(&mut self, url: &str) -> Result<()> {
        self.navigate(url).await
    }

    async fn navigate(&mut self, url: &str) -> Result<()> {
        let result = self
            .command(Method::POST, "/url", Some(json!({ "url": url })))
            .await;
        // The page is in an unknown state even if the driver reported failure
        self.epoch.advance();
        result.map(|_| ()).map_err(|e| Error::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/session/{}{}", self.endpoint, self.session_id, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        decode_response(response).await
    }

    async fn find_elements(&self, xpath: &str) -> Result<Vec<String>> {
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "xpath", "value": xpath })),
            )
            .await?;

        Ok(value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get(ELEMENT_KEY).and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn property(&self, element: &str, name: &str) -> Result<Option<String>> {
        let value = self
            .command(
                Method::GET,
                &format!("/element/{element}/property/{name}"),
                None,
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn try_enter_frame(&self) -> Result<Option<()>> {
        let xpath = format!("//iframe[@id='{}']", self.selectors.content_frame);
        let Some(frame) = self.find_elements(&xpath).await?.into_iter().next() else {
            return Ok(None);
        };

        let mut reference = Map::new();
        reference.insert(ELEMENT_KEY.to_string(), Value::String(frame));

        match self
            .command(Method::POST, "/frame", Some(json!({ "id": reference })))
            .await
        {
            Ok(_) => Ok(Some(())),
            Err(Error::WebDriver { code, .. })
                if code == "no such frame" || code == "no such element" =>
            {
                Ok(None)
            }
            Err(Error::StaleReference(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait(?Send)]
impl DocumentSource for WebDriverSource {
    async fn list_units(&mut self) -> Result<Vec<UnitRef>> {
        let links = self.find_elements(&self.selectors.chapter_links).await?;
        let mut units = Vec::with_capacity(links.len());
        for (index, link) in links.iter().enumerate() {
            let ordinal = index as u32 + 1;
            let target = self
                .property(link, "href")
                .await?
                .ok_or_else(|| Error::Navigation {
                    url: String::new(),
                    reason: format!("chapter link #{ordinal} has no href"),
                })?;
            units.push(UnitRef::new(ordinal, target, &self.epoch));
        }
        Ok(units)
    }

    async fn visit(&mut self, unit: &UnitRef) -> Result<()> {
        self.epoch.check(unit)?;
        self.navigate(&unit.target).await
    }

    async fn enter_content_scope(&mut self) -> Result<()> {
        let element = format!("`{}` frame", self.selectors.content_frame);
        self.poller
            .until_present(&element, async || self.try_enter_frame().await)
            .await
    }

    async fn leave_content_scope(&mut self) -> Result<()> {
        self.command(Method::POST, "/frame", Some(json!({ "id": null })))
            .await?;
        Ok(())
    }

    async fn query_title(&mut self) -> Result<String> {
        let xpath = format!("//*[@name='{}']", self.selectors.title_field);
        let element = format!("`{}` title field", self.selectors.title_field);
        let field = self
            .poller
            .until_present(&element, async || {
                Ok(self.find_elements(&xpath).await?.into_iter().next())
            })
            .await?;
        Ok(self.property(&field, "value").await?.unwrap_or_default())
    }

    async fn query_asset_elements(&mut self, kind: AssetKind) -> Result<Vec<RawAsset>> {
        let elements = self.find_elements(&self.selectors.images).await?;
        let mut assets = Vec::with_capacity(elements.len());
        for element in elements {
            let Some(src) = self.property(&element, "src").await? else {
                continue;
            };
            let markup = match kind {
                AssetKind::Markup => self.property(&element, "outerHTML").await?,
                AssetKind::Url => None,
            };
            assets.push(RawAsset { src, markup });
        }
        Ok(assets)
    }

    async fn return_to_index(&mut self, book_url: &str) -> Result<()> {
        self.navigate(book_url).await
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.command(Method::DELETE, "", None).await?;
        tracing::info!(session_id = %self.session_id, "WebDriver session closed");
        Ok(())
    }
}

/// New-session payload; the profile directory keeps cookies between runs.
fn session_capabilities(config: &WebDriverConfig) -> Value {
    let mut always_match = Map::new();
    always_match.insert(
        "browserName".to_string(),
        Value::String(config.browser.clone()),
    );

    if let Some(profile) = &config.profile_dir {
        match config.browser.as_str() {
            "chrome" | "chromium" | "MicrosoftEdge" => {
                let options_key = if config.browser == "MicrosoftEdge" {
                    "ms:edgeOptions"
                } else {
                    "goog:chromeOptions"
                };
                always_match.insert(
                    options_key.to_string(),
                    json!({ "args": [format!("user-data-dir={profile}")] }),
                );
            }
            "firefox" => {
                always_match.insert(
                    "moz:firefoxOptions".to_string(),
                    json!({ "args": ["-profile", profile] }),
                );
            }
            other => {
                tracing::warn!(browser = other, "Profile directory not supported for this browser, ignoring");
            }
        }
    }

    json!({ "capabilities": { "alwaysMatch": always_match } })
}

async fn decode_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let mut payload: Value = response.json().await?;
    let value = payload
        .get_mut("value")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if let Some(code) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(match code {
            "stale element reference" => Error::StaleReference(message),
            _ => Error::WebDriver {
                code: code.to_string(),
                message,
            },
        });
    }

    if !status.is_success() {
        return Err(Error::WebDriver {
            code: status.as_u16().to_string(),
            message: value.to_string(),
        });
    }

    Ok(value)
}
