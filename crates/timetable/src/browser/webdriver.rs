//! W3C WebDriver client for a headless Firefox behind geckodriver.
//!
//! Only the handful of commands the scraper needs are implemented:
//! 1. POST /session starts a headless browser
//! 2. element lookups by CSS selector
//! 3. text / enabled / outerHTML reads
//! 4. script clicks and key input
//! 5. DELETE /session/{id} tears the browser down

use super::{BrowserError, BrowserLauncher, Element, PageDriver};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Key under which WebDriver serializes element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4abd2e5d5f26";

/// Configuration for WebDriver sessions.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Base URL of the WebDriver endpoint (geckodriver)
    pub endpoint: Url,
    /// Run Firefox without a window
    pub headless: bool,
    /// Browser-side page load timeout
    pub page_load_timeout: Duration,
    /// Upper bound for a single HTTP round trip to the endpoint
    pub request_timeout: Duration,
}

impl WebDriverConfig {
    pub fn new(endpoint: &str) -> Result<Self, BrowserError> {
        let mut endpoint = Url::parse(endpoint)?;
        // `Url::join` only appends to paths ending with a slash
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        Ok(Self {
            endpoint,
            headless: true,
            page_load_timeout: Duration::from_secs(20),
            request_timeout: Duration::from_secs(60),
        })
    }

    /// Capabilities requested for every new session.
    fn capabilities(&self) -> Value {
        let mut args = vec!["--width=1280", "--height=720"];
        if self.headless {
            args.push("-headless");
        }
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "pageLoadStrategy": "normal",
                    "timeouts": {
                        "pageLoad": self.page_load_timeout.as_millis() as u64,
                        "implicit": 0,
                    },
                    "moz:firefoxOptions": {
                        "args": args,
                        "prefs": {
                            "permissions.default.image": 2,
                            "dom.webnotifications.enabled": false,
                            "media.volume_scale": "0.0",
                            "browser.cache.disk.enable": false,
                            "browser.cache.memory.enable": false,
                            "network.prefetch-next": false,
                        }
                    }
                }
            }
        })
    }
}

/// Body shape shared by every WebDriver response.
#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

/// Sends a command and unwraps the `value` field, turning error payloads
/// into [`BrowserError`]s.
async fn send(request: RequestBuilder) -> Result<Value, BrowserError> {
    let response = request.send().await?;
    let status = response.status();
    let body: WireResponse = response.json().await?;

    if status.is_success() {
        return Ok(body.value);
    }

    Err(wire_error(&body.value))
}

/// Maps a WebDriver error payload to a [`BrowserError`]. Stale references are
/// reported like missing ones since both mean the element is gone.
fn wire_error(value: &Value) -> BrowserError {
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match error.as_str() {
        "no such element" | "stale element reference" => BrowserError::NoSuchElement(message),
        "timeout" => BrowserError::Timeout {
            what: message,
            waited_ms: 0,
        },
        _ => BrowserError::Protocol { error, message },
    }
}

fn element_from(value: &Value) -> Result<Element, BrowserError> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| Element(id.to_string()))
        .ok_or_else(|| BrowserError::Malformed(format!("expected element reference, got {value}")))
}

/// Starts a fresh Firefox session per launch.
pub struct WebDriverLauncher {
    client: Client,
    config: WebDriverConfig,
}

impl WebDriverLauncher {
    pub fn new(config: WebDriverConfig) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn PageDriver>, BrowserError> {
        let url = self.config.endpoint.join("session")?;
        debug!(url = %url, "Requesting new WebDriver session");

        let value = send(self.client.post(url).json(&self.config.capabilities()))
            .await
            .map_err(|e| BrowserError::Launch {
                message: e.to_string(),
            })?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Launch {
                message: format!("response carries no sessionId: {value}"),
            })?
            .to_string();

        info!(session_id = %session_id, "WebDriver session started");

        let session_url = self.config.endpoint.join(&format!("session/{session_id}"))?;
        let base = self
            .config
            .endpoint
            .join(&format!("session/{session_id}/"))?;

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            session_url,
            base,
            session_id,
            closed: false,
        }))
    }
}

/// One live WebDriver session.
pub struct WebDriverSession {
    client: Client,
    /// `{endpoint}/session/{id}`
    session_url: Url,
    /// `{endpoint}/session/{id}/`, base for command paths
    base: Url,
    session_id: String,
    closed: bool,
}

impl WebDriverSession {
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        if self.closed {
            return Err(BrowserError::protocol("invalid session id", "session already closed"));
        }
        let url = self.base.join(path)?;
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        send(request).await
    }

    fn element_path(element: &Element, suffix: &str) -> String {
        format!("element/{}/{}", element.id(), suffix)
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<(), BrowserError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn find(&mut self, css: &str) -> Result<Option<Element>, BrowserError> {
        let body = json!({ "using": "css selector", "value": css });
        match self.command(Method::POST, "element", Some(body)).await {
            Ok(value) => element_from(&value).map(Some),
            Err(BrowserError::NoSuchElement(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&mut self, css: &str) -> Result<Vec<Element>, BrowserError> {
        let body = json!({ "using": "css selector", "value": css });
        let value = self.command(Method::POST, "elements", Some(body)).await?;
        value
            .as_array()
            .ok_or_else(|| BrowserError::Malformed(format!("expected element list, got {value}")))?
            .iter()
            .map(element_from)
            .collect()
    }

    async fn text(&mut self, element: &Element) -> Result<String, BrowserError> {
        let value = self
            .command(Method::GET, &Self::element_path(element, "text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_enabled(&mut self, element: &Element) -> Result<bool, BrowserError> {
        let value = self
            .command(Method::GET, &Self::element_path(element, "enabled"), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&mut self, element: &Element) -> Result<(), BrowserError> {
        // Script click: the carousel overlays intercept native clicks
        let body = json!({
            "script": "arguments[0].click();",
            "args": [{ ELEMENT_KEY: element.id() }],
        });
        self.command(Method::POST, "execute/sync", Some(body))
            .await
            .map(|_| ())
    }

    async fn type_text(&mut self, element: &Element, text: &str) -> Result<(), BrowserError> {
        self.command(Method::POST, &Self::element_path(element, "clear"), Some(json!({})))
            .await?;
        self.command(
            Method::POST,
            &Self::element_path(element, "value"),
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn outer_html(&mut self, element: &Element) -> Result<String, BrowserError> {
        let value = self
            .command(
                Method::GET,
                &Self::element_path(element, "property/outerHTML"),
                None,
            )
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Malformed(format!("expected markup string, got {value}")))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match send(self.client.delete(self.session_url.clone())).await {
            Ok(_) => {
                info!(session_id = %self.session_id, "WebDriver session closed");
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Failed to close WebDriver session");
                Err(e)
            }
        }
    }
}
