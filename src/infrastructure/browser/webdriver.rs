//! W3C WebDriver client over HTTP
//!
//! Talks to a chromedriver/geckodriver endpoint directly with reqwest.
//! Each `BrowserSession` call maps onto one WebDriver command.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::{SessionError, SessionResult};
use super::session::{BrowserSession, ELEMENT_KEY, ElementHandle, Locator, SessionFactory};
use crate::infrastructure::config::{BrowserKind, WebDriverConfig};

/// Opens sessions against the configured WebDriver endpoint.
pub struct WebDriverSessionFactory {
    config: WebDriverConfig,
}

impl WebDriverSessionFactory {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for WebDriverSessionFactory {
    async fn open(&self) -> SessionResult<Box<dyn BrowserSession>> {
        let session = WebDriverSession::start(&self.config).await?;
        Ok(Box::new(session))
    }

    fn describe(&self) -> String {
        format!("{:?} via {}", self.config.browser, self.config.endpoint)
    }
}

pub struct WebDriverSession {
    client: Client,
    session_url: String,
}

impl WebDriverSession {
    /// Create a new browser session with the configured capabilities.
    pub async fn start(config: &WebDriverConfig) -> SessionResult<Self> {
        let base = config.endpoint.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| SessionError::startup_failed(format!("http client build failed: {e}")))?;

        let caps = capabilities(config);
        debug!("Creating WebDriver session at {} with {}", base, caps);
        let response = client
            .post(format!("{base}/session"))
            .json(&caps)
            .send()
            .await
            .map_err(|e| SessionError::startup_failed(format!("session create request failed: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SessionError::startup_failed(format!("session create response read failed: {e}")))?;
        let json = parse_body(status.as_u16(), &body)
            .map_err(|e| SessionError::startup_failed(e.to_string()))?;

        let session_id = json
            .pointer("/value/sessionId")
            .and_then(Value::as_str)
            .or_else(|| json.pointer("/sessionId").and_then(Value::as_str))
            .ok_or_else(|| {
                SessionError::startup_failed(format!(
                    "session create missing sessionId; body={}",
                    truncate_for_log(&body, 220)
                ))
            })?;

        info!("WebDriver session {} started ({:?})", session_id, config.browser);
        Ok(Self {
            client,
            session_url: format!("{base}/session/{session_id}"),
        })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> SessionResult<Value> {
        let url = format!("{}{}", self.session_url, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let json = parse_body(status, &text)?;
        Ok(json.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> SessionResult<Value> {
        self.command(Method::GET, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> SessionResult<Value> {
        self.command(Method::POST, path, Some(body)).await
    }

    async fn element_bool(&self, element: &ElementHandle, property: &str) -> SessionResult<bool> {
        let value = self.get(&format!("/element/{}/{property}", element.id())).await?;
        value
            .as_bool()
            .ok_or_else(|| SessionError::invalid_response(format!("{property} was not a boolean: {value}")))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        debug!("Navigating to {}", url);
        self.post("/url", json!({ "url": url })).await.map(|_| ())
    }

    async fn current_url(&self) -> SessionResult<String> {
        let value = self.get("/url").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SessionError::invalid_response(format!("url was not a string: {value}")))
    }

    async fn find_element(&self, locator: &Locator) -> SessionResult<ElementHandle> {
        let (using, value) = locator.to_webdriver();
        match self.post("/element", json!({ "using": using, "value": value })).await {
            Ok(found) => element_from_json(&found),
            Err(SessionError::Protocol { error, .. }) if error == "no such element" => {
                Err(SessionError::no_such_element(locator))
            }
            Err(err) => Err(err),
        }
    }

    async fn find_elements(&self, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        let (using, value) = locator.to_webdriver();
        let found = self.post("/elements", json!({ "using": using, "value": value })).await?;
        elements_from_json(&found)
    }

    async fn find_child_elements(&self, parent: &ElementHandle, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        let (using, value) = locator.to_webdriver();
        let found = self
            .post(
                &format!("/element/{}/elements", parent.id()),
                json!({ "using": using, "value": value }),
            )
            .await?;
        elements_from_json(&found)
    }

    async fn click(&self, element: &ElementHandle) -> SessionResult<()> {
        self.post(&format!("/element/{}/click", element.id()), json!({})).await.map(|_| ())
    }

    async fn clear(&self, element: &ElementHandle) -> SessionResult<()> {
        self.post(&format!("/element/{}/clear", element.id()), json!({})).await.map(|_| ())
    }

    async fn send_keys(&self, element: &ElementHandle, keys: &str) -> SessionResult<()> {
        self.post(&format!("/element/{}/value", element.id()), json!({ "text": keys }))
            .await
            .map(|_| ())
    }

    async fn text(&self, element: &ElementHandle) -> SessionResult<String> {
        let value = self.get(&format!("/element/{}/text", element.id())).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> SessionResult<bool> {
        self.element_bool(element, "displayed").await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> SessionResult<bool> {
        self.element_bool(element, "enabled").await
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> SessionResult<Value> {
        self.post("/execute/sync", json!({ "script": script, "args": args })).await
    }

    async fn switch_to_frame(&self, frame: &Locator) -> SessionResult<()> {
        let element = match self.find_element(frame).await {
            Ok(element) => element,
            Err(SessionError::NoSuchElement { .. }) => {
                return Err(SessionError::NoSuchFrame { frame: frame.to_string() });
            }
            Err(err) => return Err(err),
        };
        self.post("/frame", json!({ "id": element.to_json() })).await.map(|_| ())
    }

    async fn switch_to_default_content(&self) -> SessionResult<()> {
        self.post("/frame", json!({ "id": Value::Null })).await.map(|_| ())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> SessionResult<()> {
        self.post("/window/rect", json!({ "width": width, "height": height }))
            .await
            .map(|_| ())
    }

    async fn screenshot_png(&self) -> SessionResult<Vec<u8>> {
        let value = self.get("/screenshot").await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| SessionError::invalid_response("screenshot was not a string"))?;
        BASE64
            .decode(encoded)
            .map_err(|e| SessionError::invalid_response(format!("screenshot base64 decode failed: {e}")))
    }

    async fn page_source(&self) -> SessionResult<String> {
        let value = self.get("/source").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn quit(&self) -> SessionResult<()> {
        let response = self.client.delete(&self.session_url).send().await?;
        if !response.status().is_success() {
            warn!("WebDriver session delete returned HTTP {}", response.status().as_u16());
        }
        Ok(())
    }
}

/// Build the new-session payload for the configured browser.
pub fn capabilities(config: &WebDriverConfig) -> Value {
    let mut args = config.browser_args.clone();
    match config.browser {
        BrowserKind::Firefox => {
            if config.headless {
                args.push("-headless".to_string());
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "firefox",
                        "acceptInsecureCerts": true,
                        "moz:firefoxOptions": { "args": args }
                    }
                }
            })
        }
        BrowserKind::Chrome => {
            if config.headless {
                args.push("--headless=new".to_string());
            }
            json!({
                "capabilities": {
                    "alwaysMatch": {
                        "browserName": "chrome",
                        "acceptInsecureCerts": true,
                        "goog:chromeOptions": { "args": args }
                    }
                }
            })
        }
    }
}

/// Decode a WebDriver response body, surfacing W3C error payloads.
fn parse_body(status: u16, body: &str) -> SessionResult<Value> {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(e) if (200..300).contains(&status) => {
            return Err(SessionError::invalid_response(format!(
                "{e}; body={}",
                truncate_for_log(body, 220)
            )));
        }
        Err(_) => {
            return Err(SessionError::Http {
                status,
                message: truncate_for_log(body, 260),
            });
        }
    };

    if let Some(error) = json.pointer("/value/error").and_then(Value::as_str) {
        let message = json
            .pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown webdriver error");
        return Err(SessionError::from_protocol(error, message));
    }
    if !(200..300).contains(&status) {
        return Err(SessionError::Http {
            status,
            message: truncate_for_log(body, 260),
        });
    }
    Ok(json)
}

fn element_from_json(value: &Value) -> SessionResult<ElementHandle> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(ElementHandle::new)
        .ok_or_else(|| SessionError::invalid_response(format!("not an element reference: {value}")))
}

fn elements_from_json(value: &Value) -> SessionResult<Vec<ElementHandle>> {
    value
        .as_array()
        .ok_or_else(|| SessionError::invalid_response(format!("not an element list: {value}")))?
        .iter()
        .map(element_from_json)
        .collect()
}

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect::<String>() + "..."
}
