//! Browser automation session contract
//!
//! Adapters only ever see `&dyn BrowserSession`. The production
//! implementation speaks W3C WebDriver; tests use a scripted fake.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt;

use super::error::SessionResult;

/// W3C identifier for element references in JSON payloads
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52f-4ab2cb6b3b23";

/// How an element is found on the current page (or current frame).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(String),
    Name(String),
    XPath(String),
    Css(String),
    TagName(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::XPath(xpath.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::TagName(tag.into())
    }

    /// `(using, value)` pair for the WebDriver find-element endpoints.
    ///
    /// WebDriver has no id/name strategies, so those become attribute selectors.
    pub fn to_webdriver(&self) -> (&'static str, String) {
        match self {
            Self::Id(id) => ("css selector", format!("[id=\"{}\"]", css_escape(id))),
            Self::Name(name) => ("css selector", format!("[name=\"{}\"]", css_escape(name))),
            Self::XPath(xpath) => ("xpath", xpath.clone()),
            Self::Css(selector) => ("css selector", selector.clone()),
            Self::TagName(tag) => ("tag name", tag.clone()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(v) => write!(f, "id={v}"),
            Self::Name(v) => write!(f, "name={v}"),
            Self::XPath(v) => write!(f, "xpath={v}"),
            Self::Css(v) => write!(f, "css={v}"),
            Self::TagName(v) => write!(f, "tag={v}"),
        }
    }
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quote an arbitrary string as an XPath 1.0 literal.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    let parts: Vec<String> = value.split('"').map(|part| format!("\"{part}\"")).collect();
    format!("concat({})", parts.join(", '\"', "))
}

/// Reference to an element, valid for the page and frame it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    /// JSON form used for script arguments and frame switching
    pub fn to_json(&self) -> Value {
        json!({ ELEMENT_KEY: self.0 })
    }
}

/// Non-printable keys understood by `send_keys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Return,
    Enter,
}

impl Key {
    pub const fn code(self) -> char {
        match self {
            Self::Return => '\u{E006}',
            Self::Enter => '\u{E007}',
        }
    }

    /// The key on its own
    pub fn text(self) -> String {
        self.code().to_string()
    }

    /// `text` followed by this key, for a single `send_keys` call
    pub fn after(self, text: &str) -> String {
        let mut keys = String::with_capacity(text.len() + 4);
        keys.push_str(text);
        keys.push(self.code());
        keys
    }
}

/// One live browser automation session.
///
/// Element lookups are scoped to the current frame. All operations
/// suspend only on the browser round-trip.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> SessionResult<()>;
    async fn current_url(&self) -> SessionResult<String>;

    async fn find_element(&self, locator: &Locator) -> SessionResult<ElementHandle>;
    async fn find_elements(&self, locator: &Locator) -> SessionResult<Vec<ElementHandle>>;
    async fn find_child_elements(&self, parent: &ElementHandle, locator: &Locator) -> SessionResult<Vec<ElementHandle>>;

    async fn click(&self, element: &ElementHandle) -> SessionResult<()>;
    async fn clear(&self, element: &ElementHandle) -> SessionResult<()>;
    async fn send_keys(&self, element: &ElementHandle, keys: &str) -> SessionResult<()>;
    async fn text(&self, element: &ElementHandle) -> SessionResult<String>;
    async fn is_displayed(&self, element: &ElementHandle) -> SessionResult<bool>;
    async fn is_enabled(&self, element: &ElementHandle) -> SessionResult<bool>;

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> SessionResult<Value>;

    /// Switch into a child frame of the current browsing context.
    async fn switch_to_frame(&self, frame: &Locator) -> SessionResult<()>;
    async fn switch_to_default_content(&self) -> SessionResult<()>;

    async fn set_window_size(&self, width: u32, height: u32) -> SessionResult<()>;
    async fn screenshot_png(&self) -> SessionResult<Vec<u8>>;
    async fn page_source(&self) -> SessionResult<String>;

    /// End the session. Calling it twice is an error on real drivers.
    async fn quit(&self) -> SessionResult<()>;
}

/// Opens browser sessions. One call per orchestration run.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> SessionResult<Box<dyn BrowserSession>>;

    /// Short description for logs (driver endpoint, browser)
    fn describe(&self) -> String;
}
