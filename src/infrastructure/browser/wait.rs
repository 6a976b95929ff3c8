//! Explicit waits and small page interactions shared by the adapters
//!
//! Every wait polls the session until the condition holds or the policy's
//! timeout elapses. Session-fatal errors end the wait immediately.

use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

use super::error::{SessionError, SessionResult};
use super::session::{BrowserSession, ElementHandle, Locator};
use crate::infrastructure::config::ScrapingConfig;

/// Timeout and poll interval for one explicit wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitPolicy {
    pub const fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self { timeout, poll_interval }
    }
}

/// The wait flavours adapters pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    /// Regular element waits
    pub standard: WaitPolicy,
    /// Slow sites (search forms that load behind a spinner)
    pub extended: WaitPolicy,
    /// Optional interstitials that usually are not there
    pub probe: WaitPolicy,
    /// Fixed pause after actions that trigger client-side rendering
    pub settle: Duration,
}

impl WaitSettings {
    pub fn from_config(config: &ScrapingConfig) -> Self {
        let poll = Duration::from_millis(config.poll_interval_ms);
        Self {
            standard: WaitPolicy::new(Duration::from_secs(config.wait_timeout_seconds), poll),
            extended: WaitPolicy::new(Duration::from_secs(config.extended_wait_timeout_seconds), poll),
            probe: WaitPolicy::new(Duration::from_secs(config.probe_timeout_seconds), poll),
            settle: Duration::from_millis(config.settle_delay_ms),
        }
    }

    /// Near-zero waits for driving scripted sessions in tests
    pub fn immediate() -> Self {
        let policy = WaitPolicy::new(Duration::from_millis(30), Duration::from_millis(5));
        Self {
            standard: policy,
            extended: policy,
            probe: policy,
            settle: Duration::ZERO,
        }
    }
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self::from_config(&ScrapingConfig::default())
    }
}

/// Poll `probe` until it yields a value. `Ok(None)` and retryable lookup
/// errors keep polling; anything else is returned as is.
pub async fn poll_until<T, F, Fut>(what: &str, policy: WaitPolicy, mut probe: F) -> SessionResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SessionResult<Option<T>>>,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;
    loop {
        match probe().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) if err.is_retryable_lookup() => {}
            Err(err) => return Err(err),
        }
        if Instant::now() >= deadline {
            debug!("Wait for {} gave up after {:?}", what, started.elapsed());
            return Err(SessionError::timeout(what, policy.timeout));
        }
        sleep(policy.poll_interval).await;
    }
}

pub async fn until_present(
    session: &dyn BrowserSession,
    locator: &Locator,
    policy: WaitPolicy,
) -> SessionResult<ElementHandle> {
    poll_until(&format!("presence of {locator}"), policy, || async move {
        session.find_element(locator).await.map(Some)
    })
    .await
}

/// Present, displayed and enabled.
pub async fn until_clickable(
    session: &dyn BrowserSession,
    locator: &Locator,
    policy: WaitPolicy,
) -> SessionResult<ElementHandle> {
    poll_until(&format!("{locator} to be clickable"), policy, || async move {
        let element = session.find_element(locator).await?;
        if session.is_displayed(&element).await? && session.is_enabled(&element).await? {
            Ok(Some(element))
        } else {
            Ok(None)
        }
    })
    .await
}

/// Wait for a child frame and switch into it.
pub async fn until_frame_and_switch(
    session: &dyn BrowserSession,
    frame: &Locator,
    policy: WaitPolicy,
) -> SessionResult<()> {
    poll_until(&format!("frame {frame}"), policy, || async move {
        session.switch_to_frame(frame).await.map(Some)
    })
    .await
}

/// Text of the first match, or an empty string when nothing matches.
pub async fn text_or_empty(session: &dyn BrowserSession, locator: &Locator) -> SessionResult<String> {
    match session.find_element(locator).await {
        Ok(element) => Ok(session.text(&element).await?.trim().to_string()),
        Err(err) if err.is_session_fatal() => Err(err),
        Err(err) => {
            debug!("Optional field {} not found: {}", locator, err);
            Ok(String::new())
        }
    }
}

/// Like [`text_or_empty`], but waits for the element first.
pub async fn wait_text_or_empty(
    session: &dyn BrowserSession,
    locator: &Locator,
    policy: WaitPolicy,
) -> SessionResult<String> {
    match until_present(session, locator, policy).await {
        Ok(element) => Ok(session.text(&element).await?.trim().to_string()),
        Err(err) if err.is_session_fatal() => Err(err),
        Err(err) => {
            debug!("Optional field {} never appeared: {}", locator, err);
            Ok(String::new())
        }
    }
}

/// Trimmed text of an element that must be present.
pub async fn required_text(
    session: &dyn BrowserSession,
    locator: &Locator,
    policy: WaitPolicy,
) -> SessionResult<String> {
    let element = until_present(session, locator, policy).await?;
    Ok(session.text(&element).await?.trim().to_string())
}

/// Assign an input's value through script, for masked inputs that drop typed keys.
pub async fn set_value_by_script(
    session: &dyn BrowserSession,
    element: &ElementHandle,
    value: &str,
) -> SessionResult<()> {
    session
        .execute_script("arguments[0].value = arguments[1];", vec![element.to_json(), json!(value)])
        .await
        .map(|_| ())
}

/// Set an attribute through script (hidden form fields).
pub async fn set_attribute_by_script(
    session: &dyn BrowserSession,
    element: &ElementHandle,
    attribute: &str,
    value: &str,
) -> SessionResult<()> {
    session
        .execute_script(
            "arguments[0].setAttribute(arguments[1], arguments[2]);",
            vec![element.to_json(), json!(attribute), json!(value)],
        )
        .await
        .map(|_| ())
}

/// Pick the `index`-th `<option>` of a `<select>` by clicking it.
pub async fn select_by_index(session: &dyn BrowserSession, select: &ElementHandle, index: usize) -> SessionResult<()> {
    let options = session.find_child_elements(select, &Locator::tag("option")).await?;
    let option = options
        .get(index)
        .ok_or_else(|| SessionError::no_such_element(format!("option #{index} of select {}", select.id())))?;
    session.click(option).await
}

/// Text of the currently selected `<option>`, if any.
pub async fn selected_option_text(session: &dyn BrowserSession, select: &ElementHandle) -> SessionResult<Option<String>> {
    let selected = session.find_child_elements(select, &Locator::css("option:checked")).await?;
    match selected.first() {
        Some(option) => Ok(Some(session.text(option).await?.trim().to_string())),
        None => Ok(None),
    }
}

/// Grow the window to the full document so a screenshot shows the whole page.
pub async fn resize_to_document(session: &dyn BrowserSession) -> SessionResult<()> {
    let size = session
        .execute_script(
            "return [document.body.parentNode.scrollWidth, document.body.parentNode.scrollHeight];",
            Vec::new(),
        )
        .await?;
    let (Some(width), Some(height)) = (dimension(&size, 0), dimension(&size, 1)) else {
        return Err(SessionError::invalid_response(format!("document size was not a pair of numbers: {size}")));
    };
    session.set_window_size(width, height).await
}

fn dimension(size: &Value, index: usize) -> Option<u32> {
    size.get(index)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
}
