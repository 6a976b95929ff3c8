//! Test utilities for the parcel valuation scraper
//!
//! A scripted in-memory `BrowserSession` stands in for WebDriver: elements
//! are registered per frame and locator, their text can depend on the last
//! value typed into a search box, and navigation failures or session loss
//! can be injected. Every interaction is logged for assertions.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::adapters::{
    AdapterError, AdapterFactory, RegistryEntry, ScrapeContext, ScrapeError, SiteAdapter,
};
use crate::domain::{AdapterKey, RawRecord, WorkItem};
use crate::infrastructure::browser::{BrowserSession, ElementHandle, Locator, SessionError, SessionFactory, SessionResult};

/// Bytes returned for every screenshot
pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

/// One element the scripted page exposes.
#[derive(Debug, Clone)]
pub struct ScriptedElement {
    text: String,
    text_by_query: HashMap<String, String>,
    missing_for: HashSet<String>,
    only_for: Option<HashSet<String>>,
    displayed: bool,
    enabled: bool,
    options: Vec<String>,
    selected: usize,
    count: usize,
}

impl Default for ScriptedElement {
    fn default() -> Self {
        Self {
            text: String::new(),
            text_by_query: HashMap::new(),
            missing_for: HashSet::new(),
            only_for: None,
            displayed: true,
            enabled: true,
            options: Vec::new(),
            selected: 0,
            count: 1,
        }
    }
}

impl ScriptedElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Text shown after `query` was typed into a search box
    #[must_use]
    pub fn for_query(mut self, query: impl Into<String>, text: impl Into<String>) -> Self {
        self.text_by_query.insert(query.into(), text.into());
        self
    }

    /// Absent after `query` was searched
    #[must_use]
    pub fn missing_for_query(mut self, query: impl Into<String>) -> Self {
        self.missing_for.insert(query.into());
        self
    }

    /// Present only after `query` was searched
    #[must_use]
    pub fn only_for_query(mut self, query: impl Into<String>) -> Self {
        self.only_for.get_or_insert_with(HashSet::new).insert(query.into());
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// `<select>` options, with the initially selected index
    #[must_use]
    pub fn with_options(mut self, options: &[&str], selected: usize) -> Self {
        self.options = options.iter().map(|o| (*o).to_string()).collect();
        self.selected = selected;
        self
    }

    /// How many matches `find_elements` reports
    #[must_use]
    pub fn repeated(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    fn visible_for(&self, query: Option<&str>) -> bool {
        let query = query.unwrap_or_default();
        if self.missing_for.contains(query) {
            return false;
        }
        self.only_for.as_ref().is_none_or(|only| only.contains(query))
    }

    fn text_for(&self, query: Option<&str>) -> String {
        query
            .and_then(|q| self.text_by_query.get(q))
            .unwrap_or(&self.text)
            .clone()
    }
}

type ElementKey = (Option<String>, Locator);

#[derive(Debug, Clone)]
enum HandleTarget {
    Element(ElementKey),
    Option(ElementKey, usize),
}

#[derive(Debug, Default)]
struct BrowserState {
    elements: HashMap<ElementKey, ScriptedElement>,
    frames: HashSet<String>,
    current_frame: Option<String>,
    current_url: Option<String>,
    query: Option<String>,
    page_source: String,
    page_source_by_query: HashMap<String, String>,
    fail_navigation: Vec<String>,
    lose_session_on: HashSet<String>,
    lost: bool,
    handles: HashMap<String, HandleTarget>,
    next_handle: usize,
    calls: Vec<String>,
    quits: usize,
}

impl BrowserState {
    fn alive(&self) -> SessionResult<()> {
        if self.lost {
            return Err(SessionError::session_lost("scripted browser crashed"));
        }
        Ok(())
    }

    fn handle_for(&mut self, target: HandleTarget) -> ElementHandle {
        self.next_handle += 1;
        let id = format!("el-{}", self.next_handle);
        self.handles.insert(id.clone(), target);
        ElementHandle::new(id)
    }

    fn target(&self, handle: &ElementHandle) -> SessionResult<HandleTarget> {
        self.handles
            .get(handle.id())
            .cloned()
            .ok_or_else(|| SessionError::from_protocol("stale element reference", handle.id()))
    }

    fn element(&self, key: &ElementKey) -> SessionResult<&ScriptedElement> {
        self.elements
            .get(key)
            .ok_or_else(|| SessionError::from_protocol("stale element reference", &key.1.to_string()))
    }

    fn lookup(&mut self, locator: &Locator) -> SessionResult<Option<(ElementKey, usize)>> {
        self.alive()?;
        if let Some(query) = &self.query {
            if self.lose_session_on.contains(query) {
                self.lost = true;
                return Err(SessionError::session_lost(format!("browser crashed while searching {query}")));
            }
        }
        let key = (self.current_frame.clone(), locator.clone());
        Ok(self
            .elements
            .get(&key)
            .filter(|element| element.visible_for(self.query.as_deref()))
            .map(|element| element.count)
            .map(|count| (key, count)))
    }
}

/// Scripted in-memory browser. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrowserState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register an element in the top-level document
    #[must_use]
    pub fn element(self, locator: Locator, element: ScriptedElement) -> Self {
        self.state().elements.insert((None, locator), element);
        self
    }

    /// Register a frame (by name or id) and an element inside it
    #[must_use]
    pub fn element_in_frame(self, frame: &str, locator: Locator, element: ScriptedElement) -> Self {
        {
            let mut state = self.state();
            state.frames.insert(frame.to_string());
            state.elements.insert((Some(frame.to_string()), locator), element);
        }
        self
    }

    #[must_use]
    pub fn page_source(self, html: impl Into<String>) -> Self {
        self.state().page_source = html.into();
        self
    }

    #[must_use]
    pub fn page_source_for_query(self, query: impl Into<String>, html: impl Into<String>) -> Self {
        self.state().page_source_by_query.insert(query.into(), html.into());
        self
    }

    /// Navigation to any URL containing `fragment` fails
    #[must_use]
    pub fn fail_navigation_to(self, fragment: impl Into<String>) -> Self {
        self.state().fail_navigation.push(fragment.into());
        self
    }

    /// The session dies on the first lookup after `query` was typed
    #[must_use]
    pub fn lose_session_on_query(self, query: impl Into<String>) -> Self {
        self.state().lose_session_on.insert(query.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| call.strip_prefix("navigate:").map(str::to_string))
            .collect()
    }

    pub fn quit_count(&self) -> usize {
        self.state().quits
    }

    pub fn current_frame(&self) -> Option<String> {
        self.state().current_frame.clone()
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }
}

fn printable(keys: &str) -> String {
    keys.chars()
        .filter(|c| !('\u{E000}'..='\u{F8FF}').contains(c))
        .collect()
}

#[async_trait]
impl BrowserSession for ScriptedBrowser {
    async fn navigate(&self, url: &str) -> SessionResult<()> {
        let mut state = self.state();
        state.alive()?;
        state.calls.push(format!("navigate:{url}"));
        if state.fail_navigation.iter().any(|fragment| url.contains(fragment.as_str())) {
            return Err(SessionError::Http {
                status: 503,
                message: format!("{url} unreachable"),
            });
        }
        state.current_url = Some(url.to_string());
        state.current_frame = None;
        Ok(())
    }

    async fn current_url(&self) -> SessionResult<String> {
        let state = self.state();
        state.alive()?;
        Ok(state.current_url.clone().unwrap_or_default())
    }

    async fn find_element(&self, locator: &Locator) -> SessionResult<ElementHandle> {
        let mut state = self.state();
        match state.lookup(locator)? {
            Some((key, _)) => Ok(state.handle_for(HandleTarget::Element(key))),
            None => Err(SessionError::no_such_element(locator)),
        }
    }

    async fn find_elements(&self, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        let mut state = self.state();
        let Some((key, count)) = state.lookup(locator)? else {
            return Ok(Vec::new());
        };
        Ok((0..count)
            .map(|_| state.handle_for(HandleTarget::Element(key.clone())))
            .collect())
    }

    async fn find_child_elements(&self, parent: &ElementHandle, locator: &Locator) -> SessionResult<Vec<ElementHandle>> {
        let mut state = self.state();
        state.alive()?;
        let HandleTarget::Element(key) = state.target(parent)? else {
            return Ok(Vec::new());
        };
        let element = state.element(&key)?.clone();
        let indexes: Vec<usize> = match locator {
            Locator::TagName(tag) if tag == "option" => (0..element.options.len()).collect(),
            Locator::Css(css) if css == "option:checked" && !element.options.is_empty() => vec![element.selected],
            _ => Vec::new(),
        };
        Ok(indexes
            .into_iter()
            .map(|index| state.handle_for(HandleTarget::Option(key.clone(), index)))
            .collect())
    }

    async fn click(&self, element: &ElementHandle) -> SessionResult<()> {
        let mut state = self.state();
        state.alive()?;
        match state.target(element)? {
            HandleTarget::Element(key) => {
                state.calls.push(format!("click:{}", key.1));
            }
            HandleTarget::Option(key, index) => {
                state.calls.push(format!("select:{}:{index}", key.1));
                if let Some(select) = state.elements.get_mut(&key) {
                    select.selected = index;
                }
            }
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> SessionResult<()> {
        let mut state = self.state();
        state.alive()?;
        if let HandleTarget::Element(key) = state.target(element)? {
            state.calls.push(format!("clear:{}", key.1));
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, keys: &str) -> SessionResult<()> {
        let mut state = self.state();
        state.alive()?;
        let typed = printable(keys);
        if let HandleTarget::Element(key) = state.target(element)? {
            state.calls.push(format!("keys:{}:{typed}", key.1));
        }
        if !typed.trim().is_empty() {
            state.query = Some(typed.trim().to_string());
        }
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> SessionResult<String> {
        let state = self.state();
        state.alive()?;
        let query = state.query.clone();
        match state.target(element)? {
            HandleTarget::Element(key) => Ok(state.element(&key)?.text_for(query.as_deref())),
            HandleTarget::Option(key, index) => Ok(state
                .element(&key)?
                .options
                .get(index)
                .cloned()
                .unwrap_or_default()),
        }
    }

    async fn is_displayed(&self, element: &ElementHandle) -> SessionResult<bool> {
        let state = self.state();
        state.alive()?;
        match state.target(element)? {
            HandleTarget::Element(key) => Ok(state.element(&key)?.displayed),
            HandleTarget::Option(..) => Ok(true),
        }
    }

    async fn is_enabled(&self, element: &ElementHandle) -> SessionResult<bool> {
        let state = self.state();
        state.alive()?;
        match state.target(element)? {
            HandleTarget::Element(key) => Ok(state.element(&key)?.enabled),
            HandleTarget::Option(..) => Ok(true),
        }
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> SessionResult<Value> {
        let mut state = self.state();
        state.alive()?;
        state.calls.push("script".to_string());
        if script.contains("arguments[0].value = arguments[1]") {
            if let Some(value) = args.get(1).and_then(Value::as_str) {
                state.query = Some(value.trim().to_string());
            }
        }
        if script.contains("scrollWidth") {
            return Ok(json!([1280, 2400]));
        }
        Ok(Value::Null)
    }

    async fn switch_to_frame(&self, frame: &Locator) -> SessionResult<()> {
        let mut state = self.state();
        state.alive()?;
        let name = match frame {
            Locator::Name(name) | Locator::Id(name) => name.clone(),
            other => other.to_string(),
        };
        if state.current_frame.is_some() || !state.frames.contains(&name) {
            return Err(SessionError::NoSuchFrame { frame: frame.to_string() });
        }
        state.calls.push(format!("frame:{name}"));
        state.current_frame = Some(name);
        Ok(())
    }

    async fn switch_to_default_content(&self) -> SessionResult<()> {
        let mut state = self.state();
        state.alive()?;
        state.calls.push("frame:default".to_string());
        state.current_frame = None;
        Ok(())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> SessionResult<()> {
        let mut state = self.state();
        state.alive()?;
        state.calls.push(format!("resize:{width}x{height}"));
        Ok(())
    }

    async fn screenshot_png(&self) -> SessionResult<Vec<u8>> {
        let mut state = self.state();
        state.alive()?;
        state.calls.push("screenshot".to_string());
        Ok(FAKE_PNG.to_vec())
    }

    async fn page_source(&self) -> SessionResult<String> {
        let state = self.state();
        state.alive()?;
        let by_query = state.query.as_ref().and_then(|q| state.page_source_by_query.get(q));
        Ok(by_query.unwrap_or(&state.page_source).clone())
    }

    async fn quit(&self) -> SessionResult<()> {
        let mut state = self.state();
        state.quits += 1;
        state.calls.push("quit".to_string());
        Ok(())
    }
}

/// Session factory handing out clones of one scripted browser.
#[derive(Debug)]
pub struct ScriptedSessionFactory {
    browser: ScriptedBrowser,
    opens: AtomicUsize,
    fail_open: bool,
}

impl ScriptedSessionFactory {
    pub fn new(browser: ScriptedBrowser) -> Self {
        Self {
            browser,
            opens: AtomicUsize::new(0),
            fail_open: false,
        }
    }

    /// A factory whose browser never starts
    pub fn failing() -> Self {
        Self {
            browser: ScriptedBrowser::new(),
            opens: AtomicUsize::new(0),
            fail_open: true,
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn browser(&self) -> &ScriptedBrowser {
        &self.browser
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    async fn open(&self) -> SessionResult<Box<dyn BrowserSession>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(SessionError::startup_failed("chromedriver not reachable"));
        }
        Ok(Box::new(self.browser.clone()))
    }

    fn describe(&self) -> String {
        "scripted browser".to_string()
    }
}

/// Adapter factory producing [`ScriptedAdapter`]s with injected failures.
#[derive(Debug, Default, Clone)]
pub struct ScriptedAdapterFactory {
    fail_build: HashSet<AdapterKey>,
    fail_gating: HashSet<AdapterKey>,
    fail_items: HashSet<String>,
    lose_session_on: HashSet<String>,
}

impl ScriptedAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fail_build_for(mut self, locality: &str, region: &str) -> Self {
        self.fail_build.insert(AdapterKey::new(locality, region));
        self
    }

    #[must_use]
    pub fn fail_gating_for(mut self, locality: &str, region: &str) -> Self {
        self.fail_gating.insert(AdapterKey::new(locality, region));
        self
    }

    #[must_use]
    pub fn fail_item(mut self, parcel_id: &str) -> Self {
        self.fail_items.insert(parcel_id.to_string());
        self
    }

    #[must_use]
    pub fn lose_session_on(mut self, parcel_id: &str) -> Self {
        self.lose_session_on.insert(parcel_id.to_string());
        self
    }
}

impl AdapterFactory for ScriptedAdapterFactory {
    fn build(&self, entry: &RegistryEntry) -> Result<Box<dyn SiteAdapter>, AdapterError> {
        let key = entry.key();
        if self.fail_build.contains(&key) {
            return Err(AdapterError::configuration(format!("{key}: scripted build failure")));
        }
        Ok(Box::new(ScriptedAdapter {
            name: entry.adapter_name(),
            entry_url: format!("https://scripted.test/{}", key.locality().replace(' ', "-")),
            fail_gating: self.fail_gating.contains(&key),
            fail_items: self.fail_items.clone(),
            lose_session_on: self.lose_session_on.clone(),
        }))
    }
}

/// Adapter that navigates the session per item and fabricates records.
#[derive(Debug)]
pub struct ScriptedAdapter {
    name: String,
    entry_url: String,
    fail_gating: bool,
    fail_items: HashSet<String>,
    lose_session_on: HashSet<String>,
}

#[async_trait]
impl SiteAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn go_to_entry_point(&self, ctx: &ScrapeContext<'_>) -> Result<(), AdapterError> {
        ctx.session()
            .navigate(&self.entry_url)
            .await
            .map_err(|e| AdapterError::navigation(&self.entry_url, e))
    }

    async fn handle_gating(&self, _ctx: &ScrapeContext<'_>) -> Result<(), AdapterError> {
        if self.fail_gating {
            return Err(AdapterError::gating(
                &self.name,
                SessionError::no_such_element("xpath=//button[@id='accept']"),
            ));
        }
        Ok(())
    }

    async fn scrape_item(&self, ctx: &ScrapeContext<'_>, item: &WorkItem) -> Result<Vec<RawRecord>, ScrapeError> {
        ctx.session()
            .navigate(&format!("{}/{}", self.entry_url, item.parcel_id))
            .await?;
        if self.lose_session_on.contains(&item.parcel_id) {
            return Err(SessionError::session_lost("chrome not reachable").into());
        }
        if self.fail_items.contains(&item.parcel_id) {
            return Err(ScrapeError::unexpected_layout(&item.parcel_id, "valuation table missing"));
        }
        Ok(vec![
            RawRecord::new(&item.parcel_id)
                .land("61,000")
                .building("143,500")
                .total("204,500")
                .year("2024"),
        ])
    }
}
