//! In-process [`PageDriver`] serving canned HTML through `scraper`.
//!
//! Each URL maps to one or more HTML snapshots. A page starts on the first
//! snapshot and advances by one on every `scroll_to_bottom`, which is how a
//! listing page that injects more items on scroll is modelled. Reads can be
//! made to fail per element and the whole site can be "crashed".

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use jobscout_engine::{DriverError, Page, PageDriver, Scope};

#[derive(Default)]
struct SiteState {
    snapshots: HashMap<String, Vec<String>>,
    delays: HashMap<String, Duration>,
    read_failures: HashMap<(String, usize), DriverError>,
    crashed: Option<DriverError>,
    visits: Vec<String>,
    refuse_pages: bool,
    open_pages: usize,
    max_open_pages: usize,
    opened_total: usize,
}

#[derive(Clone, Default)]
pub struct StaticSite {
    state: Arc<Mutex<SiteState>>,
}

impl StaticSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_snapshots(url, vec![html.into()])
    }

    /// Serve `snapshots` at `url`; each scroll reveals the next one.
    pub fn with_snapshots(self, url: impl Into<String>, snapshots: Vec<String>) -> Self {
        self.lock().snapshots.insert(url.into(), snapshots);
        self
    }

    /// Delay navigation to `url`. A delay longer than the navigation timeout
    /// produces [`DriverError::Timeout`].
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.lock().delays.insert(url.into(), delay);
        self
    }

    /// Reads of `selector` inside the `index`-th listing element fail with `error`.
    pub fn with_read_failure(
        self,
        selector: impl Into<String>,
        index: usize,
        error: DriverError,
    ) -> Self {
        self.lock()
            .read_failures
            .insert((selector.into(), index), error);
        self
    }

    /// Every DOM query after navigation fails with `error`, as if the browser died.
    pub fn crash_with(self, error: DriverError) -> Self {
        self.lock().crashed = Some(error);
        self
    }

    pub fn refuse_new_pages(&self, refuse: bool) {
        self.lock().refuse_pages = refuse;
    }

    /// Every URL navigated to, in order.
    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    pub fn open_pages(&self) -> usize {
        self.lock().open_pages
    }

    /// Highest number of pages open at the same time.
    pub fn max_open_pages(&self) -> usize {
        self.lock().max_open_pages
    }

    pub fn pages_opened(&self) -> usize {
        self.lock().opened_total
    }

    fn lock(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl PageDriver for StaticSite {
    async fn open_page(&self) -> Result<Box<dyn Page>, DriverError> {
        let mut state = self.lock();
        if state.refuse_pages {
            return Err(DriverError::OpenPage("page limit reached".to_string()));
        }
        state.open_pages += 1;
        state.opened_total += 1;
        state.max_open_pages = state.max_open_pages.max(state.open_pages);
        drop(state);

        Ok(Box::new(StaticPage {
            site: self.clone(),
            cursor: Mutex::new(Cursor::default()),
        }))
    }
}

#[derive(Default)]
struct Cursor {
    url: Option<String>,
    snapshot: usize,
    closed: bool,
}

struct StaticPage {
    site: StaticSite,
    cursor: Mutex<Cursor>,
}

impl StaticPage {
    fn cursor(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_read(&self, scope: Scope<'_>, selector: &str) -> Result<(), DriverError> {
        let state = self.site.lock();
        if let Some(error) = &state.crashed {
            return Err(error.clone());
        }
        if let Scope::Element(handle) = scope {
            let key = (selector.to_string(), handle.index());
            if let Some(error) = state.read_failures.get(&key) {
                return Err(error.clone());
            }
        }
        Ok(())
    }

    fn current_html(&self) -> Result<String, DriverError> {
        if let Some(error) = self.site.lock().crashed.clone() {
            return Err(error);
        }
        let cursor = self.cursor();
        if cursor.closed {
            return Err(DriverError::Browser("page is closed".to_string()));
        }
        let Some(url) = cursor.url.as_ref() else {
            return Ok(String::new());
        };
        let state = self.site.lock();
        let html = state
            .snapshots
            .get(url)
            .and_then(|snapshots| {
                snapshots
                    .get(cursor.snapshot)
                    .or_else(|| snapshots.last())
            })
            .cloned()
            .unwrap_or_default();
        Ok(html)
    }

    /// Parse the current snapshot and run `query` against it. `Html` is not
    /// `Send`, so it never lives across an await.
    fn query<T>(&self, query: impl FnOnce(&Html) -> Result<T, DriverError>) -> Result<T, DriverError> {
        let html = self.current_html()?;
        let document = Html::parse_document(&html);
        query(&document)
    }
}

#[async_trait::async_trait]
impl Page for StaticPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let delay = {
            let mut state = self.site.lock();
            state.visits.push(url.to_string());
            if !state.snapshots.contains_key(url) {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    message: "404 Not Found".to_string(),
                });
            }
            state.delays.get(url).copied()
        };

        if let Some(delay) = delay {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(DriverError::Timeout(timeout));
            }
            tokio::time::sleep(delay).await;
        }

        let mut cursor = self.cursor();
        cursor.url = Some(url.to_string());
        cursor.snapshot = 0;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        let parsed = parse_selector(selector)?;
        let found = self.query(|document| Ok(document.select(&parsed).next().is_some()))?;
        if found {
            Ok(())
        } else {
            Err(DriverError::SelectorMissing(selector.to_string()))
        }
    }

    async fn count(&self, selector: &str) -> Result<usize, DriverError> {
        let parsed = parse_selector(selector)?;
        self.query(|document| Ok(document.select(&parsed).count()))
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        let mut cursor = self.cursor();
        if let Some(url) = cursor.url.clone() {
            let available = self
                .site
                .lock()
                .snapshots
                .get(&url)
                .map_or(0, Vec::len);
            if cursor.snapshot + 1 < available {
                cursor.snapshot += 1;
            }
        }
        Ok(())
    }

    async fn read_texts(
        &self,
        scope: Scope<'_>,
        selector: &str,
        _timeout: Duration,
    ) -> Result<Vec<String>, DriverError> {
        self.check_read(scope, selector)?;
        let parsed = parse_selector(selector)?;
        let root = scope_selector(scope)?;
        self.query(|document| {
            let texts = match &root {
                None => document.select(&parsed).map(element_text).collect(),
                Some((container, index)) => document
                    .select(container)
                    .nth(*index)
                    .map(|element| element.select(&parsed).map(element_text).collect())
                    .unwrap_or_default(),
            };
            Ok(texts)
        })
    }

    async fn read_attribute(
        &self,
        scope: Scope<'_>,
        selector: &str,
        attr: &str,
        _timeout: Duration,
    ) -> Result<Option<String>, DriverError> {
        self.check_read(scope, selector)?;
        let parsed = parse_selector(selector)?;
        let root = scope_selector(scope)?;
        self.query(|document| {
            let element = match &root {
                None => document.select(&parsed).next(),
                Some((container, index)) => document
                    .select(container)
                    .nth(*index)
                    .and_then(|element| element.select(&parsed).next()),
            };
            Ok(element.and_then(|element| element.value().attr(attr).map(str::to_string)))
        })
    }

    async fn close(&self) -> Result<(), DriverError> {
        let mut cursor = self.cursor();
        if !cursor.closed {
            cursor.closed = true;
            let mut state = self.site.lock();
            state.open_pages = state.open_pages.saturating_sub(1);
        }
        Ok(())
    }
}

fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    Selector::parse(selector).map_err(|_| DriverError::InvalidSelector(selector.to_string()))
}

fn scope_selector(scope: Scope<'_>) -> Result<Option<(Selector, usize)>, DriverError> {
    match scope {
        Scope::Page => Ok(None),
        Scope::Element(handle) => {
            Ok(Some((parse_selector(handle.container())?, handle.index())))
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}
