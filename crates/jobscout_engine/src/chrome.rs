//! [`PageDriver`] backed by a headless Chrome instance.
//!
//! `headless_chrome` is synchronous, so every CDP call runs on the blocking
//! pool and is bounded by a tokio timeout. DOM reads are done with a single
//! script per call whose result is passed back as a JSON string, which keeps
//! element-scoped and page-scoped reads on the same code path.

use std::ffi::{OsStr, OsString};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use headless_chrome::util::Timeout as WaitTimeout;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;

use crate::driver::{DriverError, Page, PageDriver, Scope};

/// Extra time granted on top of the navigation timeout for CDP round trips.
const NAVIGATION_GRACE: Duration = Duration::from_secs(2);
/// Upper bound for calls that carry no timeout of their own.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ChromeSettings {
    pub headless: bool,
    /// Sent on every page so the session looks like a regular desktop browser.
    pub user_agent: String,
    pub accept_language: String,
    pub idle_timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Default for ChromeSettings {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            idle_timeout: Duration::from_secs(180),
            extra_args: vec![
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
            ],
        }
    }
}

pub struct ChromeDriver {
    browser: Arc<Browser>,
    user_agent: Arc<str>,
    accept_language: Arc<str>,
}

impl ChromeDriver {
    /// Launch the browser. Blocking; call before entering async code or from
    /// a blocking context.
    pub fn launch(settings: &ChromeSettings) -> Result<Self, DriverError> {
        let args: Vec<OsString> = settings.extra_args.iter().map(OsString::from).collect();
        let arg_refs: Vec<&OsStr> = args.iter().map(OsString::as_os_str).collect();
        let options = LaunchOptions {
            headless: settings.headless,
            sandbox: false,
            idle_browser_timeout: settings.idle_timeout,
            args: arg_refs,
            ..Default::default()
        };
        let browser = Browser::new(options).map_err(|err| DriverError::Launch(err.to_string()))?;
        engine_info!("Chrome launched (headless={})", settings.headless);

        Ok(Self {
            browser: Arc::new(browser),
            user_agent: Arc::from(settings.user_agent.as_str()),
            accept_language: Arc::from(settings.accept_language.as_str()),
        })
    }
}

#[async_trait::async_trait]
impl PageDriver for ChromeDriver {
    async fn open_page(&self) -> Result<Box<dyn Page>, DriverError> {
        let browser = Arc::clone(&self.browser);
        let user_agent = Arc::clone(&self.user_agent);
        let accept_language = Arc::clone(&self.accept_language);
        let tab = bounded(
            COMMAND_TIMEOUT,
            blocking(move || {
                let tab = browser
                    .new_tab()
                    .map_err(|err| DriverError::OpenPage(err.to_string()))?;
                tab.set_user_agent(&user_agent, Some(&accept_language), None)
                    .map_err(|err| DriverError::OpenPage(err.to_string()))?;
                Ok(tab)
            }),
        )
        .await?;
        Ok(Box::new(ChromePage { tab }))
    }
}

struct ChromePage {
    tab: Arc<Tab>,
}

#[async_trait::async_trait]
impl Page for ChromePage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        engine_debug!("navigate {}", target);
        bounded(
            timeout + NAVIGATION_GRACE,
            blocking(move || {
                tab.set_default_timeout(timeout);
                tab.navigate_to(&target)
                    .and_then(|tab| tab.wait_until_navigated())
                    .map(|_| ())
                    .map_err(|err| DriverError::Navigation {
                        url: target.clone(),
                        message: err.to_string(),
                    })
            }),
        )
        .await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let tab = Arc::clone(&self.tab);
        let selector = selector.to_string();
        bounded(
            timeout + NAVIGATION_GRACE,
            blocking(move || {
                match tab.wait_for_element_with_custom_timeout(&selector, timeout) {
                    Ok(_) => Ok(()),
                    // The wait only gives up with `Timeout` while the element is absent.
                    Err(err) if err.downcast_ref::<WaitTimeout>().is_some() => {
                        Err(DriverError::SelectorMissing(selector.clone()))
                    }
                    Err(err) => Err(DriverError::Browser(err.to_string())),
                }
            }),
        )
        .await
    }

    async fn count(&self, selector: &str) -> Result<usize, DriverError> {
        let expression = format!(
            "JSON.stringify(document.querySelectorAll({}).length)",
            js_string(selector)
        );
        self.evaluate(expression, COMMAND_TIMEOUT).await
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        let expression = "(() => { window.scrollTo({ top: document.body.scrollHeight, behavior: 'smooth' }); return JSON.stringify(true); })()".to_string();
        self.evaluate::<bool>(expression, COMMAND_TIMEOUT)
            .await
            .map(|_| ())
    }

    async fn read_texts(
        &self,
        scope: Scope<'_>,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, DriverError> {
        let expression = format!(
            "(() => {{ const root = {scope}; if (!root) {{ return JSON.stringify([]); }} \
             return JSON.stringify(Array.from(root.querySelectorAll({selector}), \
             (el) => el.innerText || el.textContent || '')); }})()",
            scope = scope_expression(scope),
            selector = js_string(selector),
        );
        self.evaluate(expression, timeout).await
    }

    async fn read_attribute(
        &self,
        scope: Scope<'_>,
        selector: &str,
        attr: &str,
        timeout: Duration,
    ) -> Result<Option<String>, DriverError> {
        let expression = format!(
            "(() => {{ const root = {scope}; const el = root ? root.querySelector({selector}) : null; \
             return JSON.stringify(el ? el.getAttribute({attr}) : null); }})()",
            scope = scope_expression(scope),
            selector = js_string(selector),
            attr = js_string(attr),
        );
        self.evaluate(expression, timeout).await
    }

    async fn close(&self) -> Result<(), DriverError> {
        let tab = Arc::clone(&self.tab);
        bounded(
            COMMAND_TIMEOUT,
            blocking(move || {
                tab.close(true)
                    .map(|_| ())
                    .map_err(|err| DriverError::Browser(err.to_string()))
            }),
        )
        .await
    }
}

impl ChromePage {
    async fn evaluate<T>(&self, expression: String, timeout: Duration) -> Result<T, DriverError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        bounded(timeout, blocking(move || evaluate_json(&tab, &expression))).await
    }
}

fn evaluate_json<T: DeserializeOwned>(tab: &Tab, expression: &str) -> Result<T, DriverError> {
    let object = tab
        .evaluate(expression, false)
        .map_err(|err| DriverError::Script(err.to_string()))?;
    match object.value {
        Some(serde_json::Value::String(raw)) => {
            serde_json::from_str(&raw).map_err(|err| DriverError::Script(err.to_string()))
        }
        other => Err(DriverError::Script(format!(
            "expected JSON string result, got {other:?}"
        ))),
    }
}

fn scope_expression(scope: Scope<'_>) -> String {
    match scope {
        Scope::Page => "document".to_string(),
        Scope::Element(handle) => format!(
            "document.querySelectorAll({})[{}]",
            js_string(handle.container()),
            handle.index()
        ),
    }
}

/// Quote `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

async fn blocking<T, F>(work: F) -> Result<T, DriverError>
where
    F: FnOnce() -> Result<T, DriverError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| DriverError::Browser(err.to_string()))?
}

async fn bounded<T>(
    timeout: Duration,
    work: impl Future<Output = Result<T, DriverError>>,
) -> Result<T, DriverError> {
    tokio::time::timeout(timeout, work)
        .await
        .map_err(|_| DriverError::Timeout(timeout))?
}
