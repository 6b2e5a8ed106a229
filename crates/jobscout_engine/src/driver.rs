use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("could not open page: {0}")]
    OpenPage(String),
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("no element matches {0}")]
    SelectorMissing(String),
    #[error("invalid selector {0}")]
    InvalidSelector(String),
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("browser error: {0}")]
    Browser(String),
}

/// The `index`-th element matching `container` on a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    container: String,
    index: usize,
}

impl ElementHandle {
    pub fn new(container: impl Into<String>, index: usize) -> Self {
        Self {
            container: container.into(),
            index,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Where a read looks for its selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Page,
    Element(&'a ElementHandle),
}

/// One browser page. Reads return `Ok(empty)`/`Ok(None)` when nothing
/// matches; errors are reserved for driver failures and timeouts.
#[async_trait::async_trait]
pub trait Page: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), DriverError>;

    async fn count(&self, selector: &str) -> Result<usize, DriverError>;

    async fn scroll_to_bottom(&self) -> Result<(), DriverError>;

    /// Text of every element matching `selector` within `scope`, in document order.
    async fn read_texts(
        &self,
        scope: Scope<'_>,
        selector: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, DriverError>;

    /// Attribute of the first element matching `selector` within `scope`.
    async fn read_attribute(
        &self,
        scope: Scope<'_>,
        selector: &str,
        attr: &str,
        timeout: Duration,
    ) -> Result<Option<String>, DriverError>;

    async fn close(&self) -> Result<(), DriverError>;

    async fn read_text(
        &self,
        scope: Scope<'_>,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<String>, DriverError> {
        Ok(self
            .read_texts(scope, selector, timeout)
            .await?
            .into_iter()
            .next())
    }

    async fn elements(&self, container: &str) -> Result<Vec<ElementHandle>, DriverError> {
        let count = self.count(container).await?;
        Ok((0..count)
            .map(|index| ElementHandle::new(container, index))
            .collect())
    }
}

#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// Open a fresh page. The caller owns it and must `close` it.
    async fn open_page(&self) -> Result<Box<dyn Page>, DriverError>;
}
