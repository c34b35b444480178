use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

/// Opaque reference to a node of the currently loaded page.
///
/// Handles are only meaningful until the next navigation.
pub trait ElementHandle: Clone + Debug + Send + Sync {
    /// Identity used to merge the same node found by different queries.
    /// `None` means the backend cannot tell, and the handle is kept as unique.
    fn identity(&self) -> Option<u64>;
}

/// The browser-automation capability the scraper is written against.
///
/// Implementations own a single page; callers must not run concurrent
/// queries against the same instance.
#[async_trait]
pub trait BrowserTrait: Send + Sync {
    type Element: ElementHandle;

    /// Launch a new browser instance and open the working tab
    async fn launch(&mut self, config: &crate::core::Config) -> Result<()>;

    /// Navigate to a URL and wait for the load event
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Execute JavaScript in the page
    async fn execute_script(&self, script: &str) -> Result<Value>;

    async fn get_title(&self) -> Result<String>;

    /// All elements matching a CSS selector, in document order
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Rendered (visible) text of an element
    async fn element_text(&self, element: &Self::Element) -> Result<String>;

    /// Property value when the DOM exposes one (`href`, `src`, `outerHTML`),
    /// otherwise the raw attribute
    async fn element_attribute(&self, element: &Self::Element, name: &str)
        -> Result<Option<String>>;

    /// Descendant elements with the given tag name, in document order
    async fn descendants(&self, element: &Self::Element, tag: &str) -> Result<Vec<Self::Element>>;

    /// PNG screenshot of the viewport
    async fn take_screenshot(&self) -> Result<Vec<u8>>;

    /// Release the browser. Safe to call when nothing was launched.
    async fn close(&mut self) -> Result<()>;
}
