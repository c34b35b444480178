//! In-memory automation backend over fixed HTML documents.
//!
//! Pages are re-parsed on every query, so element handles are positions in
//! document order and stay stable for as long as the page is loaded.
//! `href` and `src` come back resolved against the page URL, as the DOM
//! properties do in a real browser.

use crate::core::{BrowserTrait, Config, ElementHandle};
use crate::errors::{Result, ScraperError};
use crate::utils::javascript::READY_CHECK;
use async_trait::async_trait;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Position of an element in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StaticElement(pub usize);

impl ElementHandle for StaticElement {
    fn identity(&self) -> Option<u64> {
        Some(self.0 as u64)
    }
}

/// What the backend was asked to do, for assertions in tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct StaticActivity {
    pub launches: usize,
    pub closes: usize,
    pub navigations: Vec<String>,
    pub scripts: Vec<String>,
    pub queries: Vec<String>,
    pub screenshots: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityLog(Arc<Mutex<StaticActivity>>);

impl ActivityLog {
    pub fn snapshot(&self) -> StaticActivity {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StaticActivity> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// The loaded page: its URL and its HTML.
#[derive(Debug, Clone)]
struct LoadedPage {
    url: String,
    html: String,
}

#[derive(Debug, Default)]
pub struct StaticBrowser {
    pages: HashMap<String, String>,
    current: Mutex<Option<LoadedPage>>,
    launched: bool,
    fail_launch: bool,
    activity: ActivityLog,
}

impl StaticBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Make `launch` fail, as when no browser binary is available.
    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn activity(&self) -> ActivityLog {
        self.activity.clone()
    }

    fn current_page(&self) -> Result<LoadedPage> {
        if !self.launched {
            return Err(ScraperError::BrowserNotLaunched);
        }
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| ScraperError::NavigationFailed("no page loaded".to_string()))
    }

    /// Parse the current page and run `f` against it and its elements in
    /// document order.
    fn with_document<T>(
        &self,
        f: impl FnOnce(&Html, &[ElementRef<'_>]) -> Result<T>,
    ) -> Result<T> {
        let page = self.current_page()?;
        let document = Html::parse_document(&page.html);
        let elements: Vec<ElementRef<'_>> = document
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();
        f(&document, &elements)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScraperError::InvalidSelector(format!("{selector}: {e:?}")))
}

/// Join a non-empty `value` onto `page_url`; values that do not join stay
/// as written.
fn resolve_against(page_url: &str, value: &str) -> String {
    if value.trim().is_empty() {
        return value.to_string();
    }
    Url::parse(page_url)
        .and_then(|base| base.join(value.trim()))
        .map(String::from)
        .unwrap_or_else(|_| value.to_string())
}

fn position_of(elements: &[ElementRef<'_>], target: &ElementRef<'_>) -> Option<usize> {
    elements.iter().position(|e| e.id() == target.id())
}

fn resolve<'a>(elements: &[ElementRef<'a>], handle: &StaticElement) -> Result<ElementRef<'a>> {
    elements
        .get(handle.0)
        .copied()
        .ok_or_else(|| ScraperError::ElementNotFound(format!("stale element {}", handle.0)))
}

fn is_hidden(element: &scraper::node::Element) -> bool {
    element.attr("hidden").is_some()
        || element
            .attr("style")
            .map(|style| style.replace(' ', "").contains("display:none"))
            .unwrap_or(false)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let tag = element.value().name();
    if SKIPPED_TAGS.contains(&tag) || is_hidden(element.value()) {
        return;
    }
    if tag == "br" {
        out.push('\n');
        return;
    }
    let block = BLOCK_TAGS.contains(&tag);
    if block {
        out.push('\n');
    }
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        } else if let Node::Text(text) = child.value() {
            out.push_str(&text.text);
        }
    }
    if block {
        out.push('\n');
    }
}

/// Approximation of `innerText`: block elements break lines, whitespace
/// inside a line collapses, hidden and script content is skipped.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl BrowserTrait for StaticBrowser {
    type Element = StaticElement;

    async fn launch(&mut self, _config: &Config) -> Result<()> {
        self.activity.lock().launches += 1;
        if self.fail_launch {
            return Err(ScraperError::LaunchFailed("static launch disabled".to_string()));
        }
        self.launched = true;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        if !self.launched {
            return Err(ScraperError::BrowserNotLaunched);
        }
        self.activity.lock().navigations.push(url.to_string());
        let html = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScraperError::NavigationFailed(format!("unreachable: {url}")))?;
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = Some(LoadedPage {
            url: url.to_string(),
            html,
        });
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        self.activity.lock().scripts.push(script.to_string());
        if script == READY_CHECK {
            return self.with_document(|document, _| {
                let body = parse_selector("body")?;
                Ok(Value::Bool(document.select(&body).next().is_some()))
            });
        }
        self.current_page()?;
        Ok(Value::Null)
    }

    async fn get_title(&self) -> Result<String> {
        self.with_document(|document, _| {
            let title = parse_selector("title")?;
            Ok(document
                .select(&title)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
                .unwrap_or_default())
        })
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<StaticElement>> {
        self.activity.lock().queries.push(selector.to_string());
        let parsed = parse_selector(selector)?;
        self.with_document(|document, elements| {
            Ok(document
                .select(&parsed)
                .filter_map(|e| position_of(elements, &e))
                .map(StaticElement)
                .collect())
        })
    }

    async fn element_text(&self, element: &StaticElement) -> Result<String> {
        self.with_document(|_, elements| Ok(visible_text(resolve(elements, element)?)))
    }

    async fn element_attribute(
        &self,
        element: &StaticElement,
        name: &str,
    ) -> Result<Option<String>> {
        let page_url = self.current_page()?.url;
        self.with_document(|_, elements| {
            let node = resolve(elements, element)?;
            Ok(match name {
                "outerHTML" => Some(node.html()),
                "innerHTML" => Some(node.inner_html()),
                _ if URL_ATTRIBUTES.contains(&name) => node
                    .value()
                    .attr(name)
                    .map(|value| resolve_against(&page_url, value)),
                _ => node.value().attr(name).map(String::from),
            })
        })
    }

    async fn descendants(
        &self,
        element: &StaticElement,
        tag: &str,
    ) -> Result<Vec<StaticElement>> {
        let parsed = parse_selector(tag)?;
        self.with_document(|_, elements| {
            let node = resolve(elements, element)?;
            Ok(node
                .select(&parsed)
                .filter(|e| e.id() != node.id())
                .filter_map(|e| position_of(elements, &e))
                .map(StaticElement)
                .collect())
        })
    }

    async fn take_screenshot(&self) -> Result<Vec<u8>> {
        self.activity.lock().screenshots += 1;
        self.current_page()?;
        // PNG signature only; there is no renderer behind a static page
        Ok(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
    }

    async fn close(&mut self) -> Result<()> {
        self.activity.lock().closes += 1;
        self.launched = false;
        *self.current.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body><div class="card">
        <a id="rel" href="../p/42">voir</a>
        <a id="abs" href="https://cdn.test/p/7">voir</a>
        <a id="empty" href="">voir</a>
        <img src="/img/lait.png" data-src="/img/lazy.png" alt="Lait">
        </div></body></html>"#;

    async fn loaded() -> StaticBrowser {
        let mut browser = StaticBrowser::new().with_page("https://shop.test/rayons/lait", PAGE);
        browser.launch(&Config::instant()).await.unwrap();
        browser.navigate("https://shop.test/rayons/lait").await.unwrap();
        browser
    }

    async fn attribute(browser: &StaticBrowser, selector: &str, name: &str) -> Option<String> {
        let element = browser.query_all(selector).await.unwrap()[0];
        browser.element_attribute(&element, name).await.unwrap()
    }

    #[tokio::test]
    async fn href_and_src_resolve_against_the_page_url() {
        let browser = loaded().await;
        assert_eq!(
            attribute(&browser, "#rel", "href").await.as_deref(),
            Some("https://shop.test/p/42")
        );
        assert_eq!(
            attribute(&browser, "#abs", "href").await.as_deref(),
            Some("https://cdn.test/p/7")
        );
        assert_eq!(
            attribute(&browser, "img", "src").await.as_deref(),
            Some("https://shop.test/img/lait.png")
        );
    }

    #[tokio::test]
    async fn other_attributes_are_returned_as_written() {
        let browser = loaded().await;
        assert_eq!(attribute(&browser, "#empty", "href").await.as_deref(), Some(""));
        assert_eq!(
            attribute(&browser, "img", "data-src").await.as_deref(),
            Some("/img/lazy.png")
        );
        assert_eq!(attribute(&browser, "img", "alt").await.as_deref(), Some("Lait"));
        assert_eq!(attribute(&browser, "img", "title").await, None);
    }

    #[tokio::test]
    async fn screenshot_needs_a_loaded_page() {
        let mut browser = StaticBrowser::new();
        browser.launch(&Config::instant()).await.unwrap();
        assert!(matches!(
            browser.take_screenshot().await,
            Err(ScraperError::NavigationFailed(_))
        ));
        assert_eq!(browser.activity().snapshot().screenshots, 1);
    }
}
