use crate::core::{BrowserTrait, ElementHandle, LocatorConfig};
use crate::dom::patterns::{contains_product_word, has_card_price};
use crate::sites::{SelectorRole, SiteProfile};
use std::collections::HashSet;
use tracing::{debug, info};

/// Tried after the profile's own container selectors, on every site.
pub const GENERIC_CONTAINERS: &[&str] = &[
    r#"div[class*="product"]"#,
    r#"article[class*="product"]"#,
    ".item",
    ".card",
    ".product-card",
    ".product-block",
    ".product-tile",
    ".product-item",
    ".product-list-item",
    "div.product",
    "article.product",
    "section.product",
    "div.item",
    "article.item",
    "div.card",
    "article.card",
];

/// Block-level elements scanned when selectors find too little.
pub const SNIFF_SELECTOR: &str = "div, article, section, li";

/// Finds elements that probably are product cards.
///
/// Two strategies feed one result: configured and generic container
/// selectors, then (only when those are nearly empty) a scan of block
/// elements whose text looks like a product card. Any fault from the browser
/// degrades to fewer results, never to an error.
pub struct ElementLocator {
    config: LocatorConfig,
}

impl ElementLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub async fn locate<B: BrowserTrait>(
        &self,
        browser: &B,
        profile: &SiteProfile,
    ) -> Vec<B::Element> {
        let mut found = self.by_selectors(browser, profile).await;

        if found.len() < self.config.sniff_threshold {
            debug!(
                "only {} elements from selectors, sniffing page content",
                found.len()
            );
            found.extend(self.by_content(browser).await);
        }

        dedupe(found, self.config.max_located)
    }

    async fn by_selectors<B: BrowserTrait>(
        &self,
        browser: &B,
        profile: &SiteProfile,
    ) -> Vec<B::Element> {
        let configured = profile
            .selectors
            .role(SelectorRole::Container)
            .iter()
            .map(String::as_str);
        let mut found = Vec::new();

        for selector in configured.chain(GENERIC_CONTAINERS.iter().copied()) {
            let selector = selector.trim();
            if selector.is_empty() {
                continue;
            }
            match browser.query_all(selector).await {
                Ok(elements) if !elements.is_empty() => {
                    info!("found {} with '{}'", elements.len(), selector);
                    found.extend(elements);
                }
                Ok(_) => {}
                Err(e) => debug!("selector '{}' skipped: {}", selector, e),
            }
        }

        found
    }

    async fn by_content<B: BrowserTrait>(&self, browser: &B) -> Vec<B::Element> {
        let blocks = match browser.query_all(SNIFF_SELECTOR).await {
            Ok(blocks) => blocks,
            Err(e) => {
                debug!("content scan unavailable: {}", e);
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for block in blocks.into_iter().take(self.config.sniff_scan_limit) {
            let text = match browser.element_text(&block).await {
                Ok(text) => text,
                Err(_) => continue,
            };
            if self.looks_like_card(text.trim()) {
                found.push(block);
            }
        }
        found
    }

    fn looks_like_card(&self, text: &str) -> bool {
        let length = text.chars().count();
        if length <= self.config.min_card_text || length >= self.config.max_card_text {
            return false;
        }
        has_card_price(text) || contains_product_word(text)
    }
}

impl Default for ElementLocator {
    fn default() -> Self {
        Self::new(LocatorConfig::default())
    }
}

/// Keep the first occurrence of each identity, in discovery order, up to `cap`.
pub fn dedupe<E: ElementHandle>(elements: Vec<E>, cap: usize) -> Vec<E> {
    let mut seen = HashSet::new();
    elements
        .into_iter()
        .filter(|element| match element.identity() {
            Some(id) => seen.insert(id),
            None => true,
        })
        .take(cap)
        .collect()
}
