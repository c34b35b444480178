use crate::core::BrowserTrait;
use crate::dom::patterns::{
    extract_price, looks_absolute_link, looks_like_price_line, normalize_image_url,
    price_line_prefix, truncate_chars, DEFAULT_PRICE,
};
use crate::sites::SiteProfile;
use crate::types::ProductRecord;
use chrono::Local;
use tracing::debug;

pub const MAX_NAME_CHARS: usize = 100;
pub const MIN_NAME_CHARS: usize = 2;

/// Attributes that may carry a product name when the text does not.
const NAME_ATTRIBUTES: &[&str] = &["data-name", "alt", "title"];

const IMAGE_SOURCES: &[&str] = &["src", "data-src"];

/// Turns one candidate element into a [`ProductRecord`].
///
/// Only the name is mandatory. Price falls back to `"0.00"`, image and link
/// fall back to empty strings, and a failing descendant lookup just leaves
/// its field empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordExtractor;

impl RecordExtractor {
    pub fn new() -> Self {
        Self
    }

    pub async fn extract<B: BrowserTrait>(
        &self,
        browser: &B,
        element: &B::Element,
        profile: &SiteProfile,
    ) -> Option<ProductRecord> {
        let text = match browser.element_text(element).await {
            Ok(text) => text,
            Err(e) => {
                debug!("element text unavailable: {}", e);
                return None;
            }
        };
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let price =
            extract_price(lines.iter().copied()).unwrap_or_else(|| DEFAULT_PRICE.to_string());

        let name = match name_from_lines(&lines) {
            Some(name) => name,
            None => self
                .name_from_attributes(browser, element)
                .await
                .or_else(|| name_from_price_line(&lines))
                .unwrap_or_default(),
        };

        if name.chars().count() < MIN_NAME_CHARS {
            return None;
        }

        let image_url = self.first_image(browser, element, &profile.base_url).await;
        let product_url = self.first_link(browser, element).await;

        Some(ProductRecord {
            name,
            price,
            image_url,
            product_url,
            scraped_at: Local::now(),
            supermarket: String::new(),
            category: String::new(),
        })
    }

    async fn name_from_attributes<B: BrowserTrait>(
        &self,
        browser: &B,
        element: &B::Element,
    ) -> Option<String> {
        for attribute in NAME_ATTRIBUTES {
            if let Ok(Some(value)) = browser.element_attribute(element, attribute).await {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(truncate_chars(value, MAX_NAME_CHARS));
                }
            }
        }
        None
    }

    async fn first_image<B: BrowserTrait>(
        &self,
        browser: &B,
        element: &B::Element,
        base_url: &str,
    ) -> String {
        let images = match browser.descendants(element, "img").await {
            Ok(images) => images,
            Err(_) => return String::new(),
        };

        for image in &images {
            for attribute in IMAGE_SOURCES {
                if let Ok(Some(src)) = browser.element_attribute(image, attribute).await {
                    if !src.trim().is_empty() {
                        return normalize_image_url(&src, base_url);
                    }
                }
            }
        }
        String::new()
    }

    async fn first_link<B: BrowserTrait>(&self, browser: &B, element: &B::Element) -> String {
        let links = match browser.descendants(element, "a").await {
            Ok(links) => links,
            Err(_) => return String::new(),
        };

        for link in &links {
            if let Ok(Some(href)) = browser.element_attribute(link, "href").await {
                if looks_absolute_link(&href) {
                    return href;
                }
            }
        }
        String::new()
    }
}

/// First line that is long enough and is not itself a price.
fn name_from_lines(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|line| line.chars().count() > 3 && !looks_like_price_line(line))
        .map(|line| truncate_chars(line, MAX_NAME_CHARS))
}

/// Text ahead of the amount on a line like `"Yaourt nature 1.250 DT"`.
fn name_from_price_line(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .filter(|line| looks_like_price_line(line))
        .find_map(|line| price_line_prefix(line))
        .map(|prefix| truncate_chars(prefix, MAX_NAME_CHARS))
}
