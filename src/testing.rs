//! Fixture pages, profiles and an event recorder for offline tests.

use crate::scrape::{CancellationToken, EventSink, ScrapeEvent};
use crate::sites::{Category, SelectorHints, SiteProfile};
use crate::types::{ProductRecord, Severity};
use std::sync::Mutex;

/// A site at `https://shop.test` with three categories:
/// `fruits`, `epicerie` and `boissons`.
pub fn fixture_profile(containers: &[&str]) -> SiteProfile {
    SiteProfile {
        key: "fixture".to_string(),
        name: "Fixture Market".to_string(),
        base_url: "https://shop.test".to_string(),
        drive_url: None,
        city: None,
        url_template: "{base_url}/{path}".to_string(),
        categories: [
            ("fruits", "fruits-legumes"),
            ("epicerie", "epicerie"),
            ("boissons", "boissons"),
        ]
        .iter()
        .map(|(key, path)| Category {
            key: key.to_string(),
            path: path.to_string(),
        })
        .collect(),
        selectors: SelectorHints {
            container: containers.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
    }
}

pub fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}

/// `div.product-card` with the name, the price on its own line, a
/// root-relative image and an absolute product link.
pub fn product_card(name: &str, price: &str) -> String {
    let slug = slug(name);
    format!(
        concat!(
            r#"<div class="product-card"><h3>{name}</h3><p class="price">{price}</p>"#,
            r#"<img src="/img/{slug}.png" alt="{name}">"#,
            r#"<a href="https://shop.test/p/{slug}">Voir le produit</a></div>"#,
        ),
        name = name,
        price = price,
        slug = slug,
    )
}

pub fn product_page(cards: &[String]) -> String {
    format!(
        concat!(
            "<html><head><title>Fixture Market</title></head>",
            "<body><main class=\"listing\">{}</main></body></html>",
        ),
        cards.join("\n")
    )
}

/// Keeps every emitted event. Optionally cancels a token once a given
/// number of category batches has been seen.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ScrapeEvent>>,
    cancel_after: Option<(CancellationToken, usize)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_after(token: CancellationToken, batches: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cancel_after: Some((token, batches)),
        }
    }

    pub fn events(&self) -> Vec<ScrapeEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn logs(&self) -> Vec<(Severity, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ScrapeEvent::Log { message, severity } => Some((severity, message)),
                _ => None,
            })
            .collect()
    }

    pub fn category_batches(&self) -> Vec<(String, Vec<ProductRecord>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ScrapeEvent::CategoryRecords { category, records } => Some((category, records)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ScrapeEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event);

        if let Some((token, after)) = &self.cancel_after {
            let batches = events
                .iter()
                .filter(|e| matches!(e, ScrapeEvent::CategoryRecords { .. }))
                .count();
            if batches >= *after {
                token.cancel();
            }
        }
    }
}
