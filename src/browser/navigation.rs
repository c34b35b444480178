use crate::core::{BrowserTrait, ScrapeConfig};
use crate::errors::{Result, ScraperError};
use crate::utils::javascript::{JavaScriptRunner, READY_CHECK, SCROLL_TO_BOTTOM, SCROLL_TO_TOP};
use std::time::{Duration, Instant};
use tracing::debug;

pub struct NavigationManager;

impl NavigationManager {
    /// Wait until the page has a body, up to `timeout_ms`.
    pub async fn wait_for_dom_ready<B: BrowserTrait>(
        browser: &B,
        timeout_ms: u64,
        poll_ms: u64,
    ) -> Result<NavigationResult> {
        let start_time = Instant::now();
        let ready =
            JavaScriptRunner::wait_for_condition(browser, READY_CHECK, timeout_ms, poll_ms).await?;

        if !ready {
            return Err(ScraperError::TimeoutError(format!(
                "DOM not ready after {}ms",
                timeout_ms
            )));
        }

        Ok(NavigationResult {
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    /// Scroll to the bottom and back to the top a few times so lazy-loaded
    /// cards get rendered. Script failures are ignored.
    pub async fn trigger_lazy_load<B: BrowserTrait>(browser: &B, config: &ScrapeConfig) {
        for cycle in 0..config.scroll_cycles {
            if let Err(e) = browser.execute_script(SCROLL_TO_BOTTOM).await {
                debug!("scroll cycle {} failed: {}", cycle + 1, e);
            }
            pause(config.scroll_bottom_settle_ms).await;

            if let Err(e) = browser.execute_script(SCROLL_TO_TOP).await {
                debug!("scroll cycle {} failed: {}", cycle + 1, e);
            }
            pause(config.scroll_top_settle_ms).await;
        }

        pause(config.post_scroll_settle_ms).await;
    }
}

pub(crate) async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub duration_ms: u64,
}
