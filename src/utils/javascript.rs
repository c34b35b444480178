use crate::core::BrowserTrait;
use crate::errors::Result;
use serde_json::Value;
use std::time::Duration;

/// Minimal DOM-ready signal: the document has a body.
pub const READY_CHECK: &str = concat!(
    "(document.readyState === 'interactive' || document.readyState === 'complete')",
    " && !!document.body"
);

pub const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

pub const SCROLL_TO_TOP: &str = "window.scrollTo(0, 0);";

pub const MASK_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined })";

pub struct JavaScriptRunner;

impl JavaScriptRunner {
    /// Poll `condition` until it evaluates to `true`. Script errors while
    /// polling count as "not yet".
    pub async fn wait_for_condition<B: BrowserTrait>(
        browser: &B,
        condition: &str,
        timeout_ms: u64,
        poll_interval_ms: u64,
    ) -> Result<bool> {
        let start_time = std::time::Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let poll_interval = Duration::from_millis(poll_interval_ms.max(1));

        loop {
            if let Ok(Value::Bool(true)) = browser.execute_script(condition).await {
                return Ok(true);
            }
            if start_time.elapsed() >= timeout {
                return Ok(false);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Quote a Rust string as a JavaScript string literal.
pub fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(
            js_string(r#"a[href*='product'] "x""#).unwrap(),
            r#""a[href*='product'] \"x\"""#
        );
    }
}
