use crate::core::{BrowserTrait, Config, ElementHandle};
use crate::errors::{Result, ScraperError};
use crate::utils::javascript::{js_string, MASK_WEBDRIVER};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// Page-side element registry. Elements handed to Rust are kept in
/// `window.__shelfScout` and addressed by index; the registry disappears with
/// the document, which is what makes handles stale after navigation.
const REGISTRY_PRELUDE: &str = r#"
    const registry = window.__shelfScout
        || (window.__shelfScout = { nodes: [], ids: new WeakMap() });
    const register = (el) => {
        let id = registry.ids.get(el);
        if (id === undefined) {
            id = registry.nodes.length;
            registry.nodes.push(el);
            registry.ids.set(el, id);
        }
        return id;
    };
    const lookup = (id) => {
        const el = registry.nodes[id];
        if (!el) {
            throw new Error('stale element ' + id);
        }
        return el;
    };
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChromeElement(pub u64);

impl ElementHandle for ChromeElement {
    fn identity(&self) -> Option<u64> {
        Some(self.0)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: Option<T>,
    error: Option<String>,
}

/// Chrome browser implementation
pub struct ChromeBrowser {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeBrowser {
    pub fn new() -> Self {
        Self {
            browser: None,
            tab: None,
        }
    }

    fn tab(&self) -> Result<&Arc<Tab>> {
        self.tab.as_ref().ok_or(ScraperError::BrowserNotLaunched)
    }

    /// Run `body` (a function body ending in `return`) with the registry in
    /// scope and decode its JSON result.
    fn registry_call<T: DeserializeOwned + Default>(&self, body: &str) -> Result<T> {
        let script = format!(
            r#"
            (function() {{
                {REGISTRY_PRELUDE}
                try {{
                    return JSON.stringify({{ ok: (function() {{ {body} }})() }});
                }} catch (error) {{
                    return JSON.stringify({{ error: String(error) }});
                }}
            }})()
            "#
        );

        let result = self
            .tab()?
            .evaluate(&script, false)
            .map_err(|e| ScraperError::JavaScriptFailed(e.to_string()))?;

        let raw = match result.value {
            Some(Value::String(raw)) => raw,
            other => {
                return Err(ScraperError::JavaScriptFailed(format!(
                    "unexpected script result: {:?}",
                    other
                )))
            }
        };

        let envelope: Envelope<T> = serde_json::from_str(&raw)?;
        match envelope.error {
            Some(message) if message.contains("SyntaxError") => {
                Err(ScraperError::InvalidSelector(message))
            }
            Some(message) => Err(ScraperError::ElementNotFound(message)),
            None => Ok(envelope.ok.unwrap_or_default()),
        }
    }
}

impl Default for ChromeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserTrait for ChromeBrowser {
    type Element = ChromeElement;

    async fn launch(&mut self, config: &Config) -> Result<()> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.browser.viewport.width, config.browser.viewport.height
        );

        let user_agent_arg = config
            .browser
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--log-level=3"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        if config.browser.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }

        for arg in &config.browser.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.browser.headless)
            .args(args)
            .build()
            .map_err(|e| ScraperError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| ScraperError::LaunchFailed(e.to_string()))?;

        // keep the process handle before anything else can fail, so close()
        // still tears it down
        let tab = browser.new_tab();
        self.browser = Some(browser);
        let tab = tab.map_err(|e| ScraperError::LaunchFailed(e.to_string()))?;

        tab.set_default_timeout(Duration::from_millis(config.browser.page_load_timeout_ms));
        self.tab = Some(tab);
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let tab = self.tab()?;
        tab.navigate_to(url)
            .map_err(|e| ScraperError::NavigationFailed(e.to_string()))?;

        tab.wait_until_navigated()
            .map_err(|e| ScraperError::NavigationFailed(e.to_string()))?;

        // best-effort: some pages freeze navigator
        let _ = tab.evaluate(MASK_WEBDRIVER, false);
        Ok(())
    }

    async fn execute_script(&self, script: &str) -> Result<Value> {
        let result = self
            .tab()?
            .evaluate(script, false)
            .map_err(|e| ScraperError::JavaScriptFailed(e.to_string()))?;

        Ok(result.value.unwrap_or(Value::Null))
    }

    async fn get_title(&self) -> Result<String> {
        Ok(self.tab()?.get_title()?)
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ChromeElement>> {
        let body = format!(
            "return Array.from(document.querySelectorAll({})).map(register);",
            js_string(selector)?
        );
        let ids: Vec<u64> = self.registry_call(&body)?;
        Ok(ids.into_iter().map(ChromeElement).collect())
    }

    async fn element_text(&self, element: &ChromeElement) -> Result<String> {
        let body = format!("return lookup({}).innerText || '';", element.0);
        self.registry_call(&body)
    }

    async fn element_attribute(
        &self,
        element: &ChromeElement,
        name: &str,
    ) -> Result<Option<String>> {
        let body = format!(
            r#"
            const el = lookup({id});
            const name = {name};
            if (name in el && typeof el[name] === 'string') {{
                return el[name];
            }}
            return el.getAttribute(name);
            "#,
            id = element.0,
            name = js_string(name)?
        );
        self.registry_call(&body)
    }

    async fn descendants(&self, element: &ChromeElement, tag: &str) -> Result<Vec<ChromeElement>> {
        let body = format!(
            "return Array.from(lookup({}).getElementsByTagName({})).map(register);",
            element.0,
            js_string(tag)?
        );
        let ids: Vec<u64> = self.registry_call(&body)?;
        Ok(ids.into_iter().map(ChromeElement).collect())
    }

    async fn take_screenshot(&self) -> Result<Vec<u8>> {
        let screenshot = self
            .tab()?
            .capture_screenshot(
                headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption::Png,
                None,
                None,
                true,
            )
            .map_err(|e| ScraperError::ScreenshotFailed(e.to_string()))?;

        Ok(screenshot)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(tab) = self.tab.take() {
            let _ = tab.close(false);
        }
        // dropping the Browser kills the Chrome process
        self.browser = None;
        Ok(())
    }
}
