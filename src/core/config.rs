use crate::errors::{Result, ScraperError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub scrape: ScrapeConfig,
    pub analyzer: AnalyzerConfig,
    pub artifacts: ArtifactConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub disable_images: bool,
    pub args: Vec<String>,
    pub page_load_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Timing and cost bounds for one orchestrated run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub initial_settle_ms: u64,
    pub ready_timeout_ms: u64,
    pub ready_poll_ms: u64,
    pub scroll_cycles: u32,
    pub scroll_bottom_settle_ms: u64,
    pub scroll_top_settle_ms: u64,
    pub post_scroll_settle_ms: u64,
    pub inter_category_delay_ms: u64,
    pub max_elements_per_category: usize,
    pub locator: LocatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Below this many configured-selector matches, content sniffing kicks in.
    pub sniff_threshold: usize,
    pub sniff_scan_limit: usize,
    pub min_card_text: usize,
    pub max_card_text: usize,
    pub max_located: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub headless: bool,
    pub settle_ms: u64,
    pub survey_sample: usize,
    pub candidate_scan_limit: usize,
    pub detailed_candidates: usize,
    pub class_scan_limit: usize,
    pub top_classes: usize,
    pub outer_html_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub screenshot_dir: PathBuf,
    pub report_dir: PathBuf,
}

impl Config {
    /// Load a JSON config file; absent fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScraperError::ConfigurationError(format!("{}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Zero delays and short timeouts, for offline pages and tests.
    pub fn instant() -> Self {
        let mut config = Self::default();
        config.scrape.initial_settle_ms = 0;
        config.scrape.ready_timeout_ms = 50;
        config.scrape.ready_poll_ms = 5;
        config.scrape.scroll_bottom_settle_ms = 0;
        config.scrape.scroll_top_settle_ms = 0;
        config.scrape.post_scroll_settle_ms = 0;
        config.scrape.inter_category_delay_ms = 0;
        config.analyzer.settle_ms = 0;
        config
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            disable_images: false,
            args: vec![],
            page_load_timeout_ms: 30000,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            initial_settle_ms: 4000,
            ready_timeout_ms: 10000,
            ready_poll_ms: 250,
            scroll_cycles: 3,
            scroll_bottom_settle_ms: 2000,
            scroll_top_settle_ms: 1000,
            post_scroll_settle_ms: 2000,
            inter_category_delay_ms: 3000,
            max_elements_per_category: 100,
            locator: LocatorConfig::default(),
        }
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            sniff_threshold: 5,
            sniff_scan_limit: 300,
            min_card_text: 10,
            max_card_text: 500,
            max_located: 200,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            headless: false,
            settle_ms: 5000,
            survey_sample: 3,
            candidate_scan_limit: 100,
            detailed_candidates: 3,
            class_scan_limit: 200,
            top_classes: 20,
            outer_html_chars: 500,
        }
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: PathBuf::from("debug"),
            report_dir: PathBuf::from("analysis"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "scrape": { "inter_category_delay_ms": 500 } }"#).unwrap();
        assert_eq!(config.scrape.inter_category_delay_ms, 500);
        assert_eq!(config.scrape.max_elements_per_category, 100);
        assert_eq!(config.scrape.locator.max_located, 200);
        assert!(config.browser.headless);
        assert!(!config.analyzer.headless);
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = Config::from_file("/nonexistent/shelf-scout.json").unwrap_err();
        assert!(matches!(err, ScraperError::ConfigurationError(_)));
    }
}
