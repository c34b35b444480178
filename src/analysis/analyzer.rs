use crate::analysis::report::{AnalysisReport, ImageSample, ProductCandidate, StructureSurvey};
use crate::browser::navigation::pause;
use crate::core::{AnalyzerConfig, ArtifactConfig, BrowserTrait, Config};
use crate::dom::patterns::{
    contains_any, has_analyzer_price, truncate_chars, PRODUCT_CLASS_PATTERNS, SUGGESTION_KEYWORDS,
};
use crate::errors::{Result, ScraperError};
use crate::sites::SiteProfile;
use crate::types::SelectorSuggestion;
use crate::utils::screenshot::artifact_path;
use crate::utils::ScreenshotManager;
use chrono::Local;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

const SURVEY_TAGS: &[&str] = &["div", "article", "section", "li"];

const MIN_CANDIDATE_TEXT: usize = 20;
const MAX_CANDIDATE_TEXT: usize = 200;
const IMAGES_PER_CANDIDATE: usize = 2;

/// Inspects one page and proposes container selectors for its profile.
///
/// Nothing here changes a profile; suggestions are raw strings for a human
/// to review.
pub struct PageAnalyzer {
    config: AnalyzerConfig,
    artifacts: ArtifactConfig,
}

impl PageAnalyzer {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.analyzer.clone(),
            artifacts: config.artifacts.clone(),
        }
    }

    /// The URL to analyze: `url` when given, otherwise the first requested
    /// category (or the site's first category) through the URL template.
    pub fn resolve_url(
        profile: &SiteProfile,
        url: Option<&str>,
        category: Option<&str>,
    ) -> Result<String> {
        if let Some(url) = url {
            return Ok(url.to_string());
        }
        let category = match category {
            Some(key) => profile
                .category(key)
                .ok_or_else(|| ScraperError::UnknownCategory {
                    site: profile.key.clone(),
                    category: key.to_string(),
                })?,
            None => profile.categories.first().ok_or_else(|| {
                ScraperError::ConfigurationError(format!(
                    "site '{}' has no categories",
                    profile.key
                ))
            })?,
        };
        profile.category_url(&category.path)
    }

    /// Launch `browser`, analyze `url`, and close the browser whatever
    /// happened.
    pub async fn run<B: BrowserTrait>(
        &self,
        browser: &mut B,
        config: &Config,
        profile: &SiteProfile,
        url: &str,
    ) -> Result<AnalysisReport> {
        let mut launch_config = config.clone();
        launch_config.browser.headless = self.config.headless;

        let outcome = match browser.launch(&launch_config).await {
            Ok(()) => Ok(self.analyze(&*browser, profile, url).await),
            Err(e) => Err(e),
        };

        if let Err(e) = browser.close().await {
            warn!("closing browser failed: {}", e);
        }
        outcome
    }

    /// Analyze `url` on an already running browser.
    ///
    /// An unreachable page yields an empty report; the screenshot and the
    /// report file are still attempted.
    pub async fn analyze<B: BrowserTrait>(
        &self,
        browser: &B,
        profile: &SiteProfile,
        url: &str,
    ) -> AnalysisReport {
        info!("analyzing {}", url);
        let navigation_error = match browser.navigate(url).await {
            Ok(()) => {
                pause(self.config.settle_ms).await;
                None
            }
            Err(e) => {
                warn!("could not load {}: {}", url, e);
                Some(e.to_string())
            }
        };

        let (survey, candidates, suggestions) = if navigation_error.is_none() {
            let survey = self.survey(browser).await;
            let divs = browser.query_all("div").await.unwrap_or_default();

            let candidates = self.candidates(browser, &divs).await;
            info!("{} potential products", candidates.len());

            let suggestions = self.suggestions(browser, &divs).await;
            for suggestion in &suggestions {
                info!("{}: {} occurrences", suggestion.selector, suggestion.occurrences);
            }
            (survey, candidates, suggestions)
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };

        let screenshot_dir = &self.artifacts.screenshot_dir;
        let screenshot =
            match ScreenshotManager::capture_analysis(browser, screenshot_dir, &profile.key).await {
                Ok(path) => {
                    info!("screenshot saved: {}", path.display());
                    Some(path)
                }
                Err(e) => {
                    warn!("analysis screenshot failed: {}", e);
                    None
                }
            };

        let mut report = AnalysisReport {
            url: url.to_string(),
            site_key: profile.key.clone(),
            site_name: profile.name.clone(),
            analyzed_at: Local::now(),
            navigation_error,
            survey,
            candidates,
            suggestions,
            screenshot,
            report_path: None,
        };

        match self.write_report(&report).await {
            Ok(path) => {
                info!("report saved: {}", path.display());
                report.report_path = Some(path);
            }
            Err(e) => warn!("analysis report not written: {}", e),
        }

        report
    }

    async fn survey<B: BrowserTrait>(&self, browser: &B) -> Vec<StructureSurvey> {
        let mut surveys = Vec::with_capacity(SURVEY_TAGS.len());
        for tag in SURVEY_TAGS {
            let elements = browser.query_all(tag).await.unwrap_or_default();
            let mut sample_classes = Vec::new();
            for element in elements.iter().take(self.config.survey_sample) {
                if let Ok(Some(classes)) = browser.element_attribute(element, "class").await {
                    if !classes.trim().is_empty() {
                        sample_classes.push(classes);
                    }
                }
            }
            surveys.push(StructureSurvey {
                tag: tag.to_string(),
                count: elements.len(),
                sample_classes,
            });
        }
        surveys
    }

    async fn candidates<B: BrowserTrait>(
        &self,
        browser: &B,
        divs: &[B::Element],
    ) -> Vec<ProductCandidate> {
        let mut found = Vec::new();

        for div in divs.iter().take(self.config.candidate_scan_limit) {
            let classes = browser
                .element_attribute(div, "class")
                .await
                .ok()
                .flatten()
                .unwrap_or_default();
            let text = match browser.element_text(div).await {
                Ok(text) => text.trim().to_string(),
                Err(_) => continue,
            };

            let matched_class =
                !classes.is_empty() && contains_any(&classes, PRODUCT_CLASS_PATTERNS);
            let length = text.chars().count();
            let matched_price = length > MIN_CANDIDATE_TEXT
                && length < MAX_CANDIDATE_TEXT
                && has_analyzer_price(&text);

            if !(matched_class || matched_price) {
                continue;
            }

            let mut candidate = ProductCandidate {
                classes,
                text,
                matched_class,
                matched_price,
                outer_html: None,
                images: Vec::new(),
            };
            if found.len() < self.config.detailed_candidates {
                self.detail(browser, div, &mut candidate).await;
            }
            found.push(candidate);
        }

        found
    }

    async fn detail<B: BrowserTrait>(
        &self,
        browser: &B,
        element: &B::Element,
        candidate: &mut ProductCandidate,
    ) {
        if let Ok(Some(html)) = browser.element_attribute(element, "outerHTML").await {
            candidate.outer_html = Some(truncate_chars(&html, self.config.outer_html_chars));
        }
        if let Ok(images) = browser.descendants(element, "img").await {
            for image in images.iter().take(IMAGES_PER_CANDIDATE) {
                candidate.images.push(ImageSample {
                    src: browser.element_attribute(image, "src").await.ok().flatten(),
                    alt: browser.element_attribute(image, "alt").await.ok().flatten(),
                });
            }
        }
    }

    /// Most frequent class tokens that contain a product keyword, as `.class`
    /// selectors. Ties keep first-seen order.
    async fn suggestions<B: BrowserTrait>(
        &self,
        browser: &B,
        divs: &[B::Element],
    ) -> Vec<SelectorSuggestion> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for div in divs.iter().take(self.config.class_scan_limit) {
            let classes = match browser.element_attribute(div, "class").await {
                Ok(Some(classes)) => classes,
                _ => continue,
            };
            for class in classes.split_whitespace() {
                match index.get(class) {
                    Some(&i) => counts[i].1 += 1,
                    None => {
                        index.insert(class.to_string(), counts.len());
                        counts.push((class.to_string(), 1));
                    }
                }
            }
        }

        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
            .into_iter()
            .take(self.config.top_classes)
            .filter(|(class, _)| contains_any(class, SUGGESTION_KEYWORDS))
            .map(|(class, occurrences)| SelectorSuggestion {
                selector: format!(".{}", class),
                occurrences,
            })
            .collect()
    }

    async fn write_report(&self, report: &AnalysisReport) -> Result<PathBuf> {
        let dir = &self.artifacts.report_dir;
        tokio::fs::create_dir_all(dir).await?;
        let path = artifact_path(dir, &["analysis", &report.site_key], "txt");
        tokio::fs::write(&path, report.render()).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StaticBrowser;
    use crate::testing::{fixture_profile, product_card, product_page};

    fn scratch_config() -> Config {
        let root = std::env::temp_dir()
            .join(format!("shelf-scout-analysis-{}", uuid::Uuid::new_v4()));
        let mut config = Config::instant();
        config.artifacts.screenshot_dir = root.join("shots");
        config.artifacts.report_dir = root.join("reports");
        config
    }

    fn shop_page() -> String {
        let mut cards: Vec<String> = ["Lait entier", "Beurre doux", "Oeufs frais", "Miel de thym"]
            .iter()
            .map(|name| product_card(name, "3.450 DT"))
            .collect();
        cards.push(r#"<div class="shop-banner promo">Livraison</div>"#.to_string());
        product_page(&cards)
    }

    #[tokio::test]
    async fn product_classes_are_suggested_by_frequency() {
        let config = scratch_config();
        let mut browser = StaticBrowser::new().with_page("https://shop.test/epicerie", shop_page());
        let profile = fixture_profile(&[]);

        let report = PageAnalyzer::new(&config)
            .run(&mut browser, &config, &profile, "https://shop.test/epicerie")
            .await
            .unwrap();

        assert_eq!(report.selectors(), vec![".product-card", ".shop-banner"]);
        assert_eq!(report.suggestions[0].occurrences, 4);

        assert_eq!(report.candidates.len(), 4);
        assert!(report.candidates.iter().all(|c| c.matched_class && c.matched_price));
        let detailed: Vec<_> = report
            .candidates
            .iter()
            .filter(|c| c.outer_html.is_some())
            .collect();
        assert_eq!(detailed.len(), 3);
        assert!(detailed[0]
            .outer_html
            .as_deref()
            .unwrap()
            .starts_with(r#"<div class="product-card">"#));
        assert_eq!(detailed[0].images[0].alt.as_deref(), Some("Lait entier"));

        let div_survey = &report.survey[0];
        assert_eq!(div_survey.tag, "div");
        assert_eq!(div_survey.count, 5);
        assert_eq!(div_survey.sample_classes.len(), 3);

        assert!(report.screenshot.as_ref().unwrap().exists());
        let written = std::fs::read_to_string(report.report_path.as_ref().unwrap()).unwrap();
        assert!(written.contains("1. .product-card (4 occurrences)"));

        assert_eq!(browser.activity().snapshot().closes, 1);
        let _ = std::fs::remove_dir_all(config.artifacts.report_dir.parent().unwrap());
    }

    #[tokio::test]
    async fn page_without_product_markup_yields_no_suggestions() {
        let config = scratch_config();
        let mut browser = StaticBrowser::new().with_page(
            "https://shop.test/vide",
            concat!(
                r#"<html><body><div class="wrapper">"#,
                r#"<div class="row">Bienvenue</div></div></body></html>"#,
            ),
        );

        let report = PageAnalyzer::new(&config)
            .run(&mut browser, &config, &fixture_profile(&[]), "https://shop.test/vide")
            .await
            .unwrap();

        assert!(report.suggestions.is_empty());
        assert!(report.candidates.is_empty());
        assert!(report.render().contains("TIPS:"));
        let _ = std::fs::remove_dir_all(config.artifacts.report_dir.parent().unwrap());
    }

    #[tokio::test]
    async fn unreachable_page_yields_an_empty_report() {
        let config = scratch_config();
        let mut browser = StaticBrowser::new();

        let report = PageAnalyzer::new(&config)
            .run(&mut browser, &config, &fixture_profile(&[]), "https://shop.test/absent")
            .await
            .unwrap();

        assert!(report.navigation_error.is_some());
        assert!(report.survey.is_empty());
        assert!(report.candidates.is_empty());
        assert!(report.suggestions.is_empty());
        assert!(report.screenshot.is_none());

        let activity = browser.activity().snapshot();
        assert_eq!(activity.screenshots, 1);
        assert_eq!(activity.closes, 1);

        let written = std::fs::read_to_string(report.report_path.as_ref().unwrap()).unwrap();
        assert!(written.contains("Could not load the page"));
        assert!(written.contains("TIPS:"));
        let _ = std::fs::remove_dir_all(config.artifacts.report_dir.parent().unwrap());
    }

    #[tokio::test]
    async fn launch_failure_is_returned_after_closing() {
        let config = scratch_config();
        let mut browser = StaticBrowser::new().failing_launch();

        let result = PageAnalyzer::new(&config)
            .run(&mut browser, &config, &fixture_profile(&[]), "https://shop.test/absent")
            .await;

        assert!(matches!(result, Err(ScraperError::LaunchFailed(_))));
        assert_eq!(browser.activity().snapshot().closes, 1);
    }

    #[test]
    fn url_comes_from_the_template_when_not_given() {
        let profile = fixture_profile(&[]);
        assert_eq!(
            PageAnalyzer::resolve_url(&profile, None, Some("epicerie")).unwrap(),
            "https://shop.test/epicerie"
        );
        assert_eq!(
            PageAnalyzer::resolve_url(&profile, None, None).unwrap(),
            "https://shop.test/fruits-legumes"
        );
        assert_eq!(
            PageAnalyzer::resolve_url(&profile, Some("https://x.test/"), Some("epicerie")).unwrap(),
            "https://x.test/"
        );
        assert!(PageAnalyzer::resolve_url(&profile, None, Some("jouets")).is_err());
    }
}
