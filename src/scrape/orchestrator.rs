use crate::browser::navigation::{pause, NavigationManager};
use crate::core::{BrowserTrait, Config};
use crate::dom::{ElementLocator, RecordExtractor};
use crate::errors::Result;
use crate::scrape::cancel::CancellationToken;
use crate::scrape::events::{EventSink, ScrapeEvent};
use crate::scrape::session::{CategoryResult, RunState, ScrapeSession};
use crate::sites::{SiteProfile, SiteRegistry};
use crate::types::{CategoryTask, Severity};
use crate::utils::ScreenshotManager;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Title fragments that mark an error page.
const ERROR_TITLE_MARKERS: &[&str] = &["404", "erreur"];

#[derive(Debug, Clone, Default)]
pub struct ScrapeRequest {
    pub site: String,
    /// Category keys in processing order; empty means every category.
    pub categories: Vec<String>,
}

impl ScrapeRequest {
    pub fn new(site: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            site: site.into(),
            categories,
        }
    }
}

/// Runs one site's categories sequentially on a single browser session.
///
/// Faults inside a category only shrink that category's result. A launch
/// failure is the one error that ends a run early. The browser is closed on
/// every path out of [`run`](Self::run).
pub struct ScrapeOrchestrator<B: BrowserTrait> {
    browser: B,
    registry: Arc<SiteRegistry>,
    config: Config,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
    locator: ElementLocator,
    extractor: RecordExtractor,
}

impl<B: BrowserTrait> ScrapeOrchestrator<B> {
    pub fn new(
        browser: B,
        registry: Arc<SiteRegistry>,
        config: Config,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let locator = ElementLocator::new(config.scrape.locator.clone());
        Self {
            browser,
            registry,
            config,
            sink,
            cancel: CancellationToken::new(),
            locator,
            extractor: RecordExtractor::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub async fn run(&mut self, request: &ScrapeRequest) -> Result<ScrapeSession> {
        let registry = Arc::clone(&self.registry);
        let mut session = ScrapeSession::new(&request.site);

        let planned = registry
            .get(&request.site)
            .and_then(|profile| Ok((profile, profile.tasks(&request.categories)?)));
        let (profile, tasks) = match planned {
            Ok(planned) => planned,
            Err(e) => {
                session.finish(RunState::Failed);
                self.log(Severity::Error, format!("Cannot start run: {}", e));
                self.sink.emit(ScrapeEvent::RunFailed(e.to_string()));
                return Err(e);
            }
        };

        session.start();
        self.status("Running");
        self.log(
            Severity::Info,
            format!(
                "Starting {} ({} categories, run {})",
                profile.name,
                tasks.len(),
                session.id
            ),
        );

        if let Err(e) = self.browser.launch(&self.config).await {
            self.release().await;
            session.finish(RunState::Failed);
            self.log(Severity::Error, format!("Browser setup failed: {}", e));
            self.status("Failed");
            self.sink.emit(ScrapeEvent::RunFailed(e.to_string()));
            return Err(e);
        }

        let state = self.run_categories(profile, &tasks, &mut session).await;
        self.release().await;
        session.finish(state);

        self.sink.emit(ScrapeEvent::Progress {
            done: tasks.len(),
            total: tasks.len(),
        });
        self.summarize(&session);
        self.status(match state {
            RunState::Stopped => "Stopped",
            _ => "Done",
        });
        self.sink.emit(ScrapeEvent::RunFinished {
            records: session.records(),
            state,
        });

        Ok(session)
    }

    async fn run_categories(
        &mut self,
        profile: &SiteProfile,
        tasks: &[CategoryTask],
        session: &mut ScrapeSession,
    ) -> RunState {
        let total = tasks.len();

        for (index, task) in tasks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                self.log(
                    Severity::Warning,
                    format!("Stopped before category '{}'", task.category_key),
                );
                return RunState::Stopped;
            }

            self.sink.emit(ScrapeEvent::Progress { done: index, total });
            self.status(&format!(
                "Scraping {} ({}/{})",
                task.category_key,
                index + 1,
                total
            ));

            let result = self.scrape_category(profile, task).await;
            self.sink.emit(ScrapeEvent::CategoryRecords {
                category: task.category_key.clone(),
                records: result.records.clone(),
            });
            session.push(result);

            if index + 1 < total && !self.cancel.is_cancelled() {
                pause(self.config.scrape.inter_category_delay_ms).await;
            }
        }

        if self.cancel.is_cancelled() {
            RunState::Stopped
        } else {
            RunState::Completed
        }
    }

    async fn scrape_category(&self, profile: &SiteProfile, task: &CategoryTask) -> CategoryResult {
        let mut result = CategoryResult::empty(&task.category_key);

        let url = match profile.category_url(&task.path) {
            Ok(url) => url,
            Err(e) => {
                self.log(Severity::Error, format!("No URL for '{}': {}", task.category_key, e));
                return result;
            }
        };
        result.url = Some(url.clone());

        self.log(Severity::Info, format!("Navigating to {}", url));
        if let Err(e) = self.browser.navigate(&url).await {
            self.log(
                Severity::Error,
                format!("Navigation failed for '{}': {}", task.category_key, e),
            );
            return result;
        }
        pause(self.config.scrape.initial_settle_ms).await;

        if let Ok(title) = self.browser.get_title().await {
            let lowered = title.to_lowercase();
            if ERROR_TITLE_MARKERS.iter().any(|m| lowered.contains(m)) {
                self.log(
                    Severity::Warning,
                    format!("Error page for '{}': {}", task.category_key, title),
                );
                return result;
            }
        }

        let scrape = &self.config.scrape;
        if let Err(e) = NavigationManager::wait_for_dom_ready(
            &self.browser,
            scrape.ready_timeout_ms,
            scrape.ready_poll_ms,
        )
        .await
        {
            self.log(Severity::Warning, format!("{}, continuing", e));
        }

        NavigationManager::trigger_lazy_load(&self.browser, scrape).await;

        let elements = self.locator.locate(&self.browser, profile).await;
        result.located = elements.len();

        if elements.is_empty() {
            self.log(
                Severity::Warning,
                format!("No product elements found for '{}'", task.category_key),
            );
            match ScreenshotManager::capture_diagnostic(
                &self.browser,
                &self.config.artifacts.screenshot_dir,
                &profile.key,
                &task.category_key,
            )
            .await
            {
                Ok(path) => {
                    self.log(Severity::Info, format!("Screenshot saved: {}", path.display()));
                    result.screenshot = Some(path);
                }
                Err(e) => self.log(Severity::Warning, format!("Screenshot failed: {}", e)),
            }
            return result;
        }

        self.log(
            Severity::Info,
            format!("{} candidate elements found", elements.len()),
        );

        for element in elements.iter().take(scrape.max_elements_per_category) {
            if let Some(record) = self.extractor.extract(&self.browser, element, profile).await {
                result
                    .records
                    .push(record.tagged(&profile.name, &task.category_key));
                if result.records.len() % 10 == 0 {
                    self.log(
                        Severity::Info,
                        format!("{} products extracted...", result.records.len()),
                    );
                }
            }
        }

        self.log(
            Severity::Success,
            format!(
                "{} products extracted from '{}'",
                result.records.len(),
                task.category_key
            ),
        );
        result
    }

    fn summarize(&self, session: &ScrapeSession) {
        let total = session.record_count();
        if total == 0 {
            self.log(Severity::Warning, "No products collected".to_string());
            return;
        }

        self.log(Severity::Success, format!("{} products collected", total));
        for result in &session.results {
            if let Some(example) = result.records.first() {
                self.log(
                    Severity::Info,
                    format!(
                        "{}: {} products, e.g. {}",
                        result.category,
                        result.records.len(),
                        example.name
                    ),
                );
            }
        }
    }

    async fn release(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("closing browser failed: {}", e);
        }
    }

    fn status(&self, text: &str) {
        self.sink.emit(ScrapeEvent::StatusChanged(text.to_string()));
    }

    fn log(&self, severity: Severity, message: String) {
        match severity {
            Severity::Info | Severity::Success => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
        self.sink.emit(ScrapeEvent::Log { message, severity });
    }
}

impl<B: BrowserTrait + 'static> ScrapeOrchestrator<B> {
    /// Run on a background task. The returned token stops the run at the
    /// next category boundary.
    pub fn spawn(
        mut self,
        request: ScrapeRequest,
    ) -> (JoinHandle<Result<ScrapeSession>>, CancellationToken) {
        let token = self.cancellation_token();
        let handle = tokio::spawn(async move { self.run(&request).await });
        (handle, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StaticBrowser;
    use crate::errors::ScraperError;
    use crate::testing::{fixture_profile, product_card, product_page, RecordingSink};
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("shelf-scout-test-{}", uuid::Uuid::new_v4()))
    }

    fn instant_config() -> Config {
        let mut config = Config::instant();
        config.artifacts.screenshot_dir = scratch_dir();
        config
    }

    fn registry() -> Arc<SiteRegistry> {
        Arc::new(SiteRegistry::new(vec![fixture_profile(&["div.product-card"])]).unwrap())
    }

    fn page_with(count: usize) -> String {
        let cards: Vec<String> = (0..count)
            .map(|i| product_card(&format!("Produit {}", "x".repeat(i + 1)), "4.500 DT"))
            .collect();
        product_page(&cards)
    }

    fn all_categories() -> ScrapeRequest {
        ScrapeRequest::new("fixture", vec![])
    }

    fn full_shop() -> StaticBrowser {
        StaticBrowser::new()
            .with_page("https://shop.test/fruits-legumes", page_with(3))
            .with_page("https://shop.test/epicerie", page_with(2))
            .with_page("https://shop.test/boissons", page_with(4))
    }

    #[tokio::test]
    async fn completed_run_tags_every_record() {
        let sink = Arc::new(RecordingSink::new());
        let mut orchestrator =
            ScrapeOrchestrator::new(full_shop(), registry(), instant_config(), sink.clone());

        let session = orchestrator.run(&all_categories()).await.unwrap();
        assert_eq!(session.state, RunState::Completed);
        assert_eq!(session.results.len(), 3);
        assert_eq!(session.record_count(), 9);
        assert!(session
            .records()
            .iter()
            .all(|r| r.supermarket == "Fixture Market" && !r.category.is_empty()));
        assert_eq!(session.results[2].records[0].category, "boissons");

        let activity = orchestrator.browser().activity().snapshot();
        assert_eq!(activity.launches, 1);
        assert_eq!(activity.closes, 1);

        let events = sink.events();
        assert!(matches!(
            events.last(),
            Some(ScrapeEvent::RunFinished { records, state: RunState::Completed })
                if records.len() == 9
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, ScrapeEvent::Progress { done: 3, total: 3 })));
    }

    #[tokio::test]
    async fn cancellation_before_second_category_stops_the_run() {
        let token = CancellationToken::new();
        // cancels as soon as the first category batch is emitted
        let sink = Arc::new(RecordingSink::cancelling_after(token.clone(), 1));
        let mut orchestrator =
            ScrapeOrchestrator::new(full_shop(), registry(), instant_config(), sink.clone())
                .with_cancellation(token);

        let session = orchestrator.run(&all_categories()).await.unwrap();
        assert_eq!(session.state, RunState::Stopped);
        assert_eq!(session.results.len(), 1);
        assert_eq!(session.results[0].category, "fruits");
        assert_eq!(orchestrator.browser().activity().snapshot().closes, 1);
        assert_eq!(sink.category_batches().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_before_start_processes_nothing() {
        let sink = Arc::new(RecordingSink::new());
        let mut orchestrator =
            ScrapeOrchestrator::new(full_shop(), registry(), instant_config(), sink.clone());
        orchestrator.cancellation_token().cancel();

        let session = orchestrator.run(&all_categories()).await.unwrap();
        assert_eq!(session.state, RunState::Stopped);
        assert!(session.results.is_empty());
        assert!(orchestrator.browser().activity().snapshot().navigations.is_empty());
    }

    #[tokio::test]
    async fn empty_category_still_reports_and_takes_a_screenshot() {
        let browser = StaticBrowser::new().with_page(
            "https://shop.test/epicerie",
            "<html><head><title>Epicerie</title></head><body><p>Rien ici</p></body></html>",
        );
        let sink = Arc::new(RecordingSink::new());
        let config = instant_config();
        let screenshot_dir = config.artifacts.screenshot_dir.clone();
        let mut orchestrator = ScrapeOrchestrator::new(browser, registry(), config, sink.clone());

        let session = orchestrator
            .run(&ScrapeRequest::new("fixture", vec!["epicerie".to_string()]))
            .await
            .unwrap();

        assert_eq!(session.state, RunState::Completed);
        let result = &session.results[0];
        assert!(result.records.is_empty());
        let shot = result.screenshot.as_ref().unwrap();
        assert!(shot.starts_with(&screenshot_dir));
        assert!(shot.exists());
        assert_eq!(orchestrator.browser().activity().snapshot().screenshots, 1);

        let batches = sink.category_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, "epicerie");
        assert!(batches[0].1.is_empty());

        let _ = std::fs::remove_dir_all(screenshot_dir);
    }

    #[tokio::test]
    async fn unwritable_screenshot_dir_is_only_logged() {
        let browser = StaticBrowser::new().with_page(
            "https://shop.test/epicerie",
            "<html><head><title>Epicerie</title></head><body><p>Rien ici</p></body></html>",
        );
        // a plain file where the screenshot directory should be created
        let blocker = scratch_dir();
        std::fs::write(&blocker, b"not a directory").unwrap();
        let mut config = instant_config();
        config.artifacts.screenshot_dir = blocker.join("shots");

        let sink = Arc::new(RecordingSink::new());
        let mut orchestrator = ScrapeOrchestrator::new(browser, registry(), config, sink.clone());
        let session = orchestrator
            .run(&ScrapeRequest::new("fixture", vec!["epicerie".to_string()]))
            .await
            .unwrap();

        assert_eq!(session.state, RunState::Completed);
        assert!(session.results[0].screenshot.is_none());
        assert!(session.results[0].records.is_empty());
        assert_eq!(orchestrator.browser().activity().snapshot().screenshots, 1);
        assert_eq!(orchestrator.browser().activity().snapshot().closes, 1);

        let batches = sink.category_batches();
        assert_eq!(batches.len(), 1);
        assert!(batches[0].1.is_empty());
        assert!(sink
            .logs()
            .iter()
            .any(|(severity, message)| *severity == Severity::Warning
                && message.starts_with("Screenshot failed")));
        assert!(matches!(
            sink.events().last(),
            Some(ScrapeEvent::RunFinished { state: RunState::Completed, .. })
        ));

        let _ = std::fs::remove_file(blocker);
    }

    #[tokio::test]
    async fn twelve_cards_yield_twelve_records() {
        let browser = StaticBrowser::new().with_page("https://shop.test/boissons", page_with(12));
        let sink = Arc::new(RecordingSink::new());
        let mut orchestrator = ScrapeOrchestrator::new(browser, registry(), instant_config(), sink);

        let session = orchestrator
            .run(&ScrapeRequest::new("fixture", vec!["boissons".to_string()]))
            .await
            .unwrap();
        let result = &session.results[0];
        assert_eq!(result.located, 12);
        assert_eq!(result.records.len(), 12);
        assert!(result
            .records
            .iter()
            .all(|r| (2..=100).contains(&r.name.chars().count())));
        assert_eq!(result.records[0].price, "4.500");
    }

    #[tokio::test]
    async fn extraction_is_capped_per_category() {
        let browser = StaticBrowser::new().with_page("https://shop.test/boissons", page_with(8));
        let mut config = instant_config();
        config.scrape.max_elements_per_category = 5;
        let mut orchestrator =
            ScrapeOrchestrator::new(browser, registry(), config, Arc::new(RecordingSink::new()));

        let session = orchestrator
            .run(&ScrapeRequest::new("fixture", vec!["boissons".to_string()]))
            .await
            .unwrap();
        assert_eq!(session.results[0].located, 8);
        assert_eq!(session.record_count(), 5);
    }

    #[tokio::test]
    async fn unreachable_and_error_pages_degrade_to_empty_results() {
        let browser = StaticBrowser::new()
            .with_page(
                "https://shop.test/epicerie",
                "<html><head><title>Erreur 404</title></head><body></body></html>",
            )
            .with_page("https://shop.test/boissons", page_with(2));
        let sink = Arc::new(RecordingSink::new());
        let mut orchestrator =
            ScrapeOrchestrator::new(browser, registry(), instant_config(), sink.clone());

        let session = orchestrator.run(&all_categories()).await.unwrap();
        assert_eq!(session.state, RunState::Completed);
        let counts: Vec<usize> = session.results.iter().map(|r| r.records.len()).collect();
        assert_eq!(counts, vec![0, 0, 2]);
        assert!(session.results[1].screenshot.is_none());
        assert!(sink
            .logs()
            .iter()
            .any(|(severity, message)| *severity == Severity::Error
                && message.contains("Navigation failed")));
    }

    #[tokio::test]
    async fn setup_failure_closes_and_fails_the_run() {
        let sink = Arc::new(RecordingSink::new());
        let mut orchestrator = ScrapeOrchestrator::new(
            StaticBrowser::new().failing_launch(),
            registry(),
            instant_config(),
            sink.clone(),
        );

        let err = orchestrator.run(&all_categories()).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(orchestrator.browser().activity().snapshot().closes, 1);
        assert!(matches!(sink.events().last(), Some(ScrapeEvent::RunFailed(_))));
        assert!(sink.category_batches().is_empty());
    }

    #[tokio::test]
    async fn unknown_category_is_rejected_before_launch() {
        let sink = Arc::new(RecordingSink::new());
        let mut orchestrator =
            ScrapeOrchestrator::new(full_shop(), registry(), instant_config(), sink.clone());

        let err = orchestrator
            .run(&ScrapeRequest::new("fixture", vec!["jouets".to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::UnknownCategory { .. }));
        assert_eq!(orchestrator.browser().activity().snapshot().launches, 0);
    }

    #[tokio::test]
    async fn spawned_run_reports_through_a_channel() {
        let (sink, mut rx) = crate::scrape::events::channel();
        let orchestrator = ScrapeOrchestrator::new(full_shop(), registry(), instant_config(), sink);

        let (handle, _token) = orchestrator.spawn(all_categories());
        let session = handle.await.unwrap().unwrap();
        assert_eq!(session.record_count(), 9);

        let mut batches = 0;
        while let Ok(event) = rx.try_recv() {
            if let ScrapeEvent::CategoryRecords { .. } = event {
                batches += 1;
            }
        }
        assert_eq!(batches, 3);
    }
}
