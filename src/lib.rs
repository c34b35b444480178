pub mod analysis;
pub mod browser;
pub mod core;
pub mod dom;
pub mod errors;
pub mod scrape;
pub mod sites;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod utils;

pub use analysis::{AnalysisReport, PageAnalyzer};
#[cfg(feature = "chrome")]
pub use browser::ChromeBrowser;
pub use browser::StaticBrowser;
pub use crate::core::{BrowserTrait, Config, ElementHandle};
pub use dom::{ElementLocator, RecordExtractor};
pub use errors::{FailureKind, Result, ScraperError};
pub use scrape::{
    CancellationToken, EventSink, RunState, ScrapeEvent, ScrapeOrchestrator, ScrapeRequest,
    ScrapeSession,
};
pub use sites::{SiteProfile, SiteRegistry};
pub use types::*;
