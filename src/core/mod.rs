pub mod browser;
pub mod config;

pub use browser::{BrowserTrait, ElementHandle};
pub use config::{
    AnalyzerConfig, ArtifactConfig, BrowserConfig, Config, LocatorConfig, ScrapeConfig, Viewport,
};
