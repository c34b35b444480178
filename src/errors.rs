use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser not launched")]
    BrowserNotLaunched,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Unknown site: {0}")]
    UnknownSite(String),

    #[error("Unknown category '{category}' for site '{site}'")]
    UnknownCategory { site: String, category: String },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chrome error: {0}")]
    ChromeError(String),
}

pub type Result<T> = std::result::Result<T, ScraperError>;

/// Where a failure sits in the run's error taxonomy. Only `Setup` ends a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Setup,
    Navigation,
    Timeout,
    Element,
    Persistence,
    Configuration,
}

impl ScraperError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScraperError::LaunchFailed(_) | ScraperError::BrowserNotLaunched => FailureKind::Setup,
            ScraperError::NavigationFailed(_) | ScraperError::ChromeError(_) => {
                FailureKind::Navigation
            }
            ScraperError::TimeoutError(_) => FailureKind::Timeout,
            ScraperError::ElementNotFound(_)
            | ScraperError::JavaScriptFailed(_)
            | ScraperError::InvalidSelector(_) => FailureKind::Element,
            ScraperError::ScreenshotFailed(_)
            | ScraperError::IoError(_)
            | ScraperError::SerializationError(_) => FailureKind::Persistence,
            ScraperError::UnknownSite(_)
            | ScraperError::UnknownCategory { .. }
            | ScraperError::ConfigurationError(_) => FailureKind::Configuration,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == FailureKind::Setup
    }
}

// headless_chrome reports everything as anyhow::Error
impl From<anyhow::Error> for ScraperError {
    fn from(err: anyhow::Error) -> Self {
        ScraperError::ChromeError(err.to_string())
    }
}
