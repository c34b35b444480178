#[cfg(feature = "chrome")]
pub mod chrome;
pub mod navigation;
pub mod static_page;

#[cfg(feature = "chrome")]
pub use chrome::{ChromeBrowser, ChromeElement};
pub use navigation::{NavigationManager, NavigationResult};
pub use static_page::{ActivityLog, StaticActivity, StaticBrowser, StaticElement};
