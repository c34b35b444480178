pub mod profile;
pub mod registry;

pub use profile::{Category, SelectorHints, SelectorRole, SiteProfile};
pub use registry::SiteRegistry;
