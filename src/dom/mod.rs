pub mod extractor;
pub mod locator;
pub mod patterns;

pub use extractor::RecordExtractor;
pub use locator::ElementLocator;
