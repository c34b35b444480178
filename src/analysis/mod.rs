pub mod analyzer;
pub mod report;

pub use analyzer::PageAnalyzer;
pub use report::{AnalysisReport, ImageSample, ProductCandidate, StructureSurvey};
