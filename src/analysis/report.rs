use crate::types::SelectorSuggestion;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write;
use std::path::PathBuf;

/// How many suggestions go into the ready-to-paste profile snippet.
const SNIPPET_SUGGESTIONS: usize = 5;

/// Element count and a few class lists for one tag.
#[derive(Debug, Clone, Serialize)]
pub struct StructureSurvey {
    pub tag: String,
    pub count: usize,
    pub sample_classes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageSample {
    pub src: Option<String>,
    pub alt: Option<String>,
}

/// A `div` that looks like it might hold a product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductCandidate {
    pub classes: String,
    pub text: String,
    pub matched_class: bool,
    pub matched_price: bool,
    /// Only filled for the first few candidates.
    pub outer_html: Option<String>,
    pub images: Vec<ImageSample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub url: String,
    pub site_key: String,
    pub site_name: String,
    pub analyzed_at: DateTime<Local>,
    /// Set when the page could not be loaded; everything found is then empty.
    pub navigation_error: Option<String>,
    pub survey: Vec<StructureSurvey>,
    pub candidates: Vec<ProductCandidate>,
    pub suggestions: Vec<SelectorSuggestion>,
    pub screenshot: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

impl AnalysisReport {
    pub fn selectors(&self) -> Vec<&str> {
        self.suggestions.iter().map(|s| s.selector.as_str()).collect()
    }

    /// Plain-text report for a human to read before editing a profile.
    pub fn render(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "=== PAGE ANALYSIS ===")?;
        writeln!(out, "URL: {}", self.url)?;
        writeln!(out, "Site: {} ({})", self.site_name, self.site_key)?;
        writeln!(out, "Date: {}", self.analyzed_at.format("%Y-%m-%d %H:%M:%S"))?;
        if let Some(error) = &self.navigation_error {
            writeln!(out, "Could not load the page: {}", error)?;
        }
        writeln!(out)?;

        writeln!(out, "STRUCTURE")?;
        for survey in &self.survey {
            writeln!(out, "  {}: {} elements", survey.tag, survey.count)?;
            for (i, classes) in survey.sample_classes.iter().enumerate() {
                writeln!(out, "    element {} classes: {}", i + 1, classes)?;
            }
        }
        writeln!(out)?;

        writeln!(out, "POTENTIAL PRODUCTS: {}", self.candidates.len())?;
        for (i, candidate) in self
            .candidates
            .iter()
            .filter(|c| c.outer_html.is_some())
            .enumerate()
        {
            writeln!(out, "  Product {}", i + 1)?;
            if let Some(html) = &candidate.outer_html {
                writeln!(out, "    HTML: {}...", html)?;
            }
            writeln!(out, "    Text: {}", candidate.text.replace('\n', " | "))?;
            for image in &candidate.images {
                writeln!(
                    out,
                    "    Image: src={}, alt={}",
                    image.src.as_deref().unwrap_or("N/A"),
                    image.alt.as_deref().unwrap_or("N/A")
                )?;
            }
        }
        writeln!(out)?;

        if self.suggestions.is_empty() {
            writeln!(out, "No selector found. The site may be using:")?;
            writeln!(out, "   - JavaScript to load its content")?;
            writeln!(out, "   - a custom structure")?;
            writeln!(out, "   - iframes")?;
            writeln!(out)?;
            writeln!(out, "TIPS:")?;
            writeln!(out, "1. Run the analyzer with a visible browser")?;
            writeln!(out, "2. Inspect the page with the developer tools (F12)")?;
            writeln!(out, "3. Look for the classes on the product cards")?;
        } else {
            writeln!(out, "SELECTOR SUGGESTIONS:")?;
            writeln!(out, "{}", "=".repeat(30))?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(
                    out,
                    "{}. {} ({} occurrences)",
                    i + 1,
                    suggestion.selector,
                    suggestion.occurrences
                )?;
            }
            writeln!(out)?;
            writeln!(out, "Add these to the '{}' profile:", self.site_key)?;
            let top: Vec<String> = self
                .suggestions
                .iter()
                .take(SNIPPET_SUGGESTIONS)
                .map(|s| format!("\"{}\"", s.selector))
                .collect();
            writeln!(out, "\"selectors\": {{ \"container\": [{}] }}", top.join(", "))?;
        }

        if let Some(path) = &self.screenshot {
            writeln!(out)?;
            writeln!(out, "Screenshot: {}", path.display())?;
        }
        Ok(())
    }
}
