use crate::core::BrowserTrait;
use crate::errors::Result;
use chrono::Local;
use std::path::{Path, PathBuf};

pub struct ScreenshotManager;

impl ScreenshotManager {
    pub async fn save_to_file<B: BrowserTrait>(browser: &B, file_path: &Path) -> Result<()> {
        let screenshot_bytes = browser.take_screenshot().await?;
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(file_path, screenshot_bytes).await?;
        Ok(())
    }

    /// `debug_<site>_<category>_<timestamp>.png`, taken when a category
    /// yields no candidate elements.
    pub async fn capture_diagnostic<B: BrowserTrait>(
        browser: &B,
        dir: &Path,
        site_key: &str,
        category_key: &str,
    ) -> Result<PathBuf> {
        let path = artifact_path(dir, &["debug", site_key, category_key], "png");
        Self::save_to_file(browser, &path).await?;
        Ok(path)
    }

    /// `analysis_<site>_<timestamp>.png`, taken at the end of a page analysis.
    pub async fn capture_analysis<B: BrowserTrait>(
        browser: &B,
        dir: &Path,
        site_key: &str,
    ) -> Result<PathBuf> {
        let path = artifact_path(dir, &["analysis", site_key], "png");
        Self::save_to_file(browser, &path).await?;
        Ok(path)
    }
}

pub fn artifact_path(dir: &Path, parts: &[&str], extension: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let stem = parts
        .iter()
        .map(|p| sanitize(p))
        .collect::<Vec<_>>()
        .join("_");
    dir.join(format!("{}_{}.{}", stem, timestamp, extension))
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
