use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One extracted product. Field names on the wire match the export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "prix")]
    pub price: String,
    pub image_url: String,
    pub product_url: String,
    #[serde(rename = "date_scraping")]
    pub scraped_at: DateTime<Local>,
    #[serde(rename = "supermarche", default)]
    pub supermarket: String,
    #[serde(rename = "categorie", default)]
    pub category: String,
}

impl ProductRecord {
    pub fn tagged(mut self, supermarket: &str, category: &str) -> Self {
        self.supermarket = supermarket.to_string();
        self.category = category.to_string();
        self
    }
}

/// One (site, category) unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTask {
    pub site_key: String,
    pub category_key: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSuggestion {
    pub selector: String,
    pub occurrences: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_serialize_with_export_column_names() {
        let record = ProductRecord {
            name: "Eau minerale 1.5L".to_string(),
            price: "0.850".to_string(),
            image_url: String::new(),
            product_url: String::new(),
            scraped_at: Local::now(),
            supermarket: String::new(),
            category: String::new(),
        }
        .tagged("Carrefour", "boissons");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["nom"], "Eau minerale 1.5L");
        assert_eq!(json["prix"], "0.850");
        assert_eq!(json["supermarche"], "Carrefour");
        assert_eq!(json["categorie"], "boissons");
        assert!(json.get("date_scraping").is_some());
    }
}
