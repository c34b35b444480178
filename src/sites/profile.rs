use crate::errors::{Result, ScraperError};
use crate::types::CategoryTask;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorRole {
    Container,
    Name,
    Price,
    Image,
    Link,
}

/// Ordered selector candidates per semantic role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorHints {
    pub container: Vec<String>,
    pub name: Vec<String>,
    pub price: Vec<String>,
    pub image: Vec<String>,
    pub link: Vec<String>,
}

impl SelectorHints {
    pub fn role(&self, role: SelectorRole) -> &[String] {
        match role {
            SelectorRole::Container => &self.container,
            SelectorRole::Name => &self.name,
            SelectorRole::Price => &self.price,
            SelectorRole::Image => &self.image,
            SelectorRole::Link => &self.link,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub path: String,
}

/// Static description of one supermarket site.
///
/// `url_template` composes a category URL from `{base_url}`, `{drive_url}`,
/// `{city}` and `{path}`, so each site's URL policy lives in data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    pub key: String,
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub drive_url: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    pub url_template: String,
    pub categories: Vec<Category>,
    #[serde(default)]
    pub selectors: SelectorHints,
}

impl SiteProfile {
    pub fn category(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Tasks for the requested category keys, in request order. An empty
    /// request selects every category of the site.
    pub fn tasks(&self, keys: &[String]) -> Result<Vec<CategoryTask>> {
        let selected: Vec<&Category> = if keys.is_empty() {
            self.categories.iter().collect()
        } else {
            keys.iter()
                .map(|key| {
                    self.category(key)
                        .ok_or_else(|| ScraperError::UnknownCategory {
                            site: self.key.clone(),
                            category: key.clone(),
                        })
                })
                .collect::<Result<_>>()?
        };

        Ok(selected
            .into_iter()
            .map(|c| CategoryTask {
                site_key: self.key.clone(),
                category_key: c.key.clone(),
                path: c.path.clone(),
            })
            .collect())
    }

    pub fn category_url(&self, path: &str) -> Result<String> {
        let mut url = self.url_template.clone();
        for (placeholder, value) in [
            ("{base_url}", Some(self.base_url.as_str())),
            ("{drive_url}", self.drive_url.as_deref()),
            ("{city}", self.city.as_deref()),
            ("{path}", Some(path)),
        ] {
            if !url.contains(placeholder) {
                continue;
            }
            let value = value.ok_or_else(|| {
                ScraperError::ConfigurationError(format!(
                    "site '{}' uses {} but does not define it",
                    self.key, placeholder
                ))
            })?;
            url = url.replace(placeholder, value.trim_end_matches('/'));
        }

        if url.contains('{') {
            return Err(ScraperError::ConfigurationError(format!(
                "site '{}' has an unresolved placeholder in '{}'",
                self.key, self.url_template
            )));
        }
        Ok(url)
    }
}
