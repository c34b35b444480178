use super::profile::{Category, SelectorHints, SiteProfile};
use crate::errors::{Result, ScraperError};
use std::path::Path;

/// Immutable set of site profiles, loaded once and shared read-only.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    sites: Vec<SiteProfile>,
}

impl SiteRegistry {
    pub fn new(sites: Vec<SiteProfile>) -> Result<Self> {
        for (i, site) in sites.iter().enumerate() {
            if sites[..i].iter().any(|other| other.key == site.key) {
                return Err(ScraperError::ConfigurationError(format!(
                    "duplicate site key '{}'",
                    site.key
                )));
            }
        }
        Ok(Self { sites })
    }

    /// Load a JSON array of profiles.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScraperError::ConfigurationError(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let sites: Vec<SiteProfile> = serde_json::from_str(raw)?;
        Self::new(sites)
    }

    pub fn get(&self, key: &str) -> Result<&SiteProfile> {
        self.sites
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| ScraperError::UnknownSite(key.to_string()))
    }

    pub fn sites(&self) -> &[SiteProfile] {
        &self.sites
    }

    pub fn builtin() -> Self {
        Self {
            sites: vec![
                site(
                    "geant",
                    "Géant",
                    "https://www.geantdrive.tn",
                    None,
                    Some("tunis-city"),
                    "{base_url}/{city}/{path}",
                    &[
                        ("boissons", "10-boissons"),
                        ("epicerie", "31-epicerie"),
                        ("cremerie_et_surgele", "130-cremerie-et-surgele"),
                        ("le_marche", "160-le-marche"),
                        ("hygiene_et_beaute", "210-hygiene-et-beaute"),
                        ("univers_bebes", "322-univers-bebes"),
                        ("produits_menagers", "268-produits-menagers"),
                        ("maison", "821-maison"),
                    ],
                    [
                        "div.product-item, article.product, .product-card, .product, .item",
                        ".product-title, h2.product-name, .product-list-name, .title, h2, h3",
                        ".price, .product-price, .current-price, [class*='price'], .amount",
                        "img.product-image, img[src*='product'], img, .product-image",
                        "a.product-link, a[href*='product'], a",
                    ],
                ),
                site(
                    "carrefour",
                    "Carrefour",
                    "https://www.carrefour.tn",
                    Some("https://www.carrefour.tn/default/drive"),
                    None,
                    "{drive_url}/{path}",
                    &[
                        ("boissons", "boissons"),
                        ("epicerie", "epicerie-salee"),
                        ("fruits_legumes", "fruits-et-legumes"),
                        ("viandes_poissons", "viandes-poissons-traiteur"),
                        ("produits_laitiers", "produits-laitiers-et-oeufs"),
                        ("boulangerie", "boulangerie-et-patisserie"),
                        ("surgeles", "surgeles"),
                        ("hygiene_beaute", "hygiene-et-beaute"),
                        ("entretien", "entretien-et-nettoyage"),
                    ],
                    [
                        ".product-item, .item-product, .product-tile, article, .product, .item",
                        ".product-name, .product-title, .product-list-name, h2, h3, .name",
                        ".price, .sales, .value, .product-price, [class*='price']",
                        "img.product-image, img[src*='product'], img",
                        "a.product-link, a[href*='/p/'], a",
                    ],
                ),
                site(
                    "mg",
                    "Monoprix",
                    "https://www.monoprix.tn",
                    Some("https://www.monoprix.tn/drive"),
                    None,
                    "{drive_url}/{path}",
                    &[
                        ("epicerie", "epicerie"),
                        ("boissons", "boissons"),
                        ("frais", "frais"),
                        ("surgeles", "surgeles"),
                        ("hygiene", "hygiene-beaute"),
                        ("bebe", "bebe"),
                        ("entretien", "entretien-maison"),
                    ],
                    [
                        "div.product, .product-item, .item, article, .card, .product-card",
                        ".product-name, .product-title, h2, h3, .title, .name",
                        ".price, .product-price, .amount, [class*='price'], .value",
                        "img, .product-image, img[src*='jpg'], img[src*='png']",
                        "a, .product-link, [href*='product']",
                    ],
                ),
                site(
                    "aziza",
                    "Aziza",
                    "https://www.aziza.tn",
                    None,
                    None,
                    "{base_url}/{path}",
                    &[
                        ("alimentation", "alimentation"),
                        ("boissons", "boissons"),
                        ("hygiene", "hygiene-beaute"),
                        ("maison", "maison"),
                    ],
                    [
                        ".product, .product-block, .item, article, .card",
                        ".product-name, .product-title, h2, h3",
                        ".price, .product-price, [class*='price']",
                        "img.product-image, img",
                        "a.product-link, a",
                    ],
                ),
            ],
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn site(
    key: &str,
    name: &str,
    base_url: &str,
    drive_url: Option<&str>,
    city: Option<&str>,
    url_template: &str,
    categories: &[(&str, &str)],
    [container, name_sel, price, image, link]: [&str; 5],
) -> SiteProfile {
    let split = |list: &str| -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    };

    SiteProfile {
        key: key.to_string(),
        name: name.to_string(),
        base_url: base_url.to_string(),
        drive_url: drive_url.map(String::from),
        city: city.map(String::from),
        url_template: url_template.to_string(),
        categories: categories
            .iter()
            .map(|(key, path)| Category {
                key: key.to_string(),
                path: path.to_string(),
            })
            .collect(),
        selectors: SelectorHints {
            container: split(container),
            name: split(name_sel),
            price: split(price),
            image: split(image),
            link: split(link),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_urls_match_each_site_policy() {
        let registry = SiteRegistry::builtin();
        let url = |site: &str, cat: &str| {
            let profile = registry.get(site).unwrap();
            profile
                .category_url(&profile.category(cat).unwrap().path)
                .unwrap()
        };

        assert_eq!(
            url("geant", "boissons"),
            "https://www.geantdrive.tn/tunis-city/10-boissons"
        );
        assert_eq!(
            url("carrefour", "epicerie"),
            "https://www.carrefour.tn/default/drive/epicerie-salee"
        );
        assert_eq!(url("mg", "bebe"), "https://www.monoprix.tn/drive/bebe");
        assert_eq!(url("aziza", "maison"), "https://www.aziza.tn/maison");
    }

    #[test]
    fn container_hints_keep_listed_order() {
        let registry = SiteRegistry::builtin();
        let hints = &registry.get("geant").unwrap().selectors.container;
        assert_eq!(hints[0], "div.product-item");
        assert_eq!(hints.last().unwrap(), ".item");
    }

    #[test]
    fn loads_profiles_from_json() {
        let registry = SiteRegistry::from_json(
            r#"[{
                "key": "zed",
                "name": "Zed Market",
                "base_url": "https://zed.example",
                "url_template": "{base_url}/c/{path}",
                "categories": [{ "key": "fruits", "path": "fruits" }],
                "selectors": { "container": [".tile"] }
            }]"#,
        )
        .unwrap();

        let zed = registry.get("zed").unwrap();
        assert_eq!(zed.category_url("fruits").unwrap(), "https://zed.example/c/fruits");
        assert!(zed.selectors.price.is_empty());
        assert!(matches!(registry.get("geant"), Err(ScraperError::UnknownSite(_))));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let geant = SiteRegistry::builtin().get("geant").unwrap().clone();
        assert!(SiteRegistry::new(vec![geant.clone(), geant]).is_err());
    }
}
