//! Text heuristics shared by the locator, extractor and analyzer.
//!
//! The price token pattern and the "looks like a price line" pattern are
//! intentionally different: the first accepts bare numbers, the second needs a
//! currency marker, and the second does not know the Arabic dinar word.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// A number followed by a currency marker, used to sniff product cards.
static CARD_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d\s,.]*(?:DT|TND|€|\$|دت)").expect("valid regex"));

/// A number optionally followed by a currency marker; group 1 is the amount.
static PRICE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d\s,.]*)\s*(?:DT|TND|€|\$|دت|دينار)?").expect("valid regex")
});

/// Lines matching this are never used as a product name.
static PRICE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d\s,.]*(?:DT|TND|€|\$)").expect("valid regex"));

static ANALYZER_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d\s,.]*(?:DT|TND|€)").expect("valid regex"));

pub const PRODUCT_WORDS: &[&str] = &["produit", "article", "item", "product", "prix", "price"];

/// Class fragments that mark a `div` as a potential product in the analyzer.
pub const PRODUCT_CLASS_PATTERNS: &[&str] = &["product", "item", "card", "article", "produit"];

/// Class fragments worth proposing as selectors.
pub const SUGGESTION_KEYWORDS: &[&str] = &["product", "item", "card", "article", "prod", "shop"];

pub const DEFAULT_PRICE: &str = "0.00";

pub fn has_card_price(text: &str) -> bool {
    CARD_PRICE.is_match(text)
}

pub fn has_analyzer_price(text: &str) -> bool {
    ANALYZER_PRICE.is_match(text)
}

pub fn looks_like_price_line(line: &str) -> bool {
    PRICE_LINE.is_match(line)
}

pub fn contains_product_word(text: &str) -> bool {
    let lower = text.to_lowercase();
    PRODUCT_WORDS.iter().any(|w| lower.contains(w))
}

pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

/// Last price token of the first line that has one, normalized.
pub fn extract_price<'a>(lines: impl IntoIterator<Item = &'a str>) -> Option<String> {
    lines.into_iter().find_map(|line| {
        PRICE_TOKEN
            .captures_iter(line)
            .filter_map(|caps| caps.get(1))
            .last()
            .map(|amount| normalize_price(amount.as_str()))
    })
}

/// Strip whitespace and use `.` as the decimal separator.
pub fn normalize_price(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

/// Text in front of the first price token, e.g. `"Yaourt nature"` for
/// `"Yaourt nature 1.250 DT"`.
pub fn price_line_prefix(line: &str) -> Option<&str> {
    let found = PRICE_TOKEN.find(line)?;
    let prefix = line[..found.start()].trim();
    (!prefix.is_empty()).then_some(prefix)
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Make an image source absolute against the site's base URL.
pub fn normalize_image_url(src: &str, base_url: &str) -> String {
    let src = src.trim();
    if let Some(rest) = src.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    if src.starts_with('/') {
        return format!("{}{}", base_url.trim_end_matches('/'), src);
    }
    if Url::parse(src).is_ok() {
        return src.to_string();
    }
    Url::parse(base_url)
        .and_then(|base| base.join(src))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| src.to_string())
}

pub fn looks_absolute_link(href: &str) -> bool {
    href.contains("http") || href.contains("www")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_is_last_token_of_first_matching_line() {
        let lines = ["Yaourt nature", "Pack de 4 - 1.250 DT", "9.999 DT"];
        assert_eq!(extract_price(lines), Some("1.250".to_string()));
    }

    #[test]
    fn price_without_digits_is_absent() {
        assert_eq!(extract_price(["Lait demi-écrémé", "Promo"]), None);
    }

    #[test]
    fn price_comma_and_spaces_are_normalized() {
        assert_eq!(extract_price(["1 299,500 TND"]), Some("1299.500".to_string()));
        assert_eq!(extract_price(["12,5 دينار"]), Some("12.5".to_string()));
    }

    #[test]
    fn price_normalization_is_idempotent() {
        for raw in ["1 250,000", "3.4", "12, 5", "0.00", "7 890"] {
            let once = normalize_price(raw);
            assert_eq!(normalize_price(&once), once);
        }
    }

    #[test]
    fn price_line_detection_needs_a_currency() {
        assert!(looks_like_price_line("2.450 DT"));
        assert!(looks_like_price_line("Prix: 3,99 €"));
        assert!(!looks_like_price_line("Lot de 6 bouteilles"));
        // the dinar abbreviation is only known to the card sniffer
        assert!(!looks_like_price_line("5 دت"));
        assert!(has_card_price("5 دت"));
    }

    #[test]
    fn prefix_before_price() {
        assert_eq!(price_line_prefix("Yaourt nature 1.250 DT"), Some("Yaourt nature"));
        assert_eq!(price_line_prefix("1.250 DT"), None);
    }

    #[test]
    fn image_urls_are_made_absolute() {
        let base = "https://www.geantdrive.tn";
        assert_eq!(normalize_image_url("//img/x.png", base), "https://img/x.png");
        assert_eq!(
            normalize_image_url("/img/x.png", base),
            "https://www.geantdrive.tn/img/x.png"
        );
        assert_eq!(
            normalize_image_url("/img/x.png", "https://www.geantdrive.tn/"),
            "https://www.geantdrive.tn/img/x.png"
        );
        assert_eq!(
            normalize_image_url("https://cdn.example/a.jpg", base),
            "https://cdn.example/a.jpg"
        );
        assert_eq!(
            normalize_image_url("media/a.jpg", base),
            "https://www.geantdrive.tn/media/a.jpg"
        );
    }

    #[test]
    fn product_words_are_case_insensitive() {
        assert!(contains_product_word("Voir le PRODUIT"));
        assert!(!contains_product_word("Livraison gratuite"));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("Café crème", 4), "Café");
    }
}
