//! Criteria extraction: keywords, price range, brand and specs from free text

use crate::types::{PriceRange, SearchCriteria};
use regex::Regex;
use std::sync::OnceLock;

/// Concept -> synonyms. Any synonym hit pulls in the whole list.
const KEYWORD_CONCEPTS: &[(&str, &[&str])] = &[
    ("phone", &["موبايل", "جوال", "هاتف", "phone", "mobile", "smartphone", "iphone", "galaxy"]),
    ("laptop", &["لابتوب", "كمبيوتر", "حاسوب", "laptop", "notebook", "macbook"]),
    ("headphones", &["سماعة", "سماعات", "headphones", "headphone", "earbuds", "headset"]),
    ("camera", &["كاميرا", "تصوير", "camera"]),
    ("battery", &["بطارية", "باور بنك", "battery", "power bank"]),
    ("watch", &["ساعة", "ساعه", "smartwatch", "watch"]),
    ("tablet", &["تابلت", "ايباد", "آيباد", "tablet", "ipad"]),
];

/// Canonical brand -> spellings, checked in order. First hit wins.
pub(crate) const BRANDS: &[(&str, &[&str])] = &[
    ("apple", &["apple", "ابل", "آبل", "أبل"]),
    ("samsung", &["samsung", "سامسونج", "سامسونغ"]),
    ("huawei", &["huawei", "هواوي"]),
    ("xiaomi", &["xiaomi", "شاومي", "redmi"]),
    ("oppo", &["oppo", "اوبو"]),
    ("lenovo", &["lenovo", "لينوفو"]),
    ("dell", &["dell"]),
    ("asus", &["asus", "اسوس"]),
    ("sony", &["sony", "سوني"]),
    ("anker", &["anker", "انكر"]),
    ("jbl", &["jbl"]),
];

/// Spec concept -> trigger words. Checked independently of each other.
const SPEC_CONCEPTS: &[(&str, &[&str])] = &[
    ("camera", &["كاميرا", "تصوير", "camera", "megapixel"]),
    ("battery", &["بطارية", "شحن", "battery", "mah"]),
    ("screen", &["شاشة", "شاشه", "screen", "display"]),
    ("storage", &["ذاكرة", "تخزين", "storage", "gb"]),
];

struct PricePatterns {
    range: Regex,
    upper: Regex,
    lower: Regex,
}

fn price_patterns() -> &'static PricePatterns {
    static PATTERNS: OnceLock<PricePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| PricePatterns {
        range: Regex::new(r"([0-9]+)\s*(?:-|–|to|الى|إلى)\s*([0-9]+)")
            .expect("valid range pattern"),
        upper: Regex::new(r"(?:under|less than|below|up to|تحت|اقل من|أقل من|بحدود|حدود)\s*([0-9]+)")
            .expect("valid upper bound pattern"),
        lower: Regex::new(r"(?:more than|above|over|at least|اكثر من|أكثر من|فوق)\s*([0-9]+)")
            .expect("valid lower bound pattern"),
    })
}

/// Map Arabic-Indic and Eastern Arabic-Indic digits to ASCII
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            _ => c,
        })
        .collect()
}

/// Lowercase and digit-normalize a message for matching
pub fn normalize(message: &str) -> String {
    normalize_digits(&message.to_lowercase())
}

/// Parse a message into search criteria. Total for any input.
pub fn extract(message: &str) -> SearchCriteria {
    let text = normalize(message);

    SearchCriteria {
        keywords: expand_keywords(&text),
        price_range: extract_price_range(&text),
        brand: detect_brand(&text).map(str::to_string),
        specs: detect_specs(&text),
    }
}

fn expand_keywords(text: &str) -> std::collections::BTreeSet<String> {
    KEYWORD_CONCEPTS
        .iter()
        .filter(|(_, synonyms)| synonyms.iter().any(|s| text.contains(s)))
        .flat_map(|(_, synonyms)| synonyms.iter().map(|s| s.to_string()))
        .collect()
}

/// Range "A-B", then "under N", then "more than N". First match wins.
fn extract_price_range(text: &str) -> Option<PriceRange> {
    let patterns = price_patterns();

    if let Some(caps) = patterns.range.captures(text) {
        if let (Some(a), Some(b)) = (parse_bound(caps.get(1)), parse_bound(caps.get(2))) {
            return Some(PriceRange {
                min: Some(a.min(b)),
                max: Some(a.max(b)),
            });
        }
    }

    if let Some(max) = patterns.upper.captures(text).and_then(|c| parse_bound(c.get(1))) {
        return Some(PriceRange { min: None, max: Some(max) });
    }

    if let Some(min) = patterns.lower.captures(text).and_then(|c| parse_bound(c.get(1))) {
        return Some(PriceRange { min: Some(min), max: None });
    }

    None
}

// Overflowing captures count as no match
fn parse_bound(m: Option<regex::Match<'_>>) -> Option<u64> {
    m.and_then(|m| m.as_str().parse().ok())
}

/// First brand from the fixed list found in already-normalized text
pub fn detect_brand(text: &str) -> Option<&'static str> {
    BRANDS
        .iter()
        .find(|(_, spellings)| spellings.iter().any(|s| text.contains(s)))
        .map(|(canonical, _)| *canonical)
}

fn detect_specs(text: &str) -> Vec<String> {
    SPEC_CONCEPTS
        .iter()
        .filter(|(_, triggers)| triggers.iter().any(|t| text.contains(t)))
        .map(|(concept, _)| concept.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synonym_hit_expands_whole_concept() {
        let criteria = extract("بدي موبايل رخيص");
        assert!(criteria.keywords.contains("phone"));
        assert!(criteria.keywords.contains("جوال"));
        assert!(criteria.keywords.contains("iphone"));
        assert!(!criteria.keywords.contains("laptop"));
    }

    #[test]
    fn test_range_takes_priority_over_bounds() {
        let criteria = extract("laptop under 900, ideally 500-800");
        assert_eq!(criteria.price_range, Some(PriceRange { min: Some(500), max: Some(800) }));
    }

    #[test]
    fn test_reversed_range_is_ordered() {
        let criteria = extract("between 800 to 300");
        assert_eq!(criteria.price_range, Some(PriceRange { min: Some(300), max: Some(800) }));
    }

    #[test]
    fn test_upper_bound_arabic() {
        let criteria = extract("تحت 100");
        assert_eq!(criteria.price_range, Some(PriceRange { min: None, max: Some(100) }));
    }

    #[test]
    fn test_upper_bound_with_arabic_indic_digits() {
        let criteria = extract("سماعات تحت ١٥٠");
        assert_eq!(criteria.price_range, Some(PriceRange { min: None, max: Some(150) }));
    }

    #[test]
    fn test_lower_bound() {
        let criteria = extract("phones more than 1000");
        assert_eq!(criteria.price_range, Some(PriceRange { min: Some(1000), max: None }));
    }

    #[test]
    fn test_overflowing_number_is_no_match() {
        let criteria = extract("under 99999999999999999999999");
        assert_eq!(criteria.price_range, None);
    }

    #[test]
    fn test_first_brand_wins() {
        let criteria = extract("Samsung or Apple phone?");
        assert_eq!(criteria.brand.as_deref(), Some("apple"));
        let criteria = extract("جوال سامسونج");
        assert_eq!(criteria.brand.as_deref(), Some("samsung"));
    }

    #[test]
    fn test_specs_are_independent() {
        let criteria = extract("phone with good camera and big battery, nice screen");
        assert_eq!(criteria.specs, vec!["camera", "battery", "screen"]);
    }

    #[test]
    fn test_plain_text_yields_empty_criteria() {
        let criteria = extract("hello there");
        assert_eq!(criteria, SearchCriteria::default());
    }
}
