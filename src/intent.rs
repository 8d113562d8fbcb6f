//! Intent classification as an ordered first-match rule table

use crate::criteria::{detect_brand, normalize};
use crate::types::{Intent, Preferences, ProductType, RequestType};

const PRICE_TERMS: &[&str] = &[
    "ميزانية", "ميزانيتي", "سعر", "اسعار", "أسعار", "بكم", "تحت", "اقل من", "أقل من",
    "price", "budget", "how much", "cost", "under", "less than",
];
const DEAL_TERMS: &[&str] = &[
    "عروض", "عرض خاص", "خصم", "خصومات", "تخفيض", "تخفيضات", "offer", "deal", "discount", "sale",
];
const CATEGORY_TERMS: &[&str] = &["تصنيف", "تصنيفات", "فئات", "فئة", "اقسام", "أقسام", "category", "categories"];
const BRAND_TERMS: &[&str] = &["ماركة", "ماركات", "براند", "brand"];
const ACTION_VERBS: &[&str] = &[
    "بدي", "ابي", "أبي", "ابغى", "أبغى", "اعرض", "أرني", "ارني", "وريني", "رشح",
    "show", "find", "want", "buy", "looking for", "recommend",
];
const PRODUCT_NOUNS: &[&str] = &[
    "موبايل", "جوال", "هاتف", "لابتوب", "سماعات", "سماعة",
    "phone", "mobile", "laptop", "headphones", "earbuds",
];
const COMPLAINT_TERMS: &[&str] = &["مشكلة", "شكوى", "سيء", "غلط", "complaint", "problem", "broken", "refund"];
const COMPARE_TERMS: &[&str] = &["قارن", "مقارنة", "الفرق بين", "compare", "versus", " vs ", "difference"];

const PRODUCT_TYPES: &[(ProductType, &[&str])] = &[
    (ProductType::Phone, &["موبايل", "جوال", "هاتف", "phone", "mobile"]),
    (ProductType::Laptop, &["لابتوب", "laptop", "notebook"]),
    (ProductType::Headphones, &["سماعات", "سماعة", "headphones", "earbuds"]),
];

fn contains_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| text.contains(t))
}

type Predicate = fn(&str) -> bool;

fn mentions_price(m: &str) -> bool {
    contains_any(m, PRICE_TERMS)
}

fn mentions_deal(m: &str) -> bool {
    contains_any(m, DEAL_TERMS)
}

fn mentions_category(m: &str) -> bool {
    contains_any(m, CATEGORY_TERMS)
}

fn mentions_brand(m: &str) -> bool {
    contains_any(m, BRAND_TERMS)
}

fn wants_product(m: &str) -> bool {
    contains_any(m, ACTION_VERBS) || contains_any(m, PRODUCT_NOUNS)
}

fn is_complaint(m: &str) -> bool {
    contains_any(m, COMPLAINT_TERMS)
}

fn wants_comparison(m: &str) -> bool {
    contains_any(m, COMPARE_TERMS)
}

/// Rules in priority order; the first predicate that holds decides the intent
pub const INTENT_RULES: &[(Intent, Predicate)] = &[
    (Intent::Prices, mentions_price),
    (Intent::Deals, mentions_deal),
    (Intent::Categories, mentions_category),
    (Intent::Brands, mentions_brand),
    (Intent::Browse, wants_product),
    (Intent::Complaint, is_complaint),
    (Intent::Compare, wants_comparison),
];

/// Classify a message into one intent plus the preferences it expresses
pub fn classify(message: &str) -> (Intent, Preferences) {
    // Padding so whole-word terms like " vs " also match at the edges
    let text = format!(" {} ", normalize(message.trim()));

    let intent = INTENT_RULES
        .iter()
        .find(|(_, matches)| matches(text.as_str()))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Info);

    let mut prefs = Preferences {
        request_type: request_type(&text),
        brand: detect_brand(&text).map(str::to_string),
        ..Default::default()
    };

    match intent {
        Intent::Prices => {
            prefs.focus = Some("price".to_string());
            prefs.budget = first_budget(&text);
        }
        Intent::Deals => prefs.focus = Some("discount".to_string()),
        Intent::Browse => {
            prefs.focus = Some("product".to_string());
            prefs.product_type = product_type(&text);
        }
        _ => {}
    }

    (intent, prefs)
}

fn request_type(text: &str) -> RequestType {
    if contains_any(text, ACTION_VERBS) {
        RequestType::Explicit
    } else if contains_any(text, PRODUCT_NOUNS) {
        RequestType::Implicit
    } else {
        RequestType::General
    }
}

fn product_type(text: &str) -> Option<ProductType> {
    PRODUCT_TYPES
        .iter()
        .find(|(_, nouns)| contains_any(text, nouns))
        .map(|(kind, _)| *kind)
}

/// First run of 2-6 ASCII digits, as a positive budget
fn first_budget(text: &str) -> Option<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|run| (2..=6).contains(&run.len()))
        .and_then(|run| run.parse::<u32>().ok())
        .filter(|budget| *budget > 0)
}
