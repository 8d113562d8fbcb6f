//! Pipeline tests for the Assistant

use crate::composer::closing;
use crate::opening::{apology, complaint_opening};
use crate::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

const OPENING: &str = "أكيد! خلني أساعدك.";

/// Helper to create a catalog product
fn product(
    id: &str,
    title: &str,
    price: f64,
    discounted: Option<f64>,
    sold: u64,
    rating: f64,
    category: &str,
    brand: &str,
) -> Product {
    Product {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        price: Some(price),
        price_after_discount: discounted,
        category: Some(EntityRef::named(category, category)),
        brand: Some(EntityRef::named(brand, brand)),
        sold,
        rating_average: rating,
        rating_count: 0,
        image_cover: None,
    }
}

fn store_catalog() -> CatalogSnapshot {
    CatalogSnapshot::new(
        vec![
            product("p1", "Samsung Galaxy A54 phone", 320.0, Some(289.0), 40, 4.5, "phones", "Samsung"),
            product("p2", "Redmi Note 12 phone", 180.0, None, 12, 4.1, "phones", "Xiaomi"),
            product("p3", "Sony WH-1000 headset", 250.0, Some(199.0), 30, 4.7, "audio", "Sony"),
            product("p4", "ThinkPad laptop", 900.0, None, 5, 4.0, "laptops", "Lenovo"),
            product("p5", "Nokia basic phone", 150.0, None, 2, 3.0, "phones", "Nokia"),
        ],
        vec![
            Category { id: "phones".into(), name: "جوالات".into() },
            Category { id: "audio".into(), name: "سماعات".into() },
            Category { id: "laptops".into(), name: "لابتوبات".into() },
        ],
        vec![
            Brand { id: "Samsung".into(), name: "Samsung".into() },
            Brand { id: "Sony".into(), name: "Sony".into() },
        ],
    )
}

fn assistant_with(snapshot: CatalogSnapshot, generator: StaticOpening) -> Assistant {
    Assistant::new(
        Arc::new(CatalogCache::pinned(snapshot)),
        Arc::new(InMemorySessionStore::new(Duration::from_secs(600), 100)),
    )
    .with_generator(Arc::new(generator))
}

fn assistant() -> Assistant {
    assistant_with(store_catalog(), StaticOpening::new(OPENING))
}

fn ids(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.id.as_str()).collect()
}

#[tokio::test]
async fn test_arabic_browse_for_phone() {
    let assistant = assistant();
    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "بدي موبايل رخيص")).await);

    assert_eq!(reply.intent, Intent::Browse);
    assert_eq!(reply.lang, Lang::Ar);
    assert_eq!(ids(&reply.products), vec!["p1", "p2", "p5"]);
    assert!(reply.text.starts_with(OPENING));
    assert!(reply.text.contains("إليك أفضل الخيارات:"));
    assert!(reply.text.contains("1) Samsung Galaxy A54 phone — السعر: 289$ (خصم من 320$)"));
    assert!(reply.text.ends_with(closing(Intent::Browse, Lang::Ar)));
    assert_eq!(reply.context.product_interest, vec!["phone"]);
    assert!(!reply.suggestions.is_empty());
}

#[tokio::test]
async fn test_under_100_falls_back_to_popular() {
    let assistant = assistant();
    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "تحت 100")).await);

    assert_eq!(reply.intent, Intent::Prices);
    assert!(reply.text.contains("ما لقيت منتجات تطابق طلبك بالضبط"));
    // Nothing sells at or under 100, so the most popular products stand in
    assert_eq!(ids(&reply.products), vec!["p3", "p1", "p2"]);
    assert_eq!(reply.context.current_budget, Some(100));
    assert!(reply.text.ends_with(closing(Intent::Prices, Lang::Ar)));
}

#[tokio::test]
async fn test_budget_in_message_bounds_results() {
    let assistant = assistant();
    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "phone price 200")).await);

    assert_eq!(reply.intent, Intent::Prices);
    assert_eq!(ids(&reply.products), vec!["p2", "p5"]);
    for p in &reply.products {
        assert!(p.effective_price().unwrap() <= 200.0);
    }
}

#[tokio::test]
async fn test_deals_list_discounted_products() {
    let assistant = assistant();
    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "شو عروضكم؟")).await);

    assert_eq!(reply.intent, Intent::Deals);
    assert_eq!(ids(&reply.products), vec!["p3", "p1"]);
}

#[tokio::test]
async fn test_show_me_others_references_last_product() {
    let assistant = assistant();
    let first = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "بدي موبايل")).await);
    assert_eq!(first.context.last_products[0].id, "p1");

    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "show me others")).await);

    assert_eq!(reply.intent, Intent::Browse);
    assert_eq!(reply.lang, Lang::En);
    // Alternatives to p1, never p1 itself
    assert_eq!(ids(&reply.products), vec!["p2", "p5"]);
    assert_eq!(reply.context.last_products[0].id, "p2");
    assert_eq!(reply.context.history.len(), 2);
}

#[tokio::test]
async fn test_last_products_hold_at_most_five() {
    let products = (0..8)
        .map(|i| product(&format!("x{}", i), &format!("Phone {}", i), 100.0, None, i, 4.0, "phones", "Generic"))
        .collect();
    let assistant = assistant_with(CatalogSnapshot::new(products, vec![], vec![]), StaticOpening::new(OPENING));

    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "show me a phone")).await);
    assert_eq!(reply.products.len(), 8);
    assert_eq!(reply.context.last_products.len(), 5);
}

#[tokio::test]
async fn test_whitespace_message_is_rejected_without_session() {
    let assistant = assistant();
    let err = assert_err!(assistant.handle_turn(TurnRequest::new("s1", "  \n\t ")).await);

    assert!(matches!(err, AssistantError::InvalidInput(_)));
    assert_eq!(assistant.sessions().len().await, 0);
    assert!(assistant.sessions().peek("s1").await.is_none());
}

#[tokio::test]
async fn test_failed_generation_uses_apology() {
    let assistant = assistant_with(store_catalog(), StaticOpening::failing());
    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "hello")).await);

    assert_eq!(reply.intent, Intent::Info);
    assert!(reply.text.starts_with(apology(Lang::En)));
    assert!(reply.text.ends_with(closing(Intent::Info, Lang::En)));
}

#[tokio::test]
async fn test_complaint_replaces_opening() {
    let assistant = assistant();
    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "عندي شكوى على الطلب")).await);

    assert_eq!(reply.intent, Intent::Complaint);
    assert!(reply.text.starts_with(complaint_opening(Lang::Ar)));
    assert!(reply.products.is_empty());
}

#[tokio::test]
async fn test_categories_turn_lists_and_remembers() {
    let assistant = assistant();
    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "وش التصنيفات عندكم")).await);

    assert_eq!(reply.intent, Intent::Categories);
    assert_eq!(reply.categories.len(), 3);
    assert!(reply.text.contains("التصنيفات المتاحة: جوالات, سماعات, لابتوبات"));
    assert_eq!(reply.context.last_categories.len(), 3);
    assert_eq!(reply.suggestions[0], "أرني منتجات جوالات");
}

#[tokio::test]
async fn test_explicit_lang_overrides_detection() {
    let assistant = assistant();
    let mut req = TurnRequest::new("s1", "بدي موبايل");
    req.lang = Some(Lang::En);

    let reply = assert_ok!(assistant.handle_turn(req).await);
    assert_eq!(reply.lang, Lang::En);
    assert!(reply.text.contains("Here are the best options:"));
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let assistant = Arc::new(assistant());
    let (a, b) = tokio::join!(
        assistant.handle_turn(TurnRequest::new("a", "بدي لابتوب")),
        assistant.handle_turn(TurnRequest::new("b", "تحت 100")),
    );

    let a = assert_ok!(a);
    let b = assert_ok!(b);
    assert_eq!(a.context.history.len(), 1);
    assert_eq!(b.context.history.len(), 1);
    assert_eq!(a.context.current_budget, None);
    assert_eq!(b.context.current_budget, Some(100));
    assert_eq!(assistant.sessions().len().await, 2);
}

#[tokio::test]
async fn test_compare_needs_two_products() {
    let assistant = assistant();

    let err = assert_err!(assistant.compare(&["p1".to_string()]).await);
    assert_eq!(err, AssistantError::InsufficientProducts { found: 1 });

    let report = assert_ok!(assistant.compare(&["p1".to_string(), "p2".to_string()]).await);
    assert_eq!(report.products.len(), 2);
    assert_eq!(report.summary.cheapest.unwrap().id, "p2");

    let err = assert_err!(assistant.compare(&[]).await);
    assert!(matches!(err, AssistantError::InvalidInput(_)));
}

#[tokio::test]
async fn test_similar_and_missing_product() {
    let assistant = assistant();

    let similar = assert_ok!(assistant.similar("p1").await);
    assert_eq!(similar.target_product.id, "p1");
    assert!(!ids(&similar.similar_products).contains(&"p1"));

    let err = assert_err!(assistant.similar("nope").await);
    assert_eq!(err, AssistantError::ProductNotFound("nope".to_string()));
}

#[tokio::test]
async fn test_direct_search_has_no_session_effects() {
    let assistant = assistant();
    let results = assert_ok!(assistant.search("phone").await);

    assert_eq!(results.total, 3);
    assert_eq!(assistant.sessions().len().await, 0);
    assert_err!(assistant.search("   ").await);
}

#[tokio::test]
async fn test_status_reports_counts() {
    let assistant = assistant();
    assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "hello")).await);

    let status = assistant.status().await;
    assert!(status.generator_configured);
    assert_eq!(status.product_count, 5);
    assert_eq!(status.session_count, 1);
}

#[tokio::test]
async fn test_unmatched_brand_keeps_budget_matches() {
    let assistant = assistant();
    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "بدي موبايل سامسونج تحت 200")).await);

    assert_eq!(reply.intent, Intent::Prices);
    assert!(!reply.text.contains("ما لقيت منتجات تطابق طلبك بالضبط"));
    // No Samsung phone sells under 200, so the in-budget phones are shown
    assert_eq!(ids(&reply.products), vec!["p2", "p5"]);
    for p in &reply.products {
        assert!(p.effective_price().unwrap() <= 200.0);
    }
    assert_eq!(reply.context.favorite_brands, vec!["samsung"]);
}

struct SilentDetector;

impl LanguageDetector for SilentDetector {
    fn detect(&self, _text: &str) -> Option<Lang> {
        None
    }
}

#[tokio::test]
async fn test_undetected_language_uses_default() {
    let assistant = assistant()
        .with_detector(Box::new(SilentDetector))
        .with_default_lang(Lang::En);
    let reply = assert_ok!(assistant.handle_turn(TurnRequest::new("s1", "بدي موبايل")).await);

    assert_eq!(reply.lang, Lang::En);
    assert!(reply.text.contains("Here are the best options:"));
}
