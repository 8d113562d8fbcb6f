//! Per-session conversational memory and the store that owns it

use crate::criteria::normalize;
use crate::types::{unix_now, Brand, Category, Intent, Preferences, Product};
use async_trait::async_trait;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const MAX_LAST_PRODUCTS: usize = 5;
pub const MAX_LAST_LISTINGS: usize = 5;
pub const MAX_HISTORY: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub message: String,
    pub intent: Intent,
    pub timestamp: u64,  // unix seconds
}

/// Memory of one conversation, bounded regardless of its length
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionContext {
    pub favorite_brands: Vec<String>,
    pub product_interest: Vec<String>,
    pub current_budget: Option<u32>,
    pub last_products: Vec<Product>,  // most recent first
    pub last_categories: Vec<Category>,
    pub last_brands: Vec<Brand>,
    pub history: VecDeque<HistoryEntry>,
}

/// Kind of anaphoric reference found in a follow-up message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Alternatives,
    ProductDetails,
    SameBudget,
}

const REFERENCE_RULES: &[(ReferenceKind, &[&str])] = &[
    (
        ReferenceKind::Alternatives,
        &["show me others", "other options", "something else", "غيره", "غيرها", "بدائل", "خيارات ثانية", "شي ثاني"],
    ),
    (
        ReferenceKind::ProductDetails,
        &["what about it", "what do you think of it", "tell me more", "is it good", "رأيك فيه", "رايك فيه", "تفاصيله", "كيف هو"],
    ),
    (
        ReferenceKind::SameBudget,
        &["same price", "same budget", "نفس السعر", "نفس الميزانية"],
    ),
];

/// Message after reference resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub text: String,
    pub kind: Option<ReferenceKind>,
    pub product_id: Option<String>,
}

impl Resolution {
    fn unchanged(message: &str) -> Self {
        Self {
            text: message.to_string(),
            kind: None,
            product_id: None,
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

impl SessionContext {
    /// Rewrite a follow-up that points at earlier turns into a self-contained message
    pub fn resolve(&self, message: &str) -> String {
        self.resolve_reference(message).text
    }

    /// Like `resolve`, also reporting which reference matched.
    ///
    /// A reference whose slot is still empty leaves the message unchanged.
    pub fn resolve_reference(&self, message: &str) -> Resolution {
        let text = normalize(message);
        let Some(kind) = REFERENCE_RULES
            .iter()
            .find(|(_, triggers)| triggers.iter().any(|t| text.contains(t)))
            .map(|(kind, _)| *kind)
        else {
            return Resolution::unchanged(message);
        };

        let resolved = match kind {
            ReferenceKind::Alternatives => self
                .last_products
                .first()
                .map(|p| (format!("{} similar to {}", message, p.title), Some(p.id.clone()))),
            ReferenceKind::ProductDetails => self
                .last_products
                .first()
                .map(|p| (format!("{} {}", message, p.title), Some(p.id.clone()))),
            ReferenceKind::SameBudget => self
                .current_budget
                .map(|budget| (format!("{} under {}", message, budget), None)),
        };

        match resolved {
            Some((text, product_id)) => {
                debug!("Resolved {:?} reference: '{}' -> '{}'", kind, message, text);
                Resolution {
                    text,
                    kind: Some(kind),
                    product_id,
                }
            }
            None => Resolution::unchanged(message),
        }
    }

    /// Record the outcome of a turn
    pub fn update(&mut self, message: &str, intent: Intent, prefs: &Preferences, products: &[Product]) {
        self.history.push_back(HistoryEntry {
            message: message.to_string(),
            intent,
            timestamp: unix_now(),
        });
        while self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }

        if let Some(budget) = prefs.budget {
            self.current_budget = Some(budget);
        }
        if let Some(ref brand) = prefs.brand {
            push_unique(&mut self.favorite_brands, brand);
        }
        if let Some(product_type) = prefs.product_type {
            push_unique(&mut self.product_interest, product_type.as_str());
        }

        // A turn that shows nothing keeps the previous products referable
        if !products.is_empty() {
            self.last_products = products.iter().take(MAX_LAST_PRODUCTS).cloned().collect();
        }
    }

    /// Remember category and brand listings shown in a turn
    pub fn record_listings(&mut self, categories: &[Category], brands: &[Brand]) {
        if !categories.is_empty() {
            self.last_categories = categories.iter().take(MAX_LAST_LISTINGS).cloned().collect();
        }
        if !brands.is_empty() {
            self.last_brands = brands.iter().take(MAX_LAST_LISTINGS).cloned().collect();
        }
    }
}

/// Shared context of one session. Holding the lock serializes that session's turns.
pub type SessionHandle = Arc<tokio::sync::Mutex<SessionContext>>;

/// Trait for pluggable session backings
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Handle for the session, created empty on first use
    async fn checkout(&self, session_id: &str) -> SessionHandle;

    /// Copy of the session's current context, if it exists
    async fn peek(&self, session_id: &str) -> Option<SessionContext>;

    async fn len(&self) -> usize;
}

/// In-memory store with idle expiry and a least-recently-used bound
pub struct InMemorySessionStore {
    sessions: Cache<String, SessionHandle>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let sessions = Cache::builder()
            .max_capacity(capacity.max(1) as u64)
            .time_to_idle(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(|id: Arc<String>, _, cause| {
                debug!("Session '{}' evicted ({:?})", id, cause);
            })
            .build();

        Self { sessions }
    }

    /// Apply pending expiry and capacity evictions
    pub fn run_pending_tasks(&self) {
        self.sessions.run_pending_tasks();
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn checkout(&self, session_id: &str) -> SessionHandle {
        self.sessions.get_with(session_id.to_string(), SessionHandle::default)
    }

    async fn peek(&self, session_id: &str) -> Option<SessionContext> {
        let handle = self.sessions.get(session_id)?;
        let context = handle.lock().await;
        Some(context.clone())
    }

    async fn len(&self) -> usize {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductType;

    fn product(id: &str, title: &str) -> Product {
        Product {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            price: Some(100.0),
            price_after_discount: None,
            category: None,
            brand: None,
            sold: 0,
            rating_average: 0.0,
            rating_count: 0,
            image_cover: None,
        }
    }

    fn shown(ids: &[&str]) -> Vec<Product> {
        ids.iter().map(|id| product(id, &format!("Phone {}", id))).collect()
    }

    #[test]
    fn test_others_resolves_to_most_recent_product() {
        let mut ctx = SessionContext::default();
        ctx.update("بدي موبايل", Intent::Browse, &Preferences::default(), &shown(&["P1", "P2", "P3"]));

        let resolution = ctx.resolve_reference("show me others");
        assert_eq!(resolution.kind, Some(ReferenceKind::Alternatives));
        assert_eq!(resolution.product_id.as_deref(), Some("P1"));
        assert!(resolution.text.contains("Phone P1"));
    }

    #[test]
    fn test_reference_with_empty_slot_is_unchanged() {
        let ctx = SessionContext::default();
        assert_eq!(ctx.resolve("what about it?"), "what about it?");
        assert_eq!(ctx.resolve("نفس السعر"), "نفس السعر");
    }

    #[test]
    fn test_same_budget_uses_current_budget() {
        let mut ctx = SessionContext::default();
        let prefs = Preferences { budget: Some(250), ..Default::default() };
        ctx.update("سعر 250", Intent::Prices, &prefs, &[]);

        assert_eq!(ctx.resolve("laptop same price"), "laptop same price under 250");
    }

    #[test]
    fn test_plain_message_is_unchanged() {
        let mut ctx = SessionContext::default();
        ctx.update("x", Intent::Browse, &Preferences::default(), &shown(&["P1"]));
        let resolution = ctx.resolve_reference("بدي لابتوب");
        assert_eq!(resolution, Resolution::unchanged("بدي لابتوب"));
    }

    #[test]
    fn test_last_products_capped_and_replaced() {
        let mut ctx = SessionContext::default();
        ctx.update("a", Intent::Browse, &Preferences::default(), &shown(&["P1", "P2", "P3"]));
        ctx.update("b", Intent::Browse, &Preferences::default(), &shown(&["Q1", "Q2", "Q3", "Q4", "Q5", "Q6", "Q7"]));

        let ids: Vec<&str> = ctx.last_products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["Q1", "Q2", "Q3", "Q4", "Q5"]);

        // Nothing shown: previous products stay referable
        ctx.update("c", Intent::Info, &Preferences::default(), &[]);
        assert_eq!(ctx.last_products.len(), 5);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut ctx = SessionContext::default();
        for i in 0..15 {
            ctx.update(&format!("m{}", i), Intent::Info, &Preferences::default(), &[]);
        }
        assert_eq!(ctx.history.len(), MAX_HISTORY);
        assert_eq!(ctx.history.front().unwrap().message, "m5");
        assert_eq!(ctx.history.back().unwrap().message, "m14");
    }

    #[test]
    fn test_preferences_merge_idempotently() {
        let mut ctx = SessionContext::default();
        let prefs = Preferences {
            brand: Some("samsung".to_string()),
            product_type: Some(ProductType::Phone),
            budget: Some(300),
            ..Default::default()
        };
        ctx.update("a", Intent::Browse, &prefs, &[]);
        ctx.update("b", Intent::Browse, &prefs, &[]);
        let cheaper = Preferences { budget: Some(150), ..Default::default() };
        ctx.update("c", Intent::Prices, &cheaper, &[]);

        assert_eq!(ctx.favorite_brands, vec!["samsung"]);
        assert_eq!(ctx.product_interest, vec!["phone"]);
        assert_eq!(ctx.current_budget, Some(150));
    }

    #[tokio::test]
    async fn test_checkout_creates_lazily_and_reuses() {
        let store = InMemorySessionStore::new(Duration::from_secs(60), 10);
        assert_eq!(store.len().await, 0);
        assert!(store.peek("s1").await.is_none());

        let handle = store.checkout("s1").await;
        handle.lock().await.current_budget = Some(99);

        let again = store.checkout("s1").await;
        assert!(Arc::ptr_eq(&handle, &again));
        assert_eq!(store.peek("s1").await.unwrap().current_budget, Some(99));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = InMemorySessionStore::new(Duration::from_secs(60), 2);
        for id in ["a", "b", "a", "c"] {
            store.checkout(id).await;
            store.run_pending_tasks();
        }

        assert_eq!(store.len().await, 2);
        assert!(store.peek("a").await.is_some());
        assert!(store.peek("b").await.is_none());
        assert!(store.peek("c").await.is_some());
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let store = InMemorySessionStore::new(Duration::from_millis(50), 10);
        store.checkout("a").await;
        store.checkout("b").await;
        assert_eq!(store.len().await, 2);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.peek("a").await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_checkout_refreshes_idle_timer() {
        let store = InMemorySessionStore::new(Duration::from_millis(150), 10);
        let handle = store.checkout("a").await;
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(60)).await;
            store.checkout("a").await;
        }

        let again = store.checkout("a").await;
        assert!(Arc::ptr_eq(&handle, &again));
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_block_each_other() {
        let store = InMemorySessionStore::new(Duration::from_secs(60), 10);
        let a = store.checkout("a").await;
        let _held = a.lock().await;

        // Another session's lock is free while "a" is held
        let b = store.checkout("b").await;
        assert!(b.try_lock().is_ok());
    }
}
