//! Assistant service: wires the pipeline stages into the public operations

use crate::catalog::CatalogCache;
use crate::composer::{suggestions, ComposeRequest, ReplyComposer};
use crate::criteria;
use crate::error::{AssistantError, AssistantResult};
use crate::intent;
use crate::language::{LanguageDetector, ScriptLanguageDetector};
use crate::opening::{apology, build_sales_prompt, complaint_opening, OpeningGenerator};
use crate::ranking::{ProductRanker, SEARCH_LIMIT};
use crate::session::{ReferenceKind, Resolution, SessionStore};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MAX_PAYLOAD_PRODUCTS: usize = 8;
pub const MAX_PAYLOAD_LISTINGS: usize = 12;
pub const SIMILAR_LIMIT: usize = 6;

/// One conversational turn
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub lang: Option<Lang>,
    /// Caller-side transcript lines; only used for the generation prompt
    #[serde(default)]
    pub history: Vec<String>,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantStatus {
    pub generator_configured: bool,
    pub product_count: usize,
    pub session_count: usize,
}

/// Main assistant service (thread-safe via Arc)
pub struct Assistant {
    catalog: Arc<CatalogCache>,
    ranker: Arc<ProductRanker>,
    composer: ReplyComposer,
    sessions: Arc<dyn SessionStore>,
    generator: Option<Arc<dyn OpeningGenerator>>,
    detector: Box<dyn LanguageDetector>,
    default_lang: Lang,
}

pub type SharedAssistant = Arc<Assistant>;

impl Assistant {
    pub fn new(catalog: Arc<CatalogCache>, sessions: Arc<dyn SessionStore>) -> Self {
        let ranker = Arc::new(ProductRanker::default());
        Self {
            catalog,
            composer: ReplyComposer::new(ranker.clone()),
            ranker,
            sessions,
            generator: None,
            detector: Box::new(ScriptLanguageDetector),
            default_lang: Lang::default(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn OpeningGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_detector(mut self, detector: Box<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_default_lang(mut self, lang: Lang) -> Self {
        self.default_lang = lang;
        self
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub async fn status(&self) -> AssistantStatus {
        AssistantStatus {
            generator_configured: self.generator.is_some(),
            product_count: self.catalog.peek().map_or(0, |s| s.products.len()),
            session_count: self.sessions.len().await,
        }
    }

    /// Run one conversational turn for a session.
    ///
    /// Blank messages are rejected before the session store is touched.
    pub async fn handle_turn(&self, req: TurnRequest) -> AssistantResult<ReplyPayload> {
        let message = req.message.trim();
        if message.is_empty() {
            return Err(AssistantError::InvalidInput("message is required".to_string()));
        }
        let session_id = req.session_id.trim();
        if session_id.is_empty() {
            return Err(AssistantError::InvalidInput("session_id is required".to_string()));
        }

        let lang = req
            .lang
            .or_else(|| self.detector.detect(message))
            .unwrap_or(self.default_lang);
        let snapshot = self.catalog.snapshot().await;

        // Held for the whole turn so turns of one session never interleave
        let handle = self.sessions.checkout(session_id).await;
        let mut ctx = handle.lock().await;

        let resolution = ctx.resolve_reference(message);
        let mut criteria = criteria::extract(&resolution.text);
        let (mut intent, prefs) = intent::classify(&resolution.text);

        if resolution.kind == Some(ReferenceKind::Alternatives) && !intent.shows_products() {
            debug!("Alternatives follow-up treated as browse");
            intent = Intent::Browse;
        }
        if criteria.price_range.is_none() {
            if let Some(budget) = prefs.budget {
                criteria.price_range = Some(PriceRange {
                    min: None,
                    max: Some(budget as u64),
                });
            }
        }

        let candidates = match intent {
            i if i.shows_products() => self.product_candidates(i, &criteria, &resolution, &snapshot),
            Intent::Compare => ctx.last_products.clone(),
            _ => Vec::new(),
        };

        let opening = match intent {
            Intent::Complaint => complaint_opening(lang).to_string(),
            _ => self.opening(&resolution.text, &snapshot, &req.history, lang).await,
        };

        let reply = self.composer.compose(&ComposeRequest {
            opening: &opening,
            intent,
            preferences: &prefs,
            candidates: &candidates,
            snapshot: &snapshot,
            lang,
        });

        info!(
            "Turn session={} intent={} candidates={} fallback={}",
            session_id,
            intent,
            candidates.len(),
            reply.used_fallback
        );

        let categories: Vec<Category> = match intent {
            Intent::Categories => snapshot.categories.iter().take(MAX_PAYLOAD_LISTINGS).cloned().collect(),
            _ => Vec::new(),
        };
        let brands: Vec<Brand> = match intent {
            Intent::Brands => snapshot.brands.iter().take(MAX_PAYLOAD_LISTINGS).cloned().collect(),
            _ => Vec::new(),
        };
        let products: Vec<Product> = match intent {
            Intent::Compare => candidates,
            _ => reply.products.clone(),
        };

        ctx.update(message, intent, &prefs, &reply.products);
        ctx.record_listings(&categories, &brands);

        Ok(ReplyPayload {
            text: reply.text,
            products: products.into_iter().take(MAX_PAYLOAD_PRODUCTS).collect(),
            categories,
            brands,
            suggestions: suggestions(&ctx, &snapshot, intent, lang),
            intent,
            lang,
            context: ctx.clone(),
            timestamp: unix_now(),
        })
    }

    /// Ranked candidates for browse, prices and deals.
    ///
    /// A search that had to relax its keyword or price filter counts as no
    /// match, so the composer answers with its fallback instead. A relaxed
    /// brand keeps the in-budget matches for the requested kind of product.
    fn product_candidates(
        &self,
        intent: Intent,
        criteria: &SearchCriteria,
        resolution: &Resolution,
        snapshot: &CatalogSnapshot,
    ) -> Vec<Product> {
        if resolution.kind == Some(ReferenceKind::Alternatives) {
            if let Some(target) = resolution.product_id.as_deref().and_then(|id| snapshot.product(id)) {
                let similar = self.ranker.similar(target, snapshot, SIMILAR_LIMIT);
                return similar.into_iter().map(|r| r.product).collect();
            }
        }

        let unconstrained = criteria.keywords.is_empty() && criteria.price_range.is_none() && criteria.brand.is_none();
        if intent == Intent::Deals && unconstrained {
            return self
                .ranker
                .trending_deals(snapshot, SEARCH_LIMIT)
                .into_iter()
                .map(|r| r.product)
                .collect();
        }

        let outcome = self.ranker.search(criteria, snapshot);
        if outcome.missed_core_filter() {
            debug!("Search relaxed {:?}, using fallback", outcome.relaxed);
            return Vec::new();
        }

        let mut products = outcome.products();
        if intent == Intent::Deals {
            products.retain(Product::has_discount);
        }
        products
    }

    async fn opening(&self, message: &str, snapshot: &CatalogSnapshot, history: &[String], lang: Lang) -> String {
        let Some(ref generator) = self.generator else {
            return apology(lang).to_string();
        };

        let prompt = build_sales_prompt(message, snapshot, history, lang);
        match generator.generate(&prompt.system, &prompt.user).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Opening generation failed via '{}': {:?}", generator.name(), e);
                apology(lang).to_string()
            }
        }
    }

    /// Direct product search with no session effects
    pub async fn search(&self, query: &str) -> AssistantResult<SearchResults> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AssistantError::InvalidInput("query is required".to_string()));
        }

        let snapshot = self.catalog.snapshot().await;
        let outcome = self.ranker.search(&criteria::extract(query), &snapshot);
        let results = outcome.products();

        debug!("Search '{}' returned {} results", query, results.len());
        Ok(SearchResults {
            total: results.len(),
            results,
        })
    }

    pub async fn compare(&self, product_ids: &[String]) -> AssistantResult<ComparisonReport> {
        if product_ids.is_empty() || product_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(AssistantError::InvalidInput(
                "product_ids must be a non-empty list of ids".to_string(),
            ));
        }

        let ids: Vec<String> = product_ids.iter().map(|id| id.trim().to_string()).collect();
        let snapshot = self.catalog.snapshot().await;
        self.ranker.compare(&ids, &snapshot)
    }

    pub async fn similar(&self, product_id: &str) -> AssistantResult<SimilarProducts> {
        let product_id = product_id.trim();
        if product_id.is_empty() {
            return Err(AssistantError::InvalidInput("product id is required".to_string()));
        }

        let snapshot = self.catalog.snapshot().await;
        let target = snapshot
            .product(product_id)
            .ok_or_else(|| AssistantError::ProductNotFound(product_id.to_string()))?;

        let similar = self.ranker.similar(target, &snapshot, SIMILAR_LIMIT);
        Ok(SimilarProducts {
            target_product: target.clone(),
            similar_products: similar.into_iter().map(|r| r.product).collect(),
        })
    }
}
