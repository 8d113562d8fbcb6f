//! Product ranking: soft-filtered search, similarity, comparison and fallbacks

use crate::error::{AssistantError, AssistantResult};
use crate::scoring::{popularity_score, search_score, similarity_score, ScoreWeights};
use crate::types::*;
use std::collections::HashSet;
use tracing::debug;

/// Maximum number of results a search returns
pub const SEARCH_LIMIT: usize = 10;

const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// Keep only the candidates matching `keep`, unless that would leave none.
///
/// Returns the narrowed set and whether the stage had to be skipped.
fn soft_filter<'a, F>(candidates: Vec<&'a Product>, keep: F) -> (Vec<&'a Product>, bool)
where
    F: Fn(&Product) -> bool,
{
    let narrowed: Vec<&Product> = candidates.iter().copied().filter(|p| keep(*p)).collect();
    if narrowed.is_empty() && !candidates.is_empty() {
        (candidates, true)
    } else {
        (narrowed, false)
    }
}

/// Sort descending by score; equal scores keep catalog order
fn rank(mut ranked: Vec<RankedProduct>, limit: usize) -> Vec<RankedProduct> {
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

pub struct ProductRanker {
    weights: ScoreWeights,
}

impl Default for ProductRanker {
    fn default() -> Self {
        Self::new(ScoreWeights::default())
    }
}

impl ProductRanker {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Filter the snapshot by criteria and return the top results.
    ///
    /// Every filter stage is soft: a stage that would eliminate all remaining
    /// candidates is skipped and recorded in `relaxed`.
    pub fn search(&self, criteria: &SearchCriteria, snapshot: &CatalogSnapshot) -> SearchOutcome {
        let mut candidates: Vec<&Product> = snapshot.products.iter().collect();
        let mut relaxed = Vec::new();

        if !criteria.keywords.is_empty() {
            let (kept, skipped) = soft_filter(candidates, |p| {
                let title = p.title.to_lowercase();
                let description = p.description.to_lowercase();
                criteria
                    .keywords
                    .iter()
                    .any(|kw| title.contains(kw.as_str()) || description.contains(kw.as_str()))
            });
            candidates = kept;
            if skipped {
                relaxed.push(FilterStage::Keyword);
            }
        }

        if let Some(range) = criteria.price_range {
            let (kept, skipped) = soft_filter(candidates, |p| {
                p.effective_price().map_or(false, |price| range.contains(price))
            });
            candidates = kept;
            if skipped {
                relaxed.push(FilterStage::Price);
            }
        }

        if let Some(ref brand) = criteria.brand {
            let brand = brand.to_lowercase();
            let (kept, skipped) = soft_filter(candidates, |p| {
                p.title.to_lowercase().contains(&brand)
                    || p
                        .brand
                        .as_ref()
                        .and_then(|b| b.name.as_ref())
                        .map_or(false, |name| name.to_lowercase() == brand)
            });
            candidates = kept;
            if skipped {
                relaxed.push(FilterStage::Brand);
            }
        }

        if !relaxed.is_empty() {
            debug!("Search relaxed filter stages: {:?}", relaxed);
        }

        let scored = candidates
            .into_iter()
            .map(|p| RankedProduct {
                score: search_score(p, criteria, &self.weights),
                product: p.clone(),
            })
            .collect();

        SearchOutcome {
            results: rank(scored, SEARCH_LIMIT),
            relaxed,
        }
    }

    /// Products most like `target`, excluding it and anything scoring zero
    pub fn similar(&self, target: &Product, snapshot: &CatalogSnapshot, limit: usize) -> Vec<RankedProduct> {
        let scored = snapshot
            .products
            .iter()
            .filter(|p| p.id != target.id)
            .map(|p| RankedProduct {
                score: similarity_score(target, p),
                product: p.clone(),
            })
            .filter(|r| r.score > 0.0)
            .collect();

        rank(scored, limit)
    }

    /// Side-by-side report for the given products.
    ///
    /// Unknown and repeated ids are ignored; fewer than 2 resolved products
    /// is an error.
    pub fn compare(&self, product_ids: &[String], snapshot: &CatalogSnapshot) -> AssistantResult<ComparisonReport> {
        let mut seen = HashSet::new();
        let products: Vec<&Product> = product_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| snapshot.product(id))
            .collect();

        if products.len() < 2 {
            return Err(AssistantError::InsufficientProducts { found: products.len() });
        }

        let entries = products.iter().map(|p| comparison_entry(p)).collect();

        // Single linear scan; the first product wins ties
        let mut cheapest: Option<(&Product, f64)> = None;
        let mut highest_rated: Option<&Product> = None;
        let mut best_discount: Option<(&Product, f64)> = None;

        for &p in &products {
            if let Some(price) = p.effective_price() {
                if cheapest.map_or(true, |(_, best)| price < best) {
                    cheapest = Some((p, price));
                }
            }
            if highest_rated.map_or(true, |best| p.rating_average > best.rating_average) {
                highest_rated = Some(p);
            }
            let discount = p.discount_percent();
            if discount > 0.0 && best_discount.map_or(true, |(_, best)| discount > best) {
                best_discount = Some((p, discount));
            }
        }

        Ok(ComparisonReport {
            products: entries,
            summary: ComparisonSummary {
                cheapest: cheapest.map(|(p, _)| pick(p)),
                highest_rated: highest_rated.map(pick),
                best_discount: best_discount.map(|(p, _)| pick(p)),
            },
        })
    }

    /// Best sellers by sales, rating and review count
    pub fn popular(&self, snapshot: &CatalogSnapshot, limit: usize) -> Vec<RankedProduct> {
        let scored = snapshot
            .products
            .iter()
            .map(|p| RankedProduct {
                score: popularity_score(p),
                product: p.clone(),
            })
            .collect();

        rank(scored, limit)
    }

    /// Genuinely discounted products, largest discount first
    pub fn trending_deals(&self, snapshot: &CatalogSnapshot, limit: usize) -> Vec<RankedProduct> {
        let scored = snapshot
            .products
            .iter()
            .filter(|p| p.has_discount())
            .map(|p| RankedProduct {
                score: p.discount_percent(),
                product: p.clone(),
            })
            .collect();

        rank(scored, limit)
    }
}

fn pick(p: &Product) -> ProductPick {
    ProductPick {
        id: p.id.clone(),
        title: p.title.clone(),
    }
}

fn comparison_entry(p: &Product) -> ComparisonEntry {
    ComparisonEntry {
        id: p.id.clone(),
        title: p.title.clone(),
        price: p.effective_price(),
        original_price: p.price,
        discount_percent: (p.discount_percent() * 10.0).round() / 10.0,
        rating: p.rating_average,
        rating_count: p.rating_count,
        sold: p.sold,
        description: truncate_chars(&p.description, DESCRIPTION_PREVIEW_CHARS),
    }
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
