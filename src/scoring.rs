//! Scoring functions for catalog products

use crate::types::*;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub title_hit: f64,
    pub description_hit: f64,
    pub price_distance: f64,  // max penalty for being far from the target price
    pub sold_cap: f64,
    pub sold_divisor: f64,
    pub rating: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            title_hit: 3.0,
            description_hit: 1.0,
            price_distance: 2.0,
            sold_cap: 2.0,
            sold_divisor: 10.0,
            rating: 0.4,
        }
    }
}

/// Title match outranks description match; only one of them counts
pub fn keyword_relevance(product: &Product, keywords: &BTreeSet<String>, weights: &ScoreWeights) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }

    let title = product.title.to_lowercase();
    if keywords.iter().any(|kw| title.contains(kw.as_str())) {
        return weights.title_hit;
    }

    let description = product.description.to_lowercase();
    if keywords.iter().any(|kw| description.contains(kw.as_str())) {
        weights.description_hit
    } else {
        0.0
    }
}

/// Relative distance to the range target, bounded by the weight
pub fn price_distance_penalty(product: &Product, range: Option<&PriceRange>, weights: &ScoreWeights) -> f64 {
    let (Some(target), Some(price)) = (range.and_then(PriceRange::target), product.effective_price()) else {
        return 0.0;
    };

    let relative = (price - target).abs() / target.max(1.0);
    (relative * weights.price_distance).min(weights.price_distance)
}

pub fn sales_boost(product: &Product, weights: &ScoreWeights) -> f64 {
    (product.sold as f64 / weights.sold_divisor).min(weights.sold_cap)
}

/// Composite search score for a product that survived filtering
pub fn search_score(product: &Product, criteria: &SearchCriteria, weights: &ScoreWeights) -> f64 {
    keyword_relevance(product, &criteria.keywords, weights)
        - price_distance_penalty(product, criteria.price_range.as_ref(), weights)
        + sales_boost(product, weights)
        + weights.rating * product.rating_average
}

/// Score used when there is nothing to match against
pub fn popularity_score(product: &Product) -> f64 {
    (product.sold as f64 / 5.0).min(5.0)
        + 0.5 * product.rating_average
        + (product.rating_count as f64 / 10.0).min(2.0)
}

fn title_words(product: &Product) -> HashSet<String> {
    product
        .title
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.to_string())
        .collect()
}

fn same_ref(a: Option<&EntityRef>, b: Option<&EntityRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same_as(b),
        _ => false,
    }
}

fn within_ratio(price: Option<f64>, target: Option<f64>, ratio: f64) -> bool {
    match (price, target) {
        (Some(price), Some(target)) => (price - target).abs() <= target * ratio,
        _ => false,
    }
}

/// How alike `candidate` is to `target`: category, brand, price band, title overlap
pub fn similarity_score(target: &Product, candidate: &Product) -> f64 {
    let mut score = 0.0;

    if same_ref(target.category.as_ref(), candidate.category.as_ref()) {
        score += 3.0;
    }
    if same_ref(target.brand.as_ref(), candidate.brand.as_ref()) {
        score += 2.0;
    }
    if within_ratio(candidate.effective_price(), target.effective_price(), 0.2) {
        score += 2.0;
    }

    let common = title_words(target).intersection(&title_words(candidate)).count();
    score + common as f64
}
