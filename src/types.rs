//! Core type definitions for the shopping assistant pipeline

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::SystemTime;

/// Reference to a category or brand as embedded in a product record.
///
/// The catalog API populates these as `{ "name": ... }` objects, but older
/// records carry only the bare id string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct EntityRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl EntityRef {
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
        }
    }

    /// Two references match by id when both carry one, otherwise by name
    pub fn same_as(&self, other: &EntityRef) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => match (&self.name, &other.name) {
                (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
                _ => false,
            },
        }
    }
}

impl<'de> Deserialize<'de> for EntityRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Id(String),
            Full {
                #[serde(default, alias = "_id")]
                id: Option<String>,
                #[serde(default)]
                name: Option<String>,
            },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Id(id) => EntityRef { id: Some(id), name: None },
            Repr::Full { id, name } => EntityRef { id, name },
        })
    }
}

pub type CategoryRef = EntityRef;
pub type BrandRef = EntityRef;

/// Immutable product record owned by a catalog snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub price_after_discount: Option<f64>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub brand: Option<BrandRef>,
    #[serde(default)]
    pub sold: u64,
    #[serde(default, rename = "ratingsAverage")]
    pub rating_average: f64,  // 0.0-5.0
    #[serde(default, rename = "ratingsQuantity")]
    pub rating_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_cover: Option<String>,
}

impl Product {
    /// Discounted price, only when it is strictly below the list price
    pub fn discounted_price(&self) -> Option<f64> {
        match (self.price_after_discount, self.price) {
            (Some(discounted), Some(list)) if discounted >= 0.0 && discounted < list => {
                Some(discounted)
            }
            _ => None,
        }
    }

    /// The price a customer actually pays
    pub fn effective_price(&self) -> Option<f64> {
        self.discounted_price().or(self.price)
    }

    pub fn has_discount(&self) -> bool {
        self.discounted_price().is_some()
    }

    /// (original - discounted) / original as a percentage, 0.0 without a discount
    pub fn discount_percent(&self) -> f64 {
        match (self.discounted_price(), self.price) {
            (Some(discounted), Some(list)) if list > 0.0 => (list - discounted) / list * 100.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
}

/// Current wall-clock time in unix seconds
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Point-in-time copy of the catalog, replaced wholesale on refresh
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub brands: Vec<Brand>,
    pub fetched_at: SystemTime,
}

impl CatalogSnapshot {
    pub fn new(products: Vec<Product>, categories: Vec<Category>, brands: Vec<Brand>) -> Self {
        Self {
            products,
            categories,
            brands,
            fetched_at: SystemTime::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![], vec![], vec![])
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        self.min.map_or(true, |min| price >= min as f64)
            && self.max.map_or(true, |max| price <= max as f64)
    }

    /// Reference price used for the distance term during scoring
    pub fn target(&self) -> Option<f64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some((min + max) as f64 / 2.0),
            (Some(min), None) => Some(min as f64),
            (None, Some(max)) => Some(max as f64),
            (None, None) => None,
        }
    }
}

/// Structured search criteria derived from one message
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchCriteria {
    pub keywords: BTreeSet<String>,
    pub price_range: Option<PriceRange>,
    pub brand: Option<String>,
    pub specs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Info,
    Prices,
    Deals,
    Categories,
    Brands,
    Browse,
    Complaint,
    Compare,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Info => "info",
            Intent::Prices => "prices",
            Intent::Deals => "deals",
            Intent::Categories => "categories",
            Intent::Brands => "brands",
            Intent::Browse => "browse",
            Intent::Complaint => "complaint",
            Intent::Compare => "compare",
        }
    }

    /// Intents whose reply lists ranked products
    pub fn shows_products(&self) -> bool {
        matches!(self, Intent::Browse | Intent::Prices | Intent::Deals)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Phone,
    Laptop,
    Headphones,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Phone => "phone",
            ProductType::Laptop => "laptop",
            ProductType::Headphones => "headphones",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Explicit,
    Implicit,
    #[default]
    General,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub focus: Option<String>,
    pub budget: Option<u32>,
    pub brand: Option<String>,
    pub product_type: Option<ProductType>,
    pub request_type: RequestType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Ar,
    En,
}

impl Lang {
    pub fn parse(tag: &str) -> Option<Lang> {
        match tag.trim().to_lowercase().as_str() {
            "ar" | "arabic" => Some(Lang::Ar),
            "en" | "english" => Some(Lang::En),
            _ => None,
        }
    }
}

/// Product with the score it was ranked by
#[derive(Debug, Clone, Serialize)]
pub struct RankedProduct {
    pub product: Product,
    pub score: f64,
}

/// Stage of the search pipeline that narrows candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterStage {
    Keyword,
    Price,
    Brand,
}

/// Result of a search, including which soft filters had to be skipped
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<RankedProduct>,
    pub relaxed: Vec<FilterStage>,
}

impl SearchOutcome {
    /// True when every applicable filter matched at least one product
    pub fn is_exact(&self) -> bool {
        self.relaxed.is_empty()
    }

    /// True when a keyword or price filter was skipped. A skipped brand
    /// filter still leaves results that match what was asked for.
    pub fn missed_core_filter(&self) -> bool {
        self.relaxed
            .iter()
            .any(|stage| matches!(stage, FilterStage::Keyword | FilterStage::Price))
    }

    pub fn products(&self) -> Vec<Product> {
        self.results.iter().map(|r| r.product.clone()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub results: Vec<Product>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarProducts {
    pub target_product: Product,
    pub similar_products: Vec<Product>,
}

/// One row of a comparison table
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonEntry {
    pub id: String,
    pub title: String,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub discount_percent: f64,
    pub rating: f64,
    pub rating_count: u64,
    pub sold: u64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductPick {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSummary {
    pub cheapest: Option<ProductPick>,
    pub highest_rated: Option<ProductPick>,
    pub best_discount: Option<ProductPick>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub products: Vec<ComparisonEntry>,
    pub summary: ComparisonSummary,
}

/// Final structured reply for one conversational turn
#[derive(Debug, Clone, Serialize)]
pub struct ReplyPayload {
    pub text: String,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub brands: Vec<Brand>,
    pub suggestions: Vec<String>,
    pub intent: Intent,
    pub lang: Lang,
    pub context: crate::session::SessionContext,
    pub timestamp: u64,
}
