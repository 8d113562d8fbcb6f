//! HTTP client for the store's public catalog API
use crate::catalog::CatalogSource;
use crate::types::{Brand, CatalogSnapshot, Category, Product};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    base_url: String,
    product_limit: usize,
    client: reqwest::Client,
}

/// Envelope used by every list endpoint of the catalog API
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl HttpCatalogSource {
    /// Create a new catalog source
    pub fn new(base_url: impl Into<String>, product_limit: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build catalog HTTP client")?;

        Ok(Self {
            base_url: base_url.into(),
            product_limit,
            client,
        })
    }

    /// Fetch products
    pub async fn get_products(&self) -> Result<Vec<Product>> {
        let url = format!("{}/api/v1/products?limit={}", self.base_url, self.product_limit);
        self.get_list(&url).await
    }

    /// Fetch categories
    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let url = format!("{}/api/v1/categories?limit=100", self.base_url);
        self.get_list(&url).await
    }

    /// Fetch brands
    pub async fn get_brands(&self) -> Result<Vec<Brand>> {
        let url = format!("{}/api/v1/brands?limit=100", self.base_url);
        self.get_list(&url).await
    }

    async fn get_list<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        debug!("Fetching catalog list from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to call catalog API at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Catalog API error {}: {}", status, body);
        }

        let list: ListResponse<T> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse catalog response from {}", url))?;

        debug!("Retrieved {} entries from {}", list.data.len(), url);
        Ok(list.data)
    }

    /// Health check
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/v1/categories?limit=1", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

fn or_empty<T>(what: &str, result: Result<Vec<T>>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            error!("Failed to fetch {}: {:?}", what, e);
            Vec::new()
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    fn name(&self) -> &'static str {
        "http_catalog"
    }

    async fn fetch(&self) -> CatalogSnapshot {
        let (products, categories, brands) =
            futures::join!(self.get_products(), self.get_categories(), self.get_brands());

        CatalogSnapshot::new(
            or_empty("products", products),
            or_empty("categories", categories),
            or_empty("brands", brands),
        )
    }
}
