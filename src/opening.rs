//! Opening-sentence generation: prompt construction, generators and memoization

use crate::cache::ResponseCache;
use crate::composer::{price_text, sanitize_response};
use crate::types::{CatalogSnapshot, Lang};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub const MAX_PROMPT_ITEMS: usize = 10;
pub const MAX_HISTORY_LINES: usize = 5;
const MAX_NEW_TOKENS: usize = 60;

const AR_SYSTEM_PROMPT: &str = "\
أنت زحل AI، مساعد مبيعات ذكي في متجر Zuhall الإلكتروني. مهمتك ترويج المنتجات بذكاء، تقديم اقتراحات مخصّصة، ومساعدة العميل بأسلوب ودود.

الأسلوب:
- لهجة سعودية طبيعية، ودودة، ومختصرة (1-3 جمل).
- ركّز على فوائد المنتج (السعر، الخصومات، الميزات).
- قدم اقتراحات مخصّصة بناءً على الميزانية أو التفضيلات.
- إذا كانت الرسالة غامضة، اسأل سؤال ذكي (مثل: \"تحب نركّز على السعر ولا المواصفات؟\").
- تجنب العبارات الآلية، استخدم بدائل بشرية (مثل: \"وش تبغى نشوف لك؟\").";

const EN_SYSTEM_PROMPT: &str = "\
You are Zuhall AI, a smart and friendly sales assistant. Respond in natural, \
concise English (1-3 sentences), focusing on product benefits and personalized suggestions.";

pub fn system_prompt(lang: Lang) -> &'static str {
    match lang {
        Lang::Ar => AR_SYSTEM_PROMPT,
        Lang::En => EN_SYSTEM_PROMPT,
    }
}

/// Opening used when generation is unavailable or fails
pub fn apology(lang: Lang) -> &'static str {
    match lang {
        Lang::Ar => "فيه مشكلة تقنية، بس أقدر أساعدك! قولي وش تبغى وأرشح لك.",
        Lang::En => "We hit a technical issue, but I can still help! Tell me what you need and I'll recommend something.",
    }
}

/// Opening that replaces any generated text for complaints
pub fn complaint_opening(lang: Lang) -> &'static str {
    match lang {
        Lang::Ar => "آسفين جدًا على أي إزعاج! قولي وش المشكلة بالضبط وأحلها لك على طول.",
        Lang::En => "We're really sorry for the trouble! Tell me exactly what happened and I'll fix it right away.",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesPrompt {
    pub system: String,
    pub user: String,
}

/// Build the generation prompt from store context, recent history and the message
pub fn build_sales_prompt(message: &str, snapshot: &CatalogSnapshot, history: &[String], lang: Lang) -> SalesPrompt {
    let unavailable = match lang {
        Lang::Ar => "غير متاح",
        Lang::En => "unavailable",
    };
    let or_unavailable = |s: String| if s.is_empty() { unavailable.to_string() } else { s };

    let categories = or_unavailable(
        snapshot.categories.iter().take(MAX_PROMPT_ITEMS).map(|c| c.name.as_str()).collect::<Vec<_>>().join(", "),
    );
    let brands = or_unavailable(
        snapshot.brands.iter().take(MAX_PROMPT_ITEMS).map(|b| b.name.as_str()).collect::<Vec<_>>().join(", "),
    );
    let products = or_unavailable(
        snapshot
            .products
            .iter()
            .take(MAX_PROMPT_ITEMS)
            .map(|p| match lang {
                Lang::Ar => format!("- {} | السعر: {}", p.title, price_text(p, lang)),
                Lang::En => format!("- {} | price: {}", p.title, price_text(p, lang)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    );

    let skip = history.len().saturating_sub(MAX_HISTORY_LINES);
    let recent: Vec<&str> = history[skip..].iter().map(String::as_str).collect();

    let user = match lang {
        Lang::Ar => {
            let mut user = format!(
                "سياق المتجر:\nالتصنيفات: {}\nالماركات: {}\nعينات منتجات:\n{}\n\n",
                categories, brands, products
            );
            if !recent.is_empty() {
                user.push_str(&format!("آخر المحادثة:\n{}\n\n", recent.join("\n")));
            }
            user.push_str(&format!("رسالة العميل: {}", message));
            user
        }
        Lang::En => {
            let mut user = format!(
                "Store context:\nCategories: {}\nBrands: {}\nSample products:\n{}\n\n",
                categories, brands, products
            );
            if !recent.is_empty() {
                user.push_str(&format!("Recent conversation:\n{}\n\n", recent.join("\n")));
            }
            user.push_str(&format!("Customer message: {}", message));
            user
        }
    };

    SalesPrompt {
        system: system_prompt(lang).to_string(),
        user,
    }
}

/// Trait for pluggable opening-sentence producers
#[async_trait]
pub trait OpeningGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// Fixed opening for tests and offline runs. `failing()` always errors.
pub struct StaticOpening {
    text: Option<String>,
}

impl StaticOpening {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()) }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl OpeningGenerator for StaticOpening {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
        match self.text {
            Some(ref text) => Ok(text.clone()),
            None => anyhow::bail!("static opening configured to fail"),
        }
    }
}

/// Request to the text generation service
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    system: &'a str,
    user: &'a str,
    max_new_tokens: usize,
}

/// Response from the text generation service
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Opening generator backed by an HTTP text generation service
pub struct HttpOpeningGenerator {
    service_url: String,
    client: reqwest::Client,
}

impl HttpOpeningGenerator {
    pub fn new(service_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build generator HTTP client")?;

        Ok(Self {
            service_url: service_url.into(),
            client,
        })
    }

    /// Health check
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.service_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl OpeningGenerator for HttpOpeningGenerator {
    fn name(&self) -> &'static str {
        "http_generator"
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/generate", self.service_url);
        let request = GenerateRequest {
            system,
            user,
            max_new_tokens: MAX_NEW_TOKENS,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to call generator at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Generator API error {}: {}", status, body);
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse generator response")?;

        debug!("Generator returned {} chars", generated.text.chars().count());
        Ok(generated.text.trim().to_string())
    }
}

/// Memoizes another generator by user prompt. Failures are not cached.
pub struct CachedGenerator {
    inner: Arc<dyn OpeningGenerator>,
    cache: Arc<dyn ResponseCache>,
    ttl: Duration,
}

impl CachedGenerator {
    pub fn new(inner: Arc<dyn OpeningGenerator>, cache: Arc<dyn ResponseCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    pub fn cache_key(user: &str) -> String {
        format!("sales:{}", user)
    }
}

#[async_trait]
impl OpeningGenerator for CachedGenerator {
    fn name(&self) -> &'static str {
        "cached"
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let key = Self::cache_key(user);
        if let Some(cached) = self.cache.get(&key).await {
            info!("Returning cached response");
            return Ok(cached);
        }

        let text = sanitize_response(&self.inner.generate(system, user).await?);
        self.cache.set(&key, text.clone(), self.ttl).await;
        Ok(text)
    }
}
