//! Environment-driven configuration for the assistant service

use crate::types::Lang;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub catalog_base_url: String,
    pub port: u16,
    pub catalog_ttl: Duration,
    pub catalog_timeout: Duration,
    pub catalog_product_limit: usize,
    pub session_ttl: Duration,
    pub session_capacity: usize,
    pub generator_url: Option<String>,  // None disables generation entirely
    pub generator_timeout: Duration,
    pub response_cache_ttl: Duration,
    pub default_lang: Lang,
    pub log_level: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: "https://www.zuhall.com".to_string(),
            port: 3001,
            catalog_ttl: Duration::from_secs(300),
            catalog_timeout: Duration::from_secs(5),
            catalog_product_limit: 50,
            session_ttl: Duration::from_secs(1800),
            session_capacity: 10_000,
            generator_url: None,
            generator_timeout: Duration::from_secs(20),
            response_cache_ttl: Duration::from_secs(7200),
            default_lang: Lang::Ar,
            log_level: "info".to_string(),
        }
    }
}

impl AssistantConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_lang = match get("DEFAULT_LANG") {
            Some(tag) => Lang::parse(&tag)
                .with_context(|| format!("DEFAULT_LANG has unsupported value '{}'", tag))?,
            None => defaults.default_lang,
        };

        Ok(Self {
            catalog_base_url: get("ZUHALL_BASE")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.catalog_base_url),
            port: parse_or(&get, "PORT", defaults.port)?,
            catalog_ttl: secs_or(&get, "CATALOG_TTL_SECS", defaults.catalog_ttl)?,
            catalog_timeout: secs_or(&get, "CATALOG_TIMEOUT_SECS", defaults.catalog_timeout)?,
            catalog_product_limit: parse_or(&get, "CATALOG_PRODUCT_LIMIT", defaults.catalog_product_limit)?,
            session_ttl: secs_or(&get, "SESSION_TTL_SECS", defaults.session_ttl)?,
            session_capacity: parse_or(&get, "SESSION_CAPACITY", defaults.session_capacity)?,
            generator_url: get("GENERATOR_URL"),
            generator_timeout: secs_or(&get, "GENERATOR_TIMEOUT_SECS", defaults.generator_timeout)?,
            response_cache_ttl: secs_or(&get, "RESPONSE_CACHE_TTL_SECS", defaults.response_cache_ttl)?,
            default_lang,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    parse_or(get, key, default.as_secs()).map(Duration::from_secs)
}
