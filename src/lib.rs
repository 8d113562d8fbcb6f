//! Zuhall Assist - conversational shopping assistant backend
//!
//! Turns a customer message plus per-session memory into a structured reply:
//! - Deterministic criteria extraction and intent classification
//! - Soft-filtered product search, similarity and comparison
//! - Session-scoped reference resolution ("show me others")
//! - Templated replies around an externally generated opening line

pub mod types;
pub mod error;
pub mod config;
pub mod catalog;
pub mod catalog_client;
pub mod criteria;
pub mod intent;
pub mod scoring;
pub mod ranking;
pub mod session;
pub mod composer;
pub mod cache;
pub mod language;
pub mod opening;
pub mod assistant;
pub mod server;

pub use types::*;
pub use error::{AssistantError, AssistantResult};
pub use config::AssistantConfig;
pub use catalog::{CatalogCache, CatalogSource, StaticCatalog};
pub use catalog_client::HttpCatalogSource;
pub use ranking::ProductRanker;
pub use session::{InMemorySessionStore, SessionContext, SessionHandle, SessionStore};
pub use cache::{InMemoryResponseCache, ResponseCache};
pub use language::{LanguageDetector, ScriptLanguageDetector};
pub use opening::{CachedGenerator, HttpOpeningGenerator, OpeningGenerator, StaticOpening};
pub use assistant::{Assistant, SharedAssistant, TurnRequest};

#[cfg(test)]
mod tests;
