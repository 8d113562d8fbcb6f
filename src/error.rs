//! Error taxonomy surfaced by the core operations

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssistantError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("at least 2 products are required for comparison, found {found}")]
    InsufficientProducts { found: usize },
    #[error("product not found: {0}")]
    ProductNotFound(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

pub type AssistantResult<T> = Result<T, AssistantError>;
