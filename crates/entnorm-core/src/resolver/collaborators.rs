//! Interfaces to the external services the resolver depends on.
//!
//! Both are injected into [`Resolver`](super::Resolver) as trait objects so
//! tests can substitute deterministic doubles for live network calls.

use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

/// Maps a free-text query to ranked candidate canonical identifiers.
#[async_trait::async_trait]
pub trait CanonicalizationOracle: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Candidates best-first; an empty list means nothing suitable was found.
    async fn query(&self, text: &str) -> Result<Vec<String>, CollaboratorError>;
}

/// Result of a successful translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub translated_text: String,
    /// Language code detected for the input (e.g. "es").
    pub source_language: String,
    /// The text that was submitted.
    pub original: String,
}

/// Translates mentions to the resolver's working language.
#[async_trait::async_trait]
pub trait TranslationService: Send + Sync {
    fn name(&self) -> &str;

    /// `CollaboratorError::Unavailable` signals a temporary outage such as rate limiting.
    async fn translate(&self, text: &str, target: &str) -> Result<Translation, CollaboratorError>;
}
