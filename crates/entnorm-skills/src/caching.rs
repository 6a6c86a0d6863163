//! Memoizing oracle decorator.

use dashmap::DashMap;
use entnorm_core::{CanonicalizationOracle, CollaboratorError};

/// Caches successful, non-empty candidate lists per exact query text.
///
/// Errors and empty answers pass through uncached so a later call can retry.
pub struct CachingOracle<O> {
    inner: O,
    cache: DashMap<String, Vec<String>>,
}

impl<O: CanonicalizationOracle> CachingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait::async_trait]
impl<O: CanonicalizationOracle> CanonicalizationOracle for CachingOracle<O> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn query(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        if let Some(hit) = self.cache.get(text) {
            tracing::debug!(target: "entnorm::search", query = text, "Oracle cache hit");
            return Ok(hit.value().clone());
        }
        let candidates = self.inner.query(text).await?;
        if !candidates.is_empty() {
            self.cache.insert(text.to_string(), candidates.clone());
        }
        Ok(candidates)
    }
}
