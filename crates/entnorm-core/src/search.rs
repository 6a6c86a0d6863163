//! Candidate search over paged web results with bounded query widening.
//!
//! Results are read a page at a time and filtered down to encyclopedia-style
//! URLs. When the page budget for a query runs out before enough candidates
//! are found, the query is widened with a prefix and paging starts over. The
//! number of widenings is capped; running out of them yields an empty
//! candidate list.

use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::resolver::CanonicalizationOracle;

/// One page of raw result URLs for a query.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// URLs ranked `start..start + count`. An empty page means no more results.
    async fn page(
        &self,
        query: &str,
        start: usize,
        count: usize,
    ) -> Result<Vec<String>, CollaboratorError>;
}

/// Paging, filtering and widening limits for [`WideningSearch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WideningPolicy {
    /// Stop as soon as this many candidates are collected.
    pub candidates: usize,
    pub page_size: usize,
    /// Last start offset fetched for one query before widening.
    pub page_budget: usize,
    /// How many times the query may be widened after the first attempt.
    pub max_broadenings: usize,
    pub broaden_prefix: String,
    /// A URL must contain this to count as a candidate.
    pub require: String,
    /// A URL containing any of these is skipped (media and file pages).
    pub reject: Vec<String>,
}

impl Default for WideningPolicy {
    fn default() -> Self {
        Self {
            candidates: 1,
            page_size: 5,
            page_budget: 15,
            max_broadenings: 2,
            broaden_prefix: "wikipedia ".to_string(),
            require: "wikipedia".to_string(),
            reject: vec!["File:".to_string()],
        }
    }
}

impl WideningPolicy {
    pub fn accepts(&self, url: &str) -> bool {
        url.contains(&self.require) && !self.reject.iter().any(|r| url.contains(r.as_str()))
    }
}

/// [`CanonicalizationOracle`] backed by a [`SearchBackend`].
pub struct WideningSearch<B> {
    backend: B,
    policy: WideningPolicy,
}

impl<B: SearchBackend> WideningSearch<B> {
    pub fn new(backend: B, policy: WideningPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &WideningPolicy {
        &self.policy
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Collects up to `policy.candidates` accepted URLs, first-seen order, no duplicates.
    ///
    /// A backend error ends the search: whatever was already collected is
    /// returned, otherwise the error is.
    pub async fn search(&self, query: &str) -> Result<Vec<String>, CollaboratorError> {
        let want = self.policy.candidates.max(1);
        let page_size = self.policy.page_size.max(1);
        let mut found: Vec<String> = Vec::new();
        let mut current = query.to_string();

        for step in 0..=self.policy.max_broadenings {
            if step > 0 {
                current = format!("{}{}", self.policy.broaden_prefix, current);
                tracing::debug!(
                    target: "entnorm::search",
                    step,
                    query = %current,
                    "widening query after {} pages without enough candidates",
                    self.policy.page_budget / page_size + 1
                );
            }

            let mut start = 0;
            while start <= self.policy.page_budget {
                let urls = match self.backend.page(&current, start, page_size).await {
                    Ok(urls) => urls,
                    Err(e) => {
                        tracing::warn!(
                            target: "entnorm::search",
                            backend = self.backend.name(),
                            query = %current,
                            start,
                            error = %e,
                            "search backend failed"
                        );
                        return if found.is_empty() { Err(e) } else { Ok(found) };
                    }
                };
                if urls.is_empty() {
                    break;
                }
                for url in urls {
                    if self.policy.accepts(&url) && !found.contains(&url) {
                        found.push(url);
                        if found.len() >= want {
                            return Ok(found);
                        }
                    }
                }
                start += page_size;
            }
        }

        tracing::debug!(
            target: "entnorm::search",
            query,
            found = found.len(),
            "widening budget exhausted"
        );
        Ok(found)
    }
}

#[async_trait::async_trait]
impl<B: SearchBackend> CanonicalizationOracle for WideningSearch<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn query(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        self.search(text).await
    }
}
