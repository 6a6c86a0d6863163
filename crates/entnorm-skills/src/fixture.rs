//! Offline oracle answering from a JSON map of query → candidates.

use entnorm_core::{CanonicalizationOracle, CollaboratorError};
use std::collections::HashMap;
use std::path::Path;

pub struct FixtureOracle {
    entries: HashMap<String, Vec<String>>,
    case_insensitive: bool,
}

impl FixtureOracle {
    pub fn new(entries: HashMap<String, Vec<String>>) -> Self {
        Self {
            entries,
            case_insensitive: false,
        }
    }

    /// Parses `{"query": ["candidate", ...], ...}`.
    pub fn from_json_str(json: &str) -> Result<Self, CollaboratorError> {
        let entries: HashMap<String, Vec<String>> =
            serde_json::from_str(json).map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        Ok(Self::new(entries))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CollaboratorError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CollaboratorError::Transport(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Match queries ignoring case when no exact entry exists.
    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, text: &str) -> Option<&Vec<String>> {
        self.entries.get(text).or_else(|| {
            if !self.case_insensitive {
                return None;
            }
            let lower = text.to_lowercase();
            self.entries
                .iter()
                .find(|(k, _)| k.to_lowercase() == lower)
                .map(|(_, v)| v)
        })
    }
}

#[async_trait::async_trait]
impl CanonicalizationOracle for FixtureOracle {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn query(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.lookup(text).cloned().unwrap_or_default())
    }
}
