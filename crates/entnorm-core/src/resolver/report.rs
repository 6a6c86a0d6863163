//! Per-item outcomes and batch reports returned to callers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ResolveError;

/// What happened to one mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// A new canonical entry was created under `key`.
    Added { key: String },
    /// Stored as a new alias of the existing key `alias_of`, sharing its `value`.
    Linked { alias_of: String, value: String },
    /// `key` already existed. `alias_added` is true when the mention was
    /// appended to the key's member list.
    AlreadyPresent { key: String, alias_added: bool },
}

impl Outcome {
    /// The canonical identity the mention now resolves to.
    pub fn canonical(&self) -> &str {
        match self {
            Self::Added { key } | Self::AlreadyPresent { key, .. } => key,
            Self::Linked { value, .. } => value,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Linked { .. } => "linked",
            Self::AlreadyPresent { .. } => "already_present",
        }
    }
}

/// Successful resolution of a single mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The mention as supplied.
    pub mention: String,
    /// The text used for matching and storage (translated when translation ran).
    pub stored_as: String,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ItemReport {
    Resolved(Resolution),
    Failed { mention: String, error: String },
}

impl ItemReport {
    pub(crate) fn from_result(mention: &str, result: Result<Resolution, ResolveError>) -> Self {
        match result {
            Ok(r) => Self::Resolved(r),
            Err(e) => Self::Failed {
                mention: mention.to_string(),
                error: e.to_string(),
            },
        }
    }

    pub fn mention(&self) -> &str {
        match self {
            Self::Resolved(r) => &r.mention,
            Self::Failed { mention, .. } => mention,
        }
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        match self {
            Self::Resolved(r) => Some(r),
            Self::Failed { .. } => None,
        }
    }
}

/// Per-item results of one batch call, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub category: String,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub(crate) fn new(category: &str) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            category: category.to_string(),
            items: Vec::new(),
        }
    }

    pub fn resolved(&self) -> impl Iterator<Item = &Resolution> {
        self.items.iter().filter_map(ItemReport::resolution)
    }

    pub fn failed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, ItemReport::Failed { .. }))
            .count()
    }

    /// Number of items whose outcome has the given label.
    pub fn count(&self, label: &str) -> usize {
        self.resolved().filter(|r| r.outcome.label() == label).count()
    }
}
