//! In-memory knowledge base with one lockable table per declared category.
//!
//! The set of categories is closed: it is fixed when the [`KnowledgeBase`] is
//! built and nothing can add or drop a category afterwards. Each category sits
//! behind its own `tokio::sync::Mutex`, so work on one category is serialized
//! while different categories proceed independently. Entry counts are
//! mirrored into atomics so status reads never wait on a running batch.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use super::grouping::group_by_value;
use crate::error::ResolveError;

/// Canonical value → ordered, duplicate-free list of mentions.
pub type Cluster = IndexMap<String, Vec<String>>;

/// Storage layout of a category, fixed at declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Mention → canonical value. Used by the free-text matching cascade.
    Alias,
    /// Canonical key → mentions. Used by structured and fuzzy resolution,
    /// and by alias categories after [`KnowledgeBase::cluster_in_place`].
    Cluster,
}

impl CategoryKind {
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::Cluster => "cluster",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A category name together with its storage kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDecl {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: CategoryKind,
}

fn default_kind() -> CategoryKind {
    CategoryKind::Alias
}

impl CategoryDecl {
    pub fn new(name: impl Into<String>, kind: CategoryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl From<&str> for CategoryDecl {
    fn from(name: &str) -> Self {
        Self::new(name, CategoryKind::Alias)
    }
}

impl From<String> for CategoryDecl {
    fn from(name: String) -> Self {
        Self::new(name, CategoryKind::Alias)
    }
}

impl<S: Into<String>> From<(S, CategoryKind)> for CategoryDecl {
    fn from((name, kind): (S, CategoryKind)) -> Self {
        Self::new(name, kind)
    }
}

/// Typed contents of a category. Both layouts preserve insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entries {
    Alias(IndexMap<String, String>),
    Cluster(Cluster),
}

impl Entries {
    fn empty(kind: CategoryKind) -> Self {
        match kind {
            CategoryKind::Alias => Self::Alias(IndexMap::new()),
            CategoryKind::Cluster => Self::Cluster(IndexMap::new()),
        }
    }

    pub fn kind(&self) -> CategoryKind {
        match self {
            Self::Alias(_) => CategoryKind::Alias,
            Self::Cluster(_) => CategoryKind::Cluster,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Alias(m) => m.len(),
            Self::Cluster(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lock-free mirror of a category's size and layout, updated on every
/// insert and on clustering.
#[derive(Debug, Default)]
struct Tally {
    entries: AtomicUsize,
    clustered: AtomicBool,
}

impl Tally {
    fn record(&self, entries: &Entries) {
        self.entries.store(entries.len(), Ordering::Release);
        self.clustered
            .store(entries.kind() == CategoryKind::Cluster, Ordering::Release);
    }

    fn kind(&self) -> CategoryKind {
        if self.clustered.load(Ordering::Acquire) {
            CategoryKind::Cluster
        } else {
            CategoryKind::Alias
        }
    }

    fn len(&self) -> usize {
        self.entries.load(Ordering::Acquire)
    }
}

/// One declared category and its entries.
#[derive(Debug)]
pub struct Category {
    name: String,
    entries: Entries,
    tally: Arc<Tally>,
}

impl Category {
    fn new(decl: CategoryDecl) -> Self {
        let entries = Entries::empty(decl.kind);
        let tally = Arc::new(Tally::default());
        tally.record(&entries);
        Self {
            entries,
            name: decl.name,
            tally,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CategoryKind {
        self.entries.kind()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    fn mismatch(&self, expected: CategoryKind) -> ResolveError {
        ResolveError::KindMismatch {
            category: self.name.clone(),
            expected,
            found: self.kind(),
        }
    }

    /// Mention → canonical table; fails with `KindMismatch` on cluster categories.
    pub fn aliases(&self) -> Result<&IndexMap<String, String>, ResolveError> {
        match &self.entries {
            Entries::Alias(m) => Ok(m),
            Entries::Cluster(_) => Err(self.mismatch(CategoryKind::Alias)),
        }
    }

    /// Canonical → mentions table; fails with `KindMismatch` on alias categories.
    pub fn clusters(&self) -> Result<&Cluster, ResolveError> {
        match &self.entries {
            Entries::Cluster(m) => Ok(m),
            Entries::Alias(_) => Err(self.mismatch(CategoryKind::Cluster)),
        }
    }

    /// Fails unless the category has the given kind.
    pub fn expect_kind(&self, expected: CategoryKind) -> Result<(), ResolveError> {
        if self.kind() == expected {
            Ok(())
        } else {
            Err(self.mismatch(expected))
        }
    }

    /// Stores `mention → value`. Returns false (and leaves the table alone)
    /// when `mention` is already a key.
    pub fn insert_alias(&mut self, mention: &str, value: &str) -> Result<bool, ResolveError> {
        let expected = CategoryKind::Alias;
        let Entries::Alias(map) = &mut self.entries else {
            return Err(self.mismatch(expected));
        };
        if map.contains_key(mention) {
            return Ok(false);
        }
        map.insert(mention.to_string(), value.to_string());
        self.tally.record(&self.entries);
        tracing::debug!(
            target: "entnorm::knowledge",
            category = %self.name,
            key = mention,
            value = value,
            action = "INSERT",
            "[{}] inserted alias '{}' -> '{}'",
            self.name,
            mention,
            value
        );
        Ok(true)
    }

    /// Creates `key → mentions` if `key` is new. Returns false when the key already exists.
    pub fn insert_cluster(&mut self, key: &str, mentions: Vec<String>) -> Result<bool, ResolveError> {
        let expected = CategoryKind::Cluster;
        let Entries::Cluster(map) = &mut self.entries else {
            return Err(self.mismatch(expected));
        };
        if map.contains_key(key) {
            return Ok(false);
        }
        let mut deduped: Vec<String> = Vec::with_capacity(mentions.len());
        for m in mentions {
            if !deduped.contains(&m) {
                deduped.push(m);
            }
        }
        tracing::debug!(
            target: "entnorm::knowledge",
            category = %self.name,
            key = key,
            members = deduped.len(),
            action = "INSERT",
            "[{}] created cluster '{}' ({} members)",
            self.name,
            key,
            deduped.len()
        );
        map.insert(key.to_string(), deduped);
        self.tally.record(&self.entries);
        Ok(true)
    }

    /// Appends `mention` to the list under an existing `key`, skipping duplicates.
    /// Returns whether the list grew.
    pub fn push_member(&mut self, key: &str, mention: &str) -> Result<bool, ResolveError> {
        let expected = CategoryKind::Cluster;
        let Entries::Cluster(map) = &mut self.entries else {
            return Err(self.mismatch(expected));
        };
        let Some(members) = map.get_mut(key) else {
            return Ok(false);
        };
        if members.iter().any(|m| m == mention) {
            return Ok(false);
        }
        members.push(mention.to_string());
        tracing::debug!(
            target: "entnorm::knowledge",
            category = %self.name,
            key = key,
            member = mention,
            action = "UPDATE",
            "[{}] appended '{}' to cluster '{}'",
            self.name,
            mention,
            key
        );
        Ok(true)
    }

    /// Clustered view without mutating anything.
    pub fn grouped(&self) -> Cluster {
        match &self.entries {
            Entries::Alias(m) => group_by_value(m),
            Entries::Cluster(m) => m.clone(),
        }
    }

    pub fn snapshot(&self) -> CategorySnapshot {
        CategorySnapshot {
            name: self.name.clone(),
            kind: self.kind(),
            entries: self.entries.clone(),
        }
    }
}

/// Serializable copy of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub name: String,
    pub kind: CategoryKind,
    pub entries: Entries,
}

/// Status information for a single category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStatus {
    pub name: String,
    pub kind: CategoryKind,
    pub entry_count: usize,
}

/// The mutable store of categories.
///
/// Share it behind an `Arc`; all mutation goes through the per-category lock
/// returned by [`KnowledgeBase::lock`].
pub struct KnowledgeBase {
    order: Vec<String>,
    categories: HashMap<String, Slot>,
}

struct Slot {
    cell: Mutex<Category>,
    tally: Arc<Tally>,
}

impl KnowledgeBase {
    /// Builds a knowledge base with exactly the given categories, all empty.
    pub fn new<I, D>(decls: I) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = D>,
        D: Into<CategoryDecl>,
    {
        let mut order = Vec::new();
        let mut categories = HashMap::new();
        for decl in decls {
            let decl = decl.into();
            if categories.contains_key(&decl.name) {
                return Err(ResolveError::DuplicateCategory(decl.name));
            }
            let name = decl.name.clone();
            let category = Category::new(decl);
            let slot = Slot {
                tally: Arc::clone(&category.tally),
                cell: Mutex::new(category),
            };
            order.push(name.clone());
            categories.insert(name, slot);
        }
        tracing::info!(
            target: "entnorm::knowledge",
            categories = order.len(),
            "Knowledge base initialized with {} categories: {}",
            order.len(),
            order.join(", ")
        );
        Ok(Self { order, categories })
    }

    /// Shorthand for a knowledge base made only of alias categories.
    pub fn with_alias_categories<I, S>(names: I) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|n| CategoryDecl::new(n, CategoryKind::Alias)))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Category names in declaration order.
    pub fn category_names(&self) -> &[String] {
        &self.order
    }

    /// Acquires the exclusive lock on a category.
    pub async fn lock(&self, name: &str) -> Result<MutexGuard<'_, Category>, ResolveError> {
        let slot = self
            .categories
            .get(name)
            .ok_or_else(|| ResolveError::UnknownCategory(name.to_string()))?;
        Ok(slot.cell.lock().await)
    }

    pub async fn snapshot(&self, name: &str) -> Result<CategorySnapshot, ResolveError> {
        Ok(self.lock(name).await?.snapshot())
    }

    /// Returns status for every category in declaration order.
    ///
    /// Reads the per-category tallies and takes no lock, so it answers while
    /// batches are running. Counts reflect the last completed insert.
    pub async fn status(&self) -> Vec<CategoryStatus> {
        self.order
            .iter()
            .filter_map(|name| {
                let slot = self.categories.get(name)?;
                Some(CategoryStatus {
                    name: name.clone(),
                    kind: slot.tally.kind(),
                    entry_count: slot.tally.len(),
                })
            })
            .collect()
    }

    /// Canonical → mentions view of a category. Does not modify the category.
    pub async fn grouped(&self, name: &str) -> Result<Cluster, ResolveError> {
        Ok(self.lock(name).await?.grouped())
    }

    /// Replaces an alias category with its clustered form and returns the clusters.
    ///
    /// This is destructive and one-way: the mention → canonical table is
    /// discarded, the category becomes [`CategoryKind::Cluster`], and the
    /// free-text cascade can no longer run against it. On a category that is
    /// already clustered this is a no-op.
    pub async fn cluster_in_place(&self, name: &str) -> Result<Cluster, ResolveError> {
        let mut cat = self.lock(name).await?;
        if let Entries::Alias(map) = &cat.entries {
            let clusters = group_by_value(map);
            tracing::info!(
                target: "entnorm::knowledge",
                category = name,
                mentions = map.len(),
                clusters = clusters.len(),
                action = "CLUSTER",
                "[{}] replaced {} aliases with {} clusters",
                name,
                map.len(),
                clusters.len()
            );
            cat.entries = Entries::Cluster(clusters);
            cat.tally.record(&cat.entries);
        }
        Ok(cat.clusters()?.clone())
    }
}
