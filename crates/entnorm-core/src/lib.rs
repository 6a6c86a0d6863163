//! entnorm-core: entity normalization engine.
//!
//! Collapses noisy, differently spelled or translated mentions of the same
//! real-world entity into one canonical entry per category. The knowledge base
//! holds a closed set of categories; the [`Resolver`] runs the matching
//! cascade against it and calls out to injected collaborators (a
//! canonicalization oracle and an optional translator) only when it has to.

mod error;
mod fuzzy;
mod knowledge;
mod normalize;
mod resolver;
mod search;
mod shared;

pub use error::{CollaboratorError, ResolveError};

pub use fuzzy::{
    partial_ratio, partial_token_set_ratio, ratio, token_set_ratio, FuzzyPolicy, Scorer,
    DEFAULT_THRESHOLD,
};

pub use knowledge::{
    group_by_value, Category, CategoryDecl, CategoryKind, CategorySnapshot, CategoryStatus,
    Cluster, Entries, KnowledgeBase,
};

pub use normalize::{fold, normalize, tokens, SEPARATOR};

pub use resolver::{
    BatchMode, BatchReport, CanonicalizationOracle, ItemReport, Outcome, Resolution, Resolver,
    Translation, TranslationService,
};

pub use search::{SearchBackend, WideningPolicy, WideningSearch};

pub use shared::{default_categories, CoreConfig, SearchConfig, TranslateConfig, CONFIG_PATH_ENV};
