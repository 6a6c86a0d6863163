//! Knowledge base: a closed set of named categories holding resolved mentions.
//!
//! | Kind      | Layout                         | Written by                                |
//! |-----------|--------------------------------|-------------------------------------------|
//! | `alias`   | mention → canonical value      | free-text matching cascade                |
//! | `cluster` | canonical key → [mentions]     | structured and fuzzy resolution, clustering |
//!
//! Categories never cross: every lookup and every write is scoped to one.

mod grouping;
mod store;

pub use grouping::group_by_value;
pub use store::{
    Category, CategoryDecl, CategoryKind, CategorySnapshot, CategoryStatus, Cluster, Entries,
    KnowledgeBase,
};
