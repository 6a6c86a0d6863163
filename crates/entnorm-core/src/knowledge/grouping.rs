//! Reverse index: mention → canonical mappings folded into canonical → mentions clusters.

use indexmap::IndexMap;

use super::store::Cluster;

/// Groups every `(mention, canonical)` pair by its canonical value.
///
/// Clusters appear in first-seen order of their canonical value and members
/// keep the mapping's insertion order. A mention is appended only if the
/// cluster does not already hold it. The input is not modified.
pub fn group_by_value(mapping: &IndexMap<String, String>) -> Cluster {
    let mut clusters: Cluster = IndexMap::new();
    for (mention, canonical) in mapping {
        let members = clusters.entry(canonical.clone()).or_default();
        if !members.contains(mention) {
            members.push(mention.clone());
        }
    }
    clusters
}
