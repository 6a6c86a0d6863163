//! Built-in sample batches.

use entnorm_core::{BatchMode, BatchReport, KnowledgeBase, ResolveError, Resolver};

pub struct DemoBatch {
    pub category: &'static str,
    pub mode: BatchMode,
    pub mentions: &'static [&'static str],
}

pub const BATCHES: &[DemoBatch] = &[
    DemoBatch {
        category: "companies",
        mode: BatchMode::Cascade,
        mentions: &["NVIDIA", "Microsoft Corp", "Nvidia Ireland", "M&S Ltd"],
    },
    DemoBatch {
        category: "products",
        mode: BatchMode::Cascade,
        mentions: &["Plastic bottle", "Hardwood Table", "Transistor", "Computer", "Container"],
    },
    DemoBatch {
        category: "locations",
        mode: BatchMode::Cascade,
        mentions: &["London", "Hong Kong", "Beijing", "Barcelona", "San Francisco", "Cape Town"],
    },
    DemoBatch {
        category: "serial numbers",
        mode: BatchMode::Structured,
        mentions: &["XYZ 13423 / ILD", "XYZ--13423-ILD", "ABC 13423 / ILD", "xyz.13423.ild"],
    },
    DemoBatch {
        category: "addresses",
        mode: BatchMode::Fuzzy { threshold: None },
        mentions: &["44 CHINA Rd, London", "44, CHINA Rd Hong Kong", "221B Baker Street", "Baker Street 221B"],
    },
];

/// Runs every batch whose category is declared; returns one report per batch run.
pub async fn run(resolver: &Resolver, kb: &KnowledgeBase) -> Result<Vec<BatchReport>, ResolveError> {
    let mut reports = Vec::new();
    for batch in BATCHES {
        if !kb.contains(batch.category) {
            tracing::warn!(category = batch.category, "Demo category not declared, skipping");
            continue;
        }
        println!("{} {} {}", "*".repeat(30), batch.category.to_uppercase(), "*".repeat(30));
        let report = resolver
            .run_batch(batch.mode, batch.mentions, batch.category, kb)
            .await?;
        reports.push(report);
    }
    Ok(reports)
}
