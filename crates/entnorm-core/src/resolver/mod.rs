//! Entity Resolution Engine: decides, per mention, whether it names an entry
//! the knowledge base already holds or needs fresh canonicalization.
//!
//! Three resolution modes, one per category layout:
//!
//! | Mode         | Category kind | Match strategy                                   |
//! |--------------|---------------|--------------------------------------------------|
//! | cascade      | alias         | exact key → case-insensitive containment → oracle |
//! | structured   | cluster       | [`normalize`](crate::normalize::normalize)d key   |
//! | fuzzy        | cluster       | best token-set score above a threshold           |
//!
//! Every operation holds the category lock for its whole duration, including
//! collaborator calls, so resolutions within one category never interleave.

mod collaborators;
mod report;

pub use collaborators::{CanonicalizationOracle, Translation, TranslationService};
pub use report::{BatchReport, ItemReport, Outcome, Resolution};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ResolveError;
use crate::fuzzy::FuzzyPolicy;
use crate::knowledge::{Category, CategoryKind, KnowledgeBase};
use crate::normalize::{fold, normalize};

/// Batch resolution mode, selecting the operation applied to every mention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BatchMode {
    Cascade,
    Structured,
    /// `threshold` overrides the resolver's fuzzy policy for this batch.
    Fuzzy {
        #[serde(default)]
        threshold: Option<f64>,
    },
}

impl BatchMode {
    pub fn required_kind(&self) -> CategoryKind {
        match self {
            Self::Cascade => CategoryKind::Alias,
            Self::Structured | Self::Fuzzy { .. } => CategoryKind::Cluster,
        }
    }
}

/// The resolution engine. Holds injected collaborators; all mutable state
/// lives in the [`KnowledgeBase`] passed to each call.
pub struct Resolver {
    oracle: Arc<dyn CanonicalizationOracle>,
    translator: Option<Arc<dyn TranslationService>>,
    target_language: String,
    fuzzy: FuzzyPolicy,
}

impl Resolver {
    pub fn new(oracle: Arc<dyn CanonicalizationOracle>) -> Self {
        Self {
            oracle,
            translator: None,
            target_language: "en".to_string(),
            fuzzy: FuzzyPolicy::default(),
        }
    }

    /// Enables translation of cascade mentions into `target_language` before matching.
    pub fn with_translator(
        mut self,
        translator: Arc<dyn TranslationService>,
        target_language: impl Into<String>,
    ) -> Self {
        self.translator = Some(translator);
        self.target_language = target_language.into();
        self
    }

    pub fn with_fuzzy_policy(mut self, policy: FuzzyPolicy) -> Self {
        self.fuzzy = policy;
        self
    }

    pub fn fuzzy_policy(&self) -> &FuzzyPolicy {
        &self.fuzzy
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Resolves a free-text mention against an alias category.
    pub async fn resolve(
        &self,
        mention: &str,
        category: &str,
        kb: &KnowledgeBase,
    ) -> Result<Resolution, ResolveError> {
        let mut cat = kb.lock(category).await?;
        cat.expect_kind(CategoryKind::Alias)?;
        self.cascade(mention, &mut cat).await
    }

    /// Resolves an identifier-like token by its normalized key. Never calls a collaborator.
    pub async fn resolve_structured(
        &self,
        token: &str,
        category: &str,
        kb: &KnowledgeBase,
    ) -> Result<Resolution, ResolveError> {
        let mut cat = kb.lock(category).await?;
        cat.expect_kind(CategoryKind::Cluster)?;
        Self::structured(token, &mut cat)
    }

    /// Resolves free text by similarity to existing keys. A best score strictly
    /// above `threshold` merges; anything else creates a new upper-cased key.
    pub async fn resolve_fuzzy(
        &self,
        text: &str,
        category: &str,
        kb: &KnowledgeBase,
        threshold: f64,
    ) -> Result<Resolution, ResolveError> {
        let mut cat = kb.lock(category).await?;
        cat.expect_kind(CategoryKind::Cluster)?;
        self.fuzzy(text, &mut cat, threshold)
    }

    /// Runs `mode` over every mention, holding the category lock for the whole batch.
    ///
    /// `UnknownCategory` and `KindMismatch` are returned before any mention is
    /// touched. Per-item failures are recorded in the report and the batch
    /// carries on.
    pub async fn run_batch<S: AsRef<str>>(
        &self,
        mode: BatchMode,
        mentions: &[S],
        category: &str,
        kb: &KnowledgeBase,
    ) -> Result<BatchReport, ResolveError> {
        let mut cat = kb.lock(category).await?;
        cat.expect_kind(mode.required_kind())?;

        let mut report = BatchReport::new(category);
        tracing::info!(
            target: "entnorm::resolver",
            batch_id = %report.batch_id,
            category,
            mode = ?mode,
            items = mentions.len(),
            "Starting batch"
        );
        for mention in mentions {
            let mention = mention.as_ref();
            let result = match mode {
                BatchMode::Cascade => self.cascade(mention, &mut cat).await,
                BatchMode::Structured => Self::structured(mention, &mut cat),
                BatchMode::Fuzzy { threshold } => {
                    self.fuzzy(mention, &mut cat, threshold.unwrap_or(self.fuzzy.threshold))
                }
            };
            if let Err(e) = &result {
                tracing::warn!(
                    target: "entnorm::resolver",
                    batch_id = %report.batch_id,
                    category,
                    mention,
                    error = %e,
                    "Mention not resolved"
                );
            }
            report.items.push(ItemReport::from_result(mention, result));
        }
        Ok(report)
    }

    pub async fn resolve_batch<S: AsRef<str>>(
        &self,
        mentions: &[S],
        category: &str,
        kb: &KnowledgeBase,
    ) -> Result<BatchReport, ResolveError> {
        self.run_batch(BatchMode::Cascade, mentions, category, kb).await
    }

    pub async fn resolve_structured_batch<S: AsRef<str>>(
        &self,
        tokens: &[S],
        category: &str,
        kb: &KnowledgeBase,
    ) -> Result<BatchReport, ResolveError> {
        self.run_batch(BatchMode::Structured, tokens, category, kb).await
    }

    pub async fn resolve_fuzzy_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        category: &str,
        kb: &KnowledgeBase,
        threshold: Option<f64>,
    ) -> Result<BatchReport, ResolveError> {
        self.run_batch(BatchMode::Fuzzy { threshold }, texts, category, kb)
            .await
    }

    async fn cascade(&self, mention: &str, cat: &mut Category) -> Result<Resolution, ResolveError> {
        let trimmed = mention.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::EmptyMention);
        }
        let (text, warning) = self.translate(trimmed).await;

        let aliases = cat.aliases()?;
        if let Some(value) = aliases.get(&text) {
            let outcome = Outcome::AlreadyPresent {
                key: value.clone(),
                alias_added: false,
            };
            return Ok(Self::finish(cat, mention, text, outcome, warning));
        }

        let folded = fold(&text);
        let contained = aliases.iter().find_map(|(key, value)| {
            let k = fold(key);
            (folded.contains(&k) || k.contains(&folded)).then(|| (key.clone(), value.clone()))
        });
        if let Some((alias_of, value)) = contained {
            cat.insert_alias(&text, &value)?;
            let outcome = Outcome::Linked { alias_of, value };
            return Ok(Self::finish(cat, mention, text, outcome, warning));
        }

        let key = self.canonicalize(&text, cat.name()).await?;
        cat.insert_alias(&text, &key)?;
        Ok(Self::finish(cat, mention, text, Outcome::Added { key }, warning))
    }

    fn structured(token: &str, cat: &mut Category) -> Result<Resolution, ResolveError> {
        let trimmed = token.trim();
        let key = normalize(trimmed);
        if key.is_empty() {
            return Err(ResolveError::EmptyMention);
        }
        let outcome = if cat.clusters()?.contains_key(&key) {
            let alias_added = cat.push_member(&key, trimmed)?;
            Outcome::AlreadyPresent { key, alias_added }
        } else {
            cat.insert_cluster(&key, vec![trimmed.to_string()])?;
            Outcome::Added { key }
        };
        Ok(Self::finish(cat, token, trimmed.to_string(), outcome, None))
    }

    fn fuzzy(&self, text: &str, cat: &mut Category, threshold: f64) -> Result<Resolution, ResolveError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::EmptyMention);
        }
        let policy = FuzzyPolicy::new(threshold, self.fuzzy.scorer);

        let best = policy
            .scorer
            .best_match(trimmed, cat.clusters()?.keys().map(String::as_str))
            .map(|(key, score)| (key.to_string(), score));
        if let Some((key, score)) = best {
            tracing::debug!(
                target: "entnorm::resolver",
                category = cat.name(),
                text = trimmed,
                best = %key,
                score,
                threshold,
                "Best fuzzy candidate"
            );
            if policy.accepts(score) {
                let alias_added = cat.push_member(&key, trimmed)?;
                let outcome = Outcome::AlreadyPresent { key, alias_added };
                return Ok(Self::finish(cat, text, trimmed.to_string(), outcome, None));
            }
        }

        let key = trimmed.to_uppercase();
        let outcome = if cat.insert_cluster(&key, Vec::new())? {
            Outcome::Added { key }
        } else {
            Outcome::AlreadyPresent {
                key,
                alias_added: false,
            }
        };
        Ok(Self::finish(cat, text, trimmed.to_string(), outcome, None))
    }

    /// Translated text, or the input plus a warning when translation is unavailable.
    async fn translate(&self, text: &str) -> (String, Option<String>) {
        let Some(translator) = &self.translator else {
            return (text.to_string(), None);
        };
        match translator.translate(text, &self.target_language).await {
            Ok(t) if !t.translated_text.trim().is_empty() => {
                tracing::debug!(
                    target: "entnorm::resolver",
                    original = text,
                    translated = %t.translated_text,
                    source_language = %t.source_language,
                    "Translated mention"
                );
                (t.translated_text.trim().to_string(), None)
            }
            Ok(_) => {
                let warning = format!(
                    "{} returned an empty translation; matched untranslated text",
                    translator.name()
                );
                tracing::warn!(target: "entnorm::resolver", mention = text, "{}", warning);
                (text.to_string(), Some(warning))
            }
            Err(e) => {
                let warning = format!("translation unavailable ({e}); matched untranslated text");
                tracing::warn!(
                    target: "entnorm::resolver",
                    translator = translator.name(),
                    mention = text,
                    error = %e,
                    "Translation failed, continuing untranslated"
                );
                (text.to_string(), Some(warning))
            }
        }
    }

    /// First non-blank oracle candidate. Collaborator errors count as no candidate.
    async fn canonicalize(&self, text: &str, category: &str) -> Result<String, ResolveError> {
        let candidates = match self.oracle.query(text).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    target: "entnorm::resolver",
                    oracle = self.oracle.name(),
                    category,
                    mention = text,
                    error = %e,
                    "Oracle query failed"
                );
                Vec::new()
            }
        };
        candidates
            .into_iter()
            .map(|c| c.trim().to_string())
            .find(|c| !c.is_empty())
            .ok_or_else(|| ResolveError::NoCandidateFound {
                mention: text.to_string(),
            })
    }

    fn finish(
        cat: &Category,
        mention: &str,
        stored_as: String,
        outcome: Outcome,
        warning: Option<String>,
    ) -> Resolution {
        match &outcome {
            Outcome::Added { key } => tracing::info!(
                target: "entnorm::resolver",
                category = cat.name(),
                mention = %stored_as,
                key = %key,
                "{} has been added to the {} knowledge base",
                stored_as,
                cat.name()
            ),
            Outcome::Linked { alias_of, value } => tracing::info!(
                target: "entnorm::resolver",
                category = cat.name(),
                mention = %stored_as,
                alias_of = %alias_of,
                value = %value,
                "{} is in the {} knowledge base under a different name: {}",
                stored_as,
                cat.name(),
                alias_of
            ),
            Outcome::AlreadyPresent { key, alias_added } => tracing::info!(
                target: "entnorm::resolver",
                category = cat.name(),
                mention = %stored_as,
                key = %key,
                alias_added,
                "{} is already in the {} knowledge base",
                stored_as,
                cat.name()
            ),
        }
        Resolution {
            mention: mention.to_string(),
            stored_as,
            outcome,
            warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::fuzzy::Scorer;
    use crate::knowledge::{CategoryDecl, Entries};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockOracle {
        answers: HashMap<String, Vec<String>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockOracle {
        fn new(answers: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                answers: answers
                    .iter()
                    .map(|(q, a)| (q.to_string(), vec![a.to_string()]))
                    .collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answers: HashMap::new(),
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CanonicalizationOracle for MockOracle {
        fn name(&self) -> &str {
            "mock"
        }

        async fn query(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                return Err(CollaboratorError::Transport("connection reset".into()));
            }
            Ok(self.answers.get(text).cloned().unwrap_or_default())
        }
    }

    struct MockTranslator {
        table: HashMap<String, String>,
        available: bool,
        calls: AtomicUsize,
    }

    impl MockTranslator {
        fn new(table: &[(&str, &str)], available: bool) -> Arc<Self> {
            Arc::new(Self {
                table: table
                    .iter()
                    .map(|(a, b)| (a.to_string(), b.to_string()))
                    .collect(),
                available,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl TranslationService for MockTranslator {
        fn name(&self) -> &str {
            "mock-translator"
        }

        async fn translate(&self, text: &str, _target: &str) -> Result<Translation, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.available {
                return Err(CollaboratorError::Unavailable("429 Too Many Requests".into()));
            }
            Ok(Translation {
                translated_text: self.table.get(text).cloned().unwrap_or_else(|| text.to_string()),
                source_language: "es".into(),
                original: text.to_string(),
            })
        }
    }

    fn kb() -> KnowledgeBase {
        KnowledgeBase::new([
            CategoryDecl::from("companies"),
            CategoryDecl::from("locations"),
            CategoryDecl::new("serial numbers", CategoryKind::Cluster),
            CategoryDecl::new("addresses", CategoryKind::Cluster),
        ])
        .unwrap()
    }

    async fn aliases(kb: &KnowledgeBase, category: &str) -> Vec<(String, String)> {
        match kb.snapshot(category).await.unwrap().entries {
            Entries::Alias(m) => m.into_iter().collect(),
            Entries::Cluster(_) => panic!("expected alias category"),
        }
    }

    async fn clusters(kb: &KnowledgeBase, category: &str) -> Vec<(String, Vec<String>)> {
        kb.grouped(category).await.unwrap().into_iter().collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[tokio::test]
    async fn company_scenario_links_by_containment() {
        let oracle = MockOracle::new(&[("NVIDIA", "wiki:NVIDIA"), ("Microsoft Corp", "wiki:Microsoft")]);
        let resolver = Resolver::new(oracle.clone());
        let kb = kb();

        let report = resolver
            .resolve_batch(&["NVIDIA", "Nvidia Ireland", "Microsoft Corp"], "companies", &kb)
            .await
            .unwrap();

        assert_eq!(
            aliases(&kb, "companies").await,
            pairs(&[
                ("NVIDIA", "wiki:NVIDIA"),
                ("Nvidia Ireland", "wiki:NVIDIA"),
                ("Microsoft Corp", "wiki:Microsoft"),
            ])
        );
        assert_eq!(oracle.calls(), 2);
        let outcomes: Vec<&str> = report.resolved().map(|r| r.outcome.label()).collect();
        assert_eq!(outcomes, ["added", "linked", "added"]);
        assert_eq!(report.category, "companies");
    }

    #[tokio::test]
    async fn exact_match_does_not_call_oracle() {
        let oracle = MockOracle::new(&[("NVIDIA", "wiki:NVIDIA")]);
        let resolver = Resolver::new(oracle.clone());
        let kb = kb();

        resolver.resolve("NVIDIA", "companies", &kb).await.unwrap();
        let again = resolver.resolve("NVIDIA", "companies", &kb).await.unwrap();

        assert_eq!(oracle.calls(), 1);
        assert_eq!(
            again.outcome,
            Outcome::AlreadyPresent {
                key: "wiki:NVIDIA".into(),
                alias_added: false
            }
        );
        assert_eq!(aliases(&kb, "companies").await.len(), 1);
    }

    #[tokio::test]
    async fn shorter_mention_links_to_longer_key() {
        let oracle = MockOracle::new(&[("Microsoft Corp", "W")]);
        let resolver = Resolver::new(oracle.clone());
        let kb = kb();
        resolver.resolve("Microsoft Corp", "companies", &kb).await.unwrap();

        let r = resolver.resolve("microsoft", "companies", &kb).await.unwrap();
        assert_eq!(
            r.outcome,
            Outcome::Linked {
                alias_of: "Microsoft Corp".into(),
                value: "W".into()
            }
        );
        assert_eq!(r.outcome.canonical(), "W");
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_category_leaves_base_unmodified() {
        let oracle = MockOracle::new(&[("NVIDIA", "wiki:NVIDIA")]);
        let resolver = Resolver::new(oracle.clone());
        let kb = kb();

        let err = resolver
            .resolve_batch(&["NVIDIA"], "widgets", &kb)
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::UnknownCategory("widgets".into()));
        assert_eq!(oracle.calls(), 0);
        assert!(kb.status().await.iter().all(|s| s.entry_count == 0));
    }

    #[tokio::test]
    async fn kind_mismatch_is_fatal() {
        let resolver = Resolver::new(MockOracle::new(&[]));
        let kb = kb();
        let err = resolver
            .resolve_batch(&["44 China Rd"], "addresses", &kb)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::KindMismatch { .. }));

        let err = resolver
            .resolve_structured("XYZ 1", "companies", &kb)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn missing_candidate_does_not_abort_batch() {
        let oracle = MockOracle::new(&[("London", "wiki:London"), ("Beijing", "wiki:Beijing")]);
        let resolver = Resolver::new(oracle.clone());
        let kb = kb();

        let report = resolver
            .resolve_batch(&["London", "Atlantis", "  ", "Beijing"], "locations", &kb)
            .await
            .unwrap();

        assert_eq!(report.items.len(), 4);
        assert_eq!(report.failed_count(), 2);
        assert!(matches!(&report.items[1], ItemReport::Failed { mention, .. } if mention == "Atlantis"));
        assert!(matches!(&report.items[2], ItemReport::Failed { error, .. } if error == "mention is empty"));
        assert_eq!(
            aliases(&kb, "locations").await,
            pairs(&[("London", "wiki:London"), ("Beijing", "wiki:Beijing")])
        );
    }

    #[tokio::test]
    async fn oracle_failure_is_no_candidate() {
        let resolver = Resolver::new(MockOracle::failing());
        let kb = kb();
        let err = resolver.resolve("NVIDIA", "companies", &kb).await.unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoCandidateFound {
                mention: "NVIDIA".into()
            }
        );
        assert!(kb.snapshot("companies").await.unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn translated_text_is_matched_and_stored() {
        let oracle = MockOracle::new(&[("Barcelona", "wiki:Barcelona")]);
        let translator = MockTranslator::new(&[("Barcelone", "Barcelona")], true);
        let resolver = Resolver::new(oracle.clone()).with_translator(translator.clone(), "en");
        let kb = kb();

        let r = resolver.resolve("Barcelone", "locations", &kb).await.unwrap();
        assert_eq!(r.mention, "Barcelone");
        assert_eq!(r.stored_as, "Barcelona");
        assert!(r.warning.is_none());
        assert_eq!(aliases(&kb, "locations").await, pairs(&[("Barcelona", "wiki:Barcelona")]));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unavailable_translation_degrades_with_warning() {
        let oracle = MockOracle::new(&[("Pekín", "wiki:Beijing")]);
        let translator = MockTranslator::new(&[], false);
        let resolver = Resolver::new(oracle).with_translator(translator, "en");
        let kb = kb();

        let r = resolver.resolve("Pekín", "locations", &kb).await.unwrap();
        assert_eq!(r.stored_as, "Pekín");
        assert!(r.warning.as_deref().unwrap().contains("translation unavailable"));
        assert_eq!(r.outcome, Outcome::Added { key: "wiki:Beijing".into() });
    }

    #[tokio::test]
    async fn structured_tokens_collapse_by_normalized_key() {
        let resolver = Resolver::new(MockOracle::new(&[]));
        let kb = kb();

        let report = resolver
            .resolve_structured_batch(
                &["XYZ 13423 / ILD", "XYZ--13423-ILD", "ABC 13423 / ILD", "XYZ--13423-ILD", " -/ "],
                "serial numbers",
                &kb,
            )
            .await
            .unwrap();

        assert_eq!(
            clusters(&kb, "serial numbers").await,
            vec![
                (
                    "XYZ-13423-ILD".to_string(),
                    vec!["XYZ 13423 / ILD".to_string(), "XYZ--13423-ILD".to_string()]
                ),
                ("ABC-13423-ILD".to_string(), vec!["ABC 13423 / ILD".to_string()]),
            ]
        );
        let labels: Vec<&str> = report.resolved().map(|r| r.outcome.label()).collect();
        assert_eq!(labels, ["added", "already_present", "added", "already_present"]);
        assert_eq!(
            report.items[3].resolution().unwrap().outcome,
            Outcome::AlreadyPresent {
                key: "XYZ-13423-ILD".into(),
                alias_added: false
            }
        );
        assert_eq!(report.failed_count(), 1);
    }

    #[tokio::test]
    async fn fuzzy_score_equal_to_threshold_stays_distinct() {
        let resolver = Resolver::new(MockOracle::new(&[]));
        let kb = kb();
        let first = "10 Downing Street London";
        let second = "10 Downing St London";
        let score = resolver.fuzzy_policy().scorer.score(second, &first.to_uppercase());

        resolver.resolve_fuzzy(first, "addresses", &kb, score).await.unwrap();
        let r = resolver.resolve_fuzzy(second, "addresses", &kb, score).await.unwrap();

        assert_eq!(r.outcome.label(), "added");
        assert_eq!(clusters(&kb, "addresses").await.len(), 2);
    }

    #[tokio::test]
    async fn fuzzy_default_policy_merges_shared_street_core() {
        let resolver = Resolver::new(MockOracle::new(&[]));
        assert_eq!(*resolver.fuzzy_policy(), FuzzyPolicy::default());
        let kb = kb();

        let report = resolver
            .resolve_fuzzy_batch(&["44 CHINA Rd, London", "44, CHINA Rd Hong Kong"], "addresses", &kb, None)
            .await
            .unwrap();

        assert_eq!(
            clusters(&kb, "addresses").await,
            vec![(
                "44 CHINA RD, LONDON".to_string(),
                vec!["44, CHINA Rd Hong Kong".to_string()]
            )]
        );
        assert_eq!(
            report.items[1].resolution().unwrap().outcome,
            Outcome::AlreadyPresent {
                key: "44 CHINA RD, LONDON".into(),
                alias_added: true
            }
        );
    }

    #[tokio::test]
    async fn fuzzy_token_set_scorer_keeps_distinct_cities_apart() {
        let policy = FuzzyPolicy::new(90.0, Scorer::TokenSet);
        let resolver = Resolver::new(MockOracle::new(&[])).with_fuzzy_policy(policy);
        let kb = kb();
        resolver
            .resolve_fuzzy_batch(&["44 CHINA Rd, London", "44, CHINA Rd Hong Kong"], "addresses", &kb, None)
            .await
            .unwrap();
        assert_eq!(clusters(&kb, "addresses").await.len(), 2);
    }

    #[tokio::test]
    async fn fuzzy_ties_pick_first_key() {
        let resolver = Resolver::new(MockOracle::new(&[]));
        let kb = kb();
        {
            let mut cat = kb.lock("addresses").await.unwrap();
            cat.insert_cluster("1 MAIN ST", Vec::new()).unwrap();
            cat.insert_cluster("MAIN ST 1", Vec::new()).unwrap();
        }
        let r = resolver.resolve_fuzzy("1 Main St", "addresses", &kb, 90.0).await.unwrap();
        assert_eq!(
            r.outcome,
            Outcome::AlreadyPresent {
                key: "1 MAIN ST".into(),
                alias_added: true
            }
        );
    }

    #[tokio::test]
    async fn keys_stay_unique_across_repeated_resolution() {
        let oracle = MockOracle::new(&[("Plastic bottle", "wiki:Bottle"), ("Computer", "wiki:Computer")]);
        let resolver = Resolver::new(oracle);
        let kb = kb();
        let mentions = ["Plastic bottle", "Computer", "Plastic bottle", "computer", "Computer"];
        resolver.resolve_batch(&mentions, "companies", &kb).await.unwrap();

        let keys: Vec<String> = aliases(&kb, "companies").await.into_iter().map(|(k, _)| k).collect();
        let mut unique = keys.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(keys.len(), unique.len());
        assert_eq!(keys, ["Plastic bottle", "Computer", "computer"]);
    }

    #[tokio::test]
    async fn same_category_resolutions_are_serialized() {
        let oracle = MockOracle::new(&[("Cape Town", "wiki:Cape_Town")]);
        let resolver = Arc::new(Resolver::new(oracle.clone()));
        let kb = Arc::new(kb());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (resolver, kb) = (Arc::clone(&resolver), Arc::clone(&kb));
            handles.push(tokio::spawn(async move {
                resolver.resolve("Cape Town", "locations", &kb).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(oracle.calls(), 1);
        assert_eq!(aliases(&kb, "locations").await.len(), 1);
    }

    #[tokio::test]
    async fn different_categories_proceed_independently() {
        let oracle = MockOracle::new(&[("NVIDIA", "wiki:NVIDIA"), ("London", "wiki:London")]);
        let resolver = Arc::new(Resolver::new(oracle));
        let kb = Arc::new(kb());

        let a = {
            let (resolver, kb) = (Arc::clone(&resolver), Arc::clone(&kb));
            tokio::spawn(async move { resolver.resolve_batch(&["NVIDIA"], "companies", &kb).await })
        };
        let b = {
            let (resolver, kb) = (Arc::clone(&resolver), Arc::clone(&kb));
            tokio::spawn(async move { resolver.resolve_batch(&["London"], "locations", &kb).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(aliases(&kb, "companies").await, pairs(&[("NVIDIA", "wiki:NVIDIA")]));
        assert_eq!(aliases(&kb, "locations").await, pairs(&[("London", "wiki:London")]));
    }

    #[test]
    fn batch_mode_deserializes_from_tag() {
        let mode: BatchMode = serde_json::from_str(r#"{"mode":"fuzzy","threshold":85.0}"#).unwrap();
        assert_eq!(mode, BatchMode::Fuzzy { threshold: Some(85.0) });
        assert_eq!(mode.required_kind(), CategoryKind::Cluster);
    }
}
