//! Concrete collaborators for the resolver: web search, translation, and oracle adapters.

mod caching;
mod fixture;
mod translate;
mod web_search;

pub use caching::CachingOracle;
pub use fixture::FixtureOracle;
pub use translate::{parse_response as parse_translation, HttpTranslator};
pub use web_search::{extract_links, HttpSearchBackend};

use entnorm_core::{CanonicalizationOracle, CollaboratorError, CoreConfig, Resolver, WideningSearch};
use std::path::Path;
use std::sync::Arc;

/// Environment variable naming a fixture file that replaces web search.
pub const FIXTURES_ENV: &str = "ENTNORM_FIXTURES";

/// Resolver wired from config. With `fixtures`, answers come from that file
/// instead of the web; translation is attached when a target language is set.
pub fn build_resolver(
    config: &CoreConfig,
    fixtures: Option<&Path>,
) -> Result<Resolver, CollaboratorError> {
    let oracle: Arc<dyn CanonicalizationOracle> = match fixtures {
        Some(path) => {
            let fixture = FixtureOracle::from_path(path)?.case_insensitive(true);
            tracing::info!(
                path = %path.display(),
                entries = fixture.len(),
                "Using fixture oracle"
            );
            Arc::new(fixture)
        }
        None => Arc::new(web_oracle(config)?),
    };
    let mut resolver = Resolver::new(oracle).with_fuzzy_policy(config.fuzzy);
    if let (Some(lang), Some(t)) = (config.target_language.as_deref(), translator(config)?) {
        resolver = resolver.with_translator(Arc::new(t), lang);
    }
    Ok(resolver)
}

/// Web-search oracle assembled from config: widening search over the HTML backend, memoized.
pub fn web_oracle(
    config: &CoreConfig,
) -> Result<CachingOracle<WideningSearch<HttpSearchBackend>>, CollaboratorError> {
    let backend = HttpSearchBackend::new(&config.search.endpoint)?;
    Ok(CachingOracle::new(WideningSearch::new(
        backend,
        config.search.widening.clone(),
    )))
}

/// Translator from config, or `None` when no target language is set.
pub fn translator(config: &CoreConfig) -> Result<Option<HttpTranslator>, CollaboratorError> {
    if config.target_language.is_none() {
        return Ok(None);
    }
    HttpTranslator::new(&config.translate.endpoint, config.translate.api_key.clone()).map(Some)
}
