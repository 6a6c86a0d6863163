//! Configuration shared by the gateway and the daemon.

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::fuzzy::FuzzyPolicy;
use crate::knowledge::{CategoryDecl, CategoryKind, KnowledgeBase};
use crate::search::WideningPolicy;

/// Environment variable naming the config file (without extension).
pub const CONFIG_PATH_ENV: &str = "ENTNORM_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/entnorm";

/// Categories declared when the config does not list any.
pub fn default_categories() -> Vec<CategoryDecl> {
    vec![
        CategoryDecl::new("companies", CategoryKind::Alias),
        CategoryDecl::new("products", CategoryKind::Alias),
        CategoryDecl::new("locations", CategoryKind::Alias),
        CategoryDecl::new("serial numbers", CategoryKind::Cluster),
        CategoryDecl::new("addresses", CategoryKind::Cluster),
    ]
}

/// Web search used to canonicalize free-text mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// HTML results page queried with `q` and `s` (offset) parameters.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub widening: WideningPolicy,
}

fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            widening: WideningPolicy::default(),
        }
    }
}

/// LibreTranslate-compatible translation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateConfig {
    #[serde(default = "default_translate_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_translate_endpoint() -> String {
    "https://libretranslate.com".to_string()
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translate_endpoint(),
            api_key: None,
        }
    }
}

/// Global application configuration. Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryDecl>,
    /// Translation is enabled when set (e.g. "en").
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub fuzzy: FuzzyPolicy,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
}

impl CoreConfig {
    /// Load config from file and environment. Precedence: env `ENTNORM__*` > file at
    /// `ENTNORM_CONFIG` (default `config/entnorm`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    /// Same as [`CoreConfig::load`] with an explicit file path. A missing file is not an error.
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let built = config::Config::builder()
            .set_default("app_name", "entnorm")?
            .set_default("port", 8001_i64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ENTNORM").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    /// Empty knowledge base with the configured categories.
    pub fn knowledge_base(&self) -> Result<KnowledgeBase, ResolveError> {
        KnowledgeBase::new(self.categories.iter().cloned())
    }
}
