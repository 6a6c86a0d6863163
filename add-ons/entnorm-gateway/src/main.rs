//! Axum-based API Gateway for entity normalization. Config-driven via CoreConfig.

use axum::{
    extract::{Json, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use entnorm_core::{
    BatchMode, BatchReport, CategorySnapshot, Cluster, CoreConfig, KnowledgeBase, ResolveError,
    Resolver,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[entnorm-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(CoreConfig::load()?);
    let knowledge = Arc::new(config.knowledge_base()?);
    let fixtures = std::env::var(entnorm_skills::FIXTURES_ENV).ok().map(PathBuf::from);
    let resolver = Arc::new(entnorm_skills::build_resolver(&config, fixtures.as_deref())?);
    tracing::info!(
        oracle = resolver.oracle_name(),
        categories = knowledge.category_names().len(),
        "Resolver ready"
    );

    let app = build_app(AppState {
        config: Arc::clone(&config),
        knowledge,
        resolver,
    });

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("{} listening on {}", config.app_name, addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

fn build_app(state: AppState) -> Router {
    // CORS: allow Backend/API (8001-8099) and Frontend/UI (3001-3099) port ranges.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &axum::http::HeaderValue, _| {
            let s = origin.to_str().unwrap_or("");
            let port = s
                .rsplit(':')
                .next()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(0);
            (3001..=3099).contains(&port) || (8001..=8099).contains(&port)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/v1/status", get(status))
        .route("/v1/resolve", post(resolve))
        .route("/v1/categories/:name", get(get_category))
        .route("/v1/categories/:name/clusters", get(get_clusters))
        .route("/v1/categories/:name/cluster", post(cluster_category))
        .with_state(state)
        .layer(cors)
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) knowledge: Arc<KnowledgeBase>,
    pub(crate) resolver: Arc<Resolver>,
}

/// Maps resolution errors to HTTP statuses with a JSON body.
struct ApiError(ResolveError);

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ResolveError::UnknownCategory(_) => StatusCode::NOT_FOUND,
            ResolveError::KindMismatch { .. } => StatusCode::CONFLICT,
            ResolveError::EmptyMention | ResolveError::NoCandidateFound { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ResolveError::DuplicateCategory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = %status, error = %self.0, "Request failed");
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// GET /v1/status – app identity and per-category entry counts.
async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let categories = state.knowledge.status().await;
    Json(serde_json::json!({
        "app_name": state.config.app_name,
        "port": state.config.port,
        "oracle": state.resolver.oracle_name(),
        "fuzzy": state.resolver.fuzzy_policy(),
        "categories": categories,
    }))
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ModeName {
    #[default]
    Cascade,
    Structured,
    Fuzzy,
}

#[derive(Deserialize)]
struct ResolveRequest {
    category: String,
    #[serde(default)]
    mode: ModeName,
    mentions: Vec<String>,
    /// Fuzzy mode only; defaults to the configured threshold.
    #[serde(default)]
    threshold: Option<f64>,
}

impl ResolveRequest {
    fn batch_mode(&self) -> BatchMode {
        match self.mode {
            ModeName::Cascade => BatchMode::Cascade,
            ModeName::Structured => BatchMode::Structured,
            ModeName::Fuzzy => BatchMode::Fuzzy {
                threshold: self.threshold,
            },
        }
    }
}

/// POST /v1/resolve – run one batch against a category.
async fn resolve(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<BatchReport>, ApiError> {
    let report = state
        .resolver
        .run_batch(req.batch_mode(), &req.mentions, &req.category, &state.knowledge)
        .await?;
    tracing::info!(
        batch_id = %report.batch_id,
        category = %report.category,
        items = report.items.len(),
        failed = report.failed_count(),
        "Batch resolved"
    );
    Ok(Json(report))
}

/// GET /v1/categories/:name – stored entries of one category.
async fn get_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CategorySnapshot>, ApiError> {
    Ok(Json(state.knowledge.snapshot(&name).await?))
}

/// GET /v1/categories/:name/clusters – canonical → mentions view; does not modify the category.
async fn get_clusters(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Cluster>, ApiError> {
    Ok(Json(state.knowledge.grouped(&name).await?))
}

/// POST /v1/categories/:name/cluster – replaces the category with its clustered form (one-way).
async fn cluster_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Cluster>, ApiError> {
    Ok(Json(state.knowledge.cluster_in_place(&name).await?))
}
