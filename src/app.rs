use crate::classifier::HttpZeroShotClient;
use crate::config::Config;
use crate::interpret::PreferenceInterpreter;
use crate::models::{Candidate, FilterSet};
use crate::recommend::Recommender;
use crate::seen::{parse_submission, JsonFileSeenStore, SeenSet, SeenStore};
use crate::taxonomy::{Duration, Era, Language};
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::{anyhow, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub recommender: Recommender,
}

#[derive(Debug, Deserialize)]
pub struct FilterLabels {
    pub genre: String,
    pub duration: String,
    pub language: String,
    pub era: String,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub filters: Option<FilterLabels>,
    #[serde(default)]
    pub platform: Option<String>,
    /// Ids as numbers or strings; anything else is ignored.
    #[serde(default)]
    pub seen: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub filters: Option<FilterSet>,
    pub results: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seen: Option<SeenSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub genres: Vec<String>,
    pub durations: Vec<&'static str>,
    pub languages: Vec<Language>,
    pub platforms: Vec<String>,
    pub eras: Vec<&'static str>,
    pub seen: SeenSet,
}

pub async fn run_server(config: Config) -> Result<()> {
    let classifier = HttpZeroShotClient::new(
        &config.classifier_url,
        config.hf_api_token.clone(),
        config.http_timeout,
    )?
    .warm_up()
    .await
    .map_err(|e| anyhow!("Classifier warm-up failed: {}", e))?;

    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(
        config.tmdb_api_key.clone(),
        &config.tmdb_base_url,
        config.http_timeout,
    )?);
    let seen: Arc<dyn SeenStore> = Arc::new(JsonFileSeenStore::new(&config.seen_path));
    info!("Seen set stored at {}", config.seen_path.display());

    let recommender = Recommender::new(
        PreferenceInterpreter::new(Arc::new(classifier)),
        tmdb,
        seen,
        config.fetch_concurrency,
    );
    let app = build_router(AppState { recommender });

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/options", get(options))
        .route("/recommend", post(recommend))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn options(State(state): State<AppState>) -> Response {
    let seen = match state.recommender.current_seen().await {
        Ok(seen) => seen,
        Err(e) => {
            error!("Failed to load seen set: {}", e);
            return (e.status_code(), Json(json!({ "error": e.to_string() }))).into_response();
        }
    };
    let taxonomy = state.recommender.taxonomy();
    Json(OptionsResponse {
        genres: taxonomy.genre_labels(),
        durations: Duration::ALL.iter().map(|d| d.label()).collect(),
        languages: taxonomy.languages.clone(),
        platforms: taxonomy.platforms.iter().map(|p| p.label.clone()).collect(),
        eras: Era::ALL.iter().map(|e| e.label()).collect(),
        seen,
    })
    .into_response()
}

async fn recommend(State(state): State<AppState>, Json(req): Json<RecommendRequest>) -> Response {
    let seen_submission = parse_submission(&seen_strings(&req.seen));
    let text = req.text.filter(|t| !t.trim().is_empty());

    let outcome = match (text, req.filters) {
        (Some(text), None) => {
            info!("Recommendation requested from free text");
            state
                .recommender
                .recommend(&text, req.platform, seen_submission)
                .await
        }
        (None, Some(labels)) => {
            info!("Recommendation requested with explicit filters");
            let language = state
                .recommender
                .taxonomy()
                .language_code(&labels.language)
                .unwrap_or(labels.language.trim());
            let filters =
                FilterSet::from_labels(&labels.genre, &labels.duration, language, &labels.era)
                    .with_platform(req.platform);
            state
                .recommender
                .recommend_with_filters(filters, seen_submission)
                .await
        }
        _ => {
            warn!("Rejecting request: exactly one of text or filters is required");
            return failure(
                StatusCode::BAD_REQUEST,
                "exactly one of `text` or `filters` is required".to_string(),
            );
        }
    };

    match outcome {
        Ok(rec) => Json(RecommendResponse {
            filters: Some(rec.filters),
            results: rec.ranked,
            seen: Some(rec.seen),
            notice: rec.issue.map(|e| e.to_string()),
            error: None,
        })
        .into_response(),
        Err(e) => {
            error!("Recommendation failed: {}", e);
            failure(e.status_code(), e.to_string())
        }
    }
}

fn failure(status: StatusCode, message: String) -> Response {
    let body = RecommendResponse {
        filters: None,
        results: Vec::new(),
        seen: None,
        notice: None,
        error: Some(message),
    };
    (status, Json(body)).into_response()
}

fn seen_strings(raw: &[Value]) -> Vec<String> {
    raw.iter()
        .filter_map(|v| match v {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
