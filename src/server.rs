use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::AppConfig;
use crate::provider::{MusicProvider, SpotifyClient};
use crate::recommend::{ProviderHealth, Recommendation, RecommendError, Recommender};

pub struct AppState<P: MusicProvider> {
    pub recommender: Arc<Recommender<P>>,
    pub started: Instant,
}

// Manual impl: derive would require `P: Clone`.
impl<P: MusicProvider> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            recommender: Arc::clone(&self.recommender),
            started: self.started,
        }
    }
}

/// Body of `POST /api/recommend`. A `mood` takes precedence over `preference`.
#[derive(Debug, Default, Deserialize)]
pub struct RecommendRequest {
    pub preference: Option<String>,
    pub mood: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: ProviderHealth,
    pub uptime_secs: u64,
    pub timestamp: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_response(e: RecommendError) -> ApiError {
    let status = match e {
        RecommendError::Input(_) => StatusCode::BAD_REQUEST,
        RecommendError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { error: e.to_string() }))
}

pub fn router<P: MusicProvider + 'static>(state: AppState<P>) -> Router {
    Router::new()
        .route("/api/recommend", post(recommend::<P>))
        .route("/api/health", get(health::<P>))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn recommend<P: MusicProvider + 'static>(
    State(state): State<AppState<P>>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<Recommendation>, ApiError> {
    let recommender = Arc::clone(&state.recommender);
    let outcome = tokio::task::spawn_blocking(move || match request.mood {
        Some(mood) => recommender.recommend_mood(&mood, request.confidence),
        None => recommender.recommend(request.preference.as_deref().unwrap_or_default()),
    })
    .await
    .unwrap_or_else(|e| {
        log::error!("Recommendation worker failed: {e}");
        Err(RecommendError::Internal("recommendation worker failed".into()))
    });

    match outcome {
        Ok(rec) => {
            log::info!(
                "Served {} {:?} recommendations for {:?}",
                rec.recommendations.len(),
                rec.source,
                rec.query
            );
            Ok(Json(rec))
        }
        Err(e) => {
            log::warn!("Rejected recommendation request: {e}");
            Err(error_response(e))
        }
    }
}

async fn health<P: MusicProvider + 'static>(
    State(state): State<AppState<P>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let recommender = Arc::clone(&state.recommender);
    let provider = tokio::task::spawn_blocking(move || recommender.health())
        .await
        .map_err(|e| {
            log::error!("Health worker failed: {e}");
            error_response(RecommendError::Internal("health check failed".into()))
        })?;

    Ok(Json(HealthResponse {
        status: "ok",
        provider,
        uptime_secs: state.started.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let recommender = Recommender::new(SpotifyClient::new(&config.provider), &config);
    let state = AppState {
        recommender: Arc::new(recommender),
        started: Instant::now(),
    };

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await
        .context("Server error")
}
