// HTTP API routes (score, play, chat) with per-client rate limiting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, FromRequest, FromRequestParts, MatchedPath, Path, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::error::ApiError;
use crate::game::{Game, Move, PlayResult, Score, ScoreStore};
use crate::metrics;
use crate::rate_limit::{RateLimitType, RateLimiter};
use crate::services::{ChatRouter, Commentator, JokeSource, TextGenerator};

pub const MAX_MESSAGE_CHARS: usize = 500;

// ── Request / response types ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub yoda_response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JokeResponse {
    pub joke: String,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub game: Game,
    pub chat: ChatRouter,
    pub jokes: Arc<dyn JokeSource>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wire the game and chat router around a fresh score store.
    pub fn new(jokes: Arc<dyn JokeSource>, generator: Arc<dyn TextGenerator>) -> Self {
        let commentator = Commentator::new(generator);
        Self {
            game: Game::new(ScoreStore::new(), commentator.clone()),
            chat: ChatRouter::new(jokes.clone(), commentator),
            jokes,
            rate_limiter: RateLimiter::new(),
        }
    }
}

// ── Extractors ────────────────────────────────────────────────────────

/// The client address used as the rate-limit key.
///
/// Trusts the first `X-Forwarded-For` entry, then the socket peer address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return Ok(ClientIp(ip.to_string()));
        }

        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            return Ok(ClientIp(addr.ip().to_string()));
        }

        Ok(ClientIp("unknown".to_string()))
    }
}

/// A move taken from the `{move}` path segment.
#[derive(Debug, Clone, Copy)]
pub struct MovePath(pub Move);

impl<S> FromRequestParts<S> for MovePath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        raw.parse::<Move>()
            .map(MovePath)
            .map_err(|e| ApiError::Validation(e.to_string()))
    }
}

/// A validated chat message body.
#[derive(Debug)]
pub struct ChatInput(pub String);

impl<S> FromRequest<S> for ChatInput
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<ChatRequest>::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        validate_message(&body.user_message)?;
        Ok(ChatInput(body.user_message))
    }
}

/// Reject messages longer than `MAX_MESSAGE_CHARS` characters.
pub fn validate_message(message: &str) -> Result<(), ApiError> {
    let len = message.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(ApiError::Validation(format!(
            "user_message must be at most {MAX_MESSAGE_CHARS} characters (got {len})"
        )));
    }
    Ok(())
}

// ── Middleware ────────────────────────────────────────────────────────

async fn enforce_rate_limit(
    State((limiter, limit_type)): State<(RateLimiter, RateLimitType)>,
    ClientIp(client): ClientIp,
    req: Request,
    next: Next,
) -> Response {
    if let Err(e) = limiter.check_limit(&client, limit_type) {
        tracing::warn!("Rate limit hit on {} by {client}", limit_type.label());
        metrics::RATE_LIMITED_TOTAL
            .with_label_values(&[limit_type.label()])
            .inc();
        return ApiError::from(e).into_response();
    }
    next.run(req).await
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let matched = req.extensions().get::<MatchedPath>().map(MatchedPath::as_str);
    let endpoint = metrics::endpoint_label(matched).to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[&endpoint])
        .observe(start.elapsed().as_secs_f64());
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[&method, &endpoint, response.status().as_str()])
        .inc();
    response
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    metrics::register_metrics();

    let limited = |limit_type: RateLimitType| {
        middleware::from_fn_with_state(
            (state.rate_limiter.clone(), limit_type),
            enforce_rate_limit,
        )
    };

    let api_v1 = Router::new()
        .route("/score", get(get_score).layer(limited(RateLimitType::Score)))
        .route(
            "/play/{move}",
            post(play_round).layer(limited(RateLimitType::Play)),
        )
        .route("/chat", post(chat).layer(limited(RateLimitType::Chat)))
        .route("/joke", get(get_joke).layer(limited(RateLimitType::Joke)));

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .nest("/api/v1", api_v1)
        .with_state(state);

    let app = match static_dir {
        Some(dir) => {
            tracing::info!("Serving static files from {}", dir.display());
            app.fallback_service(ServeDir::new(dir))
        }
        None => app,
    };

    app.layer(middleware::from_fn(track_metrics))
        .layer(CorsLayer::permissive())
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "yoda-backend" }))
}

async fn get_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn get_score(State(state): State<AppState>) -> Json<Score> {
    Json(state.game.score())
}

async fn play_round(
    State(state): State<AppState>,
    MovePath(player_move): MovePath,
) -> Json<PlayResult> {
    Json(state.game.play_round(player_move).await)
}

async fn chat(State(state): State<AppState>, ChatInput(message): ChatInput) -> Json<ChatResponse> {
    let yoda_response = state.chat.handle(&message).await;
    Json(ChatResponse { yoda_response })
}

async fn get_joke(State(state): State<AppState>) -> Result<Json<JokeResponse>, ApiError> {
    let joke = state.jokes.fetch_joke().await?;
    Ok(Json(JokeResponse { joke }))
}
