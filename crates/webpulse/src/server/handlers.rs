use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::info;
use webpulse_models::{ChatReply, ChatRequest, IndexOutcome, NewsDigest, PriceOutcome, SearchOutcome};

use super::auth::is_authorized;
use super::dto::*;
use super::error::ApiError;
use super::state::AppState;

const NOTES_DISABLED: &str = "Note log disabled (NOTES_DB_PATH not set)";

/// GET / - Service banner
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        ok: true,
        service: "webpulse-bridge".to_string(),
    })
}

/// GET /ping - Liveness plus which optional features are configured
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    let services = &state.services;
    Json(PingResponse {
        ok: true,
        notes: services.notes.is_some(),
        search: services.search.is_some(),
        llm: services.completer.is_some(),
    })
}

/// GET /price?symbol= - Tiered price lookup. Errors are reported in-band.
pub async fn price(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PriceQuery>,
) -> Json<PriceOutcome> {
    let symbol = query.symbol.unwrap_or_default();
    Json(state.services.resolver.resolve(&symbol).await)
}

/// GET /web/search?q= - Web search through the configured engine
pub async fn web_search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchOutcome> {
    let q = query.q.unwrap_or_default();
    Json(state.services.web_search(&q).await)
}

/// GET /rss/crypto - One-line headlines from the configured feeds
pub async fn rss_crypto(State(state): State<Arc<AppState>>) -> Json<HeadlinesResponse> {
    let aggregator = &state.services.aggregator;
    let top = aggregator.headlines(aggregator.clamp_limit(None)).await;
    Json(HeadlinesResponse { top })
}

/// GET /news?q=&since_minutes=&limit= - Scored, deduplicated news digest
pub async fn news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Json<NewsDigest> {
    let aggregator = &state.services.aggregator;
    let since = query
        .since_minutes
        .map(|m| Duration::from_secs(m.saturating_mul(60)))
        .unwrap_or_else(|| aggregator.default_since());
    let limit = aggregator.clamp_limit(query.limit);

    Json(aggregator.digest(query.q.as_deref(), since, limit).await)
}

/// GET /sentiment - Fear & Greed index
pub async fn sentiment(State(state): State<Arc<AppState>>) -> Json<IndexOutcome> {
    Json(state.services.sentiment_index().await)
}

/// POST /chat - Run one command through the command router
///
/// Authorization is checked before the body is looked at, so an
/// unauthorized caller always gets the same 401.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let authorized = is_authorized(&state, &headers);
    let Json(req) = match body {
        Ok(body) => body,
        Err(_) if !authorized => return Err(ApiError::Unauthorized),
        Err(rejection) => return Err(ApiError::BadRequest(rejection.body_text())),
    };

    let reply = state.router.route(&req.message, authorized).await?;
    info!(
        user_id = req.user_id.as_deref().unwrap_or("-"),
        tools = ?reply.tools_ran,
        "Chat command handled"
    );
    Ok(Json(reply))
}

/// POST /notes - Append to the note log
pub async fn save_note(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NoteRequest>,
) -> Json<NoteSavedResponse> {
    if state.services.notes.is_none() {
        return Json(NoteSavedResponse::failed(NOTES_DISABLED));
    }
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Json(NoteSavedResponse::failed("Empty note"));
    }

    match state.services.with_notes(move |notes| notes.append(&text)).await {
        Some(Ok(record)) => Json(NoteSavedResponse::saved(record.path)),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Note append failed");
            Json(NoteSavedResponse::failed(e.to_string()))
        }
        None => Json(NoteSavedResponse::failed(NOTES_DISABLED)),
    }
}

/// GET /notes?limit= - Most recent notes first
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotesQuery>,
) -> Result<Json<NotesResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_NOTES_LIMIT)
        .min(MAX_NOTES_LIMIT);
    let notes = match state.services.with_notes(move |store| store.recent(limit)).await {
        Some(result) => result?,
        None => Vec::new(),
    };
    Ok(Json(NotesResponse {
        count: notes.len(),
        notes,
    }))
}

/// POST /send-command - Relay a command into the `latest` slot
pub async fn send_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = req.command.trim().to_string();
    if command.is_empty() {
        return Err(ApiError::BadRequest("Command cannot be empty".into()));
    }

    let relay = command.clone();
    match state
        .services
        .with_notes(move |store| store.record_command(&relay))
        .await
    {
        Some(result) => {
            let timestamp_ms = result?;
            info!(timestamp_ms, "Command relayed");
        }
        None => info!(command = %command, "Command received (no note log to relay into)"),
    }
    Ok(Json(CommandResponse { success: true }))
}
