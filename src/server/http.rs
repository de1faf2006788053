//! axum router for the `/api/ai/*` endpoints.
//!
//! Every handler answers HTTP 200 with a JSON body carrying `success`;
//! failures set `success: false` and `error` rather than an error status.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::types::{
    CompletionRequest, CompletionResponse, NormalizedModel, Provider, StreamEvent, StreamSummary,
};
use crate::{HealthReport, Orchestrator, OrchestratorStats};

type AppState = Arc<Orchestrator>;
type EventStream = BoxStream<'static, Result<Event, axum::Error>>;

/// Build the router with the orchestrator as shared state.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/api/ai/complete", post(complete))
        .route("/api/ai/stream", post(stream_completion))
        .route("/api/ai/models", get(list_models))
        .route("/api/ai/models/refresh", post(refresh_models))
        .route("/api/ai/stats", get(stats))
        .route("/api/ai/cache/clear", post(clear_cache))
        .route("/api/ai/health", get(health))
        .with_state(orchestrator)
}

/// `{"success": true, ...body}`
#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> Envelope<T> {
    fn ok(body: T) -> Json<Self> {
        Json(Self {
            success: true,
            body,
        })
    }
}

#[derive(Serialize)]
struct ModelsBody {
    models: std::collections::BTreeMap<Provider, Vec<NormalizedModel>>,
}

fn failure(error: impl std::fmt::Display) -> Json<Value> {
    Json(json!({ "success": false, "error": error.to_string() }))
}

async fn complete(
    State(orchestrator): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Json<CompletionResponse> {
    match coerce(body) {
        Ok(request) => Json(orchestrator.complete(request).await),
        Err(e) => {
            debug!(error = %e, "rejecting malformed completion request");
            Json(CompletionResponse::failure(e))
        }
    }
}

async fn stream_completion(
    State(orchestrator): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Sse<KeepAliveStream<EventStream>> {
    let events = match coerce(body) {
        Ok(request) => orchestrator.stream(request).await,
        Err(e) => {
            debug!(error = %e, "rejecting malformed stream request");
            let summary = StreamSummary::from(CompletionResponse::failure(e));
            stream::iter([StreamEvent::Done(summary)]).boxed()
        }
    };
    Sse::new(events.map(to_sse).boxed()).keep_alive(KeepAlive::default())
}

/// Body rejections and coercion errors both become the failure message.
fn coerce(body: Result<Json<Value>, JsonRejection>) -> Result<CompletionRequest, String> {
    let Json(body) = body.map_err(|rejection| rejection.body_text())?;
    CompletionRequest::from_value(body).map_err(|e| e.to_string())
}

fn to_sse(event: StreamEvent) -> Result<Event, axum::Error> {
    match event {
        StreamEvent::Content { content } => Event::default()
            .event("content")
            .json_data(json!({ "content": content })),
        StreamEvent::Done(summary) => Event::default().event("done").json_data(summary),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ModelsQuery {
    provider: Option<String>,
    #[serde(default)]
    refresh: bool,
}

async fn list_models(
    State(orchestrator): State<AppState>,
    query: Result<Query<ModelsQuery>, QueryRejection>,
) -> Result<Json<Envelope<ModelsBody>>, Json<Value>> {
    let Query(query) = query.map_err(|rejection| failure(rejection.body_text()))?;
    let provider = match query.provider.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(name) => Some(name.parse::<Provider>().map_err(failure)?),
        None => None,
    };

    let models = match (provider, query.refresh) {
        (Some(provider), true) => [(
            provider,
            orchestrator.catalog().get_models(provider, true).await,
        )]
        .into(),
        (None, true) => orchestrator.refresh_models().await,
        (provider, false) => orchestrator.list_models(provider).await,
    };
    Ok(Envelope::ok(ModelsBody { models }))
}

async fn refresh_models(State(orchestrator): State<AppState>) -> Json<Envelope<ModelsBody>> {
    let models = orchestrator.refresh_models().await;
    Envelope::ok(ModelsBody { models })
}

async fn stats(State(orchestrator): State<AppState>) -> Json<Envelope<OrchestratorStats>> {
    Envelope::ok(orchestrator.stats().await)
}

async fn clear_cache(State(orchestrator): State<AppState>) -> Json<Value> {
    orchestrator.clear_cache().await;
    Json(json!({ "success": true, "message": "response cache cleared" }))
}

#[derive(Debug, Default, Deserialize)]
struct HealthQuery {
    #[serde(default)]
    force: bool,
}

async fn health(
    State(orchestrator): State<AppState>,
    query: Result<Query<HealthQuery>, QueryRejection>,
) -> Result<Json<Envelope<HealthReport>>, Json<Value>> {
    let Query(query) = query.map_err(|rejection| failure(rejection.body_text()))?;
    Ok(Envelope::ok(orchestrator.health(query.force).await))
}
