//! HTTP server setup and routing.
//!
//! The chat handler returns 200 for every handled outcome, including
//! internal failures — the UI renders whatever lands in `response`. Only a
//! malformed request body or missing credentials (the pipeline cannot be
//! built) produce a non-200 status.
//!
//! Everything is rebuilt per request from the shared configuration, matching
//! the request-scoped lifecycle of the pipeline: there is no shared mutable
//! state to lock, and a credentials fix does not need a restart.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use geny_engine::{ChatPipeline, QueryGenerator};
use geny_store::{ConfigPromptStore, QueryExecutor};
use geny_utils::error::GenyError;
use geny_utils::types::{ChatQuestion, PromptOrigin};

#[derive(Clone)]
struct AppState {
    config: Arc<geny_config::Config>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PromptUpdate {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct PromptView {
    prompt: String,
    source: PromptOrigin,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Build the application router.
#[must_use]
pub fn router(config: geny_config::Config) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };

    Router::new()
        .route("/geny-chat", post(geny_chat))
        .route("/geny-prompt", get(get_prompt).put(put_prompt))
        .route("/healthz", get(healthz))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP service until the process is stopped.
///
/// # Errors
///
/// Returns an error if the listener cannot bind.
pub async fn run(config: geny_config::Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host(), config.server.port());
    let app = router(config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Geny listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire one pipeline for this request.
fn build_pipeline(config: &geny_config::Config) -> Result<ChatPipeline, GenyError> {
    let backend = geny_llm::from_config(config)?;
    let generator = QueryGenerator::new(backend);
    let prompts = ConfigPromptStore::new_from_config(config)?;
    let executor = QueryExecutor::new_from_config(config)?;

    Ok(ChatPipeline::new(
        Box::new(prompts),
        generator,
        Box::new(executor),
    ))
}

fn misconfigured(err: &GenyError) -> Response {
    error!(error = %err, "Request refused: service misconfigured");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

async fn healthz() -> &'static str {
    "ok"
}

async fn geny_chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let pipeline = match build_pipeline(&state.config) {
        Ok(pipeline) => pipeline,
        Err(err) => return misconfigured(&err),
    };

    let outcome = pipeline.handle(ChatQuestion::new(req.message)).await;
    Json(outcome).into_response()
}

async fn get_prompt(State(state): State<AppState>) -> Response {
    let store = match ConfigPromptStore::new_from_config(&state.config) {
        Ok(store) => store,
        Err(err) => return misconfigured(&GenyError::Store(err)),
    };

    let prompt = geny_engine::PromptSource::load(&store).await;
    Json(PromptView {
        prompt: prompt.text,
        source: prompt.origin,
    })
    .into_response()
}

async fn put_prompt(
    State(state): State<AppState>,
    Json(update): Json<PromptUpdate>,
) -> Response {
    let store = match ConfigPromptStore::new_from_config(&state.config) {
        Ok(store) => store,
        Err(err) => return misconfigured(&GenyError::Store(err)),
    };

    match store.save(&update.prompt).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorBody {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}
