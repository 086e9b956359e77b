//! HTTP front end.
//!
//! Exposes the ingestion and chat workflows of a [`Session`] as a small
//! JSON API for the browser client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/history` | Conversation log, oldest turn first |
//! | `GET`  | `/agents` | Registered agents with descriptions |
//! | `POST` | `/upload` | Multipart upload (field `files`), then ingestion |
//! | `POST` | `/chat` | `{ "message": "..." }` → `{ "answer", "sources" }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Empty message" } }
//! ```
//!
//! Error codes: `bad_request` (400), `ingest_failed` (500),
//! `chat_failed` (500), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use agentic_rag_core::agents::AgentInfo;
use agentic_rag_core::models::ChatTurn;
use agentic_rag_core::{Session, WorkflowError};

use crate::config::Config;

/// Largest accepted request body (all files of one upload together).
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    session: Arc<Session>,
    uploads_dir: Arc<PathBuf>,
}

/// Build the application router without binding a socket.
pub fn app(session: Arc<Session>, uploads_dir: PathBuf) -> Router {
    let state = AppState {
        session,
        uploads_dir: Arc::new(uploads_dir),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/history", get(handle_history))
        .route("/agents", get(handle_agents))
        .route("/upload", post(handle_upload))
        .route("/chat", post(handle_chat))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Bind `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config, session: Arc<Session>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = app(session, config.data.uploads_dir.clone());

    println!("Agentic RAG server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn server_error(code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: code.to_string(),
        message: message.into(),
    }
}

/// Map a failed chat workflow to a response by the stage it stopped in.
fn chat_error(err: &WorkflowError) -> AppError {
    let message = match err.stage() {
        "routing" => "Retrieval process failed.",
        "answering" => "Response generation failed.",
        _ => "Unknown error in chat processing.",
    };
    server_error("chat_failed", message)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /history ============

#[derive(Serialize)]
struct HistoryResponse {
    turns: Vec<ChatTurn>,
}

async fn handle_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        turns: state.session.history(),
    })
}

// ============ GET /agents ============

#[derive(Serialize)]
struct AgentListResponse {
    agents: Vec<AgentInfo>,
}

async fn handle_agents(State(state): State<AppState>) -> Json<AgentListResponse> {
    Json(AgentListResponse {
        agents: state.session.agents(),
    })
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
}

/// Handler for `POST /upload`.
///
/// Every part named `files` is written to the uploads directory under its
/// bare file name, then all saved paths go through one ingestion run.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut saw_files_part = false;
    let mut saved: Vec<PathBuf> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("files") {
            continue;
        }
        saw_files_part = true;

        let Some(name) = field.file_name().and_then(upload_file_name) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload {}: {}", name, e)))?;

        let path = state.uploads_dir.join(&name);
        tokio::fs::create_dir_all(state.uploads_dir.as_path())
            .await
            .map_err(|e| server_error("internal", e.to_string()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| server_error("internal", format!("failed to save {}: {}", name, e)))?;
        info!(file = %name, bytes = bytes.len(), "saved upload");
        saved.push(path);
    }

    if !saw_files_part {
        return Err(bad_request("No files part"));
    }
    if saved.is_empty() {
        return Err(bad_request("No selected files"));
    }

    let count = saved.len();
    match state.session.ingest(saved).await {
        Ok(_) => Ok(Json(UploadResponse {
            message: format!("Successfully ingested {} file(s).", count),
        })),
        Err(e) => {
            warn!(error = %e, "upload ingestion failed");
            Err(server_error("ingest_failed", "Ingestion process failed."))
        }
    }
}

/// Reduce a client-supplied name to its final path component.
///
/// Returns `None` for names with no usable component (empty, `.`, `..`).
fn upload_file_name(raw: &str) -> Option<String> {
    let normalized = raw.replace('\\', "/");
    let name = Path::new(&normalized).file_name()?.to_str()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
    sources: Vec<String>,
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) =
        payload.map_err(|e| bad_request(format!("invalid chat body: {}", e.body_text())))?;
    let query = request.message.trim();
    if query.is_empty() {
        return Err(bad_request("Empty message"));
    }

    let outcome = state
        .session
        .chat(query)
        .await
        .map_err(|e| chat_error(&e))?;

    Ok(Json(ChatResponse {
        answer: outcome.response.answer,
        sources: outcome.response.sources,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_names_keep_only_the_last_component() {
        assert_eq!(upload_file_name("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            upload_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            upload_file_name("C:\\Users\\me\\notes.txt").as_deref(),
            Some("notes.txt")
        );
        assert_eq!(upload_file_name(""), None);
        assert_eq!(upload_file_name(".."), None);
    }

    #[test]
    fn chat_errors_name_the_failed_stage() {
        let routing = chat_error(&WorkflowError::NoReply {
            workflow: "chat",
            stage: "routing",
        });
        assert_eq!(routing.message, "Retrieval process failed.");
        assert_eq!(routing.status, StatusCode::INTERNAL_SERVER_ERROR);

        let answering = chat_error(&WorkflowError::Incomplete {
            workflow: "chat",
            stage: "answering",
        });
        assert_eq!(answering.message, "Response generation failed.");
    }
}
