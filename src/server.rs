//! To-do list HTTP service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/api/todos` | All todos, newest first |
//! | `POST`   | `/api/todos` | Create from `{"content": ...}` (201) |
//! | `PUT`    | `/api/todos/{id}` | Partial update of `content` / `completed` |
//! | `DELETE` | `/api/todos/{id}` | Remove; returns `{"result": "success"}` |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "todo 7 not found" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! served from elsewhere can call the API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::todos::{self, NewTodo, Todo, TodoPatch};
use crate::{db, migrate};

#[derive(Clone)]
struct AppState {
    pool: SqlitePool,
}

/// Connect, migrate, and serve on `[server].bind` until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.todos).await?;
    migrate::run_migrations(&pool).await?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("To-do server listening on http://{}", listener.local_addr()?);
    info!(bind = %config.server.bind, db = %config.todos.db_path.display(), "server started");

    axum::serve(listener, router(pool)).await?;
    Ok(())
}

pub fn router(pool: SqlitePool) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/todos", get(handle_list).post(handle_create))
        .route("/api/todos/{id}", put(handle_update).delete(handle_delete))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { pool })
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

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(id: i64) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: format!("todo {} not found", id),
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "request failed");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
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

// ============ /api/todos ============

async fn handle_list(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, AppError> {
    Ok(Json(todos::list(&state.pool).await?))
}

async fn handle_create(
    State(state): State<AppState>,
    body: Result<Json<NewTodo>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let Json(new) = body?;
    let content = todos::validate_content(new.content.as_deref()).map_err(bad_request)?;
    let todo = todos::create(&state.pool, content).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<TodoPatch>, JsonRejection>,
) -> Result<Json<Todo>, AppError> {
    let Json(mut patch) = body?;
    if let Some(content) = patch.content.take() {
        let content = todos::validate_content(Some(&content)).map_err(bad_request)?;
        patch.content = Some(content.to_string());
    }
    todos::update(&state.pool, id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

#[derive(Serialize)]
struct DeleteResponse {
    result: &'static str,
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    if todos::delete(&state.pool, id).await? {
        Ok(Json(DeleteResponse { result: "success" }))
    } else {
        Err(not_found(id))
    }
}
