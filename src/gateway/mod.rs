//! HTTP mirror of the RPC surface.
//!
//! Serves the same four operations under `/v1/*` for callers that speak
//! plain JSON over HTTP instead of the framed transport. Error codes map
//! onto HTTP statuses so browser-side and script clients get conventional
//! semantics.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::router::ToolRouter;
use crate::types::Error;

/// JSON error envelope with the wire code preserved alongside the HTTP
/// status.
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.0.wire_code().to_string();
        let status = match code.as_str() {
            "INVALID_ARGUMENT" => StatusCode::BAD_REQUEST,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "ABORTED" => StatusCode::CONFLICT,
            "DEADLINE_EXCEEDED" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": {
                "code": code,
                "message": self.0.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult = std::result::Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    tool_name: String,
    #[serde(default)]
    task_id: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ProvideRequest {
    #[serde(default)]
    task_id: String,
    #[serde(default)]
    response: Value,
}

async fn list_tools(State(router): State<Arc<ToolRouter>>) -> ApiResult {
    let tools = router.list_tools().await;
    Ok(Json(json!({
        "count": tools.len(),
        "tools": tools,
    })))
}

async fn execute_tool(
    State(router): State<Arc<ToolRouter>>,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult {
    let outcome = router
        .execute_tool(&request.tool_name, &request.task_id, request.arguments)
        .await?;
    Ok(Json(serde_json::to_value(outcome).map_err(Error::from)?))
}

async fn provide_human_input(
    State(router): State<Arc<ToolRouter>>,
    Json(request): Json<ProvideRequest>,
) -> ApiResult {
    let ack = router
        .provide_human_input(&request.task_id, request.response)
        .await?;
    Ok(Json(serde_json::to_value(ack).map_err(Error::from)?))
}

async fn get_human_input(
    State(router): State<Arc<ToolRouter>>,
    Path(task_id): Path<String>,
) -> ApiResult {
    let answer = router.get_human_input(&task_id).await?;
    Ok(Json(serde_json::to_value(answer).map_err(Error::from)?))
}

/// Build the `/v1` router over a shared [`ToolRouter`].
pub fn api_router(router: Arc<ToolRouter>) -> Router {
    Router::new()
        .route("/v1/tools", get(list_tools))
        .route("/v1/tools/execute", post(execute_tool))
        .route("/v1/human-input", post(provide_human_input))
        .route("/v1/human-input/{task_id}", get(get_human_input))
        .layer(CorsLayer::permissive())
        .with_state(router)
}

/// Serve the HTTP surface until `cancel` fires.
pub async fn serve(
    router: Arc<ToolRouter>,
    listener: TcpListener,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "http gateway listening");
    axum::serve(listener, api_router(router))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}
