//! REST-over-HTTP surface — `/v1/…` routes mirroring the JSON-RPC
//! methods.
//!
//! Unlike the JSON-RPC endpoint, errors here map onto HTTP status codes
//! (404 not-found, 400 validation, 422 content type, 401 authentication,
//! 500 internal) with the error object as the body, and the streaming
//! path emits raw events rather than JSON-RPC envelopes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::Event;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{A2AError, A2AResult};
use crate::metrics::metrics;
use crate::types::{
    CancelTaskParams, GetTaskParams, JsonRpcError, ListTasksParams, SendMessageParams,
    StreamEvent, TaskState,
};

use super::jsonrpc::{sse_response, AppState};

pub(crate) fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/card", get(handle_card))
        .route("/v1/message:send", post(handle_message_send))
        .route("/v1/message:stream", post(handle_message_stream))
        .route("/v1/tasks", get(handle_list_tasks))
        .route("/v1/tasks/{id}", get(handle_get_task).post(handle_task_action))
        .route(
            "/v1/tasks/{id}/pushNotificationConfigs",
            get(handle_get_push_configs).post(handle_set_push_config),
        )
        .route(
            "/v1/tasks/{id}/pushNotificationConfigs/{config_id}",
            delete(handle_delete_push_config),
        )
}

async fn handle_card(State(state): State<Arc<AppState>>) -> Response {
    Json(&state.agent_card).into_response()
}

async fn handle_message_send(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let params = match decode_body::<SendMessageParams>(&headers, &body) {
        Ok(params) => params,
        Err(err) => return rest_error(err),
    };

    let cancel = CancellationToken::new();
    // If the client disconnects, axum drops this future mid-await; the
    // guard then fires and cancels the still-running handler worker.
    let _guard = cancel.clone().drop_guard();
    match state.server.send_message(params, cancel).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => rest_error(err),
    }
}

async fn handle_message_stream(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let params = match decode_body::<SendMessageParams>(&headers, &body) {
        Ok(params) => params,
        Err(err) => return rest_error(err),
    };

    match state
        .server
        .send_streaming_message(params, CancellationToken::new())
        .await
    {
        Ok(stream) => sse_response(make_raw_sse(stream)),
        Err(err) => rest_error(err),
    }
}

async fn handle_get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let history_length = match parse_i32(&query, "historyLength") {
        Ok(value) => value,
        Err(err) => return rest_error(err),
    };

    let params = GetTaskParams {
        id,
        history_length,
        metadata: None,
    };
    match state.server.get_task(params).await {
        Ok(task) => Json(task).into_response(),
        Err(err) => rest_error(err),
    }
}

/// `POST /v1/tasks/{id}:cancel` — the capture swallows the whole segment,
/// so the custom verb suffix is split off here.
async fn handle_task_action(
    State(state): State<Arc<AppState>>,
    Path(id_action): Path<String>,
) -> Response {
    let Some(id) = id_action.strip_suffix(":cancel") else {
        return rest_error(A2AError::method_not_found(format!(
            "no action on '/v1/tasks/{}'",
            id_action
        )));
    };

    let params = CancelTaskParams {
        id: id.to_string(),
        metadata: None,
    };
    match state
        .server
        .cancel_task(params, CancellationToken::new())
        .await
    {
        Ok(task) => Json(task).into_response(),
        Err(err) => rest_error(err),
    }
}

async fn handle_list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let params = match list_params_from_query(&query) {
        Ok(params) => params,
        Err(err) => return rest_error(err),
    };
    match state.server.list_tasks(params).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => rest_error(err),
    }
}

async fn handle_get_push_configs(State(state): State<Arc<AppState>>) -> Response {
    match state.server.get_push_notification_config() {
        Ok(value) => Json(value).into_response(),
        Err(err) => rest_error(err),
    }
}

async fn handle_set_push_config(State(state): State<Arc<AppState>>) -> Response {
    match state.server.set_push_notification_config() {
        Ok(value) => Json(value).into_response(),
        Err(err) => rest_error(err),
    }
}

async fn handle_delete_push_config(State(state): State<Arc<AppState>>) -> Response {
    match state.server.delete_push_notification_config() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => rest_error(err),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Enforce `application/json`, then decode in two stages so syntax errors
/// and structural violations report distinct error kinds.
fn decode_body<T: serde::de::DeserializeOwned>(headers: &HeaderMap, body: &str) -> A2AResult<T> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("application/json") {
        return Err(A2AError::content_type_not_supported(format!(
            "expected application/json, got '{}'",
            content_type
        )));
    }

    let document: Value = serde_json::from_str(body)
        .map_err(|err| A2AError::parse_error(format!("invalid JSON payload: {}", err)))?;
    serde_json::from_value(document)
        .map_err(|err| A2AError::invalid_request(format!("malformed request body: {}", err)))
}

fn parse_i32(query: &HashMap<String, String>, key: &str) -> A2AResult<Option<i32>> {
    query
        .get(key)
        .map(|raw| {
            raw.parse::<i32>()
                .map_err(|_| A2AError::invalid_params(format!("invalid {} '{}'", key, raw)))
        })
        .transpose()
}

fn list_params_from_query(query: &HashMap<String, String>) -> A2AResult<ListTasksParams> {
    let status = query
        .get("status")
        .map(|raw| {
            serde_json::from_value::<TaskState>(Value::String(raw.clone()))
                .map_err(|_| A2AError::invalid_params(format!("unknown status filter '{}'", raw)))
        })
        .transpose()?;

    let include_artifacts = query
        .get("includeArtifacts")
        .map(|raw| {
            raw.parse::<bool>().map_err(|_| {
                A2AError::invalid_params(format!("invalid includeArtifacts '{}'", raw))
            })
        })
        .transpose()?;

    Ok(ListTasksParams {
        context_id: query.get("contextId").cloned(),
        status,
        status_timestamp_after: query.get("statusTimestampAfter").cloned(),
        page_size: parse_i32(query, "pageSize")?,
        page_token: query.get("pageToken").cloned(),
        history_length: parse_i32(query, "historyLength")?,
        include_artifacts,
    })
}

/// Emit raw event payloads, one `data:` record each.
fn make_raw_sse(
    mut events: BoxStream<'static, A2AResult<StreamEvent>>,
) -> impl futures::Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => yield Ok(Event::default().data(json)),
                    Err(err) => warn!(error = %err, "Failed to serialize stream event"),
                },
                Err(err) => {
                    metrics().observe_error(err.code());
                    let error: JsonRpcError = err.into();
                    if let Ok(json) = serde_json::to_string(&error) {
                        yield Ok(Event::default().data(json));
                    }
                    break;
                }
            }
        }
    }
}

fn rest_error(err: A2AError) -> Response {
    metrics().observe_error(err.code());
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let error: JsonRpcError = err.into();
    (status, Json(error)).into_response()
}
