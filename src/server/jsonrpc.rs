//! JSON-RPC 2.0 front-end — envelope validation, method dispatch, and SSE
//! formatting.
//!
//! Routes:
//! - `POST /a2a` — JSON-RPC dispatch for all A2A methods
//! - `GET /.well-known/agent-card.json` — agent card discovery
//! - `GET /.well-known/agent.json` — deprecated card path (still served)
//!
//! | Method | Response kind |
//! |--------|---------------|
//! | `message/send` | single |
//! | `message/stream` | SSE |
//! | `tasks/get` | single |
//! | `tasks/list` | single |
//! | `tasks/cancel` | single |
//! | `tasks/subscribe`, `tasks/resubscribe` | SSE |
//! | `tasks/pushNotificationConfig/set`, `…/get` | single (unsupported) |
//! | `agent/getAuthenticatedExtendedCard` | single |
//!
//! Well-formed JSON-RPC always rides HTTP 200; errors travel in the
//! response envelope with the request id echoed verbatim (null included).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::BoxStream;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::metrics::metrics;
use crate::types::{
    AgentCard, CancelTaskParams, GetTaskParams, JsonRpcId, JsonRpcResponse, ListTasksParams,
    SendMessageParams, StreamEvent, SubscribeToTaskParams,
};
use crate::utils::constants::{AGENT_CARD_WELL_KNOWN_PATH, PREV_AGENT_CARD_WELL_KNOWN_PATH};

use super::rest;
use super::server::A2AServer;

/// Shared state for all HTTP routes.
pub(crate) struct AppState {
    pub(crate) server: Arc<A2AServer>,
    pub(crate) agent_card: AgentCard,
}

/// Create an axum `Router` exposing the JSON-RPC endpoint, the REST
/// surface, and agent-card discovery for the given orchestrator.
pub fn a2a_router(server: Arc<A2AServer>, agent_card: AgentCard) -> Router {
    let state = Arc::new(AppState { server, agent_card });

    Router::new()
        .route(AGENT_CARD_WELL_KNOWN_PATH, get(handle_agent_card))
        .route(PREV_AGENT_CARD_WELL_KNOWN_PATH, get(handle_agent_card_deprecated))
        .route(crate::utils::constants::DEFAULT_RPC_PATH, post(handle_jsonrpc))
        .merge(rest::routes())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

/// Serve the agent card at the well-known endpoint.
async fn handle_agent_card(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(&state.agent_card).into_response()
}

/// Serve the agent card at the deprecated path.
async fn handle_agent_card_deprecated(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    warn!(
        "Deprecated agent card endpoint '{}' accessed; use '{}' instead.",
        PREV_AGENT_CARD_WELL_KNOWN_PATH, AGENT_CARD_WELL_KNOWN_PATH
    );
    Json(&state.agent_card).into_response()
}

/// A validated JSON-RPC request envelope.
#[derive(Debug)]
struct ValidRequest {
    id: Option<JsonRpcId>,
    method: String,
    params: Option<Value>,
}

/// Main JSON-RPC dispatch handler.
///
/// The body is taken raw so malformed JSON can be answered with a proper
/// `ParseError` envelope instead of a transport-level failure.
async fn handle_jsonrpc(State(state): State<Arc<AppState>>, body: String) -> Response {
    let document: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(err) => {
            metrics().observe_error(crate::error::PARSE_ERROR);
            return Json(JsonRpcResponse::from_a2a_error(
                Some(JsonRpcId::Null),
                A2AError::parse_error(format!("invalid JSON payload: {}", err)),
            ))
            .into_response();
        }
    };

    let request = match validate_envelope(document) {
        Ok(request) => request,
        Err((id, err)) => {
            metrics().observe_error(err.code());
            return Json(JsonRpcResponse::from_a2a_error(id, err)).into_response();
        }
    };

    debug!(method = %request.method, "JSON-RPC request received");
    let started = Instant::now();
    let method = request.method.clone();

    let response = dispatch(state, request).await;

    metrics().observe_request(&method, started.elapsed().as_secs_f64());
    response
}

/// Validate the JSON-RPC envelope, returning the id to echo on failure.
fn validate_envelope(document: Value) -> Result<ValidRequest, (Option<JsonRpcId>, A2AError)> {
    let Some(object) = document.as_object() else {
        return Err((
            Some(JsonRpcId::Null),
            A2AError::invalid_request("request must be a JSON object"),
        ));
    };

    // The id is decoded first so later violations can echo it.
    let id = match object.get("id") {
        None => None,
        Some(Value::Null) => Some(JsonRpcId::Null),
        Some(Value::String(s)) => Some(JsonRpcId::String(s.clone())),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(JsonRpcId::Number(i)),
            None => {
                return Err((
                    Some(JsonRpcId::Null),
                    A2AError::invalid_request("request id must be an integer, a string, or null"),
                ))
            }
        },
        Some(_) => {
            return Err((
                Some(JsonRpcId::Null),
                A2AError::invalid_request("request id must be a string, number, or null"),
            ))
        }
    };

    match object.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        Some(other) => {
            return Err((
                id,
                A2AError::invalid_request(format!(
                    "unsupported JSON-RPC version '{}' — must be \"2.0\"",
                    other
                )),
            ))
        }
        None => {
            return Err((
                id,
                A2AError::invalid_request("missing required 'jsonrpc' field"),
            ))
        }
    }

    let method = match object.get("method").and_then(Value::as_str) {
        Some(m) if !m.is_empty() => m.to_string(),
        Some(_) => {
            return Err((id, A2AError::invalid_request("method must be non-empty")));
        }
        None => {
            return Err((
                id,
                A2AError::invalid_request("missing required 'method' field"),
            ))
        }
    };

    let params = match object.get("params") {
        None | Some(Value::Null) => None,
        Some(value @ Value::Object(_)) => Some(value.clone()),
        Some(_) => {
            return Err((
                id,
                A2AError::invalid_request("params must be a JSON object when present"),
            ))
        }
    };

    Ok(ValidRequest { id, method, params })
}

/// Decode typed params, distinguishing absence from malformed content.
///
/// Absent params are an `InvalidParams` violation; present-but-malformed
/// payloads (missing fields, bad event kinds, duplicated file content)
/// violate domain structure and map to `InvalidRequest`.
fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> A2AResult<T> {
    let value = params.ok_or_else(|| A2AError::invalid_params("params are required"))?;
    serde_json::from_value(value)
        .map_err(|err| A2AError::invalid_request(format!("malformed params: {}", err)))
}

async fn dispatch(state: Arc<AppState>, request: ValidRequest) -> Response {
    let ValidRequest { id, method, params } = request;

    match method.as_str() {
        "message/send" => {
            let result = match decode_params::<SendMessageParams>(params) {
                Ok(p) => run_send(&state, p).await,
                Err(err) => Err(err),
            };
            single_response(id, result)
        }
        "message/stream" => {
            match decode_params::<SendMessageParams>(params) {
                Ok(p) => {
                    let cancel = CancellationToken::new();
                    match state.server.send_streaming_message(p, cancel).await {
                        Ok(stream) => sse_response(make_jsonrpc_sse(id, stream)),
                        Err(err) => error_response(id, err),
                    }
                }
                Err(err) => error_response(id, err),
            }
        }
        "tasks/get" => {
            let result = match decode_params::<GetTaskParams>(params) {
                Ok(p) => state.server.get_task(p).await.and_then(to_json),
                Err(err) => Err(err),
            };
            single_response(id, result)
        }
        "tasks/list" => {
            // Absent params means an unfiltered first page.
            let decoded = match params {
                None => Ok(ListTasksParams::default()),
                some => decode_params::<ListTasksParams>(some),
            };
            let result = match decoded {
                Ok(p) => state.server.list_tasks(p).await.and_then(to_json),
                Err(err) => Err(err),
            };
            single_response(id, result)
        }
        "tasks/cancel" => {
            let result = match decode_params::<CancelTaskParams>(params) {
                Ok(p) => {
                    state
                        .server
                        .cancel_task(p, CancellationToken::new())
                        .await
                        .and_then(to_json)
                }
                Err(err) => Err(err),
            };
            single_response(id, result)
        }
        "tasks/subscribe" | "tasks/resubscribe" => {
            match decode_params::<SubscribeToTaskParams>(params) {
                Ok(p) => match state.server.subscribe_to_task(p).await {
                    Ok(stream) => sse_response(make_jsonrpc_sse(id, stream)),
                    Err(err) => error_response(id, err),
                },
                Err(err) => error_response(id, err),
            }
        }
        "tasks/pushNotificationConfig/set" => {
            single_response(id, state.server.set_push_notification_config())
        }
        "tasks/pushNotificationConfig/get" => {
            single_response(id, state.server.get_push_notification_config())
        }
        "agent/getAuthenticatedExtendedCard" => {
            // Params are optional for this method.
            single_response(id, state.server.extended_agent_card().and_then(to_json))
        }
        unknown => {
            warn!(method = %unknown, "Unknown JSON-RPC method");
            error_response(
                id,
                A2AError::method_not_found(format!("method '{}' is not recognized", unknown)),
            )
        }
    }
}

async fn run_send(state: &Arc<AppState>, params: SendMessageParams) -> A2AResult<Value> {
    let cancel = CancellationToken::new();
    // Dropping this handler future (client disconnect) cancels the worker.
    let _guard = cancel.clone().drop_guard();
    let response = state.server.send_message(params, cancel).await?;
    to_json(response)
}

fn to_json<T: serde::Serialize>(value: T) -> A2AResult<Value> {
    serde_json::to_value(value)
        .map_err(|err| A2AError::internal_error(format!("failed to serialize response: {}", err)))
}

fn single_response(id: Option<JsonRpcId>, result: A2AResult<Value>) -> Response {
    match result {
        Ok(value) => Json(JsonRpcResponse::success(id, value)).into_response(),
        Err(err) => error_response(id, err),
    }
}

fn error_response(id: Option<JsonRpcId>, err: A2AError) -> Response {
    metrics().observe_error(err.code());
    Json(JsonRpcResponse::from_a2a_error(id, err)).into_response()
}

/// Wrap orchestrator events as JSON-RPC response envelopes, one SSE
/// `data:` record each. No `event:` or `id:` fields are emitted.
///
/// A mid-stream failure after headers cannot change the HTTP status; a
/// single best-effort error envelope is emitted and the stream closed.
fn make_jsonrpc_sse(
    request_id: Option<JsonRpcId>,
    mut events: BoxStream<'static, A2AResult<StreamEvent>>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    use futures::StreamExt;

    async_stream::stream! {
        while let Some(item) = events.next().await {
            let envelope = match item {
                Ok(event) => match serde_json::to_value(&event) {
                    Ok(value) => JsonRpcResponse::success(request_id.clone(), value),
                    Err(err) => {
                        warn!(error = %err, "Failed to serialize stream event");
                        continue;
                    }
                },
                Err(err) => {
                    metrics().observe_error(err.code());
                    let response = JsonRpcResponse::from_a2a_error(request_id.clone(), err);
                    if let Ok(json) = serde_json::to_string(&response) {
                        yield Ok(Event::default().data(json));
                    }
                    break;
                }
            };
            match serde_json::to_string(&envelope) {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(err) => warn!(error = %err, "Failed to serialize SSE envelope"),
            }
        }
    }
}

/// Build the SSE response with streaming-friendly headers.
pub(crate) fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    let mut response = Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response();
    let headers = response.headers_mut();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store"),
    );
    // Disable proxy response buffering for timely delivery.
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_rejects_non_object() {
        let (id, err) = validate_envelope(json!([1, 2, 3])).unwrap_err();
        assert_eq!(id, Some(JsonRpcId::Null));
        assert_eq!(err.code(), crate::error::INVALID_REQUEST);
    }

    #[test]
    fn envelope_rejects_wrong_version() {
        let (id, err) = validate_envelope(json!({
            "jsonrpc": "1.0", "id": 1, "method": "tasks/get"
        }))
        .unwrap_err();
        assert_eq!(id, Some(JsonRpcId::Number(1)));
        assert_eq!(err.code(), crate::error::INVALID_REQUEST);
    }

    #[test]
    fn envelope_rejects_missing_method() {
        let (_, err) = validate_envelope(json!({"jsonrpc": "2.0", "id": 1})).unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_REQUEST);
    }

    #[test]
    fn envelope_rejects_array_params() {
        let (_, err) = validate_envelope(json!({
            "jsonrpc": "2.0", "id": 1, "method": "tasks/get", "params": [1, 2]
        }))
        .unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_REQUEST);
    }

    #[test]
    fn envelope_rejects_boolean_id() {
        let (id, err) = validate_envelope(json!({
            "jsonrpc": "2.0", "id": true, "method": "tasks/get"
        }))
        .unwrap_err();
        assert_eq!(id, Some(JsonRpcId::Null));
        assert_eq!(err.code(), crate::error::INVALID_REQUEST);
    }

    #[test]
    fn envelope_accepts_all_id_kinds() {
        for (raw, expected) in [
            (json!("abc"), JsonRpcId::String("abc".to_string())),
            (json!(42), JsonRpcId::Number(42)),
            (Value::Null, JsonRpcId::Null),
        ] {
            let request = validate_envelope(json!({
                "jsonrpc": "2.0", "id": raw, "method": "tasks/get", "params": {"id": "t1"}
            }))
            .unwrap();
            assert_eq!(request.id, Some(expected));
        }
    }

    #[test]
    fn decode_params_requires_presence() {
        let err = decode_params::<GetTaskParams>(None).unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_PARAMS);
    }

    #[test]
    fn decode_params_maps_malformed_to_invalid_request() {
        let err = decode_params::<GetTaskParams>(Some(json!({"historyLength": 3}))).unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_REQUEST);
    }
}
