//! Streamable HTTP transport for a single request/response exchange
//!
//! A transport is created for every incoming HTTP request, bound to the shared
//! [`McpServer`] with [`StreamableHttpTransport::connect`], used once and then
//! closed. Request ids are only tracked within the transport that saw them, so
//! two requests that reuse the same JSON-RPC id cannot collide.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tracing::debug;

use crate::errors::TransportError;
use crate::mcp::rpc::{json_rpc_error, INVALID_REQUEST, SERVER_ERROR};
use crate::mcp::server::McpServer;

pub const SESSION_ID_HEADER: &str = "mcp-session-id";
const JSON_MEDIA_TYPE: &str = "application/json";
const EVENT_STREAM_MEDIA_TYPE: &str = "text/event-stream";

#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    /// `None` runs the transport stateless: no session id is minted.
    pub session_id_generator: Option<fn() -> String>,
    /// Emit a single JSON document instead of an event stream.
    pub enable_json_response: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            session_id_generator: None,
            enable_json_response: true,
        }
    }
}

/// Cloneable view on a transport's lifecycle.
#[derive(Debug, Clone, Default)]
pub struct TransportHandle {
    closed: Arc<AtomicBool>,
}

impl TransportHandle {
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("mcp transport closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the transport when the returned guard is dropped, including
    /// when the owning future is cancelled by a client disconnect.
    pub fn close_on_drop(self) -> CloseGuard {
        CloseGuard { handle: self }
    }
}

pub struct CloseGuard {
    handle: TransportHandle,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.handle.close();
    }
}

pub struct StreamableHttpTransport {
    config: TransportConfig,
    server: Option<Arc<McpServer>>,
    in_flight: HashSet<String>,
    handled: bool,
    handle: TransportHandle,
}

impl StreamableHttpTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            server: None,
            in_flight: HashSet::new(),
            handled: false,
            handle: TransportHandle::default(),
        }
    }

    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub fn connect(&mut self, server: Arc<McpServer>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.server.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        self.server = Some(server);
        Ok(())
    }

    /// Serves exactly one HTTP exchange; any later call fails with
    /// [`TransportError::AlreadyHandled`].
    pub async fn handle_request(
        &mut self,
        headers: &HeaderMap,
        body: Value,
    ) -> Result<Response, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let server = self.server.clone().ok_or(TransportError::NotConnected)?;
        if self.handled {
            return Err(TransportError::AlreadyHandled);
        }
        self.handled = true;

        if !self.accepts_response_type(headers) {
            return Ok((
                StatusCode::NOT_ACCEPTABLE,
                Json(json_rpc_error(
                    None,
                    SERVER_ERROR,
                    &format!("Not Acceptable: client must accept {}", self.response_media_type()),
                )),
            )
                .into_response());
        }

        let contains_initialize = match &body {
            Value::Array(batch) => batch.iter().any(is_initialize_request),
            message => is_initialize_request(message),
        };

        let (responses, batched) = match body {
            Value::Array(batch) => {
                if batch.is_empty() {
                    let error = json_rpc_error(None, INVALID_REQUEST, "Invalid Request");
                    return Ok(self.render(vec![error], true, None));
                }

                let mut responses = Vec::new();
                for message in batch {
                    if let Some(response) = self.dispatch(&server, message).await {
                        responses.push(response);
                    }
                }
                (responses, true)
            }
            message => (self.dispatch(&server, message).await.into_iter().collect(), false),
        };

        if responses.is_empty() {
            return Ok(StatusCode::ACCEPTED.into_response());
        }

        let session_id = if contains_initialize {
            self.config.session_id_generator.map(|generate| generate())
        } else {
            None
        };

        Ok(self.render(responses, batched, session_id))
    }

    pub fn close(&mut self) {
        self.server = None;
        self.in_flight.clear();
        self.handle.close();
    }

    async fn dispatch(&mut self, server: &McpServer, message: Value) -> Option<Value> {
        if let Some(key) = request_id_key(&message) {
            if !self.in_flight.insert(key) {
                let id = message.get("id").cloned();
                return Some(json_rpc_error(id, INVALID_REQUEST, "Invalid Request"));
            }
        }

        server.handle_message(message).await
    }

    fn response_media_type(&self) -> &'static str {
        if self.config.enable_json_response {
            JSON_MEDIA_TYPE
        } else {
            EVENT_STREAM_MEDIA_TYPE
        }
    }

    fn accepts_response_type(&self, headers: &HeaderMap) -> bool {
        let Some(accept) = headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
        else {
            return true;
        };

        let wanted = self.response_media_type();
        accept
            .split(',')
            .map(|item| item.split(';').next().unwrap_or_default().trim())
            .any(|media_range| media_range_matches(media_range, wanted))
    }

    fn render(&self, responses: Vec<Value>, batched: bool, session_id: Option<String>) -> Response {
        let mut response = if self.config.enable_json_response {
            let body = if batched {
                Value::Array(responses)
            } else {
                responses.into_iter().next().unwrap_or(Value::Null)
            };
            (StatusCode::OK, Json(body)).into_response()
        } else {
            let body = responses
                .iter()
                .map(|message| format!("event: message\ndata: {message}\n\n"))
                .collect::<String>();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, EVENT_STREAM_MEDIA_TYPE)],
                body,
            )
                .into_response()
        };

        if let Some(value) = session_id.and_then(|id| HeaderValue::from_str(&id).ok()) {
            response.headers_mut().insert(SESSION_ID_HEADER, value);
        }

        response
    }
}

/// Matches `type/subtype`, `type/*` and `*/*` ranges case-insensitively.
fn media_range_matches(range: &str, media_type: &str) -> bool {
    let (Some((range_type, range_subtype)), Some((wanted_type, wanted_subtype))) =
        (range.split_once('/'), media_type.split_once('/'))
    else {
        return false;
    };

    match (range_type.trim(), range_subtype.trim()) {
        ("*", "*") => true,
        (range_type, "*") => range_type.eq_ignore_ascii_case(wanted_type),
        (range_type, range_subtype) => {
            range_type.eq_ignore_ascii_case(wanted_type)
                && range_subtype.eq_ignore_ascii_case(wanted_subtype)
        }
    }
}

fn is_initialize_request(message: &Value) -> bool {
    message.get("method").and_then(Value::as_str) == Some("initialize")
        && message.get("id").is_some()
}

/// Only requests carry ids that need a response correlated to them.
fn request_id_key(message: &Value) -> Option<String> {
    message.get("method")?;
    let id = message.get("id")?;
    match id {
        Value::String(value) => Some(format!("s:{value}")),
        Value::Number(value) => Some(format!("n:{value}")),
        _ => None,
    }
}
