use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("method not allowed: {method}")]
    MethodNotAllowed { method: String },
    #[error("internal error")]
    Internal { code: &'static str, message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl AppError {
    pub fn method_not_allowed(method: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            method: method.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::MethodNotAllowed { .. } => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "POST")],
                "Method Not Allowed",
            )
                .into_response(),
            Self::Internal { code, message } => {
                tracing::error!(error = %message, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        code: code.to_string(),
                        message: "internal server error".to_string(),
                        details: json!({}),
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// Failures raised while resolving or running a tool call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool {name} not found")]
    UnknownTool { name: String },
    #[error("Invalid arguments for tool {name}: {reason}")]
    InvalidInput { name: String, reason: String },
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    pub fn invalid_input(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidInput {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool {0} is already registered")]
    DuplicateTool(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is not connected to a server")]
    NotConnected,
    #[error("transport is already connected to a server")]
    AlreadyConnected,
    #[error("transport is closed")]
    Closed,
    #[error("transport has already handled a request")]
    AlreadyHandled,
}

impl From<TransportError> for AppError {
    fn from(err: TransportError) -> Self {
        Self::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_not_allowed_sets_allow_header() {
        let response = AppError::method_not_allowed("GET").into_response();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response
                .headers()
                .get(header::ALLOW)
                .and_then(|value| value.to_str().ok()),
            Some("POST")
        );
    }

    #[test]
    fn transport_errors_become_internal() {
        let error = AppError::from(TransportError::Closed);
        assert!(matches!(error, AppError::Internal { .. }));
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn tool_error_messages() {
        assert_eq!(
            ToolError::unknown_tool("nope").to_string(),
            "Tool nope not found"
        );
        assert_eq!(ToolError::execution("boom").to_string(), "boom");
    }
}
