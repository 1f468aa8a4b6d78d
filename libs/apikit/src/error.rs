use std::backtrace::Backtrace;

use http::StatusCode;
use serde_json::{json, Value};
use tracing_error::SpanTrace;

use crate::preparer::ResolveError;
use crate::resource::Operation;

const DEFAULT_MESSAGE: &str = "Api Error";

/// Application-level failure raised by a resource operation.
///
/// Caught once at the dispatch boundary and rendered as `{"error": ...}`.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("The specified HTTP method {method} is not implemented.")]
    MethodNotAllowed { method: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error(
        "The \"{}\" method ({},{}) is not implemented.",
        .operation.name(),
        .operation.kind().as_str(),
        .operation.method()
    )]
    NotImplemented { operation: Operation },

    #[error("Only one new record allowed")]
    MultipleRecords,

    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{}", .0.join("; "))]
    Persistence(Vec<String>),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{}", or_default(.0))]
    Message(Option<String>),
}

pub type ApiResult<T> = Result<T, ApiError>;

fn or_default(msg: &Option<String>) -> &str {
    match msg.as_deref() {
        Some(m) if !m.is_empty() => m,
        _ => DEFAULT_MESSAGE,
    }
}

impl ApiError {
    pub fn message(msg: impl Into<String>) -> Self {
        ApiError::Message(Some(msg.into()))
    }

    pub fn not_implemented(operation: Operation) -> Self {
        ApiError::NotImplemented { operation }
    }

    /// Flattens an error chain into one message per cause.
    pub fn persistence(err: &anyhow::Error) -> Self {
        ApiError::Persistence(err.chain().map(|e| e.to_string()).collect())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            ApiError::Persistence(_) | ApiError::Resolve(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MultipleRecords
            | ApiError::Validation(_)
            | ApiError::BadRequest(_)
            | ApiError::Message(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Value of the `error` key: message lists stay lists.
    pub fn payload(&self) -> Value {
        match self {
            ApiError::Validation(msgs) | ApiError::Persistence(msgs) => json!(msgs),
            other => Value::String(other.to_string()),
        }
    }
}

/// Text dump of where an error was caught: active spans, then the stack.
pub(crate) fn render_traceback(err: &ApiError, spans: &SpanTrace) -> String {
    let backtrace = Backtrace::force_capture();
    format!(
        "Traceback (most recent call last):\n{spans}\n{backtrace}\n{name}: {err}",
        name = variant_name(err)
    )
}

fn variant_name(err: &ApiError) -> &'static str {
    match err {
        ApiError::MethodNotAllowed { .. } => "MethodNotAllowed",
        ApiError::Unauthorized => "Unauthorized",
        ApiError::NotImplemented { .. } => "NotImplemented",
        ApiError::MultipleRecords => "MultipleRecords",
        ApiError::Validation(_) => "Validation",
        ApiError::Persistence(_) => "Persistence",
        ApiError::Resolve(_) => "Resolve",
        ApiError::BadRequest(_) => "BadRequest",
        ApiError::Message(_) => "ApiError",
    }
}
