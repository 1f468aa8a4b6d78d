use std::collections::HashMap;
use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, warn, Instrument};
use tracing_error::SpanTrace;

use crate::error::{render_traceback, ApiError, ApiResult};
use crate::pagination::PAGE_SIZE;
use crate::resource::{ApiRequest, CrudTable, EndpointKind, Operation, Outcome, Resource};

/// API-wide settings, read from the `api` entry of the modules bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Add a `traceback` to error bodies. Never enable in production.
    pub debug: bool,
    pub page_size: usize,
    /// Bearer token → username.
    pub tokens: HashMap<String, String>,
    pub cors_enabled: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            debug: false,
            page_size: PAGE_SIZE,
            tokens: HashMap::new(),
            cors_enabled: false,
        }
    }
}

/// Result of one dispatch, ready for a transport to render.
#[derive(Debug, Clone)]
pub enum Reply {
    Data { operation: Operation, body: Value },
    Absent { operation: Operation },
    Error { status: StatusCode, body: Value },
}

impl Reply {
    pub fn body(&self) -> Option<&Value> {
        match self {
            Reply::Data { body, .. } | Reply::Error { body, .. } => Some(body),
            Reply::Absent { .. } => None,
        }
    }
}

type Factory<R> = dyn Fn() -> R + Send + Sync;

/// Routes a request to one operation of a freshly built resource.
pub struct Dispatcher<R> {
    factory: Arc<Factory<R>>,
    table: CrudTable,
    settings: Arc<ApiSettings>,
}

impl<R> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            table: self.table.clone(),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<R: Resource> Dispatcher<R> {
    pub fn new(
        factory: impl Fn() -> R + Send + Sync + 'static,
        table: CrudTable,
        settings: Arc<ApiSettings>,
    ) -> Self {
        Self {
            factory: Arc::new(factory),
            table,
            settings,
        }
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub async fn handle(&self, kind: EndpointKind, req: ApiRequest) -> Reply {
        let resource = (self.factory)();
        let span = tracing::info_span!(
            "apikit.dispatch",
            resource = resource.name(),
            kind = kind.as_str(),
            method = %req.method,
        );

        async {
            match self.run(&resource, kind, &req).await {
                Ok(reply) => reply,
                Err(err) => self.error_reply(err),
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, resource: &R, kind: EndpointKind, req: &ApiRequest) -> ApiResult<Reply> {
        let operation = self
            .table
            .resolve(kind, &req.method)
            .ok_or_else(|| ApiError::MethodNotAllowed {
                method: req.method.to_string(),
            })?;

        if !resource.authorize(req) {
            return Err(ApiError::Unauthorized);
        }

        tracing::debug!(operation = operation.name(), "dispatching");

        let outcome = match operation {
            Operation::List => resource.list(req).await,
            Operation::Create => resource.create(req).await,
            Operation::UpdateList => resource.update_list(req).await,
            Operation::DeleteList => resource.delete_list(req).await,
            Operation::Detail => resource.detail(req).await,
            Operation::CreateDetail => resource.create_detail(req).await,
            Operation::Update => resource.update(req).await,
            Operation::Delete => resource.delete(req).await,
        }?;

        let preparer = resource.preparer(req);
        let body = match outcome {
            Outcome::Item(data) => preparer.prepare(&data)?,
            Outcome::Collection(items) => {
                let objects = items
                    .iter()
                    .map(|item| preparer.prepare(item))
                    .collect::<Result<Vec<_>, _>>()?;
                wrap_list(objects)
            }
            Outcome::Raw(value) => value,
            Outcome::Absent => return Ok(Reply::Absent { operation }),
        };

        Ok(Reply::Data { operation, body })
    }

    /// Render an error caught at the boundary; also used by transports for
    /// failures that happen before dispatch (malformed bodies).
    pub fn error_reply(&self, err: ApiError) -> Reply {
        let status = err.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %err, "api error");
        } else {
            warn!(status = status.as_u16(), error = %err, "api error");
        }

        let mut body = Map::new();
        body.insert("error".to_string(), err.payload());
        if self.settings.debug {
            let spans = SpanTrace::capture();
            body.insert(
                "traceback".to_string(),
                Value::String(render_traceback(&err, &spans)),
            );
        }
        Reply::Error {
            status,
            body: Value::Object(body),
        }
    }
}

/// Collection envelope.
pub fn wrap_list(objects: Vec<Value>) -> Value {
    json!({ "count": objects.len(), "objects": objects })
}
