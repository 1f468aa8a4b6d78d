//! The resource contract: eight CRUD operations over two endpoint kinds.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde_json::Value;
use url::Url;

use crate::data::Data;
use crate::error::{ApiError, ApiResult};
use crate::preparer::{FieldMap, Linker, Preparer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Collection route, `{resource}/`.
    List,
    /// Item route, `{resource}/{pk}/`.
    Detail,
}

impl EndpointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointKind::List => "list",
            EndpointKind::Detail => "detail",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    UpdateList,
    DeleteList,
    Detail,
    CreateDetail,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::List,
        Operation::Create,
        Operation::UpdateList,
        Operation::DeleteList,
        Operation::Detail,
        Operation::CreateDetail,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::UpdateList => "update_list",
            Operation::DeleteList => "delete_list",
            Operation::Detail => "detail",
            Operation::CreateDetail => "create_detail",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Endpoint kind of the standard mapping.
    pub fn kind(self) -> EndpointKind {
        match self {
            Operation::List | Operation::Create | Operation::UpdateList | Operation::DeleteList => {
                EndpointKind::List
            }
            _ => EndpointKind::Detail,
        }
    }

    /// HTTP method of the standard mapping.
    pub fn method(self) -> Method {
        match self {
            Operation::List | Operation::Detail => Method::GET,
            Operation::Create | Operation::CreateDetail => Method::POST,
            Operation::UpdateList | Operation::Update => Method::PUT,
            Operation::DeleteList | Operation::Delete => Method::DELETE,
        }
    }
}

/// `(endpoint kind, method)` → operation. Built once and handed to the
/// dispatcher; a missing pair means the method is not allowed.
#[derive(Debug, Clone)]
pub struct CrudTable(HashMap<(EndpointKind, Method), Operation>);

impl CrudTable {
    /// Every operation at its conventional `(kind, method)`.
    pub fn standard() -> Self {
        Self(
            Operation::ALL
                .iter()
                .map(|op| ((op.kind(), op.method()), *op))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn with(mut self, kind: EndpointKind, method: Method, op: Operation) -> Self {
        self.0.insert((kind, method), op);
        self
    }

    pub fn without(mut self, kind: EndpointKind, method: Method) -> Self {
        self.0.remove(&(kind, method));
        self
    }

    pub fn resolve(&self, kind: EndpointKind, method: &Method) -> Option<Operation> {
        self.0.get(&(kind, method.clone())).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CrudTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Who is making the request. Set by the hosting layer; `None` is anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub username: Option<String>,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self {
            username: Some(name.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }
}

/// Transport-neutral view of one API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub pk: Option<i64>,
    pub body: Option<Value>,
    pub query: HashMap<String, String>,
    pub actor: Actor,
    /// Scheme and authority of the incoming request, for absolute URLs.
    pub base_url: Option<Url>,
    pub path: String,
    pub linker: Option<Arc<dyn Linker>>,
}

impl ApiRequest {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            pk: None,
            body: None,
            query: HashMap::new(),
            actor: Actor::anonymous(),
            base_url: None,
            path: String::from("/"),
            linker: None,
        }
    }

    pub fn with_pk(mut self, pk: i64) -> Self {
        self.pk = Some(pk);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_linker(mut self, linker: Arc<dyn Linker>) -> Self {
        self.linker = Some(linker);
        self
    }

    /// Absolute form of a server path, or the path itself without a base.
    pub fn absolute(&self, path: &str) -> String {
        self.base_url
            .as_ref()
            .and_then(|base| base.join(path).ok())
            .map(String::from)
            .unwrap_or_else(|| path.to_string())
    }
}

/// What an operation produced.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// One record, shaped through the preparer.
    Item(Data),
    /// Many records, shaped and wrapped as `{count, objects}`.
    Collection(Vec<Data>),
    /// Returned untouched.
    Raw(Value),
    /// Nothing to return (missing record, or a delete).
    Absent,
}

#[async_trait]
pub trait Resource: Send + Sync {
    /// Resource name used in routes and links.
    fn name(&self) -> &str;

    /// Exposed field map; `None` serializes data as-is.
    fn fields(&self) -> Option<FieldMap> {
        None
    }

    fn preparer(&self, req: &ApiRequest) -> Preparer {
        Preparer::new(self.fields()).with_linker(req.linker.clone())
    }

    /// Reads are open; writes need an override.
    fn authorize(&self, req: &ApiRequest) -> bool {
        req.method == Method::GET
    }

    async fn list(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Err(ApiError::not_implemented(Operation::List))
    }

    async fn create(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Err(ApiError::not_implemented(Operation::Create))
    }

    async fn update_list(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Err(ApiError::not_implemented(Operation::UpdateList))
    }

    async fn delete_list(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Err(ApiError::not_implemented(Operation::DeleteList))
    }

    async fn detail(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Err(ApiError::not_implemented(Operation::Detail))
    }

    async fn create_detail(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Err(ApiError::not_implemented(Operation::CreateDetail))
    }

    async fn update(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Err(ApiError::not_implemented(Operation::Update))
    }

    async fn delete(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Err(ApiError::not_implemented(Operation::Delete))
    }
}
