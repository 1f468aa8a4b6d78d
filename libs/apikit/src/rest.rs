//! axum adapter: turns HTTP requests into [`ApiRequest`]s and [`Reply`]s into
//! responses.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Request},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde_json::json;
use url::Url;

use crate::browse::{BrowseContext, API_ROOT};
use crate::dispatch::{ApiSettings, Dispatcher, Reply};
use crate::error::ApiError;
use crate::index::{ApiIndex, ModuleIndex, RootIndex};
use crate::resource::{Actor, ApiRequest, CrudTable, EndpointKind, Operation, Resource};
use crate::routes::{RouteLinker, RouteSpec};

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
const FORWARDED_PROTO: &str = "x-forwarded-proto";

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Data { operation, body } => {
                let status = match operation {
                    Operation::Create => StatusCode::CREATED,
                    _ => StatusCode::OK,
                };
                (status, Json(body)).into_response()
            }
            Reply::Absent {
                operation: Operation::Delete | Operation::DeleteList,
            } => StatusCode::NO_CONTENT.into_response(),
            Reply::Absent { .. } => not_found(),
            Reply::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// Collection and item routes for one resource under `mount` (e.g. `/api/accounts`).
pub fn resource_router<R>(mount: &str, spec: &RouteSpec, dispatcher: Dispatcher<R>) -> Router
where
    R: Resource + 'static,
{
    let mount = mount.trim_end_matches('/').to_string();
    let list_path = format!("{mount}{}", spec.list_path());
    let detail_path = format!("{mount}{}", spec.detail_path());

    let list = {
        let dispatcher = dispatcher.clone();
        let mount = mount.clone();
        move |req: Request| async move { serve(&dispatcher, EndpointKind::List, &mount, None, req).await }
    };
    let detail = move |Path(pk): Path<String>, req: Request| async move {
        match pk.parse::<i64>() {
            Ok(pk) => serve(&dispatcher, EndpointKind::Detail, &mount, Some(pk), req).await,
            Err(_) => not_found(),
        }
    };

    Router::new()
        .route(&list_path, any(list))
        .route(&detail_path, any(detail))
}

/// One path served as an item endpoint (index pages).
pub fn page_router<R>(path: &str, dispatcher: Dispatcher<R>) -> Router
where
    R: Resource + 'static,
{
    let mount = path.trim_end_matches('/').to_string();
    let handler = move |req: Request| async move {
        serve(&dispatcher, EndpointKind::Detail, &mount, None, req).await
    };
    Router::new().route(path, any(handler))
}

/// `/api/` and one `/api/{module}/` page per registered module.
pub fn index_router(index: Arc<ApiIndex>, settings: Arc<ApiSettings>) -> Router {
    let mut router = {
        let index = Arc::clone(&index);
        page_router(
            API_ROOT,
            Dispatcher::new(
                move || RootIndex::new(Arc::clone(&index)),
                CrudTable::standard(),
                Arc::clone(&settings),
            ),
        )
    };

    for entry in index.modules() {
        let path = entry.mount();
        let entry = Arc::clone(entry);
        let dispatcher = Dispatcher::new(
            move || ModuleIndex::new(Arc::clone(&entry)),
            CrudTable::standard(),
            Arc::clone(&settings),
        );
        router = router.merge(page_router(&path, dispatcher));
    }
    router
}

async fn serve<R: Resource>(
    dispatcher: &Dispatcher<R>,
    kind: EndpointKind,
    mount: &str,
    pk: Option<i64>,
    req: Request,
) -> Response {
    let (parts, body) = req.into_parts();
    let Some(base) = base_url(&parts.headers) else {
        let err = ApiError::BadRequest("Invalid Host header".to_string());
        return dispatcher.error_reply(err).into_response();
    };
    let query: HashMap<String, String> =
        url::form_urlencoded::parse(parts.uri.query().unwrap_or("").as_bytes())
            .into_owned()
            .collect();
    let actor = parts.extensions.get::<Actor>().cloned().unwrap_or_default();
    let path = parts.uri.path().to_string();

    let mut api_req = ApiRequest::new(parts.method)
        .with_actor(actor)
        .with_path(path.clone())
        .with_base_url(base.clone())
        .with_linker(Arc::new(RouteLinker::new(base.clone(), format!("{mount}/"))));
    api_req.query = query;
    api_req.pk = pk;

    match read_body(body).await {
        Ok(body) => api_req.body = body,
        Err(err) => return dispatcher.error_reply(err).into_response(),
    }

    let browse = api_req.query.get("format").is_some_and(|f| f == "browse");
    let page = api_req.query.get("page").cloned();

    match dispatcher.handle(kind, api_req).await {
        Reply::Data { operation, body } if browse => {
            let ctx = BrowseContext::build(
                &base,
                &path,
                body,
                page.as_deref(),
                dispatcher.settings().page_size,
            );
            let body = serde_json::to_value(ctx).unwrap_or_default();
            Reply::Data { operation, body }.into_response()
        }
        reply => reply.into_response(),
    }
}

async fn read_body(body: axum::body::Body) -> Result<Option<serde_json::Value>, ApiError> {
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {e}")))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("Malformed JSON body: {e}")))
}

/// Scheme and authority the client used, honouring a fronting proxy.
fn base_url(headers: &HeaderMap) -> Option<Url> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    let scheme = headers
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .filter(|s| *s == "https" || *s == "http")
        .unwrap_or("http");
    Url::parse(&format!("{scheme}://{host}/")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn base_url_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(base_url(&headers).unwrap().as_str(), "http://localhost/");

        headers.insert(header::HOST, HeaderValue::from_static("example.org:8080"));
        headers.insert(FORWARDED_PROTO, HeaderValue::from_static("https"));
        assert_eq!(base_url(&headers).unwrap().as_str(), "https://example.org:8080/");

        headers.insert(header::HOST, HeaderValue::from_static("bad host"));
        assert!(base_url(&headers).is_none());
    }

    #[test]
    fn absent_replies_map_to_status() {
        let resp = Reply::Absent { operation: Operation::Delete }.into_response();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = Reply::Absent { operation: Operation::Detail }.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = Reply::Data { operation: Operation::Create, body: json!({}) }.into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}
