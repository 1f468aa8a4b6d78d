//! Per-request `http_request` spans: request id, matched route, API resource
//! and the authenticated user.

use std::time::Duration;

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    request_id::{MakeRequestId, RequestId},
    trace::{DefaultOnRequest, TraceLayer},
};
use tracing::{
    field::{display, Empty},
    Span,
};

use apikit::Actor;

pub const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Fresh nanoid for requests that arrive without an `x-request-id`.
#[derive(Clone, Default)]
pub struct NanoRequestId;

impl MakeRequestId for NanoRequestId {
    fn make_request_id<B>(&mut self, _req: &axum::http::Request<B>) -> Option<RequestId> {
        let id = nanoid::nanoid!();
        Some(RequestId::new(id.parse().ok()?))
    }
}

/// API resource and endpoint kind behind a matched route, e.g.
/// `/api/accounts/user/{pk}/` is `("user", "detail")`. Index pages are
/// reported as `index`.
pub fn api_target(route: &str) -> Option<(&str, &'static str)> {
    let rest = route.strip_prefix("/api/")?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] | [_] => Some(("index", "detail")),
        [.., resource, "{pk}"] => Some((*resource, "detail")),
        [.., resource] => Some((*resource, "list")),
    }
}

fn make_span(req: &Request<Body>) -> Span {
    let rid = req
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("n/a");
    let route = req.extensions().get::<MatchedPath>().map(MatchedPath::as_str);

    let span = tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %rid,
        route = Empty,
        resource = Empty,
        endpoint = Empty,
        user = Empty,
        status = Empty,
        latency_ms = Empty,
    );
    if let Some(route) = route {
        span.record("route", display(route));
        if let Some((resource, endpoint)) = api_target(route) {
            span.record("resource", display(resource));
            span.record("endpoint", display(endpoint));
        }
    }
    span
}

fn record_response(res: &Response, latency: Duration, span: &Span) {
    span.record("status", res.status().as_u16());
    span.record("latency_ms", latency.as_millis() as u64);
    tracing::debug!(parent: span, status = res.status().as_u16(), "response");
}

/// Trace layer whose spans carry the fields above. Runs inside the request id
/// layers so the id is already in the extensions.
#[allow(clippy::type_complexity)]
pub fn trace_layer() -> TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    fn(&Request<Body>) -> Span,
    DefaultOnRequest,
    fn(&Response, Duration, &Span),
> {
    TraceLayer::new_for_http()
        .make_span_with(make_span as fn(&Request<Body>) -> Span)
        .on_response(record_response as fn(&Response, Duration, &Span))
}

/// Records the actor attached by the bearer middleware on the request span.
/// Must sit inside `bearer_actor`.
pub async fn record_actor(req: Request, next: Next) -> Response {
    if let Some(name) = req.extensions().get::<Actor>().and_then(|a| a.username.as_deref()) {
        Span::current().record("user", display(name));
    }
    next.run(req).await
}
