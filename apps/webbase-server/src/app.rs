//! Router assembly: API index, module routes and the tower-http stack.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

use accounts::Accounts;
use apikit::{
    auth::{bearer_actor, TokenTable},
    rest::index_router,
    ApiIndex, ApiSettings,
};

use crate::http_trace;

const BODY_LIMIT: usize = 16 * 1024 * 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Build the full HTTP router. `timeout_sec == 0` keeps the 30s default.
pub fn build_router(accounts: &Accounts, settings: Arc<ApiSettings>, timeout_sec: u64) -> Router {
    let mut index = ApiIndex::new();
    index.register(accounts.index_entry());

    let tokens: TokenTable = Arc::new(settings.tokens.clone());
    let cors_enabled = settings.cors_enabled;

    let mut router = Router::new()
        .merge(index_router(Arc::new(index), Arc::clone(&settings)));
    router = accounts.register_rest(router, settings);
    router = router
        .layer(from_fn(http_trace::record_actor))
        .layer(from_fn_with_state(tokens, bearer_actor))
        .route("/health", get(health_check));

    // Outermost to innermost:
    // SetRequestId -> PropagateRequestId -> Trace -> Timeout -> CORS -> BodyLimit
    let timeout = if timeout_sec == 0 {
        DEFAULT_TIMEOUT
    } else {
        Duration::from_secs(timeout_sec)
    };

    router = router.layer(RequestBodyLimitLayer::new(BODY_LIMIT));
    if cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }
    router
        .layer(TimeoutLayer::new(timeout))
        .layer(http_trace::trace_layer())
        .layer(PropagateRequestIdLayer::new(http_trace::REQUEST_ID))
        .layer(SetRequestIdLayer::new(http_trace::REQUEST_ID, http_trace::NanoRequestId))
}
