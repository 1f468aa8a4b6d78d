use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::resource::Actor;

/// Bearer token → username.
pub type TokenTable = Arc<HashMap<String, String>>;

/// Attach an [`Actor`] to every request. Known bearer tokens authenticate;
/// anything else proceeds anonymously.
pub async fn bearer_actor(State(tokens): State<TokenTable>, mut req: Request, next: Next) -> Response {
    let actor = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| tokens.get(token.trim()))
        .map(Actor::user)
        .unwrap_or_default();

    if let Some(name) = &actor.username {
        tracing::debug!(user = %name, "authenticated request");
    }
    req.extensions_mut().insert(actor);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn_with_state, routing::get, Extension, Router};
    use http::StatusCode;
    use tower::ServiceExt;

    async fn whoami(Extension(actor): Extension<Actor>) -> String {
        actor.username.unwrap_or_else(|| "anonymous".to_string())
    }

    fn app() -> Router {
        let tokens: TokenTable = Arc::new(HashMap::from([("s3cret".to_string(), "alice".to_string())]));
        Router::new()
            .route("/", get(whoami))
            .layer(from_fn_with_state(tokens, bearer_actor))
    }

    async fn call(auth: Option<&str>) -> String {
        let mut req = http::Request::builder().uri("/");
        if let Some(a) = auth {
            req = req.header(AUTHORIZATION, a);
        }
        let resp = app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn known_token_authenticates() {
        assert_eq!(call(Some("Bearer s3cret")).await, "alice");
    }

    #[tokio::test]
    async fn unknown_or_missing_token_is_anonymous() {
        assert_eq!(call(Some("Bearer nope")).await, "anonymous");
        assert_eq!(call(Some("Basic s3cret")).await, "anonymous");
        assert_eq!(call(None).await, "anonymous");
    }
}
