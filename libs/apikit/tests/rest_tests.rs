//! The axum adapter end to end: routing, status mapping, actors, browse context.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use apikit::{
    auth::{bearer_actor, TokenTable},
    rest::{index_router, resource_router},
    ApiIndex, ApiSettings, CrudTable, Dispatcher, MemoryStore, ModelResource, ModuleEntry,
    RouteSpec, Store,
};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::from_fn_with_state,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Note;

const TOKEN: &str = "t0ken";

fn app(store: Arc<MemoryStore<Note>>, debug: bool) -> Router {
    let settings = Arc::new(ApiSettings {
        debug,
        ..Default::default()
    });

    let dispatcher = Dispatcher::new(
        move || ModelResource::new("note", Arc::clone(&store)).with_can_delete(true),
        CrudTable::standard(),
        Arc::clone(&settings),
    );

    let mut index = ApiIndex::new();
    index.register(ModuleEntry::new("Notes", "notes").resource("note"));

    let tokens: TokenTable = Arc::new(HashMap::from([(TOKEN.to_string(), "alice".to_string())]));

    Router::new()
        .merge(index_router(Arc::new(index), settings))
        .merge(resource_router("/api/notes", &RouteSpec::new("note"), dispatcher))
        .layer(from_fn_with_state(tokens, bearer_actor))
}

fn request(method: &str, uri: &str, body: Option<&str>, token: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "testserver");
    if token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
    }
    let body = match body {
        Some(b) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(b.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn seed(store: &MemoryStore<Note>, n: usize) {
    for i in 1..=n {
        store
            .save(Note {
                title: format!("note {i}"),
                ..Default::default()
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn create_requires_an_actor() {
    let store = Arc::new(MemoryStore::new());
    let body = Some(r#"{"title": "hello"}"#);

    let (status, json) = send(app(store.clone(), false), request("POST", "/api/notes/note/", body, false)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({"error": "Unauthorized"}));

    let (status, json) = send(app(store.clone(), false), request("POST", "/api/notes/note/", body, true)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["title"], json!("hello"));
    assert_eq!(json["url"], json!("http://testserver/api/notes/note/1/"));
}

#[tokio::test]
async fn detail_status_mapping() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 1).await;

    let (status, json) = send(app(store.clone(), false), request("GET", "/api/notes/note/1/", None, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], json!("note 1"));

    let (status, json) = send(app(store.clone(), false), request("GET", "/api/notes/note/7/", None, false)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json, json!({"error": "Not found"}));

    let (status, _) = send(app(store.clone(), false), request("GET", "/api/notes/note/abc/", None, false)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(app(store.clone(), false), request("DELETE", "/api/notes/note/1/", None, true)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(json, Value::Null);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let store = Arc::new(MemoryStore::new());
    let (status, json) = send(app(store, false), request("POST", "/api/notes/note/", Some("{nope"), true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("Malformed JSON body"));
}

#[tokio::test]
async fn unsupported_method_is_405() {
    let store = Arc::new(MemoryStore::new());
    let (status, json) = send(app(store, false), request("PATCH", "/api/notes/note/", None, true)).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        json["error"],
        json!("The specified HTTP method PATCH is not implemented.")
    );
}

#[tokio::test]
async fn traceback_follows_debug_setting() {
    let store = Arc::new(MemoryStore::new());
    let (_, quiet) = send(app(store.clone(), false), request("PUT", "/api/notes/note/", Some("[]"), true)).await;
    assert!(quiet.get("traceback").is_none());

    let (status, loud) = send(app(store, true), request("PUT", "/api/notes/note/", Some("[]"), true)).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(loud["error"], quiet["error"]);
    assert!(loud["traceback"]
        .as_str()
        .unwrap()
        .starts_with("Traceback (most recent call last):"));
}

#[tokio::test]
async fn browse_paginates_lists() {
    let store = Arc::new(MemoryStore::new());
    seed(&store, 120).await;

    let cases = [("1", 1, 50), ("3", 3, 20), ("abc", 1, 50), ("999", 3, 20)];
    for (page, curr, len) in cases {
        let uri = format!("/api/notes/note/?format=browse&page={page}");
        let (status, json) = send(app(store.clone(), false), request("GET", &uri, None, false)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["pager"]["curr"], json!(curr), "page {page}");
        assert_eq!(json["pager"]["last"], json!(3));
        assert_eq!(json["json"]["objects"].as_array().unwrap().len(), len);
        assert_eq!(json["json"]["count"], json!(120));
    }

    let (_, first) = send(
        app(store.clone(), false),
        request("GET", "/api/notes/note/?format=browse", None, false),
    )
    .await;
    assert_eq!(
        first["pager"],
        json!({"url": "http://testserver/api/notes/note/", "curr": 1, "last": 3, "next": 2})
    );
    assert_eq!(first["breadcrumbs"][2]["label"], json!("Note List"));

    let (_, plain) = send(app(store, false), request("GET", "/api/notes/note/", None, false)).await;
    assert!(plain.get("pager").is_none());
    assert_eq!(plain["objects"].as_array().unwrap().len(), 120);
}

#[tokio::test]
async fn index_pages() {
    let store = Arc::new(MemoryStore::new());

    let (status, root) = send(app(store.clone(), false), request("GET", "/api/", None, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root, json!({"Notes": "http://testserver/api/notes/"}));

    let (_, module) = send(app(store.clone(), false), request("GET", "/api/notes/", None, false)).await;
    assert_eq!(module, json!({"note": "http://testserver/api/notes/note/"}));

    let (status, _) = send(app(store, false), request("POST", "/api/notes/", Some("{}"), true)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
