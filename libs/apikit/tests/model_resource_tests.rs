//! ModelResource behavior driven through the dispatcher over an in-memory store.

mod common;

use std::sync::Arc;

use apikit::{
    Actor, ApiRequest, ApiSettings, CrudTable, Dispatcher, EndpointKind, FieldMap, MemoryStore,
    ModelResource, Operation, Reply, UnknownFields,
};
use http::{Method, StatusCode};
use serde_json::{json, Value};

use common::Note;

struct Fixture {
    store: Arc<MemoryStore<Note>>,
    dispatcher: Dispatcher<ModelResource<MemoryStore<Note>>>,
}

fn fixture(policy: UnknownFields, can_delete: bool) -> Fixture {
    let store = Arc::new(MemoryStore::<Note>::new());
    let factory_store = Arc::clone(&store);
    let dispatcher = Dispatcher::new(
        move || {
            ModelResource::new("note", Arc::clone(&factory_store))
                .with_unknown_fields(policy)
                .with_can_delete(can_delete)
        },
        CrudTable::standard(),
        Arc::new(ApiSettings::default()),
    );
    Fixture { store, dispatcher }
}

fn authed(method: Method) -> ApiRequest {
    ApiRequest::new(method).with_actor(Actor::user("alice"))
}

fn data(reply: Reply) -> (Operation, Value) {
    match reply {
        Reply::Data { operation, body } => (operation, body),
        other => panic!("expected data, got {other:?}"),
    }
}

fn error(reply: Reply) -> (StatusCode, Value) {
    match reply {
        Reply::Error { status, body } => (status, body),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_ignores_unknown_fields_by_default() {
    let fx = fixture(UnknownFields::Ignore, false);
    let req = authed(Method::POST).with_body(json!({"title": "buy milk", "colour": "blue"}));

    let (op, body) = data(fx.dispatcher.handle(EndpointKind::List, req).await);
    assert_eq!(op, Operation::Create);
    assert_eq!(body["title"], json!("buy milk"));
    assert_eq!(body["id"], json!(1));
    assert!(body.get("colour").is_none());
    assert_eq!(fx.store.len(), 1);
}

#[tokio::test]
async fn create_rejects_unknown_fields_when_configured() {
    let fx = fixture(UnknownFields::Reject, false);
    let req = authed(Method::POST).with_body(json!({"title": "x", "colour": "blue"}));

    let (status, body) = error(fx.dispatcher.handle(EndpointKind::List, req).await);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!(["colour: unknown field"]));
    assert!(fx.store.is_empty());
}

#[tokio::test]
async fn create_accepts_only_one_record() {
    let fx = fixture(UnknownFields::Ignore, false);
    let req = authed(Method::POST).with_body(json!([{"title": "a"}, {"title": "b"}]));

    let (status, body) = error(fx.dispatcher.handle(EndpointKind::List, req).await);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Only one new record allowed"}));
}

#[tokio::test]
async fn create_validates_before_saving() {
    let fx = fixture(UnknownFields::Ignore, false);
    let req = authed(Method::POST).with_body(json!({"title": "  ", "done": "yes"}));

    let (status, body) = error(fx.dispatcher.handle(EndpointKind::List, req).await);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!(["done: expected a boolean"]));

    let req = authed(Method::POST).with_body(json!({"title": ""}));
    let (_, body) = error(fx.dispatcher.handle(EndpointKind::List, req).await);
    assert_eq!(body["error"], json!(["title: This field cannot be blank."]));
    assert!(fx.store.is_empty());
}

#[tokio::test]
async fn primary_key_is_not_assignable() {
    let fx = fixture(UnknownFields::Reject, false);
    let req = authed(Method::POST).with_body(json!({"id": 42, "title": "t"}));
    let (_, body) = data(fx.dispatcher.handle(EndpointKind::List, req).await);
    assert_eq!(body["id"], json!(1));
}

#[tokio::test]
async fn anonymous_writes_are_unauthorized() {
    let fx = fixture(UnknownFields::Ignore, true);
    let req = ApiRequest::new(Method::POST).with_body(json!({"title": "x"}));

    let (status, body) = error(fx.dispatcher.handle(EndpointKind::List, req).await);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Unauthorized"}));
}

#[tokio::test]
async fn delete_requires_can_delete() {
    let denied = fixture(UnknownFields::Ignore, false);
    let req = authed(Method::DELETE).with_pk(1);
    let (status, _) = error(denied.dispatcher.handle(EndpointKind::Detail, req).await);
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let allowed = fixture(UnknownFields::Ignore, true);
    let req = authed(Method::DELETE).with_pk(1);
    let reply = allowed.dispatcher.handle(EndpointKind::Detail, req).await;
    assert!(matches!(reply, Reply::Absent { operation: Operation::Delete }));
}

#[tokio::test]
async fn detail_update_and_list() {
    let fx = fixture(UnknownFields::Ignore, false);
    let create = authed(Method::POST).with_body(json!({"title": "draft"}));
    data(fx.dispatcher.handle(EndpointKind::List, create).await);

    let missing = ApiRequest::new(Method::GET).with_pk(99);
    let reply = fx.dispatcher.handle(EndpointKind::Detail, missing).await;
    assert!(matches!(reply, Reply::Absent { operation: Operation::Detail }));

    let update = authed(Method::PUT)
        .with_pk(1)
        .with_body(json!({"title": "final", "done": true}));
    let (op, body) = data(fx.dispatcher.handle(EndpointKind::Detail, update).await);
    assert_eq!(op, Operation::Update);
    assert_eq!((body["title"].clone(), body["done"].clone()), (json!("final"), json!(true)));

    let (_, body) = data(
        fx.dispatcher
            .handle(EndpointKind::List, ApiRequest::new(Method::GET))
            .await,
    );
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["objects"][0]["title"], json!("final"));
}

#[tokio::test]
async fn update_of_missing_record_is_absent() {
    let fx = fixture(UnknownFields::Ignore, false);
    let req = authed(Method::PUT).with_pk(5).with_body(json!({"title": "x"}));
    let reply = fx.dispatcher.handle(EndpointKind::Detail, req).await;
    assert!(matches!(reply, Reply::Absent { operation: Operation::Update }));
}

#[tokio::test]
async fn bulk_operations_are_not_implemented() {
    let fx = fixture(UnknownFields::Ignore, false);
    let (status, body) = error(
        fx.dispatcher
            .handle(EndpointKind::List, authed(Method::PUT).with_body(json!([])))
            .await,
    );
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(
        body["error"],
        json!("The \"update_list\" method (list,PUT) is not implemented.")
    );

    let (status, _) = error(
        fx.dispatcher
            .handle(EndpointKind::Detail, authed(Method::POST).with_pk(1))
            .await,
    );
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn custom_field_maps_resolve_paths() {
    let store = Arc::new(MemoryStore::<Note>::new());
    let factory_store = Arc::clone(&store);
    let fields = FieldMap::new()
        .field("name", "+shout")
        .field("finished", "done")
        .field("missing", ":nothing.here");
    let dispatcher = Dispatcher::new(
        move || ModelResource::new("note", Arc::clone(&factory_store)).with_fields(fields.clone()),
        CrudTable::standard(),
        Arc::new(ApiSettings::default()),
    );

    let req = authed(Method::POST).with_body(json!({"title": "quiet"}));
    let (_, body) = data(dispatcher.handle(EndpointKind::List, req).await);
    assert_eq!(body, json!({"name": "QUIET", "finished": false, "missing": null}));
}

#[tokio::test]
async fn resolve_errors_are_server_errors() {
    let store = Arc::new(MemoryStore::<Note>::new());
    let factory_store = Arc::clone(&store);
    let dispatcher = Dispatcher::new(
        move || {
            ModelResource::new("note", Arc::clone(&factory_store))
                .with_fields(FieldMap::new().field("x", "no_such_attribute"))
        },
        CrudTable::standard(),
        Arc::new(ApiSettings::default()),
    );

    let req = authed(Method::POST).with_body(json!({"title": "t"}));
    let (status, body) = error(dispatcher.handle(EndpointKind::List, req).await);
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body["error"],
        json!("'note' object has no attribute 'no_such_attribute'")
    );
}
