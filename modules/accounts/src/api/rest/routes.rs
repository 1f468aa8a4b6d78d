use std::sync::Arc;

use axum::Router;
use tracing::info;

use apikit::{rest::resource_router, ApiSettings, CrudTable, Dispatcher, RouteSpec, Store};

use crate::api::rest::resource::UserResource;
use crate::config::AccountsConfig;
use crate::domain::User;

/// `{mount}user/` and `{mount}user/{pk}/`; a fresh `UserResource` per request.
pub fn register_routes<S>(
    router: Router,
    mount: &str,
    store: Arc<S>,
    cfg: &AccountsConfig,
    settings: Arc<ApiSettings>,
) -> Router
where
    S: Store<Item = User>,
{
    let can_delete = cfg.can_delete;
    let unknown_fields = cfg.unknown_fields;
    let dispatcher = Dispatcher::new(
        move || UserResource::new(Arc::clone(&store), can_delete, unknown_fields),
        CrudTable::standard(),
        settings,
    );

    let spec = RouteSpec::for_type::<UserResource<S>>();
    info!(
        list = %spec.url_name(apikit::EndpointKind::List, None),
        detail = %spec.url_name(apikit::EndpointKind::Detail, None),
        "registering user routes under {mount}"
    );
    router.merge(resource_router(mount, &spec, dispatcher))
}
