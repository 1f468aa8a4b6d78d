use std::sync::Arc;

use apikit::{
    async_trait, ApiError, ApiRequest, ApiResult, FieldMap, Model, ModelResource, Outcome, Resource,
    Store, UnknownFields,
};

use crate::domain::User;

/// The `user` resource. Behaves like any model resource, except that DELETE
/// deactivates the account instead of removing the row.
pub struct UserResource<S: Store<Item = User>> {
    inner: ModelResource<S>,
}

impl<S: Store<Item = User>> UserResource<S> {
    pub const NAME: &'static str = "user";

    pub fn new(store: Arc<S>, can_delete: bool, unknown_fields: UnknownFields) -> Self {
        let fields = FieldMap::from_descriptors(&User::field_descriptors())
            .field("full_name", "+get_full_name");
        Self {
            inner: ModelResource::new(Self::NAME, store)
                .with_fields(fields)
                .with_can_delete(can_delete)
                .with_unknown_fields(unknown_fields),
        }
    }
}

#[async_trait]
impl<S: Store<Item = User>> Resource for UserResource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fields(&self) -> Option<FieldMap> {
        self.inner.fields()
    }

    fn authorize(&self, req: &ApiRequest) -> bool {
        self.inner.authorize(req)
    }

    async fn list(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        self.inner.list(req).await
    }

    async fn create(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        self.inner.create(req).await
    }

    async fn detail(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        self.inner.detail(req).await
    }

    async fn update(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        self.inner.update(req).await
    }

    async fn delete(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        if let Some(mut user) = self.inner.fetch(req.pk).await? {
            // Only the flag changes; rows that predate current validation still deactivate.
            if user.is_active {
                user.is_active = false;
                let user = self
                    .inner
                    .store()
                    .save(user)
                    .await
                    .map_err(|e| ApiError::persistence(&e))?;
                tracing::info!(id = ?user.id, username = %user.username, "user deactivated");
            }
        }
        Ok(Outcome::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apikit::MemoryStore;
    use axum::http::Method;

    #[tokio::test]
    async fn delete_deactivates_rows_that_no_longer_validate() {
        let store = Arc::new(MemoryStore::<User>::new());
        let legacy = User {
            is_active: true,
            ..User::new("old name!")
        };
        assert!(legacy.full_clean().is_err());
        let legacy = store.save(legacy).await.unwrap();
        let id = legacy.id.unwrap();

        let resource = UserResource::new(Arc::clone(&store), true, UnknownFields::Ignore);
        let outcome = resource
            .delete(&ApiRequest::new(Method::DELETE).with_pk(id))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Absent));

        let stored = store.get(id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.username, "old name!");
    }

    #[test]
    fn routes_are_named_after_the_resource() {
        let spec = apikit::RouteSpec::for_type::<UserResource<MemoryStore<User>>>();
        assert_eq!(spec.resource, UserResource::<MemoryStore<User>>::NAME);
        assert_eq!(spec.list_path(), "/user/");
    }
}
