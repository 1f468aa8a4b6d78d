//! Generic resource over a persisted model.

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::{Data, Record};
use crate::error::{ApiError, ApiResult};
use crate::preparer::{FieldDescriptor, FieldKind, FieldMap};
use crate::resource::{ApiRequest, Outcome, Resource};

/// A record type a [`Store`] can persist and clients can write to.
pub trait Model: Record + Clone + Default + 'static {
    fn field_descriptors() -> Vec<FieldDescriptor>;

    fn has_field(name: &str) -> bool {
        Self::field_descriptors()
            .iter()
            .any(|f| f.name == name || f.attname == name)
    }

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Assign one client-supplied value. `Err` carries a message for the
    /// validation error list.
    fn set_field(&mut self, name: &str, value: &Value) -> Result<(), String>;

    /// Field-level validation before save.
    fn full_clean(&self) -> Result<(), Vec<String>>;
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Item: Model;

    async fn all(&self) -> anyhow::Result<Vec<Self::Item>>;

    async fn get(&self, pk: i64) -> anyhow::Result<Option<Self::Item>>;

    /// Insert when the item has no id yet, update otherwise.
    async fn save(&self, item: Self::Item) -> anyhow::Result<Self::Item>;

    /// Uniqueness violations, as validation messages.
    async fn validate_unique(&self, _item: &Self::Item) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// What to do with body keys the model does not have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    #[default]
    Ignore,
    Reject,
}

pub struct ModelResource<S: Store> {
    name: String,
    store: Arc<S>,
    fields: Option<FieldMap>,
    unknown_fields: UnknownFields,
    can_delete: bool,
}

impl<S: Store> ModelResource<S> {
    pub fn new(name: impl Into<String>, store: Arc<S>) -> Self {
        Self {
            name: name.into(),
            store,
            fields: None,
            unknown_fields: UnknownFields::default(),
            can_delete: false,
        }
    }

    /// Replace the field map derived from the model's descriptors.
    pub fn with_fields(mut self, fields: FieldMap) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn with_can_delete(mut self, can_delete: bool) -> Self {
        self.can_delete = can_delete;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn can_delete(&self) -> bool {
        self.can_delete
    }

    pub async fn fetch(&self, pk: Option<i64>) -> ApiResult<Option<S::Item>> {
        let Some(pk) = pk else {
            return Ok(None);
        };
        self.store
            .get(pk)
            .await
            .map_err(|e| ApiError::persistence(&e))
    }

    /// Copy body values onto the item. The primary key is never assigned.
    pub fn assign(&self, item: &mut S::Item, body: &Map<String, Value>) -> ApiResult<()> {
        let descriptors = S::Item::field_descriptors();
        let mut errors = Vec::new();

        for (key, value) in body {
            let primary = descriptors
                .iter()
                .any(|f| f.kind == FieldKind::PrimaryKey && (f.name == *key || f.attname == *key));
            if primary {
                continue;
            }
            if !S::Item::has_field(key) {
                match self.unknown_fields {
                    UnknownFields::Ignore => {
                        tracing::debug!(resource = %self.name, field = %key, "ignoring unknown field");
                    }
                    UnknownFields::Reject => errors.push(format!("{key}: unknown field")),
                }
                continue;
            }
            if let Err(msg) = item.set_field(key, value) {
                errors.push(format!("{key}: {msg}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }

    /// Validate (fields, then uniqueness) and persist.
    pub async fn clean_and_save(&self, item: S::Item) -> ApiResult<S::Item> {
        let mut errors = item.full_clean().err().unwrap_or_default();
        let unique = self
            .store
            .validate_unique(&item)
            .await
            .map_err(|e| ApiError::persistence(&e))?;
        errors.extend(unique);
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        self.store
            .save(item)
            .await
            .map_err(|e| ApiError::persistence(&e))
    }

    fn body_object<'a>(&self, req: &'a ApiRequest) -> Option<&'a Map<String, Value>> {
        req.body.as_ref().and_then(Value::as_object)
    }
}

#[async_trait]
impl<S: Store> Resource for ModelResource<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> Option<FieldMap> {
        Some(
            self.fields
                .clone()
                .unwrap_or_else(|| FieldMap::from_descriptors(&S::Item::field_descriptors())),
        )
    }

    /// Reads are open; writes need an authenticated actor; deletes also need
    /// the resource to allow them.
    fn authorize(&self, req: &ApiRequest) -> bool {
        let allowed = match req.method {
            Method::GET => return true,
            Method::POST | Method::PUT => true,
            Method::DELETE => self.can_delete,
            _ => false,
        };
        allowed && req.actor.is_authenticated()
    }

    async fn list(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        let items = self
            .store
            .all()
            .await
            .map_err(|e| ApiError::persistence(&e))?;
        Ok(Outcome::Collection(items.into_iter().map(Data::record).collect()))
    }

    async fn detail(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        Ok(match self.fetch(req.pk).await? {
            Some(item) => Outcome::Item(Data::record(item)),
            None => Outcome::Absent,
        })
    }

    async fn create(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        let body = self.body_object(req).ok_or(ApiError::MultipleRecords)?;
        let mut item = S::Item::default();
        self.assign(&mut item, body)?;
        let saved = self.clean_and_save(item).await?;
        tracing::info!(resource = %self.name, id = ?saved.id(), "record created");
        Ok(Outcome::Item(Data::record(saved)))
    }

    async fn update(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        let Some(mut item) = self.fetch(req.pk).await? else {
            return Ok(Outcome::Absent);
        };
        let body = self
            .body_object(req)
            .ok_or_else(|| ApiError::BadRequest("Request body must be a JSON object".into()))?;
        self.assign(&mut item, body)?;
        let saved = self.clean_and_save(item).await?;
        tracing::info!(resource = %self.name, id = ?saved.id(), "record updated");
        Ok(Outcome::Item(Data::record(saved)))
    }

    async fn delete(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Ok(Outcome::Absent)
    }

    async fn delete_list(&self, _req: &ApiRequest) -> ApiResult<Outcome> {
        Ok(Outcome::Absent)
    }
}
