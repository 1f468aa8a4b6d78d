use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::browse::API_ROOT;
use crate::data::Data;
use crate::error::ApiResult;
use crate::resource::{ApiRequest, Outcome, Resource};

/// One module mounted under `/api/{slug}/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub label: String,
    pub slug: String,
    pub resources: Vec<String>,
}

impl ModuleEntry {
    pub fn new(label: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            slug: slug.into(),
            resources: Vec::new(),
        }
    }

    pub fn resource(mut self, name: impl Into<String>) -> Self {
        self.resources.push(name.into());
        self
    }

    pub fn mount(&self) -> String {
        format!("{API_ROOT}{}/", self.slug)
    }
}

/// Registry behind `GET /api/`.
#[derive(Debug, Clone, Default)]
pub struct ApiIndex {
    modules: Vec<Arc<ModuleEntry>>,
}

impl ApiIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: ModuleEntry) -> Arc<ModuleEntry> {
        let entry = Arc::new(entry);
        self.modules.retain(|m| m.slug != entry.slug);
        self.modules.push(Arc::clone(&entry));
        entry
    }

    pub fn module(&self, slug: &str) -> Option<Arc<ModuleEntry>> {
        self.modules.iter().find(|m| m.slug == slug).cloned()
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<ModuleEntry>> {
        self.modules.iter()
    }

    /// Module label → absolute module URL.
    pub fn root(&self, req: &ApiRequest) -> Value {
        let map: Map<String, Value> = self
            .modules
            .iter()
            .map(|m| (m.label.clone(), Value::String(req.absolute(&m.mount()))))
            .collect();
        Value::Object(map)
    }
}

/// `GET /api/`: the registered modules.
pub struct RootIndex {
    index: Arc<ApiIndex>,
}

impl RootIndex {
    pub fn new(index: Arc<ApiIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Resource for RootIndex {
    fn name(&self) -> &str {
        "api"
    }

    async fn detail(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        Ok(Outcome::Raw(self.index.root(req)))
    }
}

/// `GET /api/{module}/`: resource name → absolute list URL. Only the detail
/// operation is served.
pub struct ModuleIndex {
    entry: Arc<ModuleEntry>,
}

impl ModuleIndex {
    pub fn new(entry: Arc<ModuleEntry>) -> Self {
        Self { entry }
    }
}

#[async_trait]
impl Resource for ModuleIndex {
    fn name(&self) -> &str {
        &self.entry.slug
    }

    async fn detail(&self, req: &ApiRequest) -> ApiResult<Outcome> {
        let mount = self.entry.mount();
        Ok(Outcome::Item(Data::mapping(self.entry.resources.iter().map(
            |name| {
                let url = req.absolute(&format!("{mount}{name}/"));
                (name.clone(), Data::from(url))
            },
        ))))
    }
}
