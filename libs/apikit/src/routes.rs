use std::any::type_name;

use serde_json::Value;
use url::Url;

use crate::preparer::Linker;
use crate::resource::EndpointKind;

/// Route names and paths for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub resource: String,
}

impl RouteSpec {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }

    /// Derive the resource name from a type: generic arguments and an
    /// `Api`/`Resource` affix are dropped and the rest lowercased
    /// (`BaseApi` → `base`, `UserResource<S>` → `user`).
    pub fn for_type<T: ?Sized>() -> Self {
        let full = type_name::<T>();
        let path = full.split('<').next().unwrap_or(full);
        let short = path.rsplit("::").next().unwrap_or(path);
        Self::new(normalize(short))
    }

    pub fn url_name(&self, kind: EndpointKind, prefix: Option<&str>) -> String {
        match prefix {
            Some(p) => format!("{p}_{}", kind.as_str()),
            None => format!("api_{}_{}", self.resource, kind.as_str()),
        }
    }

    pub fn list_path(&self) -> String {
        format!("/{}/", self.resource)
    }

    pub fn detail_path(&self) -> String {
        format!("/{}/{{pk}}/", self.resource)
    }
}

fn normalize(name: &str) -> String {
    let mut name = name;
    for affix in ["Resource", "Api"] {
        if let Some(stripped) = name.strip_suffix(affix).filter(|s| !s.is_empty()) {
            name = stripped;
        }
        if let Some(stripped) = name.strip_prefix(affix).filter(|s| !s.is_empty()) {
            name = stripped;
        }
    }
    name.to_lowercase()
}

/// Builds `{base}{mount}{resource}/{pk}/` detail links.
#[derive(Debug, Clone)]
pub struct RouteLinker {
    base: Url,
    mount: String,
}

impl RouteLinker {
    pub fn new(base: Url, mount: impl Into<String>) -> Self {
        let mut mount = mount.into();
        if !mount.ends_with('/') {
            mount.push('/');
        }
        Self { base, mount }
    }
}

impl Linker for RouteLinker {
    fn detail_url(&self, resource: &str, pk: &Value) -> Option<String> {
        let pk = match pk {
            Value::Number(n) => n.to_string(),
            Value::String(s) if !s.is_empty() => s.clone(),
            _ => return None,
        };
        self.base
            .join(&format!("{}{resource}/{pk}/", self.mount))
            .ok()
            .map(String::from)
    }
}
