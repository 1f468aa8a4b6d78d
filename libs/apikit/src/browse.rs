//! Navigation context for browsing the API from a client that is not a program.

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::pagination::{paginate, Pager};

pub const API_ROOT: &str = "/api/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub label: String,
    pub url: String,
}

impl Crumb {
    fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Trail from the API root down to `path`: module, then list, then instance.
pub fn breadcrumbs(base: &Url, path: &str) -> Vec<Crumb> {
    let absolute = |p: &str| {
        base.join(p)
            .map(String::from)
            .unwrap_or_else(|_| p.to_string())
    };

    let mut crumbs = vec![Crumb::new("API Root", absolute(API_ROOT))];

    let rest = path
        .strip_prefix(API_ROOT)
        .or_else(|| path.strip_prefix("/api"))
        .unwrap_or("");

    let mut prefix = API_ROOT.trim_end_matches('/').to_string();
    let mut last_name = String::new();
    for (ix, segment) in rest.split('/').filter(|s| !s.is_empty()).take(3).enumerate() {
        prefix = format!("{prefix}/{segment}");
        let url = absolute(&format!("{prefix}/"));
        let name = display_name(segment);
        let label = match ix {
            0 => format!("Module {name}"),
            1 => format!("{name} List"),
            _ => format!("{last_name} Instance"),
        };
        crumbs.push(Crumb::new(label, url));
        last_name = name;
    }
    crumbs
}

/// Title case, except very short segments (ids, abbreviations) stay as-is.
fn display_name(segment: &str) -> String {
    if segment.chars().count() < 4 {
        return segment.to_string();
    }
    let mut out = String::with_capacity(segment.len());
    let mut boundary = true;
    for c in segment.chars() {
        if boundary {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        boundary = !c.is_alphabetic();
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowseContext {
    pub breadcrumbs: Vec<Crumb>,
    pub json: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pager: Option<Pager>,
}

impl BrowseContext {
    /// List pages (exactly three crumbs) are paginated.
    pub fn build(
        base: &Url,
        path: &str,
        mut json: Value,
        page: Option<&str>,
        page_size: usize,
    ) -> Self {
        let breadcrumbs = breadcrumbs(base, path);
        let pager = match breadcrumbs.as_slice() {
            [_, _, list] => paginate(&mut json, page, page_size, &list.url),
            _ => None,
        };
        Self {
            breadcrumbs,
            json,
            pager,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("http://testserver").unwrap()
    }

    fn labels(crumbs: &[Crumb]) -> Vec<&str> {
        crumbs.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn instance_trail() {
        let crumbs = breadcrumbs(&base(), "/api/accounts/user/5/");
        assert_eq!(
            labels(&crumbs),
            vec!["API Root", "Module Accounts", "User List", "User Instance"]
        );
        assert_eq!(crumbs[0].url, "http://testserver/api/");
        assert_eq!(crumbs[2].url, "http://testserver/api/accounts/user/");
        assert_eq!(crumbs[3].url, "http://testserver/api/accounts/user/5/");
    }

    #[test]
    fn root_has_single_crumb() {
        assert_eq!(labels(&breadcrumbs(&base(), "/api/")), vec!["API Root"]);
    }

    #[test]
    fn short_names_keep_their_case() {
        let crumbs = breadcrumbs(&base(), "/api/crm/big_thing/");
        assert_eq!(labels(&crumbs), vec!["API Root", "Module crm", "Big_Thing List"]);
    }

    #[test]
    fn list_pages_are_paginated() {
        let objects: Vec<Value> = (0..60).map(|i| json!(i)).collect();
        let ctx = BrowseContext::build(
            &base(),
            "/api/accounts/user/",
            json!({"count": 60, "objects": objects}),
            Some("2"),
            50,
        );
        let pager = ctx.pager.unwrap();
        assert_eq!(pager.url, "http://testserver/api/accounts/user/");
        assert_eq!((pager.curr, pager.prev, pager.next), (2, Some(1), None));
        assert_eq!(ctx.json["objects"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn detail_pages_are_not_paginated() {
        let ctx = BrowseContext::build(&base(), "/api/accounts/user/1/", json!({"id": 1}), None, 50);
        assert!(ctx.pager.is_none());
        assert_eq!(ctx.breadcrumbs.len(), 4);
    }
}
