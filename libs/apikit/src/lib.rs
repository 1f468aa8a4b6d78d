//! # apikit
//!
//! Generic REST layer over records.
//!
//! A [`Resource`] implements up to eight CRUD operations. The [`Dispatcher`]
//! picks one from the endpoint kind and HTTP method through a [`CrudTable`],
//! authorizes, runs it, and shapes the [`Outcome`] with a [`Preparer`]:
//!
//! ```text
//! GET  /api/accounts/user/     -> list    -> {"count": N, "objects": [...]}
//! POST /api/accounts/user/     -> create  -> prepared record
//! GET  /api/accounts/user/{pk}/ -> detail -> prepared record | 404
//! ```
//!
//! [`ModelResource`] provides the usual behavior over any [`Store`]; the
//! [`rest`] module adapts it all to axum.

pub mod auth;
pub mod browse;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod index;
pub mod memory;
pub mod model;
pub mod pagination;
pub mod preparer;
pub mod resource;
pub mod rest;
pub mod routes;

pub use browse::{breadcrumbs, BrowseContext, Crumb};
pub use data::{Callable, Data, Manager, Record};
pub use dispatch::{ApiSettings, Dispatcher, Reply};
pub use error::{ApiError, ApiResult};
pub use index::{ApiIndex, ModuleEntry, ModuleIndex, RootIndex};
pub use memory::MemoryStore;
pub use model::{Model, ModelResource, Store, UnknownFields};
pub use pagination::{paginate, Pager, PAGE_SIZE};
pub use preparer::{resolve, FieldDescriptor, FieldKind, FieldMap, Linker, Lookup, Preparer, ResolveError};
pub use resource::{Actor, ApiRequest, CrudTable, EndpointKind, Operation, Outcome, Resource};
pub use routes::{RouteLinker, RouteSpec};

pub use async_trait::async_trait;
