//! Accounts: site users exposed through the generic API layer.

pub mod config;
pub mod module;

pub use config::AccountsConfig;
pub use module::Accounts;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
