use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use apikit::{ApiSettings, ModuleEntry};

use crate::api::rest::{resource::UserResource, routes};
use crate::config::AccountsConfig;
use crate::infra::storage::{migrations::Migrator, sea_orm_store::SeaOrmUserStore};

/// The accounts module: user records under `/api/accounts/`.
#[derive(Clone)]
pub struct Accounts {
    store: Arc<SeaOrmUserStore<DatabaseConnection>>,
    db: DatabaseConnection,
    config: AccountsConfig,
}

impl Accounts {
    pub const LABEL: &'static str = "Accounts";
    pub const SLUG: &'static str = "accounts";

    pub fn new(db: DatabaseConnection, config: AccountsConfig) -> Self {
        debug!(
            can_delete = config.can_delete,
            unknown_fields = ?config.unknown_fields,
            "accounts config loaded"
        );
        Self {
            store: Arc::new(SeaOrmUserStore::new(db.clone())),
            db,
            config,
        }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        info!("Running accounts database migrations");
        Migrator::up(&self.db, None).await?;
        info!("Accounts database migrations completed");
        Ok(())
    }

    pub fn index_entry(&self) -> ModuleEntry {
        ModuleEntry::new(Self::LABEL, Self::SLUG)
            .resource(UserResource::<SeaOrmUserStore<DatabaseConnection>>::NAME)
    }

    pub fn register_rest(&self, router: Router, settings: Arc<ApiSettings>) -> Router {
        let mount = self.index_entry().mount();
        routes::register_routes(router, &mount, Arc::clone(&self.store), &self.config, settings)
    }
}
