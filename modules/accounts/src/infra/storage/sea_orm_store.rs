//! SeaORM-backed user store.
//!
//! Generic over `C: ConnectionTrait`, so it can run on a `DatabaseConnection`
//! or inside a transaction.

use anyhow::Context;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use apikit::Store;

use crate::domain::User;
use crate::infra::storage::entity::{Column, Entity as UserEntity};
use crate::infra::storage::mapper::to_active;

pub struct SeaOrmUserStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUserStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    async fn taken(&self, column: Column, value: &str, id: Option<i64>) -> anyhow::Result<bool> {
        let mut query = UserEntity::find().filter(column.eq(value));
        if let Some(id) = id {
            query = query.filter(Column::Id.ne(id));
        }
        let count = query
            .count(&self.conn)
            .await
            .context("uniqueness check failed")?;
        Ok(count > 0)
    }
}

#[async_trait::async_trait]
impl<C> Store for SeaOrmUserStore<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    type Item = User;

    async fn all(&self) -> anyhow::Result<Vec<User>> {
        let rows = UserEntity::find()
            .order_by_asc(Column::Id)
            .all(&self.conn)
            .await
            .context("list users failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, pk: i64) -> anyhow::Result<Option<User>> {
        let found = UserEntity::find_by_id(pk)
            .one(&self.conn)
            .await
            .context("find user failed")?;
        Ok(found.map(Into::into))
    }

    async fn save(&self, user: User) -> anyhow::Result<User> {
        let active = to_active(&user);
        let saved = if user.id.is_some() {
            active.update(&self.conn).await.context("update user failed")?
        } else {
            active.insert(&self.conn).await.context("insert user failed")?
        };
        Ok(saved.into())
    }

    async fn validate_unique(&self, user: &User) -> anyhow::Result<Vec<String>> {
        let mut errors = Vec::new();
        if self.taken(Column::Username, user.username.trim(), user.id).await? {
            errors.push("username: A user with that username already exists.".to_string());
        }
        if !user.email.is_empty() && self.taken(Column::Email, &user.email, user.id).await? {
            errors.push("email: A user with that email address already exists.".to_string());
        }
        Ok(errors)
    }
}
