use chrono::Utc;
use sea_orm::{ActiveValue::NotSet, Set};

use crate::domain::User;
use crate::infra::storage::entity::{ActiveModel, Model};

impl From<Model> for User {
    fn from(m: Model) -> Self {
        Self {
            id: Some(m.id),
            username: m.username,
            email: m.email,
            first_name: m.first_name,
            last_name: m.last_name,
            is_active: m.is_active,
            is_staff: m.is_staff,
            date_joined: Some(m.date_joined),
        }
    }
}

/// Full-row active model; an unsaved user leaves the id to the database.
pub fn to_active(u: &User) -> ActiveModel {
    ActiveModel {
        id: u.id.map(Set).unwrap_or(NotSet),
        username: Set(u.username.trim().to_string()),
        email: Set(u.email.clone()),
        first_name: Set(u.first_name.clone()),
        last_name: Set(u.last_name.clone()),
        is_active: Set(u.is_active),
        is_staff: Set(u.is_staff),
        date_joined: Set(u.date_joined.unwrap_or_else(Utc::now)),
    }
}
