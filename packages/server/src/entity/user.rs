use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An account. Committee members are users whose role grants admin permissions.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored lowercase.
    #[sea_orm(unique)]
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,

    pub role: String,
    #[sea_orm(belongs_to, from = "role", to = "name")]
    pub role_ref: HasOne<super::role::Entity>,

    pub is_active: bool,

    #[sea_orm(has_many)]
    pub activate_tokens: HasMany<super::activate_token::Entity>,

    #[sea_orm(has_many)]
    pub registrations: HasMany<super::competition_registration::Entity>,

    #[sea_orm(has_many)]
    pub tickets: HasMany<super::event_registration::Entity>,

    #[sea_orm(has_one)]
    pub karya_vote: HasOne<super::karya_vote::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
