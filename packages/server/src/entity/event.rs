use common::EventKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub slug: String,
    pub title: String,
    pub kind: EventKind,
    pub description: String,
    pub venue: String,
    pub starts_at: DateTimeUtc,
    pub ends_at: DateTimeUtc,
    /// `None` means unlimited seats.
    pub capacity: Option<i32>,
    /// Ticket price in rupiah; 0 for free events.
    pub price: i64,
    pub is_active: bool,

    #[sea_orm(has_many)]
    pub tickets: HasMany<super::event_registration::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
