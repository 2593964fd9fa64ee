use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Keyed by voter: each user casts a single vote overall.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "karya_vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub karya_id: i32,
    #[sea_orm(belongs_to, from = "karya_id", to = "id")]
    pub karya: HasOne<super::karya::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
