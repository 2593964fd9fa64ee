use common::TransactionKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger row written alongside an approval. `registration_id` points at a
/// competition registration or an event ticket depending on `kind`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_detail")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub kind: TransactionKind,
    pub registration_id: i32,
    pub amount: i64,
    pub recorded_by: i32,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
