use common::VerificationStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A ticket. Unique per `(event_id, user_id)`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_registration")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub event_id: i32,
    #[sea_orm(belongs_to, from = "event_id", to = "id")]
    pub event: HasOne<super::event::Entity>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub attendee_name: String,
    pub attendee_email: String,

    pub status: VerificationStatus,
    pub amount_due: i64,
    pub payment_proof_key: Option<String>,
    pub payment_uploaded_at: Option<DateTimeUtc>,

    /// Issued on approval; this is what the QR code encodes.
    #[sea_orm(unique)]
    pub ticket_code: Option<String>,
    pub checked_in_at: Option<DateTimeUtc>,

    pub verified_by: Option<i32>,
    pub verified_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
