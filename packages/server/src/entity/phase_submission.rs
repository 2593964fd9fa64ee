use common::{Phase, SubmissionKind};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One uploaded deliverable. At most one row per `(registration_id, phase, kind)`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "phase_submission")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub registration_id: i32,
    #[sea_orm(belongs_to, from = "registration_id", to = "id")]
    pub registration: HasOne<super::competition_registration::Entity>,

    pub phase: Phase,
    pub kind: SubmissionKind,

    pub storage_key: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    /// SHA-256, hex.
    pub checksum: String,

    pub submitted_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
